use std::path::PathBuf;

use clap::Parser;
use otbm::prelude::*;

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "otbm-inspect", about = "Print a summary of an OTBM map and optionally re-save it")]
struct Args {
    /// Item database: a JSON list of item types.
    items: PathBuf,
    /// Map file to load.
    map: PathBuf,
    /// Write the loaded map back out to this path.
    #[arg(long, value_name = "OUT")]
    resave: Option<PathBuf>,
    /// Fail on item ids missing from the database instead of skipping them.
    #[arg(long)]
    strict: bool,
    /// Compress tile data when re-saving.
    #[arg(long)]
    compress: bool,
}

impl Args {
    fn config(&self) -> CodecConfig {
        CodecConfig {
            skip_unknown_items: !self.strict,
            compress_tile_data: self.compress,
            ..CodecConfig::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

fn print_summary(map: &Map, skipped: usize) {
    let items: usize = map
        .tiles()
        .flat_map(|t| t.ground.iter().chain(&t.items))
        .map(Item::total_count)
        .sum();
    let house_tiles = map.tiles().filter(|t| t.is_house_tile()).count();
    let creatures: usize = map.tiles().map(|t| t.creatures.len()).sum();
    let v = map.client_version;

    println!("description : {}", map.description);
    println!("size        : {} x {}", map.width, map.height);
    println!("client      : {}.{}.{}", v.major, v.minor, v.build);
    println!(
        "items otb   : {}.{}",
        map.items_version.major, map.items_version.minor
    );
    println!("tiles       : {} ({house_tiles} in houses)", map.tile_count());
    println!("items       : {items} ({skipped} unknown skipped)");
    println!("creatures   : {creatures}");
    println!("towns       : {}", map.town_count());
    for town in map.towns() {
        println!("  #{:<4} {} temple {}", town.id, town.name, town.temple_position);
    }
    println!("waypoints   : {}", map.waypoint_count());
    for waypoint in map.waypoints() {
        println!("  {} at {}", waypoint.name, waypoint.position);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let items: ItemDatabase = serde_json::from_str(&std::fs::read_to_string(&args.items)?)?;
    tracing::info!(path = %args.items.display(), types = items.len(), "item database loaded");

    let mut codec = OtbmCodec::with_config(items, args.config());
    let map = codec.load(&args.map)?;
    print_summary(&map, codec.skipped_items());

    if let Some(out) = &args.resave {
        codec.save(out, &map)?;
        println!("saved to {}", out.display());
    }
    Ok(())
}
