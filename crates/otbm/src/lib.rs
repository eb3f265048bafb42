//! # otbm
//!
//! Reader and writer for OTBM, the node-tree binary format that stores
//! tile maps: tiles grouped into 256×256 areas, stacked and nested items,
//! creatures, houses, towns, and waypoints.
//!
//! The crate is layered the same way the format is:
//!
//! - [`otbm_node`] frames bytes into a tree of typed nodes
//! - [`otbm_map`] holds the in-memory [`Map`](otbm_map::Map)
//! - this crate maps between the two with [`OtbmCodec`]
//!
//! # Quick start
//!
//! ```rust,no_run
//! use otbm::prelude::*;
//!
//! let items: ItemDatabase =
//!     serde_json::from_str(&std::fs::read_to_string("items.json").unwrap()).unwrap();
//! let mut codec = OtbmCodec::with_config(items, CodecConfig::strict());
//!
//! let map = codec.load("world.otbm").unwrap();
//! println!("{} tiles", map.tile_count());
//! codec.save("world-copy.otbm", &map).unwrap();
//! ```
//!
//! Loading is strict: an attribute tag or node type the format does not
//! define fails the load with a [`SchemaError`]. The one lenient case is
//! an item id missing from the item database, which is skipped unless
//! [`CodecConfig::skip_unknown_items`] is turned off.

mod area;
mod attribute;
mod codec;
mod config;
mod error;
mod load;
mod save;

pub mod schema;

pub use area::{AREA_SIZE, area_offset, area_origin};
pub use codec::OtbmCodec;
pub use config::CodecConfig;
pub use error::{CodecError, SchemaError, ValidationError};

pub use otbm_map;
pub use otbm_node;

/// Convenience re-exports for the common load/save workflow.
pub mod prelude {
    pub use crate::{CodecConfig, CodecError, OtbmCodec, SchemaError, ValidationError};
    pub use otbm_map::{
        ClientVersion, Creature, Direction, Item, ItemDatabase, ItemKind, ItemType, ItemTypes,
        ItemsVersion, Map, Position, Tile, TileFlags, Town, Waypoint,
    };
}
