//! Integration tests: loading and saving through the filesystem.

use std::fs;

use otbm::otbm_node::FramingError;
use otbm::prelude::*;
use otbm::ValidationError;

// =========================================================================
// Helpers
// =========================================================================

fn items() -> ItemDatabase {
    [
        ItemType::new(100, ItemKind::Ground),
        ItemType::new(2050, ItemKind::Plain),
    ]
    .into_iter()
    .collect()
}

fn small_map() -> Map {
    let mut map = Map::new(256, 256);
    map.description = "file test".into();
    let tile = map.get_or_create_tile(Position::new(12, 34, 7));
    tile.ground = Some(Item::new(100));
    tile.items.push(Item::new(2050).with_text("note"));
    map.add_town(Town::new(1, "Edron", Position::new(12, 34, 7)))
        .unwrap();
    map
}

fn file_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// =========================================================================
// Save and load
// =========================================================================

#[test]
fn test_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.otbm");
    let map = small_map();

    let mut codec = OtbmCodec::new(items());
    codec.save(&path, &map).unwrap();
    assert_eq!(&fs::read(&path).unwrap()[..4], b"OTBM");
    assert_eq!(codec.load(&path).unwrap(), map);
    assert_eq!(file_names(dir.path()), vec!["world.otbm"]);
}

#[test]
fn test_in_place_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.otbm");
    let map = small_map();

    let config = CodecConfig {
        atomic_save: false,
        ..CodecConfig::default()
    };
    let mut codec = OtbmCodec::with_config(items(), config);
    codec.save(&path, &map).unwrap();
    assert_eq!(codec.load(&path).unwrap(), map);
}

#[test]
fn test_saved_file_matches_encode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.otbm");
    let map = small_map();

    let mut codec = OtbmCodec::new(items());
    codec.save(&path, &map).unwrap();
    assert_eq!(fs::read(&path).unwrap(), codec.encode(&map).unwrap());
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut codec = OtbmCodec::new(items());
    let err = codec.load(dir.path().join("missing.otbm")).unwrap_err();
    assert!(matches!(err, CodecError::Framing(FramingError::Io(_))));
    assert!(codec.last_error().is_some());
}

// =========================================================================
// Atomic save
// =========================================================================

#[test]
fn test_failed_save_keeps_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.otbm");
    let mut codec = OtbmCodec::new(items());
    codec.save(&path, &small_map()).unwrap();
    let before = fs::read(&path).unwrap();

    // Town ids are 16 bits on the wire; this one fails mid-save.
    let mut broken = small_map();
    broken
        .add_town(Town::new(70_000, "Overflow", Position::new(1, 1, 7)))
        .unwrap();
    let err = codec.save(&path, &broken).unwrap_err();
    assert!(matches!(
        err,
        CodecError::Validation(ValidationError::TownIdTooLarge(70_000))
    ));

    assert_eq!(fs::read(&path).unwrap(), before);
    assert_eq!(file_names(dir.path()), vec!["world.otbm"]);
    assert_eq!(codec.load(&path).unwrap(), small_map());
}

#[test]
fn test_save_into_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-such-dir").join("world.otbm");
    let mut codec = OtbmCodec::new(items());
    let err = codec.save(&path, &small_map()).unwrap_err();
    assert!(matches!(err, CodecError::Io(_)));
    assert!(!path.exists());
}
