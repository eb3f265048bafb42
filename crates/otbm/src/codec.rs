//! Top-level load and save entry points.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use otbm_map::{ItemTypes, Map};
use otbm_node::{NodeReader, NodeWriter};
use tempfile::NamedTempFile;

use crate::load::Loader;
use crate::save::{SaveStats, Saver};
use crate::{CodecConfig, CodecError};

/// Loads and saves OTBM maps.
///
/// The codec owns the item-type lookup it validates item ids against
/// and a [`CodecConfig`]. Every operation runs to completion or to its
/// first failure; the message of the most recent failure stays available
/// through [`last_error`](Self::last_error).
///
/// ```rust
/// use otbm::prelude::*;
///
/// let items: ItemDatabase = [ItemType::new(100, ItemKind::Ground)].into_iter().collect();
/// let mut codec = OtbmCodec::new(items);
///
/// let mut map = Map::new(256, 256);
/// map.get_or_create_tile(Position::new(10, 10, 7)).ground = Some(Item::new(100));
///
/// let bytes = codec.encode(&map).unwrap();
/// let loaded = codec.decode(bytes).unwrap();
/// assert_eq!(loaded, map);
/// ```
#[derive(Debug)]
pub struct OtbmCodec<T: ItemTypes> {
    items: T,
    config: CodecConfig,
    last_error: Option<String>,
    skipped_items: usize,
}

impl<T: ItemTypes> OtbmCodec<T> {
    pub fn new(items: T) -> Self {
        Self::with_config(items, CodecConfig::default())
    }

    pub fn with_config(items: T, config: CodecConfig) -> Self {
        Self {
            items,
            config,
            last_error: None,
            skipped_items: 0,
        }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn items(&self) -> &T {
        &self.items
    }

    /// Message of the most recent failed operation, cleared on success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Unknown items dropped by the most recent load.
    pub fn skipped_items(&self) -> usize {
        self.skipped_items
    }

    // -----------------------------------------------------------------------
    // Load
    // -----------------------------------------------------------------------

    /// Reads the map file at `path`.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<Map, CodecError> {
        let path = path.as_ref();
        let result = NodeReader::open(path)
            .map_err(CodecError::from)
            .and_then(|reader| self.read(reader));
        if let Ok(map) = &result {
            tracing::info!(
                path = %path.display(),
                tiles = map.tile_count(),
                towns = map.town_count(),
                waypoints = map.waypoint_count(),
                skipped = self.skipped_items,
                "map loaded"
            );
        }
        self.track(result)
    }

    /// Decodes a map from an in-memory file image.
    pub fn decode(&mut self, bytes: Vec<u8>) -> Result<Map, CodecError> {
        let result = NodeReader::from_bytes(bytes)
            .map_err(CodecError::from)
            .and_then(|reader| self.read(reader));
        self.track(result)
    }

    fn read(&mut self, mut reader: NodeReader) -> Result<Map, CodecError> {
        self.skipped_items = 0;
        let root = reader.root_node()?;
        let mut loader = Loader::new(&self.items, &self.config);
        let result = loader.load(root);
        self.skipped_items = loader.skipped;
        result
    }

    // -----------------------------------------------------------------------
    // Save
    // -----------------------------------------------------------------------

    /// Writes `map` to `path`.
    ///
    /// With [`CodecConfig::atomic_save`] set, the map is written to a
    /// temporary file in the same directory and renamed over `path` only
    /// once it is complete, so a failed save leaves any existing file
    /// intact.
    pub fn save(&mut self, path: impl AsRef<Path>, map: &Map) -> Result<(), CodecError> {
        let path = path.as_ref();
        let result = if self.config.atomic_save {
            self.save_atomic(path, map)
        } else {
            self.save_in_place(path, map)
        };
        if let Ok(stats) = &result {
            tracing::info!(
                path = %path.display(),
                areas = stats.areas,
                tiles = stats.tiles,
                towns = map.town_count(),
                waypoints = map.waypoint_count(),
                "map saved"
            );
        }
        self.track(result).map(|_| ())
    }

    /// Encodes `map` into an in-memory file image.
    pub fn encode(&mut self, map: &Map) -> Result<Vec<u8>, CodecError> {
        let result = NodeWriter::new(Vec::new())
            .map_err(CodecError::from)
            .and_then(|writer| self.write(writer, map))
            .map(|(out, _)| out);
        self.track(result)
    }

    fn save_atomic(&self, path: &Path, map: &Map) -> Result<SaveStats, CodecError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let temp = NamedTempFile::new_in(dir)?;
        let writer = NodeWriter::new(BufWriter::new(temp))?;
        let (out, stats) = self.write(writer, map)?;
        let temp = out.into_inner().map_err(|e| e.into_error())?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| e.error)?;
        Ok(stats)
    }

    fn save_in_place(&self, path: &Path, map: &Map) -> Result<SaveStats, CodecError> {
        let writer = NodeWriter::create(path)?;
        let (out, stats) = self.write(writer, map)?;
        out.into_inner()
            .map_err(|e| e.into_error())
            .and_then(|file: File| file.sync_all())?;
        Ok(stats)
    }

    fn write<W: Write>(
        &self,
        mut writer: NodeWriter<W>,
        map: &Map,
    ) -> Result<(W, SaveStats), CodecError> {
        let stats = Saver::new(&self.items, &self.config).save(map, &mut writer)?;
        Ok((writer.finish()?, stats))
    }

    fn track<R>(&mut self, result: Result<R, CodecError>) -> Result<R, CodecError> {
        match &result {
            Ok(_) => self.last_error = None,
            Err(e) => self.last_error = Some(e.to_string()),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use otbm_map::{Item, ItemDatabase, ItemKind, ItemType, Position};

    use super::*;

    fn codec() -> OtbmCodec<ItemDatabase> {
        OtbmCodec::new(
            [ItemType::new(100, ItemKind::Ground)]
                .into_iter()
                .collect(),
        )
    }

    #[test]
    fn test_last_error_set_and_cleared() {
        let mut codec = codec();
        assert!(codec.decode(b"NOPE".to_vec()).is_err());
        assert_eq!(
            codec.last_error(),
            Some("invalid file identifier [4e, 4f, 50, 45]")
        );

        let map = Map::new(10, 10);
        let bytes = codec.encode(&map).unwrap();
        assert!(codec.last_error().is_none());
        assert_eq!(codec.decode(bytes).unwrap(), map);
    }

    #[test]
    fn test_skipped_items_reset_per_load() {
        let mut codec = codec();
        let mut map = Map::new(10, 10);
        let tile = map.get_or_create_tile(Position::new(1, 1, 7));
        tile.ground = Some(Item::new(100));
        tile.items.push(Item::new(999));
        let bytes = codec.encode(&map).unwrap();

        let loaded = codec.decode(bytes).unwrap();
        assert_eq!(codec.skipped_items(), 1);
        assert!(loaded.tile(Position::new(1, 1, 7)).unwrap().items.is_empty());

        let empty = codec.encode(&Map::new(1, 1)).unwrap();
        codec.decode(empty).unwrap();
        assert_eq!(codec.skipped_items(), 0);
    }
}
