//! Codec configuration.

use serde::{Deserialize, Serialize};

/// Settings that change how maps are loaded and saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Drop items whose id is missing from the item database instead of
    /// failing the load.
    pub skip_unknown_items: bool,

    /// Compress the properties of Tile/HouseTile nodes and everything
    /// below them. Map-wide nodes are never compressed.
    pub compress_tile_data: bool,

    /// Save to a temporary file next to the target and rename it into
    /// place, so a failed save leaves the old file untouched.
    pub atomic_save: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            skip_unknown_items: true,
            compress_tile_data: false,
            atomic_save: true,
        }
    }
}

impl CodecConfig {
    /// Defaults, but an unknown item id fails the load.
    pub fn strict() -> Self {
        Self {
            skip_unknown_items: false,
            ..Self::default()
        }
    }
}
