//! Error types for the map codec.
//!
//! Failures are split the way the format treats them:
//!
//! - [`FramingError`]: the byte stream is broken (from `otbm-node`)
//! - [`SchemaError`]: the tree is well framed but not a map this crate
//!   understands
//! - [`ValidationError`]: a decoded entity breaks a domain invariant
//! - [`CodecError::UnknownItem`]: an item id the item database lacks
//!
//! [`CodecError`] wraps all of them so callers deal with one type.

use otbm_map::{MapError, Position};
use otbm_node::FramingError;

use crate::schema::NodeType;

/// The tree does not match the map schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// An attribute tag that this node type does not define.
    #[error("unknown attribute {tag:#04x} on {node} node")]
    UnknownAttribute { node: NodeType, tag: u8 },

    /// A node type tag the format does not define.
    #[error("unknown node type {0:#04x}")]
    UnknownNodeType(u8),

    /// A known node type in a place it cannot appear.
    #[error("{found} node cannot appear inside {parent}")]
    UnexpectedNode { parent: NodeType, found: NodeType },

    /// A node that must not carry properties has some.
    #[error("{node} node has {count} unexpected property byte(s)")]
    UnexpectedProperties { node: NodeType, count: usize },

    /// An attribute whose length does not match its type.
    #[error("attribute {tag:#04x} on {node} node is {found} byte(s), expected {expected}")]
    AttributeLength {
        node: NodeType,
        tag: u8,
        expected: usize,
        found: usize,
    },

    /// The top-level node is not a Root node.
    #[error("top-level node has type {0:#04x}, expected a root node")]
    InvalidRootType(u8),

    /// The root node has no MapData child.
    #[error("root node has no map data")]
    MissingMapData,

    /// A HouseTile node without a house id.
    #[error("house tile at {0} has no house id")]
    MissingHouseId(Position),

    /// A plain Tile node carrying a house id.
    #[error("plain tile at {0} carries a house id")]
    HouseIdOnPlainTile(Position),

    /// An item of a non-container type with child items.
    #[error("item {server_id} at {position} is not a container but has contents")]
    ContentsInNonContainer { server_id: u16, position: Position },

    /// Two tile nodes decode to the same position.
    ///
    /// This happens when one area repeats an offset or when two areas
    /// overlap. Keeping either tile would silently drop the other, so the
    /// load fails instead.
    #[error("duplicate tile at {0}")]
    DuplicateTile(Position),

    /// The root header names a version outside the supported range.
    #[error("unsupported map format version {0}")]
    UnsupportedVersion(u32),

    /// A node type introduced after the file's format version.
    #[error("{node} node is not allowed in format version {version}")]
    NodeNotInVersion { node: NodeType, version: u32 },

    /// An attribute introduced after the file's format version.
    #[error("attribute {tag:#04x} on {node} node is not allowed in format version {version}")]
    AttributeNotInVersion { node: NodeType, tag: u8, version: u32 },
}

/// A decoded or to-be-encoded entity breaks a domain invariant.
///
/// The saver checks these before writing anything a later load would
/// read back differently. The loader reports the same variants for
/// values it refuses to build a map from. Variants carry the position or
/// id of the offending entity, so the `#[error]` text is enough to find
/// it in an editor.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("waypoint has an empty name")]
    EmptyWaypointName,

    #[error("waypoint {name:?} has invalid position {position}")]
    InvalidWaypointPosition { name: String, position: Position },

    #[error("town {name:?} has id 0")]
    ZeroTownId { name: String },

    #[error("town {0} has an empty name")]
    EmptyTownName(u32),

    #[error("town {id} has invalid temple position {position}")]
    InvalidTemplePosition { id: u32, position: Position },

    /// Town ids are u16 on the wire.
    #[error("town id {0} does not fit in 16 bits")]
    TownIdTooLarge(u32),

    /// A tile or area on a floor outside the valid range.
    #[error("invalid position {0}")]
    InvalidPosition(Position),

    /// A tile offset that runs past the coordinate range.
    #[error("tile offset ({dx}, {dy}) overflows area at {base}")]
    CoordinateOverflow { base: Position, dx: u8, dy: u8 },

    /// A tile whose `position` field no longer matches the position the
    /// map stores it under.
    #[error("tile stored at {key} claims position {found}")]
    MisplacedTile { key: Position, found: Position },

    /// A tile's ground slot holds an item whose type is not ground.
    ///
    /// The file has no separate ground field: the loader treats the first
    /// ground-type item of a tile as its ground. A non-ground item in the
    /// slot would come back as an ordinary stacked item.
    #[error("ground item {server_id} at {position} is not a ground type")]
    NotGroundItem { server_id: u16, position: Position },

    /// A ground-type item is stacked on a tile that has no ground.
    ///
    /// On load this item would be promoted into the ground slot.
    #[error("ground-type item {server_id} at {position} is stacked on a tile without ground")]
    StackedGroundItem { server_id: u16, position: Position },

    #[error("creature at {0} has an empty name")]
    EmptyCreatureName(Position),

    #[error("creature at {position} has invalid direction {value}")]
    InvalidDirection { position: Position, value: u8 },

    /// The map model refused the entity (duplicate town id or waypoint name).
    #[error(transparent)]
    Model(#[from] MapError),
}

/// Top-level error for map load and save.
///
/// The layer errors are wrapped with `#[error(transparent)]`, which
/// forwards both `Display` and `source()` to the inner error. A framing
/// failure therefore prints exactly as [`FramingError`] would, and `?` on
/// any layer's `Result` converts through the `#[from]` impls.
///
/// Its `Display` output is the human-readable message reported by
/// [`OtbmCodec::last_error`](crate::OtbmCodec::last_error).
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error(transparent)]
    Framing(#[from] FramingError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An item id missing from the item database, with skipping disabled.
    #[error("unknown item id {server_id} at {position}")]
    UnknownItem { server_id: u16, position: Position },

    /// File-level I/O outside the framing layer (temp file, rename).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
