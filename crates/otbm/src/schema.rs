//! Node types and attribute tags of the OTBM schema.
//!
//! The schema is closed: each node type accepts a fixed set of attribute
//! tags, modelled as one enum per node type. Decoding matches
//! exhaustively on those enums, and a tag with no variant is a
//! [`SchemaError::UnknownAttribute`](crate::SchemaError::UnknownAttribute).

use std::fmt;

/// Oldest format version this crate reads.
pub const MIN_FORMAT_VERSION: u32 = 1;

/// Format version written on save. Version 2 added waypoints, creatures
/// and the client-version attributes.
pub const CURRENT_FORMAT_VERSION: u32 = 2;

/// Raw attribute tag values.
pub mod tag {
    pub const DESCRIPTION: u8 = 1;
    pub const TILE_FLAGS: u8 = 3;
    pub const ACTION_ID: u8 = 4;
    pub const UNIQUE_ID: u8 = 5;
    pub const TEXT: u8 = 6;
    pub const ITEM_DESCRIPTION: u8 = 7;
    pub const TELEPORT_DESTINATION: u8 = 8;
    pub const DEPOT_ID: u8 = 10;
    pub const EXT_SPAWN_FILE: u8 = 11;
    pub const EXT_HOUSE_FILE: u8 = 13;
    pub const HOUSE_DOOR_ID: u8 = 14;
    pub const COUNT: u8 = 15;
    pub const HOUSE_ID: u8 = 23;
    pub const CLIENT_VERSION_MAJOR: u8 = 24;
    pub const CLIENT_VERSION_MINOR: u8 = 25;
    pub const CLIENT_VERSION_BUILD: u8 = 26;
    pub const NAME: u8 = 30;
    pub const POSITION_X: u8 = 31;
    pub const POSITION_Y: u8 = 32;
    pub const POSITION_Z: u8 = 33;
    pub const CONNECTION_TO: u8 = 34;
    pub const TOWN_ID: u8 = 35;
    pub const SPAWN_TIME: u8 = 36;
    pub const DIRECTION: u8 = 37;
}

// ---------------------------------------------------------------------------
// NodeType
// ---------------------------------------------------------------------------

/// Every node type the map format defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Root,
    MapData,
    TileArea,
    Tile,
    Item,
    Creature,
    Towns,
    Town,
    HouseTile,
    Waypoints,
    Waypoint,
}

impl NodeType {
    pub fn tag(self) -> u8 {
        match self {
            Self::Root => 0x00,
            Self::MapData => 0x02,
            Self::TileArea => 0x04,
            Self::Tile => 0x05,
            Self::Item => 0x06,
            Self::Creature => 0x0B,
            Self::Towns => 0x0C,
            Self::Town => 0x0D,
            Self::HouseTile => 0x0E,
            Self::Waypoints => 0x0F,
            Self::Waypoint => 0x10,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0x00 => Self::Root,
            0x02 => Self::MapData,
            0x04 => Self::TileArea,
            0x05 => Self::Tile,
            0x06 => Self::Item,
            0x0B => Self::Creature,
            0x0C => Self::Towns,
            0x0D => Self::Town,
            0x0E => Self::HouseTile,
            0x0F => Self::Waypoints,
            0x10 => Self::Waypoint,
            _ => return None,
        })
    }

    /// First format version in which this node type may appear.
    pub fn since(self) -> u32 {
        match self {
            Self::Creature | Self::Waypoints | Self::Waypoint => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Root => "Root",
            Self::MapData => "MapData",
            Self::TileArea => "TileArea",
            Self::Tile => "Tile",
            Self::Item => "Item",
            Self::Creature => "Creature",
            Self::Towns => "Towns",
            Self::Town => "Town",
            Self::HouseTile => "HouseTile",
            Self::Waypoints => "Waypoints",
            Self::Waypoint => "Waypoint",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Per-node attribute sets
// ---------------------------------------------------------------------------

/// Attributes of the MapData node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapAttribute {
    Description,
    SpawnFile,
    HouseFile,
    ClientVersionMajor,
    ClientVersionMinor,
    ClientVersionBuild,
}

impl MapAttribute {
    pub fn from_tag(value: u8) -> Option<Self> {
        Some(match value {
            tag::DESCRIPTION => Self::Description,
            tag::EXT_SPAWN_FILE => Self::SpawnFile,
            tag::EXT_HOUSE_FILE => Self::HouseFile,
            tag::CLIENT_VERSION_MAJOR => Self::ClientVersionMajor,
            tag::CLIENT_VERSION_MINOR => Self::ClientVersionMinor,
            tag::CLIENT_VERSION_BUILD => Self::ClientVersionBuild,
            _ => return None,
        })
    }

    pub fn since(self) -> u32 {
        match self {
            Self::ClientVersionMajor | Self::ClientVersionMinor | Self::ClientVersionBuild => 2,
            _ => 1,
        }
    }
}

/// Attributes of Tile and HouseTile nodes, after the fixed X/Y offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileAttribute {
    Flags,
    HouseId,
}

impl TileAttribute {
    pub fn from_tag(value: u8) -> Option<Self> {
        match value {
            tag::TILE_FLAGS => Some(Self::Flags),
            tag::HOUSE_ID => Some(Self::HouseId),
            _ => None,
        }
    }
}

/// Attributes of Item nodes, after the fixed server id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAttribute {
    Count,
    ActionId,
    UniqueId,
    Text,
    Description,
    TeleportDestination,
    DepotId,
    DoorId,
}

impl ItemAttribute {
    pub fn from_tag(value: u8) -> Option<Self> {
        Some(match value {
            tag::COUNT => Self::Count,
            tag::ACTION_ID => Self::ActionId,
            tag::UNIQUE_ID => Self::UniqueId,
            tag::TEXT => Self::Text,
            tag::ITEM_DESCRIPTION => Self::Description,
            tag::TELEPORT_DESTINATION => Self::TeleportDestination,
            tag::DEPOT_ID => Self::DepotId,
            tag::HOUSE_DOOR_ID => Self::DoorId,
            _ => return None,
        })
    }
}

/// Attributes of Creature nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatureAttribute {
    Name,
    SpawnTime,
    Direction,
}

impl CreatureAttribute {
    pub fn from_tag(value: u8) -> Option<Self> {
        match value {
            tag::NAME => Some(Self::Name),
            tag::SPAWN_TIME => Some(Self::SpawnTime),
            tag::DIRECTION => Some(Self::Direction),
            _ => None,
        }
    }
}

/// Attributes of Town nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TownAttribute {
    Id,
    Name,
    TempleX,
    TempleY,
    TempleZ,
}

impl TownAttribute {
    pub fn from_tag(value: u8) -> Option<Self> {
        Some(match value {
            tag::TOWN_ID => Self::Id,
            tag::NAME => Self::Name,
            tag::POSITION_X => Self::TempleX,
            tag::POSITION_Y => Self::TempleY,
            tag::POSITION_Z => Self::TempleZ,
            _ => return None,
        })
    }
}

/// Attributes of Waypoint nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaypointAttribute {
    Name,
    X,
    Y,
    Z,
    ConnectionTo,
}

impl WaypointAttribute {
    pub fn from_tag(value: u8) -> Option<Self> {
        Some(match value {
            tag::NAME => Self::Name,
            tag::POSITION_X => Self::X,
            tag::POSITION_Y => Self::Y,
            tag::POSITION_Z => Self::Z,
            tag::CONNECTION_TO => Self::ConnectionTo,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_NODES: [NodeType; 11] = [
        NodeType::Root,
        NodeType::MapData,
        NodeType::TileArea,
        NodeType::Tile,
        NodeType::Item,
        NodeType::Creature,
        NodeType::Towns,
        NodeType::Town,
        NodeType::HouseTile,
        NodeType::Waypoints,
        NodeType::Waypoint,
    ];

    #[test]
    fn test_node_tags_are_unique_and_frameable() {
        for node in ALL_NODES {
            assert_eq!(NodeType::from_tag(node.tag()), Some(node));
            assert!(node.tag() <= otbm_node::MAX_NODE_TYPE);
        }
        assert_eq!(NodeType::from_tag(0x01), None);
        assert_eq!(NodeType::from_tag(0x7C), None);
    }

    #[test]
    fn test_version_gated_nodes() {
        assert_eq!(NodeType::Waypoints.since(), 2);
        assert_eq!(NodeType::Creature.since(), 2);
        assert_eq!(NodeType::Towns.since(), 1);
        assert_eq!(MapAttribute::ClientVersionBuild.since(), 2);
        assert_eq!(MapAttribute::Description.since(), 1);
    }

    #[test]
    fn test_attribute_sets_are_closed() {
        assert_eq!(TileAttribute::from_tag(tag::HOUSE_ID), Some(TileAttribute::HouseId));
        assert_eq!(TileAttribute::from_tag(tag::TEXT), None);
        assert_eq!(ItemAttribute::from_tag(tag::HOUSE_ID), None);
        assert_eq!(MapAttribute::from_tag(tag::NAME), None);
        // Town and waypoint share position tags but mean different things.
        assert_eq!(TownAttribute::from_tag(tag::POSITION_X), Some(TownAttribute::TempleX));
        assert_eq!(WaypointAttribute::from_tag(tag::POSITION_X), Some(WaypointAttribute::X));
        assert_eq!(TownAttribute::from_tag(tag::CONNECTION_TO), None);
        assert_eq!(CreatureAttribute::from_tag(tag::TOWN_ID), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(NodeType::HouseTile.to_string(), "HouseTile");
    }
}
