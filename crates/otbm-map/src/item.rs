//! Items and creatures placed on tiles.

use std::fmt;

use crate::{MapError, Position};

/// One item instance.
///
/// `subtype` is the count for stackables, the charges for charged items
/// and the fluid type for fluid containers; which one it means depends on
/// the item type, which the map model does not know. Zero means "unset".
///
/// `contents` is only populated for container items. Nesting is a plain
/// owned tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Item {
    pub server_id: u16,
    pub subtype: u16,
    pub action_id: u16,
    pub unique_id: u16,
    pub text: String,
    pub description: String,
    pub teleport_destination: Option<Position>,
    pub depot_id: u16,
    pub door_id: u8,
    pub contents: Vec<Item>,
}

impl Item {
    pub fn new(server_id: u16) -> Self {
        Self {
            server_id,
            ..Self::default()
        }
    }

    pub fn with_subtype(mut self, subtype: u16) -> Self {
        self.subtype = subtype;
        self
    }

    pub fn with_action_id(mut self, action_id: u16) -> Self {
        self.action_id = action_id;
        self
    }

    pub fn with_unique_id(mut self, unique_id: u16) -> Self {
        self.unique_id = unique_id;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Adds `item` to this item's contents.
    pub fn with_content(mut self, item: Item) -> Self {
        self.contents.push(item);
        self
    }

    /// Depth of the deepest nested container chain. A plain item is 0.
    pub fn nesting_depth(&self) -> usize {
        self.contents
            .iter()
            .map(|c| c.nesting_depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// This item plus everything nested inside it.
    pub fn total_count(&self) -> usize {
        1 + self.contents.iter().map(Item::total_count).sum::<usize>()
    }
}

/// Facing of a placed creature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    North,
    East,
    #[default]
    South,
    West,
}

impl Direction {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::North => 0,
            Self::East => 1,
            Self::South => 2,
            Self::West => 3,
        }
    }
}

impl TryFrom<u8> for Direction {
    type Error = MapError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::North),
            1 => Ok(Self::East),
            2 => Ok(Self::South),
            3 => Ok(Self::West),
            other => Err(MapError::InvalidDirection(other)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::North => write!(f, "North"),
            Self::East => write!(f, "East"),
            Self::South => write!(f, "South"),
            Self::West => write!(f, "West"),
        }
    }
}

/// A creature placed on a tile by the map author.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Creature {
    pub name: String,
    /// Respawn interval in seconds.
    pub spawn_time: u32,
    pub direction: Direction,
}

impl Creature {
    pub fn new(name: impl Into<String>, spawn_time: u32) -> Self {
        Self {
            name: name.into(),
            spawn_time,
            direction: Direction::default(),
        }
    }
}
