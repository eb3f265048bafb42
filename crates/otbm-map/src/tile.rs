//! Tiles and their flag bitmask.

use serde::{Deserialize, Serialize};

use crate::{Creature, Item, Position};

/// Tile state bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileFlags(u32);

impl TileFlags {
    pub const NONE: Self = Self(0);
    pub const PROTECTION_ZONE: Self = Self(0x0001);
    pub const NO_PVP: Self = Self(0x0004);
    pub const NO_LOGOUT: Self = Self(0x0008);
    pub const PVP_ZONE: Self = Self(0x0010);
    pub const REFRESH: Self = Self(0x0020);

    /// Wraps raw bits. Unknown bits are kept so they survive a round trip.
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for TileFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// One map square.
///
/// A tile with `house_id` set is a house tile and is framed as such.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    /// Where the tile sits. Inside a [`Map`](crate::Map) this must equal
    /// the key the tile is stored under.
    pub position: Position,
    pub ground: Option<Item>,
    /// Items stacked on the ground, bottom first.
    pub items: Vec<Item>,
    pub creatures: Vec<Creature>,
    pub flags: TileFlags,
    pub house_id: Option<u32>,
}

impl Tile {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            ground: None,
            items: Vec::new(),
            creatures: Vec::new(),
            flags: TileFlags::NONE,
            house_id: None,
        }
    }

    /// `true` if the tile carries nothing worth saving.
    pub fn is_empty(&self) -> bool {
        self.ground.is_none()
            && self.items.is_empty()
            && self.creatures.is_empty()
            && self.flags.is_empty()
            && self.house_id.is_none()
    }

    pub fn is_house_tile(&self) -> bool {
        self.house_id.is_some()
    }

    /// Ground plus stacked items, not counting container contents.
    pub fn item_count(&self) -> usize {
        usize::from(self.ground.is_some()) + self.items.len()
    }
}
