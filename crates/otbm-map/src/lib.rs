//! In-memory map model for OTBM maps.
//!
//! These are plain data types: the codec in the `otbm` crate fills a
//! [`Map`] on load and walks one on save. Nothing here does any I/O.
//!
//! # Key types
//!
//! - [`Map`]: tiles keyed by [`Position`], plus [`Town`]s and [`Waypoint`]s
//! - [`Tile`]: ground, stacked [`Item`]s, [`Creature`]s, flags, house id
//! - [`ItemTypes`]: the item metadata lookup the codec consults on load
//! - [`MapError`]: model invariants broken by an insert

mod error;
mod item;
mod item_types;
mod map;
mod position;
mod tile;
mod town;
mod waypoint;

pub use error::MapError;
pub use item::{Creature, Direction, Item};
pub use item_types::{ItemDatabase, ItemKind, ItemType, ItemTypes};
pub use map::{ClientVersion, ItemsVersion, Map};
pub use position::{MAX_FLOOR, Position};
pub use tile::{Tile, TileFlags};
pub use town::Town;
pub use waypoint::Waypoint;
