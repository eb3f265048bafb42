//! Error types for the map model.

use crate::Position;

/// Errors raised when an insert would break a map invariant.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// A town with this id is already on the map.
    #[error("town {0} already exists")]
    DuplicateTown(u32),

    /// The town has id 0 or an empty name.
    #[error("invalid town (id {id}, name {name:?})")]
    InvalidTown { id: u32, name: String },

    /// A waypoint with this name (ignoring case) is already on the map.
    #[error("waypoint {0:?} already exists")]
    DuplicateWaypoint(String),

    /// The waypoint has an empty name or an out-of-range position.
    #[error("invalid waypoint {name:?} at {position}")]
    InvalidWaypoint { name: String, position: Position },

    /// A creature direction byte outside 0..=3.
    #[error("invalid direction {0}")]
    InvalidDirection(u8),
}
