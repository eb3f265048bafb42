//! Named waypoints and their connections.

use std::collections::BTreeSet;

use crate::Position;

/// A named point on the map.
///
/// Connections name other waypoints. Nothing checks that they exist;
/// a dangling connection is kept as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waypoint {
    pub name: String,
    pub position: Position,
    pub connections: BTreeSet<String>,
}

impl Waypoint {
    pub fn new(name: impl Into<String>, position: Position) -> Self {
        Self {
            name: name.into(),
            position,
            connections: BTreeSet::new(),
        }
    }

    /// Adds a connection to the waypoint called `name`.
    pub fn connect(&mut self, name: impl Into<String>) {
        self.connections.insert(name.into());
    }

    pub fn is_valid(&self) -> bool {
        !self.name.is_empty() && self.position.is_valid()
    }
}
