//! Towns.

use crate::Position;

/// A town with the temple players respawn at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Town {
    pub id: u32,
    pub name: String,
    pub temple_position: Position,
}

impl Town {
    pub fn new(id: u32, name: impl Into<String>, temple_position: Position) -> Self {
        Self {
            id,
            name: name.into(),
            temple_position,
        }
    }

    /// A town needs a non-zero id and a name.
    pub fn is_valid(&self) -> bool {
        self.id != 0 && !self.name.is_empty()
    }
}
