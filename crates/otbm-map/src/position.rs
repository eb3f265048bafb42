//! Tile coordinates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Highest floor index. Floor 7 is ground level; 0 is the sky.
pub const MAX_FLOOR: u8 = 15;

/// An absolute tile coordinate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub x: u16,
    pub y: u16,
    pub z: u8,
}

impl Position {
    pub fn new(x: u16, y: u16, z: u8) -> Self {
        Self { x, y, z }
    }

    /// `true` if the floor index is within range.
    pub fn is_valid(&self) -> bool {
        self.z <= MAX_FLOOR
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid() {
        assert!(Position::new(0, 0, 0).is_valid());
        assert!(Position::new(65535, 65535, MAX_FLOOR).is_valid());
        assert!(!Position::new(100, 100, MAX_FLOOR + 1).is_valid());
    }

    #[test]
    fn test_display() {
        assert_eq!(Position::new(1000, 2000, 7).to_string(), "(1000, 2000, 7)");
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&Position::new(1, 2, 3)).unwrap();
        assert_eq!(json, r#"{"x":1,"y":2,"z":3}"#);
    }
}
