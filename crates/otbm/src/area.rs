//! Chunking tiles into 256×256 areas.
//!
//! Tiles are stored under TileArea nodes so each tile only needs a
//! one-byte X and Y offset from its area's origin.

use std::collections::BTreeMap;

use otbm_map::{Position, Tile};

/// Width and height of one tile area.
pub const AREA_SIZE: u16 = 256;

/// Origin of the area containing `position`.
pub fn area_origin(position: Position) -> Position {
    Position::new(
        position.x & !(AREA_SIZE - 1),
        position.y & !(AREA_SIZE - 1),
        position.z,
    )
}

/// Offset of `position` within its area.
pub fn area_offset(position: Position) -> (u8, u8) {
    ((position.x % AREA_SIZE) as u8, (position.y % AREA_SIZE) as u8)
}

/// Sort key for areas: floor first, then X, then Y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct AreaKey {
    pub(crate) z: u8,
    pub(crate) x: u16,
    pub(crate) y: u16,
}

impl AreaKey {
    pub(crate) fn origin(self) -> Position {
        Position::new(self.x, self.y, self.z)
    }
}

/// Groups the non-empty tiles by area, in a stable order.
pub(crate) fn group_tiles<'a>(
    tiles: impl Iterator<Item = &'a Tile>,
) -> BTreeMap<AreaKey, Vec<&'a Tile>> {
    let mut areas: BTreeMap<AreaKey, Vec<&'a Tile>> = BTreeMap::new();
    for tile in tiles.filter(|t| !t.is_empty()) {
        let origin = area_origin(tile.position);
        let key = AreaKey {
            z: origin.z,
            x: origin.x,
            y: origin.y,
        };
        areas.entry(key).or_default().push(tile);
    }
    areas
}

#[cfg(test)]
mod tests {
    use otbm_map::{Item, TileFlags};

    use super::*;

    #[test]
    fn test_origin_and_offset() {
        let p = Position::new(1000, 2000, 7);
        assert_eq!(area_origin(p), Position::new(768, 1792, 7));
        assert_eq!(area_offset(p), (232, 208));
    }

    #[test]
    fn test_origin_and_offset_match_div_mod() {
        for (x, y) in [(0, 0), (255, 256), (256, 255), (65535, 65535), (12345, 54321)] {
            let p = Position::new(x, y, 3);
            let origin = area_origin(p);
            assert_eq!(origin.x, 256 * (x / 256));
            assert_eq!(origin.y, 256 * (y / 256));
            assert_eq!(origin.z, 3);
            let (dx, dy) = area_offset(p);
            assert_eq!(u16::from(dx), x % 256);
            assert_eq!(u16::from(dy), y % 256);
        }
    }

    #[test]
    fn test_group_tiles_skips_empty_and_orders_by_floor() {
        let mut tiles = Vec::new();
        for (x, y, z) in [(300, 10, 7), (10, 10, 7), (10, 10, 6), (20, 20, 7), (40, 40, 7)] {
            let mut t = Tile::new(Position::new(x, y, z));
            if (x, y) != (40, 40) {
                t.ground = Some(Item::new(100));
            }
            tiles.push(t);
        }
        tiles[3].flags = TileFlags::REFRESH;

        let areas = group_tiles(tiles.iter());
        let keys: Vec<Position> = areas.keys().map(|k| k.origin()).collect();
        assert_eq!(
            keys,
            vec![
                Position::new(0, 0, 6),
                Position::new(0, 0, 7),
                Position::new(256, 0, 7),
            ]
        );
        assert_eq!(areas[&AreaKey { z: 7, x: 0, y: 0 }].len(), 2);
    }
}
