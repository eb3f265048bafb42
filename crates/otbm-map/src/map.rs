//! The map aggregate.

use std::collections::BTreeMap;

use crate::{MapError, Position, Tile, Town, Waypoint};

/// Client version the map was authored for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientVersion {
    pub major: u16,
    pub minor: u16,
    pub build: u16,
}

/// Version of the item database the map's item ids refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemsVersion {
    pub major: u32,
    pub minor: u32,
}

/// A whole map: metadata, tiles, towns and waypoints.
///
/// Tiles are keyed by position, towns by id and waypoints by lower-cased
/// name, so two maps compare equal regardless of insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Map {
    pub description: String,
    pub house_file: String,
    pub spawn_file: String,
    pub width: u16,
    pub height: u16,
    pub client_version: ClientVersion,
    pub items_version: ItemsVersion,
    tiles: BTreeMap<Position, Tile>,
    towns: BTreeMap<u32, Town>,
    waypoints: BTreeMap<String, Waypoint>,
}

impl Map {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    // -----------------------------------------------------------------------
    // Tiles
    // -----------------------------------------------------------------------

    pub fn tile(&self, position: Position) -> Option<&Tile> {
        self.tiles.get(&position)
    }

    /// Mutable access to the tile at `position`.
    ///
    /// The tile stays stored under `position`. Changing its
    /// [`position`](Tile::position) field does not move it: use
    /// [`remove_tile`](Self::remove_tile) and [`set_tile`](Self::set_tile)
    /// for that. A tile whose field disagrees with its key is refused by
    /// the saver.
    pub fn tile_mut(&mut self, position: Position) -> Option<&mut Tile> {
        self.tiles.get_mut(&position)
    }

    /// Returns the tile at `position`, creating an empty one if needed.
    pub fn get_or_create_tile(&mut self, position: Position) -> &mut Tile {
        self.tiles
            .entry(position)
            .or_insert_with(|| Tile::new(position))
    }

    /// Stores `tile`, replacing whatever was at its position.
    pub fn set_tile(&mut self, tile: Tile) -> Option<Tile> {
        self.tiles.insert(tile.position, tile)
    }

    pub fn remove_tile(&mut self, position: Position) -> Option<Tile> {
        self.tiles.remove(&position)
    }

    /// All tiles, ordered by position.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    /// All tiles with the position each is stored under.
    pub fn tile_entries(&self) -> impl Iterator<Item = (Position, &Tile)> {
        self.tiles.iter().map(|(position, tile)| (*position, tile))
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    // -----------------------------------------------------------------------
    // Towns
    // -----------------------------------------------------------------------

    /// Adds a town. Ids are unique; invalid towns are refused.
    pub fn add_town(&mut self, town: Town) -> Result<(), MapError> {
        if !town.is_valid() {
            return Err(MapError::InvalidTown {
                id: town.id,
                name: town.name,
            });
        }
        if self.towns.contains_key(&town.id) {
            return Err(MapError::DuplicateTown(town.id));
        }
        self.towns.insert(town.id, town);
        Ok(())
    }

    pub fn town(&self, id: u32) -> Option<&Town> {
        self.towns.get(&id)
    }

    pub fn remove_town(&mut self, id: u32) -> Option<Town> {
        self.towns.remove(&id)
    }

    /// All towns, ordered by id.
    pub fn towns(&self) -> impl Iterator<Item = &Town> {
        self.towns.values()
    }

    pub fn town_count(&self) -> usize {
        self.towns.len()
    }

    // -----------------------------------------------------------------------
    // Waypoints
    // -----------------------------------------------------------------------

    /// Adds a waypoint. Names are unique ignoring case.
    pub fn add_waypoint(&mut self, waypoint: Waypoint) -> Result<(), MapError> {
        if !waypoint.is_valid() {
            return Err(MapError::InvalidWaypoint {
                name: waypoint.name,
                position: waypoint.position,
            });
        }
        let key = waypoint.name.to_lowercase();
        if self.waypoints.contains_key(&key) {
            return Err(MapError::DuplicateWaypoint(waypoint.name));
        }
        self.waypoints.insert(key, waypoint);
        Ok(())
    }

    /// Looks up a waypoint by name, ignoring case.
    pub fn waypoint(&self, name: &str) -> Option<&Waypoint> {
        self.waypoints.get(&name.to_lowercase())
    }

    pub fn remove_waypoint(&mut self, name: &str) -> Option<Waypoint> {
        self.waypoints.remove(&name.to_lowercase())
    }

    /// All waypoints, ordered by lower-cased name.
    pub fn waypoints(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.values()
    }

    pub fn waypoint_count(&self) -> usize {
        self.waypoints.len()
    }
}
