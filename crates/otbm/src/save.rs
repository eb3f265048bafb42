//! [`Map`] → node stream.

use std::io::Write;

use otbm_map::{Creature, Item, ItemKind, ItemTypes, Map, Tile, Town, Waypoint};
use otbm_node::NodeWriter;

use crate::area::{area_offset, group_tiles};
use crate::attribute::AttributeWriter;
use crate::schema::{CURRENT_FORMAT_VERSION, NodeType, tag};
use crate::{CodecConfig, CodecError, SchemaError, ValidationError};

/// Counts reported after a successful save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SaveStats {
    pub(crate) areas: usize,
    pub(crate) tiles: usize,
}

/// Drives a [`NodeWriter`] over a [`Map`], depth first.
pub(crate) struct Saver<'a, T: ItemTypes + ?Sized> {
    items: &'a T,
    config: &'a CodecConfig,
}

impl<'a, T: ItemTypes + ?Sized> Saver<'a, T> {
    pub(crate) fn new(items: &'a T, config: &'a CodecConfig) -> Self {
        Self { items, config }
    }

    pub(crate) fn save<W: Write>(
        &self,
        map: &Map,
        w: &mut NodeWriter<W>,
    ) -> Result<SaveStats, CodecError> {
        w.begin_node(NodeType::Root.tag(), false)?;
        w.add_u32(CURRENT_FORMAT_VERSION)?;
        w.add_u16(map.width)?;
        w.add_u16(map.height)?;
        w.add_u32(map.items_version.major)?;
        w.add_u32(map.items_version.minor)?;

        w.begin_node(NodeType::MapData.tag(), false)?;
        for (attr, value) in [
            (tag::DESCRIPTION, &map.description),
            (tag::EXT_SPAWN_FILE, &map.spawn_file),
            (tag::EXT_HOUSE_FILE, &map.house_file),
        ] {
            if !value.is_empty() {
                w.attr_string(attr, value)?;
            }
        }
        w.attr_u16(tag::CLIENT_VERSION_MAJOR, map.client_version.major)?;
        w.attr_u16(tag::CLIENT_VERSION_MINOR, map.client_version.minor)?;
        w.attr_u16(tag::CLIENT_VERSION_BUILD, map.client_version.build)?;

        if let Some((key, tile)) = map.tile_entries().find(|(key, t)| *key != t.position) {
            return Err(ValidationError::MisplacedTile {
                key,
                found: tile.position,
            }
            .into());
        }

        let mut stats = SaveStats::default();
        for (key, tiles) in group_tiles(map.tiles()) {
            let origin = key.origin();
            if !origin.is_valid() {
                return Err(ValidationError::InvalidPosition(origin).into());
            }
            w.begin_node(NodeType::TileArea.tag(), false)?;
            w.add_u16(origin.x)?;
            w.add_u16(origin.y)?;
            w.add_u8(origin.z)?;
            for tile in &tiles {
                self.tile(tile, w)?;
            }
            w.end_node()?;
            stats.areas += 1;
            stats.tiles += tiles.len();
        }

        if map.town_count() > 0 {
            w.begin_node(NodeType::Towns.tag(), false)?;
            for town in map.towns() {
                town_node(town, w)?;
            }
            w.end_node()?;
        }

        if map.waypoint_count() > 0 {
            w.begin_node(NodeType::Waypoints.tag(), false)?;
            for waypoint in map.waypoints() {
                waypoint_node(waypoint, w)?;
            }
            w.end_node()?;
        }

        w.end_node()?; // MapData
        w.end_node()?; // Root
        Ok(stats)
    }

    fn tile<W: Write>(&self, tile: &Tile, w: &mut NodeWriter<W>) -> Result<(), CodecError> {
        let compress = self.config.compress_tile_data;
        let node_type = if tile.is_house_tile() {
            NodeType::HouseTile
        } else {
            NodeType::Tile
        };

        self.check_ground(tile)?;

        let (dx, dy) = area_offset(tile.position);
        w.begin_node(node_type.tag(), compress)?;
        w.add_u8(dx)?;
        w.add_u8(dy)?;
        if !tile.flags.is_empty() {
            w.attr_u32(tag::TILE_FLAGS, tile.flags.bits())?;
        }
        if let Some(house_id) = tile.house_id {
            w.attr_u32(tag::HOUSE_ID, house_id)?;
        }

        for item in tile.ground.iter().chain(&tile.items) {
            self.item(item, tile, w)?;
        }
        for creature in &tile.creatures {
            self.creature(creature, tile, w)?;
        }
        w.end_node()?;
        Ok(())
    }

    /// The file has no ground slot: the loader makes the first ground-type
    /// item of a tile its ground. Refuse tiles that would not read back
    /// the same way.
    fn check_ground(&self, tile: &Tile) -> Result<(), ValidationError> {
        match &tile.ground {
            Some(ground) if !self.items.is_ground(ground.server_id) => {
                Err(ValidationError::NotGroundItem {
                    server_id: ground.server_id,
                    position: tile.position,
                })
            }
            Some(_) => Ok(()),
            None => match tile.items.iter().find(|i| self.items.is_ground(i.server_id)) {
                Some(item) => Err(ValidationError::StackedGroundItem {
                    server_id: item.server_id,
                    position: tile.position,
                }),
                None => Ok(()),
            },
        }
    }

    fn item<W: Write>(
        &self,
        item: &Item,
        tile: &Tile,
        w: &mut NodeWriter<W>,
    ) -> Result<(), CodecError> {
        if !item.contents.is_empty() && !self.items.is_container(item.server_id) {
            return Err(SchemaError::ContentsInNonContainer {
                server_id: item.server_id,
                position: tile.position,
            }
            .into());
        }

        w.begin_node(NodeType::Item.tag(), self.config.compress_tile_data)?;
        w.add_u16(item.server_id)?;
        if item.subtype != 0 {
            match (self.items.kind(item.server_id), u8::try_from(item.subtype)) {
                (Some(ItemKind::Charged), _) | (_, Err(_)) => {
                    w.attr_u16(tag::COUNT, item.subtype)?;
                }
                (_, Ok(count)) => w.attr_u8(tag::COUNT, count)?,
            }
        }
        if item.action_id != 0 {
            w.attr_u16(tag::ACTION_ID, item.action_id)?;
        }
        if item.unique_id != 0 {
            w.attr_u16(tag::UNIQUE_ID, item.unique_id)?;
        }
        if !item.text.is_empty() {
            w.attr_string(tag::TEXT, &item.text)?;
        }
        if !item.description.is_empty() {
            w.attr_string(tag::ITEM_DESCRIPTION, &item.description)?;
        }
        if let Some(destination) = item.teleport_destination {
            w.attr_position(tag::TELEPORT_DESTINATION, destination)?;
        }
        if item.depot_id != 0 {
            w.attr_u16(tag::DEPOT_ID, item.depot_id)?;
        }
        if item.door_id != 0 {
            w.attr_u8(tag::HOUSE_DOOR_ID, item.door_id)?;
        }

        for inner in &item.contents {
            self.item(inner, tile, w)?;
        }
        w.end_node()?;
        Ok(())
    }

    fn creature<W: Write>(
        &self,
        creature: &Creature,
        tile: &Tile,
        w: &mut NodeWriter<W>,
    ) -> Result<(), CodecError> {
        if creature.name.is_empty() {
            return Err(ValidationError::EmptyCreatureName(tile.position).into());
        }
        w.begin_node(NodeType::Creature.tag(), self.config.compress_tile_data)?;
        w.attr_string(tag::NAME, &creature.name)?;
        w.attr_u32(tag::SPAWN_TIME, creature.spawn_time)?;
        w.attr_u8(tag::DIRECTION, creature.direction.as_u8())?;
        w.end_node()?;
        Ok(())
    }
}

fn town_node<W: Write>(town: &Town, w: &mut NodeWriter<W>) -> Result<(), CodecError> {
    let id = u16::try_from(town.id).map_err(|_| ValidationError::TownIdTooLarge(town.id))?;
    if id == 0 {
        return Err(ValidationError::ZeroTownId {
            name: town.name.clone(),
        }
        .into());
    }
    if town.name.is_empty() {
        return Err(ValidationError::EmptyTownName(town.id).into());
    }
    let temple = town.temple_position;
    if !temple.is_valid() {
        return Err(ValidationError::InvalidTemplePosition {
            id: town.id,
            position: temple,
        }
        .into());
    }

    w.begin_node(NodeType::Town.tag(), false)?;
    w.attr_u16(tag::TOWN_ID, id)?;
    w.attr_string(tag::NAME, &town.name)?;
    w.attr_u16(tag::POSITION_X, temple.x)?;
    w.attr_u16(tag::POSITION_Y, temple.y)?;
    w.attr_u8(tag::POSITION_Z, temple.z)?;
    w.end_node()?;
    Ok(())
}

fn waypoint_node<W: Write>(waypoint: &Waypoint, w: &mut NodeWriter<W>) -> Result<(), CodecError> {
    if waypoint.name.is_empty() {
        return Err(ValidationError::EmptyWaypointName.into());
    }
    if !waypoint.position.is_valid() {
        return Err(ValidationError::InvalidWaypointPosition {
            name: waypoint.name.clone(),
            position: waypoint.position,
        }
        .into());
    }

    w.begin_node(NodeType::Waypoint.tag(), false)?;
    w.attr_string(tag::NAME, &waypoint.name)?;
    w.attr_u16(tag::POSITION_X, waypoint.position.x)?;
    w.attr_u16(tag::POSITION_Y, waypoint.position.y)?;
    w.attr_u8(tag::POSITION_Z, waypoint.position.z)?;
    for target in &waypoint.connections {
        w.attr_string(tag::CONNECTION_TO, target)?;
    }
    w.end_node()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use otbm_map::{ItemDatabase, ItemType, Position};
    use otbm_node::{Node, NodeReader};

    use super::*;

    fn items() -> ItemDatabase {
        [
            ItemType::new(100, ItemKind::Ground),
            ItemType::new(200, ItemKind::Stackable),
            ItemType::new(300, ItemKind::Charged),
        ]
        .into_iter()
        .collect()
    }

    fn encode(map: &Map) -> Node {
        let db = items();
        let config = CodecConfig::default();
        let mut w = NodeWriter::new(Vec::new()).unwrap();
        Saver::new(&db, &config).save(map, &mut w).unwrap();
        NodeReader::from_bytes(w.finish().unwrap())
            .unwrap()
            .into_root()
            .unwrap()
    }

    fn first_item(root: &Node) -> &Node {
        let map_data = root.first_child().unwrap();
        let area = map_data.first_child().unwrap();
        let tile = area.first_child().unwrap();
        tile.first_child().unwrap()
    }

    #[test]
    fn test_root_header() {
        let mut map = Map::new(2048, 1024);
        map.items_version.major = 3;
        map.items_version.minor = 57;
        let root = encode(&map);
        assert_eq!(root.node_type(), NodeType::Root.tag());
        assert_eq!(root.read_u32().unwrap(), CURRENT_FORMAT_VERSION);
        assert_eq!(root.read_u16().unwrap(), 2048);
        assert_eq!(root.read_u16().unwrap(), 1024);
        assert_eq!(root.read_u32().unwrap(), 3);
        assert_eq!(root.read_u32().unwrap(), 57);
        assert!(!root.has_more_properties());
        assert_eq!(root.child_count(), 1);
    }

    #[test]
    fn test_count_width_follows_item_kind() {
        let mut map = Map::new(100, 100);
        let p = Position::new(5, 5, 7);
        map.get_or_create_tile(p)
            .items
            .push(Item::new(300).with_subtype(10));
        let node = encode(&map);
        // id, tag, len=2, value
        assert_eq!(first_item(&node).properties(), &[44, 1, tag::COUNT, 2, 0, 10, 0]);

        let mut map = Map::new(100, 100);
        map.get_or_create_tile(p)
            .items
            .push(Item::new(200).with_subtype(10));
        let node = encode(&map);
        assert_eq!(first_item(&node).properties(), &[200, 0, tag::COUNT, 1, 0, 10]);

        let mut map = Map::new(100, 100);
        map.get_or_create_tile(p)
            .items
            .push(Item::new(200).with_subtype(1000));
        let node = encode(&map);
        assert_eq!(first_item(&node).properties(), &[200, 0, tag::COUNT, 2, 0, 0xE8, 0x03]);
    }

    #[test]
    fn test_zero_fields_are_omitted() {
        let mut map = Map::new(100, 100);
        map.get_or_create_tile(Position::new(1, 1, 7)).ground = Some(Item::new(100));
        let node = encode(&map);
        assert_eq!(first_item(&node).properties(), &[100, 0]);
    }

    #[test]
    fn test_contents_in_non_container_rejected() {
        let mut map = Map::new(100, 100);
        map.get_or_create_tile(Position::new(1, 1, 7))
            .items
            .push(Item::new(200).with_content(Item::new(200)));
        let db = items();
        let config = CodecConfig::default();
        let mut w = NodeWriter::new(Vec::new()).unwrap();
        let err = Saver::new(&db, &config).save(&map, &mut w).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Schema(SchemaError::ContentsInNonContainer { server_id: 200, .. })
        ));
    }

    fn save_err(map: &Map) -> CodecError {
        let db = items();
        let config = CodecConfig::default();
        let mut w = NodeWriter::new(Vec::new()).unwrap();
        Saver::new(&db, &config).save(map, &mut w).unwrap_err()
    }

    #[test]
    fn test_non_ground_item_in_ground_slot_rejected() {
        let mut map = Map::new(100, 100);
        map.get_or_create_tile(Position::new(5, 5, 7)).ground = Some(Item::new(200));
        assert!(matches!(
            save_err(&map),
            CodecError::Validation(ValidationError::NotGroundItem { server_id: 200, position })
                if position == Position::new(5, 5, 7)
        ));
    }

    #[test]
    fn test_stacked_ground_without_ground_rejected() {
        let mut map = Map::new(100, 100);
        let tile = map.get_or_create_tile(Position::new(5, 5, 7));
        tile.items.push(Item::new(200));
        tile.items.push(Item::new(100));
        assert!(matches!(
            save_err(&map),
            CodecError::Validation(ValidationError::StackedGroundItem { server_id: 100, .. })
        ));
    }

    #[test]
    fn test_misplaced_tile_rejected() {
        let mut map = Map::new(100, 100);
        map.get_or_create_tile(Position::new(5, 5, 7)).ground = Some(Item::new(100));
        map.tile_mut(Position::new(5, 5, 7)).unwrap().position = Position::new(6, 5, 7);
        assert!(matches!(
            save_err(&map),
            CodecError::Validation(ValidationError::MisplacedTile { key, found })
                if key == Position::new(5, 5, 7) && found == Position::new(6, 5, 7)
        ));
    }

    #[test]
    fn test_town_id_must_fit_wire() {
        let mut w = NodeWriter::new(Vec::new()).unwrap();
        w.begin_node(NodeType::Towns.tag(), false).unwrap();
        let town = Town::new(70_000, "Thais", Position::new(1, 1, 7));
        assert!(matches!(
            town_node(&town, &mut w),
            Err(CodecError::Validation(ValidationError::TownIdTooLarge(70_000)))
        ));
    }

    #[test]
    fn test_waypoint_connections_are_sorted() {
        let mut wp = Waypoint::new("temple", Position::new(10, 10, 7));
        wp.connect("depot");
        wp.connect("boat");
        let mut w = NodeWriter::new(Vec::new()).unwrap();
        waypoint_node(&wp, &mut w).unwrap();
        let node = NodeReader::from_bytes(w.finish().unwrap())
            .unwrap()
            .into_root()
            .unwrap();
        let props = node.properties();
        let boat = props.windows(4).position(|s| s == b"boat").unwrap();
        let depot = props.windows(5).position(|s| s == b"depot").unwrap();
        assert!(boat < depot);
    }
}
