//! Node tree → [`Map`].

use otbm_map::{
    Creature, Direction, Item, ItemTypes, Map, Position, Tile, TileFlags, Town, Waypoint,
};
use otbm_node::Node;

use crate::attribute::Attribute;
use crate::schema::{
    CURRENT_FORMAT_VERSION, CreatureAttribute, ItemAttribute, MIN_FORMAT_VERSION, MapAttribute,
    NodeType, TileAttribute, TownAttribute, WaypointAttribute,
};
use crate::{CodecConfig, CodecError, SchemaError, ValidationError};

/// Walks a decoded node tree top-down and builds a [`Map`].
pub(crate) struct Loader<'a, T: ItemTypes + ?Sized> {
    items: &'a T,
    config: &'a CodecConfig,
    version: u32,
    /// Items dropped because their id was unknown.
    pub(crate) skipped: usize,
}

impl<'a, T: ItemTypes + ?Sized> Loader<'a, T> {
    pub(crate) fn new(items: &'a T, config: &'a CodecConfig) -> Self {
        Self {
            items,
            config,
            version: CURRENT_FORMAT_VERSION,
            skipped: 0,
        }
    }

    pub(crate) fn load(&mut self, root: &Node) -> Result<Map, CodecError> {
        if root.node_type() != NodeType::Root.tag() {
            return Err(SchemaError::InvalidRootType(root.node_type()).into());
        }

        root.reset_read_offset();
        let version = root.read_u32()?;
        if !(MIN_FORMAT_VERSION..=CURRENT_FORMAT_VERSION).contains(&version) {
            return Err(SchemaError::UnsupportedVersion(version).into());
        }
        self.version = version;

        let mut map = Map::new(root.read_u16()?, root.read_u16()?);
        map.items_version.major = root.read_u32()?;
        map.items_version.minor = root.read_u32()?;
        no_more_properties(root, NodeType::Root)?;

        let mut children = root.children();
        let map_data = children.next().ok_or(SchemaError::MissingMapData)?;
        match self.child_type(map_data, NodeType::Root)? {
            NodeType::MapData => {}
            other => return Err(unexpected(NodeType::Root, other)),
        }
        if let Some(extra) = children.next() {
            let found = self.child_type(extra, NodeType::Root)?;
            return Err(unexpected(NodeType::Root, found));
        }

        self.map_data(map_data, &mut map)?;
        Ok(map)
    }

    /// Resolves a child's node type and checks it exists in this version.
    fn child_type(&self, child: &Node, parent: NodeType) -> Result<NodeType, SchemaError> {
        let node = NodeType::from_tag(child.node_type())
            .ok_or(SchemaError::UnknownNodeType(child.node_type()))?;
        if node.since() > self.version {
            return Err(SchemaError::NodeNotInVersion {
                node,
                version: self.version,
            });
        }
        if parent == NodeType::Root && node != NodeType::MapData {
            return Err(SchemaError::UnexpectedNode {
                parent,
                found: node,
            });
        }
        Ok(node)
    }

    // -----------------------------------------------------------------------
    // Map data
    // -----------------------------------------------------------------------

    fn map_data(&mut self, node: &Node, map: &mut Map) -> Result<(), CodecError> {
        node.reset_read_offset();
        while node.has_more_properties() {
            let attr = Attribute::read(node, NodeType::MapData)?;
            let Some(kind) = MapAttribute::from_tag(attr.tag) else {
                return Err(attr.unknown().into());
            };
            if kind.since() > self.version {
                return Err(attr.not_in_version(self.version).into());
            }
            match kind {
                MapAttribute::Description => map.description = attr.text(),
                MapAttribute::SpawnFile => map.spawn_file = attr.text(),
                MapAttribute::HouseFile => map.house_file = attr.text(),
                MapAttribute::ClientVersionMajor => map.client_version.major = attr.u16()?,
                MapAttribute::ClientVersionMinor => map.client_version.minor = attr.u16()?,
                MapAttribute::ClientVersionBuild => map.client_version.build = attr.u16()?,
            }
        }

        for child in node.children() {
            match self.child_type(child, NodeType::MapData)? {
                NodeType::TileArea => self.tile_area(child, map)?,
                NodeType::Towns => self.towns(child, map)?,
                NodeType::Waypoints => self.waypoints(child, map)?,
                other => return Err(unexpected(NodeType::MapData, other)),
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Tiles
    // -----------------------------------------------------------------------

    fn tile_area(&mut self, node: &Node, map: &mut Map) -> Result<(), CodecError> {
        node.reset_read_offset();
        let base = Position::new(node.read_u16()?, node.read_u16()?, node.read_u8()?);
        no_more_properties(node, NodeType::TileArea)?;
        if !base.is_valid() {
            return Err(ValidationError::InvalidPosition(base).into());
        }
        tracing::debug!(%base, tiles = node.child_count(), "reading tile area");

        for child in node.children() {
            let tile = match self.child_type(child, NodeType::TileArea)? {
                NodeType::Tile => self.tile(child, base, false)?,
                NodeType::HouseTile => self.tile(child, base, true)?,
                other => return Err(unexpected(NodeType::TileArea, other)),
            };
            let position = tile.position;
            if map.set_tile(tile).is_some() {
                return Err(SchemaError::DuplicateTile(position).into());
            }
        }
        Ok(())
    }

    fn tile(&mut self, node: &Node, base: Position, is_house: bool) -> Result<Tile, CodecError> {
        let node_type = if is_house {
            NodeType::HouseTile
        } else {
            NodeType::Tile
        };

        node.reset_read_offset();
        let dx = node.read_u8()?;
        let dy = node.read_u8()?;
        let position = match (
            base.x.checked_add(u16::from(dx)),
            base.y.checked_add(u16::from(dy)),
        ) {
            (Some(x), Some(y)) => Position::new(x, y, base.z),
            _ => return Err(ValidationError::CoordinateOverflow { base, dx, dy }.into()),
        };

        let mut tile = Tile::new(position);
        while node.has_more_properties() {
            let attr = Attribute::read(node, node_type)?;
            match TileAttribute::from_tag(attr.tag) {
                Some(TileAttribute::Flags) => tile.flags = TileFlags::from_bits(attr.u32()?),
                Some(TileAttribute::HouseId) => {
                    if !is_house {
                        return Err(SchemaError::HouseIdOnPlainTile(position).into());
                    }
                    tile.house_id = Some(attr.u32()?);
                }
                None => return Err(attr.unknown().into()),
            }
        }
        if is_house && tile.house_id.is_none() {
            return Err(SchemaError::MissingHouseId(position).into());
        }

        for child in node.children() {
            match self.child_type(child, node_type)? {
                NodeType::Item => {
                    let Some(item) = self.item(child, position)? else {
                        continue;
                    };
                    if tile.ground.is_none() && self.items.is_ground(item.server_id) {
                        tile.ground = Some(item);
                    } else {
                        tile.items.push(item);
                    }
                }
                NodeType::Creature => tile.creatures.push(self.creature(child, position)?),
                other => return Err(unexpected(node_type, other)),
            }
        }
        Ok(tile)
    }

    /// Decodes an item and its contents. Returns `None` for an unknown
    /// item that the config says to skip.
    fn item(&mut self, node: &Node, position: Position) -> Result<Option<Item>, CodecError> {
        node.reset_read_offset();
        let server_id = node.read_u16()?;
        if !self.items.is_known(server_id) {
            if !self.config.skip_unknown_items {
                return Err(CodecError::UnknownItem {
                    server_id,
                    position,
                });
            }
            tracing::warn!(server_id, %position, "skipping unknown item");
            self.skipped += 1;
            return Ok(None);
        }

        let mut item = Item::new(server_id);
        while node.has_more_properties() {
            let attr = Attribute::read(node, NodeType::Item)?;
            let Some(kind) = ItemAttribute::from_tag(attr.tag) else {
                return Err(attr.unknown().into());
            };
            match kind {
                ItemAttribute::Count => item.subtype = attr.count()?,
                ItemAttribute::ActionId => item.action_id = attr.u16()?,
                ItemAttribute::UniqueId => item.unique_id = attr.u16()?,
                ItemAttribute::Text => item.text = attr.text(),
                ItemAttribute::Description => item.description = attr.text(),
                ItemAttribute::TeleportDestination => {
                    item.teleport_destination = Some(attr.position()?);
                }
                ItemAttribute::DepotId => item.depot_id = attr.u16()?,
                ItemAttribute::DoorId => item.door_id = attr.u8()?,
            }
        }

        if node.child_count() > 0 && !self.items.is_container(server_id) {
            return Err(SchemaError::ContentsInNonContainer {
                server_id,
                position,
            }
            .into());
        }
        for child in node.children() {
            match self.child_type(child, NodeType::Item)? {
                NodeType::Item => {
                    if let Some(inner) = self.item(child, position)? {
                        item.contents.push(inner);
                    }
                }
                other => return Err(unexpected(NodeType::Item, other)),
            }
        }
        Ok(Some(item))
    }

    fn creature(&self, node: &Node, position: Position) -> Result<Creature, CodecError> {
        self.no_children(node, NodeType::Creature)?;
        node.reset_read_offset();
        let mut creature = Creature::default();
        while node.has_more_properties() {
            let attr = Attribute::read(node, NodeType::Creature)?;
            match CreatureAttribute::from_tag(attr.tag) {
                Some(CreatureAttribute::Name) => creature.name = attr.text(),
                Some(CreatureAttribute::SpawnTime) => creature.spawn_time = attr.u32()?,
                Some(CreatureAttribute::Direction) => {
                    let value = attr.u8()?;
                    creature.direction = Direction::try_from(value)
                        .map_err(|_| ValidationError::InvalidDirection { position, value })?;
                }
                None => return Err(attr.unknown().into()),
            }
        }
        if creature.name.is_empty() {
            return Err(ValidationError::EmptyCreatureName(position).into());
        }
        Ok(creature)
    }

    // -----------------------------------------------------------------------
    // Towns and waypoints
    // -----------------------------------------------------------------------

    fn towns(&self, node: &Node, map: &mut Map) -> Result<(), CodecError> {
        node.reset_read_offset();
        no_more_properties(node, NodeType::Towns)?;
        for child in node.children() {
            match self.child_type(child, NodeType::Towns)? {
                NodeType::Town => self.town(child, map)?,
                other => return Err(unexpected(NodeType::Towns, other)),
            }
        }
        Ok(())
    }

    fn town(&self, node: &Node, map: &mut Map) -> Result<(), CodecError> {
        self.no_children(node, NodeType::Town)?;
        node.reset_read_offset();
        let mut id = 0;
        let mut name = String::new();
        let mut temple = Position::default();
        while node.has_more_properties() {
            let attr = Attribute::read(node, NodeType::Town)?;
            match TownAttribute::from_tag(attr.tag) {
                Some(TownAttribute::Id) => id = u32::from(attr.u16()?),
                Some(TownAttribute::Name) => name = attr.text(),
                Some(TownAttribute::TempleX) => temple.x = attr.u16()?,
                Some(TownAttribute::TempleY) => temple.y = attr.u16()?,
                Some(TownAttribute::TempleZ) => temple.z = attr.u8()?,
                None => return Err(attr.unknown().into()),
            }
        }

        if id == 0 {
            return Err(ValidationError::ZeroTownId { name }.into());
        }
        if name.is_empty() {
            return Err(ValidationError::EmptyTownName(id).into());
        }
        if !temple.is_valid() {
            return Err(ValidationError::InvalidTemplePosition {
                id,
                position: temple,
            }
            .into());
        }
        map.add_town(Town::new(id, name, temple))
            .map_err(ValidationError::from)?;
        Ok(())
    }

    fn waypoints(&self, node: &Node, map: &mut Map) -> Result<(), CodecError> {
        node.reset_read_offset();
        no_more_properties(node, NodeType::Waypoints)?;
        for child in node.children() {
            match self.child_type(child, NodeType::Waypoints)? {
                NodeType::Waypoint => self.waypoint(child, map)?,
                other => return Err(unexpected(NodeType::Waypoints, other)),
            }
        }
        Ok(())
    }

    fn waypoint(&self, node: &Node, map: &mut Map) -> Result<(), CodecError> {
        self.no_children(node, NodeType::Waypoint)?;
        node.reset_read_offset();
        let mut waypoint = Waypoint::new(String::new(), Position::default());
        while node.has_more_properties() {
            let attr = Attribute::read(node, NodeType::Waypoint)?;
            match WaypointAttribute::from_tag(attr.tag) {
                Some(WaypointAttribute::Name) => waypoint.name = attr.text(),
                Some(WaypointAttribute::X) => waypoint.position.x = attr.u16()?,
                Some(WaypointAttribute::Y) => waypoint.position.y = attr.u16()?,
                Some(WaypointAttribute::Z) => waypoint.position.z = attr.u8()?,
                Some(WaypointAttribute::ConnectionTo) => waypoint.connect(attr.text()),
                None => return Err(attr.unknown().into()),
            }
        }

        if waypoint.name.is_empty() {
            return Err(ValidationError::EmptyWaypointName.into());
        }
        if !waypoint.position.is_valid() {
            return Err(ValidationError::InvalidWaypointPosition {
                name: waypoint.name,
                position: waypoint.position,
            }
            .into());
        }
        map.add_waypoint(waypoint).map_err(ValidationError::from)?;
        Ok(())
    }

    /// Leaf nodes carry no children; the first one found is reported.
    fn no_children(&self, node: &Node, parent: NodeType) -> Result<(), SchemaError> {
        match node.first_child() {
            Some(child) => {
                let found = self.child_type(child, parent)?;
                Err(SchemaError::UnexpectedNode { parent, found })
            }
            None => Ok(()),
        }
    }
}

fn no_more_properties(node: &Node, node_type: NodeType) -> Result<(), SchemaError> {
    match node.remaining() {
        0 => Ok(()),
        count => Err(SchemaError::UnexpectedProperties {
            node: node_type,
            count,
        }),
    }
}

fn unexpected(parent: NodeType, found: NodeType) -> CodecError {
    SchemaError::UnexpectedNode { parent, found }.into()
}
