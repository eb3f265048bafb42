//! Item metadata lookup.
//!
//! The map file only stores server item ids. Whether an id exists, and
//! whether it is a container or a ground tile, lives in a separate item
//! database owned by the caller. The codec sees it through [`ItemTypes`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How an item type behaves, as far as the map format cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    #[default]
    Plain,
    Ground,
    Container,
    Stackable,
    Fluid,
    /// Items whose subtype is a charge count (runes, wands).
    Charged,
}

/// Static metadata for one server item id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemType {
    pub server_id: u16,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: ItemKind,
}

impl ItemType {
    pub fn new(server_id: u16, kind: ItemKind) -> Self {
        Self {
            server_id,
            name: String::new(),
            kind,
        }
    }
}

/// Lookup of item metadata by server id.
pub trait ItemTypes {
    /// Returns the type registered for `server_id`.
    fn get(&self, server_id: u16) -> Option<&ItemType>;

    fn is_known(&self, server_id: u16) -> bool {
        self.get(server_id).is_some()
    }

    fn is_container(&self, server_id: u16) -> bool {
        self.kind(server_id) == Some(ItemKind::Container)
    }

    fn is_ground(&self, server_id: u16) -> bool {
        self.kind(server_id) == Some(ItemKind::Ground)
    }

    fn kind(&self, server_id: u16) -> Option<ItemKind> {
        self.get(server_id).map(|t| t.kind)
    }
}

impl<T: ItemTypes + ?Sized> ItemTypes for &T {
    fn get(&self, server_id: u16) -> Option<&ItemType> {
        (**self).get(server_id)
    }
}

/// A `HashMap`-backed [`ItemTypes`].
///
/// Deserializes from a JSON list of item types:
///
/// ```rust
/// use otbm_map::{ItemDatabase, ItemTypes};
///
/// let db: ItemDatabase = serde_json::from_str(
///     r#"[{"server_id": 1988, "name": "backpack", "kind": "container"}]"#,
/// ).unwrap();
/// assert!(db.is_container(1988));
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "Vec<ItemType>")]
pub struct ItemDatabase {
    types: HashMap<u16, ItemType>,
}

impl ItemDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `item_type`, replacing any previous type with that id.
    pub fn insert(&mut self, item_type: ItemType) {
        self.types.insert(item_type.server_id, item_type);
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl ItemTypes for ItemDatabase {
    fn get(&self, server_id: u16) -> Option<&ItemType> {
        self.types.get(&server_id)
    }
}

impl FromIterator<ItemType> for ItemDatabase {
    fn from_iter<I: IntoIterator<Item = ItemType>>(iter: I) -> Self {
        let mut db = Self::new();
        for item_type in iter {
            db.insert(item_type);
        }
        db
    }
}

impl From<Vec<ItemType>> for ItemDatabase {
    fn from(types: Vec<ItemType>) -> Self {
        types.into_iter().collect()
    }
}
