//! In-memory node tree.

use std::cell::Cell;

use crate::FramingError;

/// Iterator over a node's children in document order.
///
/// Each call to `next()` moves to the following sibling, which is how the
/// map codec walks the tree: `first_child` is `children().next()`.
pub type Children<'a> = std::slice::Iter<'a, Node>;

/// One framed unit of the binary tree.
///
/// A node owns its type tag, the raw (unescaped, decompressed) bytes of
/// its property body, and its children. The property bytes are scanned
/// with the `read_*` methods, which advance an internal cursor. The
/// cursor lives in a `Cell` so a node can be scanned through a shared
/// reference while the tree itself stays immutable.
///
/// The length of the property body is not stored on the wire; it is
/// whatever sat between the type tag and the first child or end marker.
#[derive(Debug, Clone, Default)]
pub struct Node {
    node_type: u8,
    properties: Vec<u8>,
    children: Vec<Node>,
    cursor: Cell<usize>,
}

impl Node {
    /// Creates a node with no properties and no children.
    pub fn new(node_type: u8) -> Self {
        Self {
            node_type,
            ..Self::default()
        }
    }

    /// Creates a node with the given raw property bytes.
    pub fn with_properties(node_type: u8, properties: Vec<u8>) -> Self {
        Self {
            node_type,
            properties,
            ..Self::default()
        }
    }

    /// The node's type tag.
    pub fn node_type(&self) -> u8 {
        self.node_type
    }

    /// The full property body, independent of the read cursor.
    pub fn properties(&self) -> &[u8] {
        &self.properties
    }

    /// Appends a new empty child and returns it for further building.
    pub fn add_child(&mut self, node_type: u8) -> &mut Node {
        self.children.push(Node::new(node_type));
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Appends an already-built child.
    pub fn push_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// The first child, if any.
    pub fn first_child(&self) -> Option<&Node> {
        self.children.first()
    }

    /// All children in document order.
    pub fn children(&self) -> Children<'_> {
        self.children.iter()
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    // -----------------------------------------------------------------------
    // Property cursor
    // -----------------------------------------------------------------------

    /// `true` while the cursor has not reached the end of the properties.
    pub fn has_more_properties(&self) -> bool {
        self.cursor.get() < self.properties.len()
    }

    /// Bytes left between the cursor and the end of the properties.
    pub fn remaining(&self) -> usize {
        self.properties.len().saturating_sub(self.cursor.get())
    }

    /// Rewinds the cursor to the first property byte.
    pub fn reset_read_offset(&self) {
        self.cursor.set(0);
    }

    /// Reads `len` raw bytes.
    pub fn read_bytes(&self, len: usize) -> Result<&[u8], FramingError> {
        let start = self.cursor.get();
        let have = self.remaining();
        if len > have {
            return Err(FramingError::PropertyUnderflow { need: len, have });
        }
        self.cursor.set(start + len);
        Ok(&self.properties[start..start + len])
    }

    /// Skips `len` bytes.
    pub fn skip(&self, len: usize) -> Result<(), FramingError> {
        self.read_bytes(len).map(|_| ())
    }

    pub fn read_u8(&self) -> Result<u8, FramingError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&self) -> Result<u16, FramingError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&self) -> Result<u32, FramingError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a u16 length prefix followed by that many bytes of text.
    ///
    /// Text that is not valid UTF-8 is taken as Latin-1, which is what
    /// older editors wrote. If the body is short, the cursor is left
    /// before the length prefix.
    pub fn read_string(&self) -> Result<String, FramingError> {
        let start = self.cursor.get();
        let len = self.read_u16()? as usize;
        match self.read_bytes(len) {
            Ok(bytes) => Ok(decode_text(bytes)),
            Err(e) => {
                self.cursor.set(start);
                Err(e)
            }
        }
    }
}

/// Decodes raw text bytes, falling back to Latin-1 for non-UTF-8 input.
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_owned(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Structural equality: type, properties, and children. The read cursor
/// is scanning state and does not take part.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.node_type == other.node_type
            && self.properties == other.properties
            && self.children == other.children
    }
}

impl Eq for Node {}
