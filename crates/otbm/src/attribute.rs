//! Tag-length-value attribute encoding.
//!
//! Every attribute is `{tag: u8, length: u16, value: [u8; length]}`.
//! A string attribute's value is the text itself, so its length field
//! doubles as the string length prefix.

use std::io::Write;

use otbm_map::Position;
use otbm_node::{FramingError, Node, NodeWriter, decode_text};

use crate::SchemaError;
use crate::schema::NodeType;

/// One attribute read from a node's property cursor.
#[derive(Debug)]
pub(crate) struct Attribute<'a> {
    node: NodeType,
    pub(crate) tag: u8,
    value: &'a [u8],
}

impl<'a> Attribute<'a> {
    /// Reads the next attribute at `node`'s cursor.
    pub(crate) fn read(node: &'a Node, node_type: NodeType) -> Result<Self, FramingError> {
        let tag = node.read_u8()?;
        let len = node.read_u16()? as usize;
        let value = node.read_bytes(len)?;
        Ok(Self {
            node: node_type,
            tag,
            value,
        })
    }

    fn expect_len(&self, expected: usize) -> Result<(), SchemaError> {
        if self.value.len() != expected {
            return Err(SchemaError::AttributeLength {
                node: self.node,
                tag: self.tag,
                expected,
                found: self.value.len(),
            });
        }
        Ok(())
    }

    pub(crate) fn u8(&self) -> Result<u8, SchemaError> {
        self.expect_len(1)?;
        Ok(self.value[0])
    }

    pub(crate) fn u16(&self) -> Result<u16, SchemaError> {
        self.expect_len(2)?;
        Ok(u16::from_le_bytes([self.value[0], self.value[1]]))
    }

    pub(crate) fn u32(&self) -> Result<u32, SchemaError> {
        self.expect_len(4)?;
        let v = self.value;
        Ok(u32::from_le_bytes([v[0], v[1], v[2], v[3]]))
    }

    /// A count or charge value, stored as either one or two bytes.
    pub(crate) fn count(&self) -> Result<u16, SchemaError> {
        match self.value.len() {
            1 => Ok(u16::from(self.value[0])),
            _ => self.u16(),
        }
    }

    /// A packed `{x: u16, y: u16, z: u8}` position.
    pub(crate) fn position(&self) -> Result<Position, SchemaError> {
        self.expect_len(5)?;
        let v = self.value;
        Ok(Position::new(
            u16::from_le_bytes([v[0], v[1]]),
            u16::from_le_bytes([v[2], v[3]]),
            v[4],
        ))
    }

    pub(crate) fn text(&self) -> String {
        decode_text(self.value)
    }

    pub(crate) fn unknown(&self) -> SchemaError {
        SchemaError::UnknownAttribute {
            node: self.node,
            tag: self.tag,
        }
    }

    pub(crate) fn not_in_version(&self, version: u32) -> SchemaError {
        SchemaError::AttributeNotInVersion {
            node: self.node,
            tag: self.tag,
            version,
        }
    }
}

/// Attribute writers on top of [`NodeWriter`].
pub(crate) trait AttributeWriter {
    fn attr_u8(&mut self, tag: u8, value: u8) -> Result<(), FramingError>;
    fn attr_u16(&mut self, tag: u8, value: u16) -> Result<(), FramingError>;
    fn attr_u32(&mut self, tag: u8, value: u32) -> Result<(), FramingError>;
    fn attr_string(&mut self, tag: u8, value: &str) -> Result<(), FramingError>;
    fn attr_position(&mut self, tag: u8, value: Position) -> Result<(), FramingError>;
}

impl<W: Write> AttributeWriter for NodeWriter<W> {
    fn attr_u8(&mut self, tag: u8, value: u8) -> Result<(), FramingError> {
        self.add_u8(tag)?;
        self.add_u16(1)?;
        self.add_u8(value)
    }

    fn attr_u16(&mut self, tag: u8, value: u16) -> Result<(), FramingError> {
        self.add_u8(tag)?;
        self.add_u16(2)?;
        self.add_u16(value)
    }

    fn attr_u32(&mut self, tag: u8, value: u32) -> Result<(), FramingError> {
        self.add_u8(tag)?;
        self.add_u16(4)?;
        self.add_u32(value)
    }

    fn attr_string(&mut self, tag: u8, value: &str) -> Result<(), FramingError> {
        self.add_u8(tag)?;
        self.add_string(value)
    }

    fn attr_position(&mut self, tag: u8, value: Position) -> Result<(), FramingError> {
        self.add_u8(tag)?;
        self.add_u16(5)?;
        self.add_u16(value.x)?;
        self.add_u16(value.y)?;
        self.add_u8(value.z)
    }
}
