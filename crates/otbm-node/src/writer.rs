//! Encoding nodes into a framed byte stream.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::ZlibEncoder;

use crate::{
    COMPRESSED_FLAG, ESCAPE, FramingError, IDENTIFIER, MAX_NODE_TYPE, NODE_END, NODE_START, Node,
    is_marker,
};

/// A node that has been begun but not ended.
///
/// Properties are buffered until the node's first child begins or the
/// node ends, so a compressed node can deflate its whole body at once.
#[derive(Debug)]
struct OpenNode {
    node_type: u8,
    compress: bool,
    properties: Vec<u8>,
    emitted: bool,
}

/// Streams framed nodes to any [`Write`] sink.
///
/// Calls must nest: every [`begin_node`](Self::begin_node) is matched by
/// one [`end_node`](Self::end_node), innermost first. The first error
/// poisons the writer; later calls return [`FramingError::Poisoned`].
///
/// ```rust
/// use otbm_node::NodeWriter;
///
/// let mut w = NodeWriter::new(Vec::new()).unwrap();
/// w.begin_node(0, false).unwrap();
/// w.add_u32(2).unwrap();
/// w.end_node().unwrap();
/// let bytes = w.finish().unwrap();
/// assert_eq!(&bytes[..4], b"OTBM");
/// ```
#[derive(Debug)]
pub struct NodeWriter<W: Write> {
    out: W,
    open: Vec<OpenNode>,
    failed: Option<String>,
}

impl NodeWriter<BufWriter<File>> {
    /// Creates (or truncates) the file at `path` and writes the identifier.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, FramingError> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> NodeWriter<W> {
    /// Wraps `out` and writes the standard identifier.
    pub fn new(out: W) -> Result<Self, FramingError> {
        Self::with_identifier(out, IDENTIFIER)
    }

    /// Wraps `out` and writes a custom 4-byte identifier.
    pub fn with_identifier(mut out: W, identifier: [u8; 4]) -> Result<Self, FramingError> {
        out.write_all(&identifier)?;
        Ok(Self {
            out,
            open: Vec::new(),
            failed: None,
        })
    }

    /// Opens a node. With `compress` set, the node's properties are
    /// zlib-compressed before they are framed.
    pub fn begin_node(&mut self, node_type: u8, compress: bool) -> Result<(), FramingError> {
        self.check()?;
        let result = self.begin_inner(node_type, compress);
        self.record(result)
    }

    fn begin_inner(&mut self, node_type: u8, compress: bool) -> Result<(), FramingError> {
        if node_type > MAX_NODE_TYPE {
            return Err(FramingError::InvalidNodeType(node_type));
        }
        if let Some(parent) = self.open.last_mut() {
            emit_properties(&mut self.out, parent)?;
        }
        let tag = if compress {
            node_type | COMPRESSED_FLAG
        } else {
            node_type
        };
        self.out.write_all(&[NODE_START, tag])?;
        self.open.push(OpenNode {
            node_type,
            compress,
            properties: Vec::new(),
            emitted: false,
        });
        Ok(())
    }

    /// Closes the most recently opened node.
    pub fn end_node(&mut self) -> Result<(), FramingError> {
        self.check()?;
        let result = self.end_inner();
        self.record(result)
    }

    fn end_inner(&mut self) -> Result<(), FramingError> {
        let mut node = self.open.pop().ok_or(FramingError::NoOpenNode)?;
        emit_properties(&mut self.out, &mut node)?;
        self.out.write_all(&[NODE_END])?;
        Ok(())
    }

    /// Appends raw bytes to the current node's properties.
    pub fn add_node_data(&mut self, bytes: &[u8]) -> Result<(), FramingError> {
        self.check()?;
        let result = self.current().map(|node| node.properties.extend_from_slice(bytes));
        self.record(result)
    }

    pub fn add_u8(&mut self, value: u8) -> Result<(), FramingError> {
        self.add_node_data(&[value])
    }

    pub fn add_u16(&mut self, value: u16) -> Result<(), FramingError> {
        self.add_node_data(&value.to_le_bytes())
    }

    pub fn add_u32(&mut self, value: u32) -> Result<(), FramingError> {
        self.add_node_data(&value.to_le_bytes())
    }

    /// Appends a u16 length prefix and the UTF-8 bytes of `value`.
    pub fn add_string(&mut self, value: &str) -> Result<(), FramingError> {
        self.check()?;
        let len = match u16::try_from(value.len()) {
            Ok(len) => len,
            Err(_) => {
                let result = Err(FramingError::StringTooLong { len: value.len() });
                return self.record(result);
            }
        };
        self.add_u16(len)?;
        self.add_node_data(value.as_bytes())
    }

    /// Writes an already-built node tree as the next node.
    pub fn write_tree(&mut self, node: &Node) -> Result<(), FramingError> {
        self.begin_node(node.node_type(), false)?;
        self.add_node_data(node.properties())?;
        for child in node.children() {
            self.write_tree(child)?;
        }
        self.end_node()
    }

    /// Flushes buffered output to the sink.
    pub fn flush(&mut self) -> Result<(), FramingError> {
        self.check()?;
        let result = self.out.flush().map_err(FramingError::from);
        self.record(result)
    }

    /// Checks that every node is closed, flushes, and returns the sink.
    pub fn finish(mut self) -> Result<W, FramingError> {
        self.check()?;
        if !self.open.is_empty() {
            return Err(FramingError::UnbalancedNodes {
                open: self.open.len(),
            });
        }
        self.out.flush()?;
        Ok(self.out)
    }

    /// Number of nodes currently open.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// `false` once any operation has failed.
    pub fn is_ok(&self) -> bool {
        self.failed.is_none()
    }

    /// Message of the first failure, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.failed.as_deref()
    }

    fn current(&mut self) -> Result<&mut OpenNode, FramingError> {
        let node = self.open.last_mut().ok_or(FramingError::NoOpenNode)?;
        if node.emitted {
            return Err(FramingError::PropertiesAfterChild {
                node_type: node.node_type,
            });
        }
        Ok(node)
    }

    fn check(&self) -> Result<(), FramingError> {
        match &self.failed {
            Some(message) => Err(FramingError::Poisoned(message.clone())),
            None => Ok(()),
        }
    }

    fn record<T>(&mut self, result: Result<T, FramingError>) -> Result<T, FramingError> {
        if let Err(e) = &result {
            self.failed = Some(e.to_string());
        }
        result
    }
}

/// Writes a node's buffered properties, once.
fn emit_properties<W: Write>(out: &mut W, node: &mut OpenNode) -> Result<(), FramingError> {
    if node.emitted {
        return Ok(());
    }
    node.emitted = true;
    let raw = std::mem::take(&mut node.properties);
    let body = if node.compress { deflate(&raw)? } else { raw };
    out.write_all(&escape(&body))?;
    Ok(())
}

fn deflate(raw: &[u8]) -> Result<Vec<u8>, FramingError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw).map_err(FramingError::Compression)?;
    encoder.finish().map_err(FramingError::Compression)
}

/// Prefixes every marker byte in `body` with [`ESCAPE`].
pub(crate) fn escape(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len());
    for &byte in body {
        if is_marker(byte) {
            out.push(ESCAPE);
        }
        out.push(byte);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(bytes: Vec<u8>) -> Vec<u8> {
        bytes[4..].to_vec()
    }

    #[test]
    fn test_writes_identifier_immediately() {
        let w = NodeWriter::new(Vec::new()).unwrap();
        assert_eq!(w.finish().unwrap(), IDENTIFIER.to_vec());
    }

    #[test]
    fn test_frames_nested_nodes() {
        let mut w = NodeWriter::new(Vec::new()).unwrap();
        w.begin_node(0x00, false).unwrap();
        w.add_u16(0x0201).unwrap();
        w.begin_node(0x02, false).unwrap();
        w.add_u8(0x33).unwrap();
        w.end_node().unwrap();
        w.end_node().unwrap();
        assert_eq!(
            body(w.finish().unwrap()),
            vec![NODE_START, 0x00, 0x01, 0x02, NODE_START, 0x02, 0x33, NODE_END, NODE_END]
        );
    }

    #[test]
    fn test_escapes_marker_bytes() {
        let mut w = NodeWriter::new(Vec::new()).unwrap();
        w.begin_node(0x01, false).unwrap();
        w.add_node_data(&[NODE_START, 0x10, NODE_END, ESCAPE]).unwrap();
        w.end_node().unwrap();
        assert_eq!(
            body(w.finish().unwrap()),
            vec![
                NODE_START, 0x01, ESCAPE, NODE_START, 0x10, ESCAPE, NODE_END, ESCAPE, ESCAPE,
                NODE_END
            ]
        );
    }

    #[test]
    fn test_add_string_prefixes_length() {
        let mut w = NodeWriter::new(Vec::new()).unwrap();
        w.begin_node(0x01, false).unwrap();
        w.add_string("abc").unwrap();
        w.end_node().unwrap();
        assert_eq!(
            body(w.finish().unwrap()),
            vec![NODE_START, 0x01, 3, 0, b'a', b'b', b'c', NODE_END]
        );
    }

    #[test]
    fn test_string_too_long_poisons_writer() {
        let mut w = NodeWriter::new(Vec::new()).unwrap();
        w.begin_node(0x01, false).unwrap();
        let long = "x".repeat(70_000);
        assert!(matches!(
            w.add_string(&long),
            Err(FramingError::StringTooLong { len: 70_000 })
        ));
        assert!(!w.is_ok());
        assert!(matches!(w.end_node(), Err(FramingError::Poisoned(_))));
    }

    #[test]
    fn test_end_without_begin() {
        let mut w = NodeWriter::new(Vec::new()).unwrap();
        assert!(matches!(w.end_node(), Err(FramingError::NoOpenNode)));
        assert_eq!(w.last_error(), Some("no node is open"));
    }

    #[test]
    fn test_properties_after_child_rejected() {
        let mut w = NodeWriter::new(Vec::new()).unwrap();
        w.begin_node(0x00, false).unwrap();
        w.begin_node(0x02, false).unwrap();
        w.end_node().unwrap();
        assert!(matches!(
            w.add_u8(1),
            Err(FramingError::PropertiesAfterChild { node_type: 0x00 })
        ));
    }

    #[test]
    fn test_finish_with_open_nodes() {
        let mut w = NodeWriter::new(Vec::new()).unwrap();
        w.begin_node(0x00, false).unwrap();
        w.begin_node(0x02, false).unwrap();
        assert_eq!(w.depth(), 2);
        assert!(matches!(
            w.finish(),
            Err(FramingError::UnbalancedNodes { open: 2 })
        ));
    }

    #[test]
    fn test_rejects_unframeable_node_type() {
        let mut w = NodeWriter::new(Vec::new()).unwrap();
        assert!(matches!(
            w.begin_node(0x7E, false),
            Err(FramingError::InvalidNodeType(0x7E))
        ));
    }

    #[test]
    fn test_compressed_node_sets_flag() {
        let mut w = NodeWriter::new(Vec::new()).unwrap();
        w.begin_node(0x05, true).unwrap();
        w.add_node_data(&[0u8; 64]).unwrap();
        w.end_node().unwrap();
        let bytes = body(w.finish().unwrap());
        assert_eq!(bytes[0], NODE_START);
        assert_eq!(bytes[1], 0x05 | COMPRESSED_FLAG);
        assert_eq!(*bytes.last().unwrap(), NODE_END);
        // 64 zero bytes deflate to far fewer.
        assert!(bytes.len() < 40);
    }

    #[test]
    fn test_escape_helper() {
        assert_eq!(escape(&[1, 2, 3]), vec![1, 2, 3]);
        assert_eq!(escape(&[ESCAPE]), vec![ESCAPE, ESCAPE]);
    }
}
