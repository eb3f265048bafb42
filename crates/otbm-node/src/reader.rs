//! Decoding a framed byte stream into a [`Node`] tree.

use std::io::Read;
use std::path::Path;

use flate2::read::ZlibDecoder;

use crate::{
    COMPRESSED_FLAG, ESCAPE, FramingError, IDENTIFIER, NODE_END, NODE_START, Node,
    WILDCARD_IDENTIFIER,
};

/// Compressed bodies may inflate to at most this many times the file size,
/// summed over the whole tree.
const MAX_INFLATE_RATIO: usize = 64;

/// Inflate budget floor, so small files with well-compressed tiles load.
const MIN_INFLATE_BUDGET: usize = 1 << 20;

/// Reads a whole OTBM file and materializes its node tree.
///
/// The identifier is checked when the reader is built; the tree is
/// decoded on the first call to [`root_node`](Self::root_node) and kept
/// for later calls. A decode failure is sticky: once the stream is known
/// to be corrupt, every later call reports [`FramingError::Poisoned`]
/// rather than trying again.
#[derive(Debug)]
pub struct NodeReader {
    identifier: [u8; 4],
    data: Vec<u8>,
    root: Option<Node>,
    failed: Option<String>,
}

impl NodeReader {
    /// Reads the file at `path` into memory and validates its identifier.
    ///
    /// The file handle is closed before this returns.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FramingError> {
        let data = std::fs::read(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), bytes = data.len(), "map file read");
        Self::from_bytes(data)
    }

    /// Wraps an in-memory file image and validates its identifier.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, FramingError> {
        if data.len() < 4 {
            return Err(FramingError::UnexpectedEof {
                offset: data.len(),
                open: 0,
            });
        }
        let identifier = [data[0], data[1], data[2], data[3]];
        if identifier != IDENTIFIER && identifier != WILDCARD_IDENTIFIER {
            return Err(FramingError::InvalidIdentifier { found: identifier });
        }
        Ok(Self {
            identifier,
            data,
            root: None,
            failed: None,
        })
    }

    /// The identifier the file started with.
    pub fn identifier(&self) -> [u8; 4] {
        self.identifier
    }

    /// Decodes the tree on first call and returns its root.
    pub fn root_node(&mut self) -> Result<&Node, FramingError> {
        if let Some(message) = &self.failed {
            return Err(FramingError::Poisoned(message.clone()));
        }
        if self.root.is_none() {
            match decode_tree(&self.data) {
                Ok(root) => self.root = Some(root),
                Err(e) => {
                    self.failed = Some(e.to_string());
                    return Err(e);
                }
            }
        }
        // Populated just above.
        self.root
            .as_ref()
            .ok_or_else(|| FramingError::Poisoned("root node missing".into()))
    }

    /// Decodes the tree if needed and hands ownership of the root to the caller.
    pub fn into_root(mut self) -> Result<Node, FramingError> {
        self.root_node()?;
        self.root
            .take()
            .ok_or_else(|| FramingError::Poisoned("root node missing".into()))
    }

    /// `false` once decoding has failed.
    pub fn is_ok(&self) -> bool {
        self.failed.is_none()
    }

    /// Message of the decode failure, if one occurred.
    pub fn last_error(&self) -> Option<&str> {
        self.failed.as_deref()
    }
}

/// Decodes the node tree that follows the 4-byte identifier.
///
/// Nesting is tracked with an explicit stack so a hostile file cannot
/// exhaust the call stack. Inflated bodies draw from one budget sized by
/// the file length.
fn decode_tree(data: &[u8]) -> Result<Node, FramingError> {
    let limit = data
        .len()
        .saturating_mul(MAX_INFLATE_RATIO)
        .max(MIN_INFLATE_BUDGET);
    let mut budget = limit;
    let mut pos = 4;
    match data.get(pos) {
        Some(&NODE_START) => {}
        Some(&found) => return Err(FramingError::ExpectedNodeStart { offset: pos, found }),
        None => return Err(FramingError::UnexpectedEof { offset: pos, open: 0 }),
    }

    let mut stack: Vec<Node> = Vec::new();
    loop {
        // `pos` is at a start marker.
        pos += 1;
        let tag = *data.get(pos).ok_or(FramingError::UnexpectedEof {
            offset: pos,
            open: stack.len(),
        })?;
        pos += 1;

        let (raw, next) = read_body(data, pos, stack.len() + 1)?;
        pos = next;
        let properties = if tag & COMPRESSED_FLAG != 0 {
            let body = inflate(&raw, budget).map_err(|e| match e {
                InflateError::OverBudget => FramingError::DecompressedTooLarge { limit },
                InflateError::Zlib(e) => FramingError::Compression(e),
            })?;
            budget -= body.len();
            body
        } else {
            raw
        };
        stack.push(Node::with_properties(tag & !COMPRESSED_FLAG, properties));

        // `pos` is at a start or end marker. Close as many nodes as the
        // stream ends, then either open the next child or finish.
        loop {
            match data.get(pos) {
                Some(&NODE_START) => break,
                Some(&NODE_END) => {
                    pos += 1;
                    let node = stack.pop().ok_or(FramingError::NoOpenNode)?;
                    match stack.last_mut() {
                        Some(parent) => parent.push_child(node),
                        None => {
                            if pos != data.len() {
                                return Err(FramingError::TrailingData {
                                    offset: pos,
                                    count: data.len() - pos,
                                });
                            }
                            return Ok(node);
                        }
                    }
                }
                Some(&found) => return Err(FramingError::ExpectedMarker { offset: pos, found }),
                None => {
                    return Err(FramingError::UnexpectedEof {
                        offset: pos,
                        open: stack.len(),
                    });
                }
            }
        }
    }
}

/// Collects an escaped property body starting at `pos`.
///
/// Returns the unescaped bytes and the offset of the marker that ended
/// the body.
fn read_body(data: &[u8], mut pos: usize, open: usize) -> Result<(Vec<u8>, usize), FramingError> {
    let mut out = Vec::new();
    loop {
        match data.get(pos) {
            Some(&NODE_START) | Some(&NODE_END) => return Ok((out, pos)),
            Some(&ESCAPE) => {
                let byte = *data
                    .get(pos + 1)
                    .ok_or(FramingError::UnexpectedEof { offset: pos + 1, open })?;
                out.push(byte);
                pos += 2;
            }
            Some(&byte) => {
                out.push(byte);
                pos += 1;
            }
            None => return Err(FramingError::UnexpectedEof { offset: pos, open }),
        }
    }
}

enum InflateError {
    OverBudget,
    Zlib(std::io::Error),
}

/// Inflates `raw`, reading at most one byte past `budget`.
fn inflate(raw: &[u8], budget: usize) -> Result<Vec<u8>, InflateError> {
    let mut out = Vec::new();
    let cap = (budget as u64).saturating_add(1);
    ZlibDecoder::new(raw)
        .take(cap)
        .read_to_end(&mut out)
        .map_err(InflateError::Zlib)?;
    if out.len() > budget {
        return Err(InflateError::OverBudget);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::ZlibEncoder;

    use super::*;

    fn file(body: &[u8]) -> Vec<u8> {
        let mut data = IDENTIFIER.to_vec();
        data.extend_from_slice(body);
        data
    }

    #[test]
    fn test_rejects_unknown_identifier() {
        let err = NodeReader::from_bytes(b"ABCD\xFE\x00\xFF".to_vec()).unwrap_err();
        assert!(matches!(err, FramingError::InvalidIdentifier { found } if &found == b"ABCD"));
    }

    #[test]
    fn test_accepts_wildcard_identifier() {
        let mut reader = NodeReader::from_bytes(vec![0, 0, 0, 0, NODE_START, 0, NODE_END]).unwrap();
        assert_eq!(reader.identifier(), WILDCARD_IDENTIFIER);
        assert_eq!(reader.root_node().unwrap().node_type(), 0);
    }

    #[test]
    fn test_rejects_short_file() {
        assert!(matches!(
            NodeReader::from_bytes(b"OT".to_vec()),
            Err(FramingError::UnexpectedEof { offset: 2, .. })
        ));
    }

    #[test]
    fn test_decodes_nested_tree() {
        let data = file(&[
            NODE_START, 0x00, 0x01, 0x02, //
            NODE_START, 0x02, 0xAA, //
            NODE_START, 0x06, NODE_END, //
            NODE_END, //
            NODE_START, 0x0C, NODE_END, //
            NODE_END,
        ]);
        let mut reader = NodeReader::from_bytes(data).unwrap();
        let root = reader.root_node().unwrap();
        assert_eq!(root.properties(), &[0x01, 0x02]);
        assert_eq!(root.child_count(), 2);

        let mut children = root.children();
        let map_data = children.next().unwrap();
        assert_eq!(map_data.node_type(), 0x02);
        assert_eq!(map_data.properties(), &[0xAA]);
        assert_eq!(map_data.first_child().unwrap().node_type(), 0x06);
        assert_eq!(children.next().unwrap().node_type(), 0x0C);
    }

    #[test]
    fn test_strips_escapes() {
        let data = file(&[
            NODE_START, 0x01, ESCAPE, NODE_START, ESCAPE, NODE_END, ESCAPE, ESCAPE, 0x10, NODE_END,
        ]);
        let mut reader = NodeReader::from_bytes(data).unwrap();
        assert_eq!(
            reader.root_node().unwrap().properties(),
            &[NODE_START, NODE_END, ESCAPE, 0x10]
        );
    }

    #[test]
    fn test_missing_start_marker() {
        let mut reader = NodeReader::from_bytes(file(&[0x00, 0x01, NODE_END])).unwrap();
        assert!(matches!(
            reader.root_node(),
            Err(FramingError::ExpectedNodeStart { offset: 4, found: 0x00 })
        ));
    }

    #[test]
    fn test_unterminated_node() {
        let mut reader =
            NodeReader::from_bytes(file(&[NODE_START, 0x00, NODE_START, 0x02, 0x01])).unwrap();
        assert!(matches!(
            reader.root_node(),
            Err(FramingError::UnexpectedEof { open: 2, .. })
        ));
    }

    #[test]
    fn test_dangling_escape() {
        let mut reader = NodeReader::from_bytes(file(&[NODE_START, 0x00, ESCAPE])).unwrap();
        assert!(matches!(
            reader.root_node(),
            Err(FramingError::UnexpectedEof { offset: 7, open: 1 })
        ));
    }

    #[test]
    fn test_data_after_child_is_rejected() {
        let data = file(&[NODE_START, 0x00, NODE_START, 0x02, NODE_END, 0x33, NODE_END]);
        let mut reader = NodeReader::from_bytes(data).unwrap();
        assert!(matches!(
            reader.root_node(),
            Err(FramingError::ExpectedMarker { found: 0x33, .. })
        ));
    }

    #[test]
    fn test_trailing_data() {
        let data = file(&[NODE_START, 0x00, NODE_END, 0x00, 0x00]);
        let mut reader = NodeReader::from_bytes(data).unwrap();
        assert!(matches!(
            reader.root_node(),
            Err(FramingError::TrailingData { count: 2, .. })
        ));
    }

    #[test]
    fn test_failure_is_sticky() {
        let mut reader = NodeReader::from_bytes(file(&[NODE_START, 0x00])).unwrap();
        assert!(reader.root_node().is_err());
        assert!(!reader.is_ok());
        assert!(reader.last_error().unwrap().contains("unexpected end"));
        assert!(matches!(reader.root_node(), Err(FramingError::Poisoned(_))));
    }

    #[test]
    fn test_inflate_stops_at_budget() {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&[7; 4096]).unwrap();
        let raw = enc.finish().unwrap();

        assert_eq!(inflate(&raw, 4096).ok().map(|b| b.len()), Some(4096));
        assert!(matches!(inflate(&raw, 4095), Err(InflateError::OverBudget)));
    }

    #[test]
    fn test_corrupt_compressed_body() {
        let data = file(&[NODE_START, COMPRESSED_FLAG, 0x01, 0x02, 0x03, NODE_END]);
        let mut reader = NodeReader::from_bytes(data).unwrap();
        assert!(matches!(reader.root_node(), Err(FramingError::Compression(_))));
    }
}
