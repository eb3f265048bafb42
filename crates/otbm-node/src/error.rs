//! Error types for the framing layer.
//!
//! A framing error means the byte stream itself is broken: markers are
//! missing, the file is truncated, or a property read ran off the end of
//! a node. None of these are recoverable, because after a desync there
//! is no way to know where the next node starts.

/// Errors that can occur while reading or writing framed nodes.
///
/// `#[derive(thiserror::Error)]` writes the `std::error::Error` impl, and
/// each `#[error("...")]` attribute becomes the variant's `Display` text.
/// Offsets are printed in hex so they can be matched against a hex dump
/// of the file.
///
/// The `#[from]` on [`Io`](Self::Io) lets `?` turn an `io::Error` into a
/// `FramingError` directly. [`Compression`](Self::Compression) wraps an
/// `io::Error` too, but with `#[source]` instead, so zlib failures are
/// never mistaken for file-system ones.
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    /// The underlying file could not be read or written.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with a known 4-byte identifier.
    #[error("invalid file identifier {found:02x?}")]
    InvalidIdentifier { found: [u8; 4] },

    /// A node start marker was required but something else was found.
    #[error("expected node start at offset {offset:#x}, found {found:#04x}")]
    ExpectedNodeStart { offset: usize, found: u8 },

    /// After a child node closed, the parent continued with raw data
    /// instead of another child or its own end marker.
    #[error("expected node start or end at offset {offset:#x}, found {found:#04x}")]
    ExpectedMarker { offset: usize, found: u8 },

    /// The stream ended inside a node.
    #[error("unexpected end of stream at offset {offset:#x} ({open} node(s) open)")]
    UnexpectedEof { offset: usize, open: usize },

    /// Bytes follow the end of the root node.
    #[error("{count} trailing byte(s) after root node at offset {offset:#x}")]
    TrailingData { offset: usize, count: usize },

    /// A typed property read needed more bytes than the node has left.
    #[error("property read past end of node (need {need} bytes, have {have})")]
    PropertyUnderflow { need: usize, have: usize },

    /// A node type tag outside the frameable range.
    #[error("node type {0:#04x} cannot be framed")]
    InvalidNodeType(u8),

    /// A compressed property body could not be inflated or deflated.
    #[error("node compression failed: {0}")]
    Compression(#[source] std::io::Error),

    /// Compressed node bodies inflate to more than the file can plausibly
    /// hold.
    ///
    /// The budget is shared by every compressed node in the file and
    /// scales with the file's size, so reading a file never allocates
    /// more than a fixed multiple of its length.
    #[error("compressed nodes inflate past the {limit}-byte limit")]
    DecompressedTooLarge { limit: usize },

    /// `end_node` or a property write with no node open.
    #[error("no node is open")]
    NoOpenNode,

    /// Properties were added to a node after one of its children began.
    #[error("properties added to node {node_type:#04x} after its first child")]
    PropertiesAfterChild { node_type: u8 },

    /// The writer was finished with nodes still open.
    #[error("{open} node(s) still open")]
    UnbalancedNodes { open: usize },

    /// A string longer than its u16 length prefix can express.
    #[error("string of {len} bytes exceeds the 65535-byte limit")]
    StringTooLong { len: usize },

    /// An operation on a reader or writer that already failed.
    #[error("stream already failed: {0}")]
    Poisoned(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.otbm");
        let err: FramingError = io.into();
        assert!(matches!(err, FramingError::Io(_)));
        assert!(err.to_string().contains("missing.otbm"));
    }

    #[test]
    fn test_display_includes_offsets() {
        let err = FramingError::ExpectedNodeStart { offset: 4, found: 0x12 };
        assert_eq!(err.to_string(), "expected node start at offset 0x4, found 0x12");
    }
}
