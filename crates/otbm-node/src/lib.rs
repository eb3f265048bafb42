//! Framed node-tree layer of the OTBM format.
//!
//! An OTBM file is a 4-byte identifier followed by a single tree of
//! framed nodes:
//!
//! ```text
//! identifier  START type props... [child...] END
//! ```
//!
//! This crate knows nothing about tiles or items. It only turns bytes
//! into a [`Node`] tree ([`NodeReader`]) and a sequence of
//! begin/add/end calls back into bytes ([`NodeWriter`]).
//!
//! # Key types
//!
//! - [`Node`]: one framed unit: type tag, raw properties, children
//! - [`NodeReader`]: decodes a whole file into a `Node` tree
//! - [`NodeWriter`]: streams nodes out, escaping and compressing
//! - [`FramingError`]: everything that can go wrong at this layer

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

// The reader and writer are the two halves of the format and never call
// each other. Both share `Node` and the marker constants below, so the
// escaping rules live in one place.

mod error;
mod node;
mod reader;
mod writer;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

// Callers write `otbm_node::NodeReader` rather than reaching into the
// submodules, which stay private so their layout can change freely.

pub use error::FramingError;
pub use node::{Children, Node, decode_text};
pub use reader::NodeReader;
pub use writer::NodeWriter;

// ---------------------------------------------------------------------------
// Wire constants
// ---------------------------------------------------------------------------

/// Marks the beginning of a node.
pub const NODE_START: u8 = 0xFE;

/// Marks the end of a node.
pub const NODE_END: u8 = 0xFF;

/// Prefixes a literal marker byte inside a property body.
pub const ESCAPE: u8 = 0xFD;

/// Set on the wire type tag of a node whose properties are zlib-compressed.
pub const COMPRESSED_FLAG: u8 = 0x80;

/// Largest node type tag that can be framed.
///
/// Type tags are never escaped, so a tag with [`COMPRESSED_FLAG`] set must
/// stay below [`ESCAPE`].
pub const MAX_NODE_TYPE: u8 = 0x7C;

/// Identifier written at the start of every file.
pub const IDENTIFIER: [u8; 4] = *b"OTBM";

/// Legacy identifier accepted on read.
pub const WILDCARD_IDENTIFIER: [u8; 4] = [0; 4];

/// Returns `true` if `byte` must be escaped inside a property body.
pub fn is_marker(byte: u8) -> bool {
    matches!(byte, NODE_START | NODE_END | ESCAPE)
}
