//! Node descriptors and the lazily-materialized node tree.
//!
//! ## Descriptor layout (20 bytes, little-endian, one per node)
//! ```text
//! [0x00] NameId        (u32) - string table index
//! [0x04] FirstChildId  (u32)
//! [0x08] ChildCount    (u16)
//! [0x0A] Type          (u16) - see NodeType
//! [0x0C] Payload       (8 bytes, interpreted per Type)
//! ```
//!
//! Payload interpretation:
//!
//! | Type   | Bytes 12..20 |
//! |--------|--------------|
//! | Nothing| unused |
//! | Int64  | `i64` |
//! | Double | `f64` |
//! | String | `u32` string id |
//! | Point  | `i32` x, `i32` y |
//! | Bitmap | `u32` bitmap id, `u16` width, `u16` height |
//! | Audio  | `u32` audio id, `i32` byte length |
//!
//! The descriptor table is a contiguous array at the header's node block
//! offset. For every node, its children occupy the contiguous id range
//! `[first_child, first_child + child_count)`; node 0 is the root. That
//! invariant is what lets the tree live in a flat array with no parent
//! or child pointers.

use std::fmt;

use crate::file::NxFile;
use crate::utils::{bytesa, le_i32, le_i64, le_u16, le_u32};
use crate::{Error, Result};

/// Size of one on-disk node descriptor in bytes.
pub(crate) const NODE_LEN: u64 = 20;

/// The value category a node carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum NodeType {
    /// A plain container with no value.
    Nothing = 0,
    /// A signed 64-bit integer.
    Int64 = 1,
    /// A 64-bit float.
    Double = 2,
    /// An interned string.
    String = 3,
    /// A 2D integer point.
    Point = 4,
    /// An LZ4-compressed 32-bit RGBA bitmap.
    Bitmap = 5,
    /// Raw audio bytes (codec opaque to this library).
    Audio = 6,
}

/// A node's decoded payload. Decoded exactly once from the fixed byte
/// window; the on-disk overlap of payload fields never aliases in
/// memory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Payload {
    Nothing,
    Int64(i64),
    Double(f64),
    String(u32),
    Point { x: i32, y: i32 },
    Bitmap { id: u32, width: u16, height: u16 },
    Audio { id: u32, length: u32 },
}

impl Payload {
    /// The node type this payload belongs to.
    pub(crate) fn node_type(&self) -> NodeType {
        match self {
            Payload::Nothing => NodeType::Nothing,
            Payload::Int64(_) => NodeType::Int64,
            Payload::Double(_) => NodeType::Double,
            Payload::String(_) => NodeType::String,
            Payload::Point { .. } => NodeType::Point,
            Payload::Bitmap { .. } => NodeType::Bitmap,
            Payload::Audio { .. } => NodeType::Audio,
        }
    }
}

/// A fully-decoded node descriptor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct NodeRecord {
    pub name_id: u32,
    pub first_child: u32,
    pub child_count: u16,
    pub payload: Payload,
}

impl NodeRecord {
    /// Decode the 20-byte descriptor for node `id` at `offset`.
    ///
    /// A type value outside 0..=6 is fatal:
    /// [`Error::InvalidNodeType`] carries the raw value and the node id.
    pub(crate) fn parse(buf: &[u8], offset: u64, id: u32) -> Result<Self> {
        let name_id = le_u32(buf, offset)?;
        let first_child = le_u32(buf, offset + 4)?;
        let child_count = le_u16(buf, offset + 8)?;
        let raw_type = le_u16(buf, offset + 10)?;

        let payload = match raw_type {
            0 => Payload::Nothing,
            1 => Payload::Int64(le_i64(buf, offset + 12)?),
            2 => Payload::Double(f64::from_le_bytes(bytesa::<8>(buf, offset + 12)?)),
            3 => Payload::String(le_u32(buf, offset + 12)?),
            4 => Payload::Point {
                x: le_i32(buf, offset + 12)?,
                y: le_i32(buf, offset + 16)?,
            },
            5 => Payload::Bitmap {
                id: le_u32(buf, offset + 12)?,
                width: le_u16(buf, offset + 16)?,
                height: le_u16(buf, offset + 18)?,
            },
            6 => Payload::Audio {
                id: le_u32(buf, offset + 12)?,
                length: u32::try_from(le_i32(buf, offset + 16)?)
                    .map_err(|_| Error::InvalidRange)?,
            },
            t => return Err(Error::InvalidNodeType(t, id)),
        };

        Ok(Self {
            name_id,
            first_child,
            child_count,
            payload,
        })
    }
}

/// A decoded 32-bit RGBA image.
///
/// `data` is `width * height * 4` bytes in row-major order and borrows
/// from the owning [`NxFile`]'s cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bitmap<'a> {
    pub width: u16,
    pub height: u16,
    pub data: &'a [u8],
}

/// One node of an NX tree.
///
/// `Node` is a cheap `Copy` handle; everything it exposes is read on
/// demand from the owning [`NxFile`] and cached there, so cloning a
/// node never duplicates decoded data. The lifetime ties every node
/// (and every value borrowed through one) to its file.
#[derive(Clone, Copy)]
pub struct Node<'a> {
    file: &'a NxFile,
    id: u32,
    record: &'a NodeRecord,
}

impl<'a> Node<'a> {
    pub(crate) fn new(file: &'a NxFile, id: u32, record: &'a NodeRecord) -> Self {
        Self { file, id, record }
    }

    pub(crate) fn record(&self) -> &'a NodeRecord {
        self.record
    }

    /// This node's id in the descriptor table.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The file containing this node.
    pub fn file(&self) -> &'a NxFile {
        self.file
    }

    /// The node's name, resolved through the string table.
    pub fn name(&self) -> Result<&'a str> {
        self.file.get_string(self.record.name_id)
    }

    /// The value category of this node.
    pub fn node_type(&self) -> NodeType {
        self.record.payload.node_type()
    }

    /// Number of children. Read straight from the descriptor; never
    /// triggers child-map construction.
    pub fn child_count(&self) -> u32 {
        u32::from(self.record.child_count)
    }

    /// Look up a child by name.
    ///
    /// Builds this node's name map on first use. Returns `Ok(None)` if
    /// no child has that name.
    pub fn get(&self, name: &str) -> Result<Option<Node<'a>>> {
        if self.record.child_count == 0 {
            return Ok(None);
        }
        match self.file.child_map(self.id, self.record)?.get(name) {
            Some(&id) => self.file.get_node(id).map(Some),
            None => Ok(None),
        }
    }

    /// Whether a child with the given name exists.
    pub fn contains_child(&self, name: &str) -> Result<bool> {
        if self.record.child_count == 0 {
            return Ok(false);
        }
        Ok(self.file.child_map(self.id, self.record)?.contains_key(name))
    }

    /// Look up a child by name, panicking when absent.
    ///
    /// Chained-lookup sugar for `get`: `root.at("a").at("b")`. Use
    /// [`Node::get`] or [`NxFile::resolve_path`] when "not found" is an
    /// expected outcome.
    ///
    /// # Panics
    /// Panics if the child does not exist or the lookup fails.
    pub fn at(&self, name: &str) -> Node<'a> {
        match self.get(name) {
            Ok(Some(n)) => n,
            Ok(None) => panic!("no child named {name:?}"),
            Err(e) => panic!("child lookup for {name:?} failed: {e}"),
        }
    }

    /// Iterate over this node's children in ascending id order (which
    /// equals on-disk order).
    ///
    /// Enumeration walks the contiguous child id range directly and
    /// never builds the name map; names are only resolved if the caller
    /// asks a child for its name.
    pub fn children(&self) -> Children<'a> {
        let first = u64::from(self.record.first_child);
        Children {
            file: self.file,
            next: first,
            end: first + u64::from(self.record.child_count),
        }
    }

    /// The integer value of an `Int64` node.
    pub fn integer(&self) -> Result<i64> {
        match self.record.payload {
            Payload::Int64(v) => Ok(v),
            _ => Err(self.mismatch(NodeType::Int64)),
        }
    }

    /// The float value of a `Double` node.
    pub fn float(&self) -> Result<f64> {
        match self.record.payload {
            Payload::Double(v) => Ok(v),
            _ => Err(self.mismatch(NodeType::Double)),
        }
    }

    /// The `(x, y)` value of a `Point` node.
    pub fn point(&self) -> Result<(i32, i32)> {
        match self.record.payload {
            Payload::Point { x, y } => Ok((x, y)),
            _ => Err(self.mismatch(NodeType::Point)),
        }
    }

    /// The string value of a `String` node, decoded lazily through the
    /// string table and cached in the file.
    pub fn string(&self) -> Result<&'a str> {
        match self.record.payload {
            Payload::String(id) => self.file.get_string(id),
            _ => Err(self.mismatch(NodeType::String)),
        }
    }

    /// The decoded RGBA image of a `Bitmap` node.
    ///
    /// `Ok(None)` when the file declares no bitmap block or the file
    /// was opened with `never_bitmap`; in both cases the bitmap block
    /// is never touched. Pixels are decompressed once and cached; a
    /// decompression failure leaves the cache unset, so the access can
    /// be retried.
    pub fn bitmap(&self) -> Result<Option<Bitmap<'a>>> {
        match self.record.payload {
            Payload::Bitmap { id, .. } => self.file.load_bitmap(id),
            _ => Err(self.mismatch(NodeType::Bitmap)),
        }
    }

    /// The `(width, height)` a `Bitmap` node declares in its
    /// descriptor. Never touches the bitmap block, so it works even
    /// under `never_bitmap`.
    pub fn bitmap_dims(&self) -> Result<(u16, u16)> {
        match self.record.payload {
            Payload::Bitmap { width, height, .. } => Ok((width, height)),
            _ => Err(self.mismatch(NodeType::Bitmap)),
        }
    }

    /// The raw audio bytes of an `Audio` node, copied verbatim (the
    /// audio codec is opaque to this library).
    ///
    /// `Ok(None)` when the file declares no audio block.
    pub fn audio(&self) -> Result<Option<&'a [u8]>> {
        match self.record.payload {
            Payload::Audio { id, .. } => self.file.load_audio(id),
            _ => Err(self.mismatch(NodeType::Audio)),
        }
    }

    /// The byte length an `Audio` node declares in its descriptor,
    /// without copying any audio data.
    pub fn audio_len(&self) -> Result<u32> {
        match self.record.payload {
            Payload::Audio { length, .. } => Ok(length),
            _ => Err(self.mismatch(NodeType::Audio)),
        }
    }

    fn mismatch(&self, expected: NodeType) -> Error {
        Error::TypeMismatch {
            expected,
            actual: self.node_type(),
        }
    }
}

impl PartialEq for Node<'_> {
    /// Two nodes are equal when they name the same id in the same file.
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.file, other.file) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("type", &self.node_type())
            .field("children", &self.record.child_count)
            .finish()
    }
}

/// Iterator over a node's children in ascending id order.
///
/// Finite and restartable: each call to [`Node::children`] starts a
/// fresh pass over the same id range.
pub struct Children<'a> {
    file: &'a NxFile,
    next: u64,
    end: u64,
}

impl<'a> Iterator for Children<'a> {
    type Item = Result<Node<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let id = match u32::try_from(self.next) {
            Ok(id) => id,
            Err(_) => {
                self.next = self.end;
                return Some(Err(Error::InvalidRange));
            }
        };
        self.next += 1;
        Some(self.file.get_node(id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.end - self.next) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Children<'_> {}
