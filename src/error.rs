//! Library-wide error and result types.

use std::fmt;
use std::io;

use crate::node::NodeType;

/// Result alias used throughout nxkit.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Error messages are kept intentionally terse; callers that need richer
/// context should wrap `Error` in their own type.
#[derive(Debug)]
pub enum Error {
    /// The file's magic field did not equal `PKG4`.
    BadMagic,
    /// The buffer ended before all expected bytes could be read.
    UnexpectedEof,
    /// An offset or size field would read outside the valid region.
    InvalidRange,
    /// A node descriptor carried a type value outside 0..=6.
    /// Fields are the raw type value and the offending node id.
    InvalidNodeType(u16, u32),
    /// An id exceeded the count declared in the header for the named
    /// block table.
    IndexOutOfRange(&'static str, u32),
    /// A typed accessor was called on a node of a different type.
    TypeMismatch {
        expected: NodeType,
        actual: NodeType,
    },
    /// A path segment did not name a child during path resolution.
    NotFound { path: String, segment: String },
    /// LZ4 decompression failed or produced the wrong number of bytes.
    Lz4,
    /// An underlying I/O operation failed (file open / memory map).
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadMagic => write!(f, "bad magic value"),
            Error::UnexpectedEof => write!(f, "unexpected end of file"),
            Error::InvalidRange => write!(f, "invalid offset or size"),
            Error::InvalidNodeType(t, id) => {
                write!(f, "node {id} has invalid type {t}")
            }
            Error::IndexOutOfRange(table, id) => {
                write!(f, "{table} id {id} out of range")
            }
            Error::TypeMismatch { expected, actual } => {
                write!(f, "expected {expected:?} node, got {actual:?}")
            }
            Error::NotFound { path, segment } => {
                write!(f, "path {path:?}: no child named {segment:?}")
            }
            Error::Lz4 => write!(f, "lz4 decompression failed"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Error::Io(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
