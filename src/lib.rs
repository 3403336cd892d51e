//! **nxkit** - a read-only decoder for the NX binary container format.
//!
//! NX packs a hierarchical tree of typed nodes plus three auxiliary
//! blob stores (interned strings, LZ4-compressed RGBA bitmaps, raw
//! audio) into one contiguous file laid out for random access. Only
//! the 52-byte header is parsed at open time; every node, string, and
//! blob is decoded lazily on first use and cached per file, so a
//! memory-mapped multi-gigabyte file opens instantly and pays only for
//! what is actually read.
//!
//! # Modules
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`buffer`]  | Byte-range providers (memory map, owned array) |
//! | [`header`]  | 52-byte header validation and block metadata |
//! | [`node`]    | Node descriptors, typed values, tree traversal |
//! | [`file`]    | The open file: caches, blob loaders, path resolution |
//! | [`options`] | Open-time eagerness flags |
//!
//! # Example
//! ```no_run
//! use nxkit::{NxFile, Options};
//!
//! let file = NxFile::map("Character.nx", Options::default())?;
//! let node = file.resolve_path("/Hair/00002.img/default")?;
//! for child in node.children() {
//!     let child = child?;
//!     println!("{}: {:?}", child.name()?, child.node_type());
//! }
//! # Ok::<(), nxkit::Error>(())
//! ```
//!
//! # Concurrency
//! [`NxFile`] is `Sync`: any number of threads may traverse and decode
//! concurrently with no external locking. Caches fill by idempotent
//! publish - racing first accesses may decode redundantly, but exactly
//! one result is ever retained.

pub mod buffer;
pub mod error;
pub mod file;
pub mod header;
pub mod node;
pub mod options;
pub mod utils;

pub use buffer::Buffer;
pub use error::{Error, Result};
pub use file::NxFile;
pub use header::MAGIC;
pub use node::{Bitmap, Children, Node, NodeType};
pub use options::Options;
