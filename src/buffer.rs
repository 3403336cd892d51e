//! Buffer providers - sources of the raw NX byte range.
//!
//! The decoder never performs I/O of its own; it reads from whatever
//! implements [`Buffer`]. The byte range must be stable for the
//! provider's whole lifetime (the decoder hands out references into it),
//! and the underlying resource is released when the provider is dropped.
//!
//! Two providers cover the expected uses:
//!
//! * [`memmap2::Mmap`] - random access into a file without reading it
//!   up front; the intended way to consume large NX files.
//! * `Vec<u8>` / `Box<[u8]>` - a fully in-memory copy, convenient for
//!   tests and small files.

/// A stable, read-only byte range backing an NX file.
///
/// # Safety contract
/// Not `unsafe`, but implementations must return the same region for
/// every call; the decoder caches offsets computed against it.
pub trait Buffer: Send + Sync {
    /// The full byte range of the NX file.
    fn bytes(&self) -> &[u8];
}

impl Buffer for memmap2::Mmap {
    fn bytes(&self) -> &[u8] {
        self
    }
}

impl Buffer for Vec<u8> {
    fn bytes(&self) -> &[u8] {
        self
    }
}

impl Buffer for Box<[u8]> {
    fn bytes(&self) -> &[u8] {
        self
    }
}

impl Buffer for &'static [u8] {
    fn bytes(&self) -> &[u8] {
        self
    }
}
