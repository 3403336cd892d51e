//! NX file header - the only eagerly-parsed structure.
//!
//! ## Layout (52 bytes, little-endian)
//! ```text
//! [0x00] Magic "PKG4"       (u32, 0x34474B50)
//! [0x04] NodeCount          (u32)
//! [0x08] NodeBlockOffset    (i64)
//! [0x10] StringCount        (u32)
//! [0x14] StringBlockOffset  (i64)
//! [0x1C] BitmapCount        (u32)
//! [0x20] BitmapBlockOffset  (i64)
//! [0x28] AudioCount         (u32)
//! [0x2C] AudioBlockOffset   (i64)
//! ```
//!
//! A count of zero for the bitmap or audio block means the feature is
//! absent from the file; the matching offset is then meaningless and is
//! never dereferenced. Beyond length and magic, nothing is validated
//! here - all other bounds are checked lazily at the access that uses
//! them.

use crate::utils::{le_offset, le_u32};
use crate::{Error, Result};

/// `"PKG4"` interpreted as a little-endian `u32`.
pub const MAGIC: u32 = 0x34474B50;

/// Size of the on-disk header in bytes.
pub(crate) const HEADER_LEN: usize = 52;

/// Decoded block metadata from the 52-byte header.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Header {
    pub node_count: u32,
    pub node_block: u64,
    pub string_count: u32,
    pub string_block: u64,
    pub bitmap_count: u32,
    pub bitmap_block: u64,
    pub audio_count: u32,
    pub audio_block: u64,
}

impl Header {
    /// Decode and validate the header at the start of `buf`.
    ///
    /// Returns [`Error::UnexpectedEof`] if the buffer is shorter than
    /// 52 bytes, [`Error::BadMagic`] on a magic mismatch, and
    /// [`Error::InvalidRange`] if a block offset is negative.
    pub(crate) fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_LEN {
            return Err(Error::UnexpectedEof);
        }
        if le_u32(buf, 0)? != MAGIC {
            return Err(Error::BadMagic);
        }

        let node_count = le_u32(buf, 4)?;
        let node_block = le_offset(buf, 8)?;
        let string_count = le_u32(buf, 16)?;
        let string_block = le_offset(buf, 20)?;
        let bitmap_count = le_u32(buf, 28)?;
        let bitmap_block = le_offset(buf, 32)?;
        let audio_count = le_u32(buf, 40)?;
        let audio_block = le_offset(buf, 44)?;

        Ok(Self {
            node_count,
            node_block,
            string_count,
            string_block,
            bitmap_count,
            bitmap_block,
            audio_count,
            audio_block,
        })
    }
}
