//! Bounds-checked slice primitives shared by all decoders.
//!
//! NX is consumed by random access into one contiguous buffer, so these
//! helpers read at absolute offsets instead of advancing a stream. Each
//! function reads exactly the bytes it promises or returns an error -
//! there is no partial-read ambiguity.

use crate::{Error, Result};

/// Borrow exactly `len` bytes starting at `offset`.
///
/// Returns [`Error::UnexpectedEof`] if the range leaves the buffer.
#[inline]
pub(crate) fn slice(buf: &[u8], offset: u64, len: usize) -> Result<&[u8]> {
    let start = usize::try_from(offset).map_err(|_| Error::InvalidRange)?;
    let end = start.checked_add(len).ok_or(Error::InvalidRange)?;
    buf.get(start..end).ok_or(Error::UnexpectedEof)
}

/// Read exactly `N` bytes at `offset` into a fixed-size array.
#[inline]
pub(crate) fn bytesa<const N: usize>(buf: &[u8], offset: u64) -> Result<[u8; N]> {
    let b = slice(buf, offset, N)?;
    let mut out = [0u8; N];
    out.copy_from_slice(b);
    Ok(out)
}

/// Read a little-endian `u16` at `offset`.
#[inline]
pub(crate) fn le_u16(buf: &[u8], offset: u64) -> Result<u16> {
    Ok(u16::from_le_bytes(bytesa::<2>(buf, offset)?))
}

/// Read a little-endian `u32` at `offset`.
#[inline]
pub(crate) fn le_u32(buf: &[u8], offset: u64) -> Result<u32> {
    Ok(u32::from_le_bytes(bytesa::<4>(buf, offset)?))
}

/// Read a little-endian `u64` at `offset`.
#[inline]
pub(crate) fn le_u64(buf: &[u8], offset: u64) -> Result<u64> {
    Ok(u64::from_le_bytes(bytesa::<8>(buf, offset)?))
}

/// Read a little-endian `i32` at `offset`.
#[inline]
pub(crate) fn le_i32(buf: &[u8], offset: u64) -> Result<i32> {
    Ok(i32::from_le_bytes(bytesa::<4>(buf, offset)?))
}

/// Read a little-endian `i64` at `offset`.
#[inline]
pub(crate) fn le_i64(buf: &[u8], offset: u64) -> Result<i64> {
    Ok(i64::from_le_bytes(bytesa::<8>(buf, offset)?))
}

/// Read a little-endian `i64` at `offset` and require it to be a valid
/// in-file offset (non-negative).
///
/// Block offsets are stored signed on disk but never legitimately
/// negative; a negative value means a corrupt header.
#[inline]
pub(crate) fn le_offset(buf: &[u8], offset: u64) -> Result<u64> {
    u64::try_from(le_i64(buf, offset)?).map_err(|_| Error::InvalidRange)
}

/// Decode the length-prefixed string entry at `offset`: a `u16` byte
/// count followed by that many bytes of UTF-8 text.
///
/// Invalid UTF-8 is replaced rather than rejected; NX string ids are
/// used as tree keys and a lossy name is more useful than a dead file.
pub(crate) fn prefixed_string(buf: &[u8], offset: u64) -> Result<Box<str>> {
    let len = le_u16(buf, offset)? as usize;
    let body = offset.checked_add(2).ok_or(Error::InvalidRange)?;
    let bytes = slice(buf, body, len)?;
    Ok(match String::from_utf8_lossy(bytes) {
        std::borrow::Cow::Borrowed(s) => s.into(),
        std::borrow::Cow::Owned(s) => s.into_boxed_str(),
    })
}
