//! LEB128 variable-length integer coding.
//!
//! Each byte carries 7 value bits, least significant group first. The high
//! bit is set on every byte except the last one of an encoding, so a 64-bit
//! value takes between 1 and 10 bytes.

use crate::error::{Error, Result};
use bytes::BufMut;

/// Longest possible encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Decodes a varint from the start of `data`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode_varint(data: &[u8]) -> Result<(u64, usize)> {
    let mut value = 0u64;
    for (i, &byte) in data.iter().enumerate() {
        if i >= MAX_VARINT_LEN {
            return Err(Error::format("varint longer than 10 bytes"));
        }
        // The tenth byte holds only bit 63.
        if i == MAX_VARINT_LEN - 1 && byte & 0x7f > 1 {
            return Err(Error::format("varint overflows u64"));
        }
        value |= u64::from(byte & 0x7f) << (7 * i as u32);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(Error::TruncatedVarint { offset: 0 })
}

/// Decodes a varint at `pos`, returning the value and the advanced position.
pub fn decode_varint_at(data: &[u8], pos: usize) -> Result<(u64, usize)> {
    let rest = data.get(pos..).unwrap_or(&[]);
    match decode_varint(rest) {
        Ok((value, n)) => Ok((value, pos + n)),
        Err(Error::TruncatedVarint { .. }) => Err(Error::TruncatedVarint { offset: pos }),
        Err(e) => Err(e),
    }
}

/// Decodes a varint from the front of `buf` and advances it past the encoding.
pub fn get_varint(buf: &mut &[u8]) -> Result<u64> {
    let (value, n) = decode_varint(buf)?;
    *buf = &buf[n..];
    Ok(value)
}

/// Decodes a varint length prefix and checks it fits in memory.
pub fn get_length(buf: &mut &[u8]) -> Result<usize> {
    let len = get_varint(buf)?;
    usize::try_from(len).map_err(|_| Error::format(format!("length {} overflows usize", len)))
}

/// Appends the varint encoding of `value` to `buf`.
pub fn put_varint<B: BufMut>(buf: &mut B, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Number of bytes `put_varint` writes for `value`.
pub fn varint_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}
