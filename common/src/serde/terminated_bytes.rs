//! Terminated bytes serialization for lexicographically ordered keys.
//!
//! Variable-length segments are escaped and terminated with `0x00`:
//!
//! - `0x00` → `0x01 0x01`
//! - `0x01` → `0x01 0x02`
//! - All other bytes unchanged
//! - Terminated with `0x00` delimiter
//!
//! The encoding is prefix-free: no encoded segment is a prefix of another
//! encoded segment, so a terminated segment followed by arbitrary bytes can
//! never be confused with a different segment. Using the lowest byte as the
//! terminator keeps shorter segments before longer ones sharing a prefix
//! (e.g. "post" < "posts").

use bytes::{BufMut, BytesMut};

/// Terminator byte (lowest byte value).
const TERMINATOR_BYTE: u8 = 0x00;

/// Escape character.
const ESCAPE_BYTE: u8 = 0x01;

/// Serializes raw bytes with escape sequences and a `0x00` terminator,
/// appending to `buf`.
pub fn serialize(data: &[u8], buf: &mut BytesMut) {
    for &byte in data {
        match byte {
            TERMINATOR_BYTE => {
                buf.put_u8(ESCAPE_BYTE);
                buf.put_u8(0x01);
            }
            ESCAPE_BYTE => {
                buf.put_u8(ESCAPE_BYTE);
                buf.put_u8(0x02);
            }
            _ => buf.put_u8(byte),
        }
    }
    buf.put_u8(TERMINATOR_BYTE);
}

/// Number of bytes [`serialize`] writes for `data`.
pub fn encoded_len(data: &[u8]) -> usize {
    let escaped = data
        .iter()
        .filter(|&&b| b == TERMINATOR_BYTE || b == ESCAPE_BYTE)
        .count();
    data.len() + escaped + 1
}
