//! Variable-width unsigned magnitudes (1 to 8 big-endian bytes).
//!
//! A magnitude is written as `length0 + 1` bytes, most significant first,
//! where `length0` is the smallest count of extra bytes that holds it. The
//! `length0` itself travels in the tag byte.

use bytes::{Buf, BufMut};

use crate::error::SpearalError;

/// Largest `length0` usable by families with a 2-bit length field.
pub const MAX_LENGTH0_U32: u8 = 3;

/// Smallest `length0` such that `value` fits in `length0 + 1` bytes.
pub fn length0(value: u64) -> u8 {
    if value <= 0xFFFF_FFFF {
        if value <= 0xFFFF {
            return if value <= 0xFF { 0 } else { 1 };
        }
        return if value <= 0xFF_FFFF { 2 } else { 3 };
    }
    if value <= 0xFFFF_FFFF_FFFF {
        return if value <= 0xFF_FFFF_FFFF { 4 } else { 5 };
    }
    if value <= 0xFF_FFFF_FFFF_FFFF { 6 } else { 7 }
}

/// Writes the low `length0 + 1` bytes of `value`, big-endian.
pub fn put_magnitude(out: &mut (impl BufMut + ?Sized), value: u64, length0: u8) {
    debug_assert!(length0 <= 7);
    out.put_slice(&value.to_be_bytes()[7 - usize::from(length0)..]);
}

/// Reads a `length0 + 1` byte big-endian magnitude.
pub fn get_magnitude(buf: &mut impl Buf, length0: u8) -> Result<u64, SpearalError> {
    let width = usize::from(length0) + 1;
    ensure_remaining(&*buf, width)?;
    Ok(buf.get_uint(width))
}

pub fn ensure_remaining(buf: &impl Buf, needed: usize) -> Result<(), SpearalError> {
    if buf.remaining() < needed {
        Err(SpearalError::Truncated {
            needed,
            remaining: buf.remaining(),
        })
    } else {
        Ok(())
    }
}
