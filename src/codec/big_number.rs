//! Nibble packing of big number representations: two symbols per byte,
//! first symbol in the high nibble, odd counts padded with a zero nibble.

use crate::error::SpearalError;
use crate::types::BIG_NUMBER_ALPHABET;

fn nibble(symbol: u8) -> u8 {
    BIG_NUMBER_ALPHABET
        .iter()
        .position(|&s| s == symbol)
        .map_or(0, |i| i as u8)
}

/// Packs an already validated representation.
pub fn pack(repr: &str) -> Vec<u8> {
    repr.as_bytes()
        .chunks(2)
        .map(|pair| {
            let high = nibble(pair[0]) << 4;
            let low = pair.get(1).map_or(0, |&s| nibble(s));
            high | low
        })
        .collect()
}

/// Number of packed bytes holding `count` symbols.
pub fn packed_len(count: usize) -> usize {
    count.div_ceil(2)
}

/// Unpacks `count` symbols from `packed`.
pub fn unpack(packed: &[u8], count: usize) -> Result<String, SpearalError> {
    let mut repr = String::with_capacity(count);
    for i in 0..count {
        let byte = *packed
            .get(i / 2)
            .ok_or_else(|| SpearalError::InvalidBigNumber(format!("missing symbol {i}")))?;
        let index = if i % 2 == 0 { byte >> 4 } else { byte & 0x0F };
        let symbol = BIG_NUMBER_ALPHABET
            .get(usize::from(index))
            .ok_or_else(|| SpearalError::InvalidBigNumber(format!("invalid nibble 0x{index:X}")))?;
        repr.push(char::from(*symbol));
    }
    Ok(repr)
}
