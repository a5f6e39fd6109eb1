//! Spearal type tags and parameter bit layouts.
//!
//! Every value starts with one tag byte. The top nibble selects the type
//! family; the bottom nibble carries inline parameters. `NULL`, `TRUE` and
//! `FALSE` occupy the low nibble directly and carry no parameters.

/// The type family selected by a tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeTag {
    // No parameters (0x00..=0x0F).
    Null = 0x00,
    True = 0x01,
    False = 0x02,

    // 4 bits of parameters (0x10..=0xF0).
    Integral = 0x10,
    BigIntegral = 0x20,
    Floating = 0x30,
    BigFloating = 0x40,
    String = 0x50,
    ByteArray = 0x60,
    DateTime = 0x70,
    Collection = 0x80,
    Map = 0x90,
    Enum = 0xA0,
    Class = 0xB0,
    Bean = 0xC0,
}

impl TypeTag {
    /// Resolves the family of a parameterized tag byte.
    pub fn from_parameterized(byte: u8) -> Option<Self> {
        let family = if byte < 0x10 { byte } else { byte & 0xF0 };
        Some(match family {
            0x00 => Self::Null,
            0x01 => Self::True,
            0x02 => Self::False,
            0x10 => Self::Integral,
            0x20 => Self::BigIntegral,
            0x30 => Self::Floating,
            0x40 => Self::BigFloating,
            0x50 => Self::String,
            0x60 => Self::ByteArray,
            0x70 => Self::DateTime,
            0x80 => Self::Collection,
            0x90 => Self::Map,
            0xA0 => Self::Enum,
            0xB0 => Self::Class,
            0xC0 => Self::Bean,
            _ => return None,
        })
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

// INTEGRAL: bits 0-2 length0, bit 3 negative.
pub const INTEGRAL_LENGTH0_MASK: u8 = 0x07;
pub const INTEGRAL_NEGATIVE: u8 = 0x08;

// FLOATING: bit 3 scaled-by-1000 mode; in that mode bit 2 negative and
// bits 0-1 length0. Without bit 3, eight raw IEEE-754 bytes follow.
pub const FLOATING_SCALED: u8 = 0x08;
pub const FLOATING_NEGATIVE: u8 = 0x04;

// Length or index bearing families: bits 0-1 length0.
pub const LENGTH0_MASK: u8 = 0x03;

// String bearing families (STRING, BIG_*, ENUM, CLASS, BEAN description).
pub const STRING_REFERENCE: u8 = 0x04;

// Object families (BYTE_ARRAY, COLLECTION, MAP, BEAN).
pub const OBJECT_REFERENCE: u8 = 0x08;

// DATE_TIME: presence flags and bits 0-1 sub-second unit.
pub const DATE_PRESENT: u8 = 0x08;
pub const TIME_PRESENT: u8 = 0x04;
pub const SUBSECONDS_MASK: u8 = 0x03;
pub const SUBSECONDS_NONE: u8 = 0;
pub const SUBSECONDS_NANOS: u8 = 1;
pub const SUBSECONDS_MICROS: u8 = 2;
pub const SUBSECONDS_MILLIS: u8 = 3;

// DATE_TIME date byte: bit 7 year sign, bits 4-5 year length0, low nibble month.
pub const YEAR_NEGATIVE: u8 = 0x80;
// DATE_TIME time byte: bits 5-7 sub-seconds length0, low 5 bits hour.
pub const HOUR_MASK: u8 = 0x1F;

pub fn is_string_reference(byte: u8) -> bool {
    byte & STRING_REFERENCE != 0
}

pub fn is_object_reference(byte: u8) -> bool {
    byte & OBJECT_REFERENCE != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_byte_maps_to_its_family_or_nothing() {
        for byte in 0x00..=0xFFu8 {
            match TypeTag::from_parameterized(byte) {
                Some(tag) if byte < 0x10 => assert_eq!(tag.id(), byte),
                Some(tag) => assert_eq!(tag.id(), byte & 0xF0),
                None => assert!(
                    (0x03..0x10).contains(&byte) || byte >= 0xD0,
                    "0x{byte:02X} should be known"
                ),
            }
        }
    }

    #[test]
    fn parameter_bits_do_not_change_family() {
        assert_eq!(TypeTag::from_parameterized(0x1F), Some(TypeTag::Integral));
        assert_eq!(TypeTag::from_parameterized(0x3B), Some(TypeTag::Floating));
        assert_eq!(TypeTag::from_parameterized(0xCC), Some(TypeTag::Bean));
        assert_eq!(TypeTag::from_parameterized(0x05), None);
        assert_eq!(TypeTag::from_parameterized(0xD0), None);
    }

    #[test]
    fn reference_flags() {
        assert!(is_string_reference(TypeTag::String.id() | STRING_REFERENCE));
        assert!(!is_string_reference(TypeTag::String.id() | 0x03));
        assert!(is_object_reference(TypeTag::Map.id() | OBJECT_REFERENCE));
    }
}
