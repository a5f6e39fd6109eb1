//! Arbitrary-precision numbers carried as canonical decimal strings.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::SpearalError;

/// The 14 symbols a big number may contain, in nibble order.
pub const BIG_NUMBER_ALPHABET: &[u8; 14] = b"0123456789+-.E";

/// A big integral or big floating value in `[sign]digits[.digits][E exponent]` form.
///
/// The representation is validated against [`BIG_NUMBER_ALPHABET`] only; the
/// host is responsible for parsing it into whatever arbitrary-precision type
/// it uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BigNumber(Arc<str>);

impl BigNumber {
    /// Validates and wraps a decimal representation. A lowercase `e`
    /// exponent marker is normalized to `E`.
    pub fn new(repr: impl AsRef<str>) -> Result<Self, SpearalError> {
        let repr = repr.as_ref();
        if repr.contains('e') {
            return Self::from_shared(Arc::from(repr.replace('e', "E")));
        }
        Self::from_shared(Arc::from(repr))
    }

    pub(crate) fn from_shared(repr: Arc<str>) -> Result<Self, SpearalError> {
        if repr.is_empty() {
            return Err(SpearalError::InvalidBigNumber("empty representation".into()));
        }
        if let Some(c) = repr.bytes().find(|b| !BIG_NUMBER_ALPHABET.contains(b)) {
            return Err(SpearalError::InvalidBigNumber(format!(
                "unexpected symbol {:?} in {repr:?}",
                c as char
            )));
        }
        Ok(Self(repr))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for BigNumber {
    type Err = SpearalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<i128> for BigNumber {
    fn from(value: i128) -> Self {
        Self(Arc::from(value.to_string()))
    }
}

impl From<u128> for BigNumber {
    fn from(value: u128) -> Self {
        Self(Arc::from(value.to_string()))
    }
}

impl fmt::Display for BigNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_canonical_forms() {
        for repr in ["0", "-12345678901234567890", "+1.5E-300", "3.14159", "1E10"] {
            assert_eq!(BigNumber::new(repr).unwrap().as_str(), repr);
        }
    }

    #[test]
    fn normalizes_lowercase_exponent() {
        assert_eq!(BigNumber::new("2.5e7").unwrap().as_str(), "2.5E7");
    }

    #[test]
    fn rejects_foreign_symbols() {
        assert!(BigNumber::new("").is_err());
        assert!(BigNumber::new("12 34").is_err());
        assert!(BigNumber::new("0x1F").is_err());
    }

    #[test]
    fn from_wide_integers() {
        assert_eq!(BigNumber::from(i128::MIN).as_str(), i128::MIN.to_string());
        assert_eq!(BigNumber::from(u128::MAX).as_str(), u128::MAX.to_string());
    }
}
