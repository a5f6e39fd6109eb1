//! Error types for Spearal encoding and decoding.

use std::fmt;

/// Which back-reference table an index points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    String,
    Object,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Object => write!(f, "object"),
        }
    }
}

/// Errors that can occur while encoding or decoding a Spearal stream.
#[derive(Debug, thiserror::Error)]
pub enum SpearalError {
    #[error("unexpected end of input: need {needed} bytes but only {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("unknown type tag: 0x{0:02X}")]
    UnknownType(u8),

    #[error("invalid {kind} reference: index {index} out of range ({len} entries)")]
    InvalidReference {
        kind: ReferenceKind,
        index: usize,
        len: usize,
    },

    #[error("no coder found for class {0}")]
    NoCoder(String),

    #[error("unknown class: {0}")]
    UnknownClass(String),

    #[error("invalid UTF-8 string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("invalid big number: {0}")]
    InvalidBigNumber(String),

    #[error("invalid date/time: {0}")]
    InvalidDateTime(String),

    #[error("value too large: {0}")]
    TooLarge(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("maximum nesting depth ({0}) exceeded")]
    DepthExceeded(usize),

    #[error("property error: {0}")]
    Property(String),

    #[error("conversion error: {0}")]
    Conversion(String),
}

impl SpearalError {
    /// Wraps any displayable error raised by host coders or converters.
    pub fn conversion(e: impl fmt::Display) -> Self {
        Self::Conversion(e.to_string())
    }

    /// Returns `true` for errors caused by a malformed or truncated stream,
    /// as opposed to a configuration problem on the encoding side.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::Truncated { .. }
                | Self::UnknownType(_)
                | Self::InvalidReference { .. }
                | Self::InvalidUtf8(_)
                | Self::InvalidBigNumber(_)
                | Self::InvalidDateTime(_)
                | Self::Protocol(_)
                | Self::DepthExceeded(_)
        )
    }
}
