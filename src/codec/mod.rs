//! Spearal binary encoding format.
//!
//! Each value is a tag byte (type family in the high nibble, parameters in
//! the low nibble) followed by a family-specific payload. Multi-byte numbers
//! are big-endian. Strings and objects repeated within a session are written
//! once and then back-referenced by index.

pub mod big_number;
pub mod decode;
pub mod description;
pub mod encode;
pub mod reference;
pub mod tag;
pub mod var_width;

pub use decode::Decoder;
pub use encode::Encoder;
pub use tag::TypeTag;
