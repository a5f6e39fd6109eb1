//! Spearal: compact binary object serialization in pure Rust.
//!
//! This crate encodes arbitrary value graphs (scalars, strings, byte arrays,
//! date/times, collections, maps, enums, class references and structured
//! records) into the Spearal binary format and decodes them back. Repeated
//! strings and shared objects are written once and back-referenced, which also
//! makes cyclic graphs representable.
//!
//! # Architecture
//!
//! - **`types`**: The dynamic value model (`Value`, `Bean`, big numbers, date/times)
//! - **`codec`**: Tag layout, the `Encoder` and `Decoder` sessions and their reference tables
//! - **`context`**: Shared configuration: coders, converters, aliasing, introspection
//! - **`error`**: `SpearalError`
//!
//! # Example
//!
//! ```
//! use spearal::context::{ClassDescriptor, Context, RegistryIntrospector};
//! use spearal::types::{DynamicBean, Value};
//!
//! let context = Context::builder()
//!     .introspector(
//!         RegistryIntrospector::new().with_class(ClassDescriptor::new("Person", ["name", "age"])),
//!     )
//!     .build();
//!
//! let person = Value::bean(DynamicBean::new("Person").with("name", "Ada").with("age", 36));
//! let bytes = context.encode(&person).unwrap();
//! let decoded = context.decode(&bytes).unwrap();
//! assert_eq!(decoded.as_bean().unwrap().read().get("name"), Some(Value::from("Ada")));
//! ```

pub mod codec;
pub mod context;
pub mod error;
pub mod types;

pub use context::Context;
pub use error::SpearalError;
pub use types::Value;
