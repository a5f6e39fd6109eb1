//! Post-decode value conversion.

use std::fmt;
use std::sync::Arc;

use crate::error::SpearalError;
use crate::types::Value;

/// Where a decoded value is about to be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position<'a> {
    /// The top-level value of a stream.
    Root,
    /// A bean property, with local names.
    Property {
        class_name: &'a str,
        property: &'a str,
    },
    CollectionIndex(usize),
    MapKey,
    MapValue,
}

impl fmt::Display for Position<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::Property {
                class_name,
                property,
            } => write!(f, "{class_name}.{property}"),
            Self::CollectionIndex(index) => write!(f, "[{index}]"),
            Self::MapKey => write!(f, "map key"),
            Self::MapValue => write!(f, "map value"),
        }
    }
}

/// Turns a decoded value into the value stored at `position`.
pub trait Converter: Send + Sync {
    fn convert(&self, value: Value, position: &Position<'_>) -> Result<Value, SpearalError>;
}

impl<F> Converter for F
where
    F: Fn(Value, &Position<'_>) -> Result<Value, SpearalError> + Send + Sync,
{
    fn convert(&self, value: Value, position: &Position<'_>) -> Result<Value, SpearalError> {
        self(value, position)
    }
}

/// Offers a converter for the decoded values it recognizes. Same ordering
/// and caching rules as [`CoderProvider`](super::CoderProvider).
pub trait ConverterProvider: Send + Sync {
    fn converter(&self, value: &Value) -> Option<Arc<dyn Converter>>;
}

/// Serves one converter for every decoded value of a single class.
pub struct ClassConverterProvider {
    class_name: String,
    converter: Arc<dyn Converter>,
}

impl ClassConverterProvider {
    pub fn new(class_name: impl Into<String>, converter: impl Converter + 'static) -> Self {
        Self {
            class_name: class_name.into(),
            converter: Arc::new(converter),
        }
    }
}

impl ConverterProvider for ClassConverterProvider {
    fn converter(&self, value: &Value) -> Option<Arc<dyn Converter>> {
        (value.class_name() == self.class_name.as_str()).then(|| self.converter.clone())
    }
}
