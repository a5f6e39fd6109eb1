//! Structured records ("beans") and their generic implementations.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use super::value::{Shared, Value};
use crate::error::SpearalError;

/// Handle to a structured record inside a value graph.
pub type BeanRef = Shared<Box<dyn Bean>>;

/// A host structured record with named properties.
///
/// Property order is not a concern of the record itself: the introspector
/// supplies the ordered property list of each class.
pub trait Bean: fmt::Debug + Send + Sync + 'static {
    /// Local class name of this record.
    fn class_name(&self) -> &str;

    /// Reads a property. `None` means the record has no value for it.
    fn get(&self, property: &str) -> Option<Value>;

    /// Writes a property.
    fn set(&mut self, property: &str, value: Value) -> Result<(), SpearalError>;

    /// Whether the property was explicitly set. Undefined properties are left
    /// out of the encoded description instead of being sent as null.
    fn is_defined(&self, property: &str) -> bool {
        let _ = property;
        true
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn Bean {
    pub fn downcast_ref<T: Bean>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    pub fn downcast_mut<T: Bean>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}

/// A record whose properties live in a map. A property is defined once it
/// has been set and until it is undefined again.
#[derive(Debug, Clone, Default)]
pub struct DynamicBean {
    class_name: String,
    values: HashMap<String, Value>,
}

impl DynamicBean {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            values: HashMap::new(),
        }
    }

    /// Builder-style setter.
    pub fn with(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(property.into(), value.into());
        self
    }

    /// Clears a property and marks it undefined.
    pub fn undefine(&mut self, property: &str) {
        self.values.remove(property);
    }

    pub fn defined_properties(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl Bean for DynamicBean {
    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn get(&self, property: &str) -> Option<Value> {
        self.values.get(property).cloned()
    }

    fn set(&mut self, property: &str, value: Value) -> Result<(), SpearalError> {
        self.values.insert(property.to_owned(), value);
        Ok(())
    }

    fn is_defined(&self, property: &str) -> bool {
        self.values.contains_key(property)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Placeholder for a record whose class the receiver does not know.
///
/// Carries the raw properties in stream order so nothing the sender wrote is
/// lost, and re-encodes with that same property list.
#[derive(Debug, Clone)]
pub struct UnsupportedBean {
    class_name: String,
    remote_class_name: String,
    properties: Vec<(String, Value)>,
}

impl UnsupportedBean {
    pub fn new(class_name: impl Into<String>, remote_class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            remote_class_name: remote_class_name.into(),
            properties: Vec::new(),
        }
    }

    /// Class name as it appeared in the stream, before aliasing.
    pub fn remote_class_name(&self) -> &str {
        &self.remote_class_name
    }

    pub fn properties(&self) -> &[(String, Value)] {
        &self.properties
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(name, _)| name.as_str())
    }
}

impl Bean for UnsupportedBean {
    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn get(&self, property: &str) -> Option<Value> {
        self.properties
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value.clone())
    }

    fn set(&mut self, property: &str, value: Value) -> Result<(), SpearalError> {
        match self.properties.iter_mut().find(|(name, _)| name == property) {
            Some((_, slot)) => *slot = value,
            None => self.properties.push((property.to_owned(), value)),
        }
        Ok(())
    }

    fn is_defined(&self, property: &str) -> bool {
        self.properties.iter().any(|(name, _)| name == property)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
