//! Back-reference tables for one encoding or decoding session.
//!
//! Both sides append in encounter order, so the Nth fresh string (or object)
//! written by the encoder is the Nth fresh one read by the decoder and a
//! back-reference carries that index. Tables are only valid for a single
//! session and are never shared.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ReferenceKind, SpearalError};
use crate::types::{ObjectId, Value};

/// Encoder-side tables: strings keyed by value, objects keyed by identity.
#[derive(Debug, Default)]
pub struct ReferenceTable {
    strings: HashMap<Arc<str>, usize>,
    objects: HashMap<ObjectId, usize>,
    // Keeps every registered object alive for the session, so an identity
    // can't be reused by a later allocation.
    retained: Vec<Value>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of a previously seen equal string, or registers
    /// `value` and returns `None`. Empty strings are never registered.
    pub fn string(&mut self, value: &str) -> Option<usize> {
        if value.is_empty() {
            return None;
        }
        if let Some(&index) = self.strings.get(value) {
            return Some(index);
        }
        let index = self.strings.len();
        self.strings.insert(Arc::from(value), index);
        None
    }

    /// Returns the index of a previously seen identical object, or registers
    /// it and returns `None`. Values without identity are never registered.
    pub fn object(&mut self, value: &Value) -> Option<usize> {
        let id = object_id(value)?;
        if let Some(&index) = self.objects.get(&id) {
            return Some(index);
        }
        let index = self.retained.len();
        self.objects.insert(id, index);
        self.retained.push(value.clone());
        None
    }

    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    pub fn object_count(&self) -> usize {
        self.retained.len()
    }
}

fn object_id(value: &Value) -> Option<ObjectId> {
    match value {
        Value::ByteArray(bytes) => Some(ObjectId::of_bytes(bytes)),
        Value::Collection(items) => Some(items.identity()),
        Value::Map(entries) => Some(entries.identity()),
        Value::Bean(bean) => Some(bean.identity()),
        _ => None,
    }
}

/// Decoder-side tables, indexed by back-reference.
#[derive(Debug, Default)]
pub struct ReferenceList {
    strings: Vec<Arc<str>>,
    objects: Vec<Value>,
}

impl ReferenceList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_string(&mut self, value: Arc<str>) {
        self.strings.push(value);
    }

    pub fn string(&self, index: usize) -> Result<Arc<str>, SpearalError> {
        self.strings
            .get(index)
            .cloned()
            .ok_or(SpearalError::InvalidReference {
                kind: ReferenceKind::String,
                index,
                len: self.strings.len(),
            })
    }

    pub fn push_object(&mut self, value: Value) {
        self.objects.push(value);
    }

    pub fn object(&self, index: usize) -> Result<&Value, SpearalError> {
        self.objects.get(index).ok_or(SpearalError::InvalidReference {
            kind: ReferenceKind::Object,
            index,
            len: self.objects.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Shared;

    #[test]
    fn strings_dedup_by_value() {
        let mut table = ReferenceTable::new();
        assert_eq!(table.string("abc"), None);
        assert_eq!(table.string("def"), None);
        assert_eq!(table.string(&String::from("abc")), Some(0));
        assert_eq!(table.string("def"), Some(1));
        assert_eq!(table.string_count(), 2);
    }

    #[test]
    fn empty_string_is_never_registered() {
        let mut table = ReferenceTable::new();
        assert_eq!(table.string(""), None);
        assert_eq!(table.string(""), None);
        assert_eq!(table.string_count(), 0);
    }

    #[test]
    fn objects_dedup_by_identity() {
        let mut table = ReferenceTable::new();
        let a = Value::Collection(Shared::new(vec![Value::from(1)]));
        let b = Value::Collection(Shared::new(vec![Value::from(1)]));
        assert_eq!(table.object(&a), None);
        assert_eq!(table.object(&b), None);
        assert_eq!(table.object(&a.clone()), Some(0));
        assert_eq!(table.object(&b), Some(1));

        let bytes = Value::from(vec![1u8, 2]);
        assert_eq!(table.object(&bytes), None);
        assert_eq!(table.object(&bytes), Some(2));
        assert_eq!(table.object(&Value::from(vec![1u8, 2])), None);
    }

    #[test]
    fn scalars_have_no_identity() {
        let mut table = ReferenceTable::new();
        assert_eq!(table.object(&Value::from(7)), None);
        assert_eq!(table.object(&Value::from(7)), None);
        assert_eq!(table.object_count(), 0);
    }

    #[test]
    fn out_of_range_lookups_fail() {
        let mut list = ReferenceList::new();
        list.push_string(Arc::from("x"));
        assert_eq!(&*list.string(0).unwrap(), "x");
        assert!(matches!(
            list.string(1),
            Err(SpearalError::InvalidReference {
                kind: ReferenceKind::String,
                index: 1,
                len: 1
            })
        ));
        assert!(list.object(0).is_err());
    }
}
