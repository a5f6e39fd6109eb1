//! Spearal value types.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::bean::{Bean, BeanRef};
use super::big_number::BigNumber;
use super::datetime::DateTime;

/// Stable identity token of a shared allocation, valid while the allocation
/// is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

impl ObjectId {
    pub(crate) fn of_bytes(bytes: &Arc<[u8]>) -> Self {
        Self(Arc::as_ptr(bytes) as *const u8 as usize)
    }
}

/// A mutable, reference-counted container whose identity is its allocation.
///
/// Cloning a `Shared` clones the handle, not the contents. Two handles are
/// the "same object" for back-reference purposes only when [`Shared::ptr_eq`]
/// holds.
pub struct Shared<T>(Arc<RwLock<T>>);

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn identity(&self) -> ObjectId {
        ObjectId(Arc::as_ptr(&self.0) as *const () as usize)
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shared({:p})", Arc::as_ptr(&self.0))
    }
}

/// A host value with no built-in wire representation.
///
/// Custom values are encoded only by a registered coder and are produced on
/// decode only by converters.
pub trait CustomValue: fmt::Debug + Send + Sync + 'static {
    fn class_name(&self) -> &str;
    fn as_any(&self) -> &dyn Any;
}

/// An enum constant: its class and the constant's name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub class_name: Arc<str>,
    pub name: Arc<str>,
}

/// A node of a Spearal value graph.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Integral(i64),
    BigIntegral(BigNumber),
    Floating(f64),
    BigFloating(BigNumber),
    String(Arc<str>),
    ByteArray(Arc<[u8]>),
    DateTime(DateTime),
    Collection(Shared<Vec<Value>>),
    Map(Shared<Vec<(Value, Value)>>),
    Enum(EnumValue),
    Class(Arc<str>),
    Bean(BeanRef),
    Custom(Arc<dyn CustomValue>),
}

impl Value {
    pub fn collection(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Collection(Shared::new(items.into_iter().collect()))
    }

    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Self::Map(Shared::new(entries.into_iter().collect()))
    }

    pub fn bean(bean: impl Bean) -> Self {
        Self::Bean(Shared::new(Box::new(bean)))
    }

    pub fn enumeration(class_name: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self::Enum(EnumValue {
            class_name: class_name.into(),
            name: name.into(),
        })
    }

    pub fn class(name: impl Into<Arc<str>>) -> Self {
        Self::Class(name.into())
    }

    pub fn custom(value: impl CustomValue) -> Self {
        Self::Custom(Arc::new(value))
    }

    /// The runtime type name used to resolve coders and converters.
    pub fn class_name(&self) -> Cow<'static, str> {
        match self {
            Self::Null => Cow::Borrowed("null"),
            Self::Boolean(_) => Cow::Borrowed("bool"),
            Self::Integral(_) => Cow::Borrowed("i64"),
            Self::BigIntegral(_) => Cow::Borrowed("BigIntegral"),
            Self::Floating(_) => Cow::Borrowed("f64"),
            Self::BigFloating(_) => Cow::Borrowed("BigFloating"),
            Self::String(_) => Cow::Borrowed("String"),
            Self::ByteArray(_) => Cow::Borrowed("ByteArray"),
            Self::DateTime(_) => Cow::Borrowed("DateTime"),
            Self::Collection(_) => Cow::Borrowed("Collection"),
            Self::Map(_) => Cow::Borrowed("Map"),
            Self::Class(_) => Cow::Borrowed("Class"),
            Self::Enum(e) => Cow::Owned(e.class_name.to_string()),
            Self::Bean(b) => Cow::Owned(b.read().class_name().to_owned()),
            Self::Custom(c) => Cow::Owned(c.class_name().to_owned()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as an i64, if it is an `Integral` variant.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integral(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as an f64. Integral values are widened, since the
    /// encoder writes integer-valued doubles as `INTEGRAL`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Floating(f) => Some(*f),
            Self::Integral(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::ByteArray(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&Shared<Vec<Value>>> {
        match self {
            Self::Collection(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Shared<Vec<(Value, Value)>>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_bean(&self) -> Option<&BeanRef> {
        match self {
            Self::Bean(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_custom<T: CustomValue>(&self) -> Option<&T> {
        match self {
            Self::Custom(c) => c.as_any().downcast_ref(),
            _ => None,
        }
    }

    fn fmt_guarded(&self, f: &mut fmt::Formatter<'_>, open: &mut Vec<ObjectId>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integral(i) => write!(f, "{i}"),
            Self::BigIntegral(n) | Self::BigFloating(n) => write!(f, "{n}"),
            Self::Floating(v) => write!(f, "{v:?}"),
            Self::String(s) => write!(f, "\"{s}\""),
            Self::ByteArray(b) => write!(f, "<{} bytes>", b.len()),
            Self::DateTime(dt) => write!(f, "{dt}"),
            Self::Collection(items) => {
                let id = items.identity();
                if open.contains(&id) {
                    return write!(f, "<cycle>");
                }
                open.push(id);
                write!(f, "[")?;
                for (i, item) in items.read().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_guarded(f, open)?;
                }
                open.pop();
                write!(f, "]")
            }
            Self::Map(entries) => {
                let id = entries.identity();
                if open.contains(&id) {
                    return write!(f, "<cycle>");
                }
                open.push(id);
                write!(f, "{{")?;
                for (i, (k, v)) in entries.read().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    k.fmt_guarded(f, open)?;
                    write!(f, ": ")?;
                    v.fmt_guarded(f, open)?;
                }
                open.pop();
                write!(f, "}}")
            }
            Self::Enum(e) => write!(f, "{}.{}", e.class_name, e.name),
            Self::Class(name) => write!(f, "class {name}"),
            Self::Bean(b) => write!(f, "{} {{..}}", b.read().class_name()),
            Self::Custom(c) => write!(f, "{}({c:?})", c.class_name()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_guarded(f, &mut Vec::new())
    }
}

/// Structural equality, except for beans and custom values which compare by
/// identity. Shared containers that are the same allocation are equal without
/// being inspected; structurally comparing two distinct cyclic graphs does not
/// terminate.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integral(a), Self::Integral(b)) => a == b,
            (Self::BigIntegral(a), Self::BigIntegral(b)) => a == b,
            (Self::Floating(a), Self::Floating(b)) => a == b,
            (Self::BigFloating(a), Self::BigFloating(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::ByteArray(a), Self::ByteArray(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            (Self::Collection(a), Self::Collection(b)) => a.ptr_eq(b) || *a.read() == *b.read(),
            (Self::Map(a), Self::Map(b)) => a.ptr_eq(b) || *a.read() == *b.read(),
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Class(a), Self::Class(b)) => a == b,
            (Self::Bean(a), Self::Bean(b)) => a.ptr_eq(b),
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// -- Convenience conversions --

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integral(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integral(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Floating(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(Arc::from(s))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(Arc::from(s))
    }
}

impl From<Arc<str>> for Value {
    fn from(s: Arc<str>) -> Self {
        Self::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::ByteArray(Arc::from(b))
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Collection(Shared::new(v))
    }
}

impl From<DateTime> for Value {
    fn from(dt: DateTime) -> Self {
        Self::DateTime(dt)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_identity_follows_handles() {
        let a = Shared::new(vec![Value::from(1)]);
        let b = a.clone();
        let c = Shared::new(vec![Value::from(1)]);
        assert!(a.ptr_eq(&b));
        assert_eq!(a.identity(), b.identity());
        assert!(!a.ptr_eq(&c));
        assert_ne!(a.identity(), c.identity());
        assert_eq!(Value::Collection(a), Value::Collection(c));
    }

    #[test]
    fn class_names_for_dispatch() {
        assert_eq!(Value::from("x").class_name(), "String");
        assert_eq!(Value::from(1.5).class_name(), "f64");
        assert_eq!(Value::enumeration("Color", "RED").class_name(), "Color");
    }

    #[test]
    fn display_marks_cycles() {
        let list = Shared::new(vec![Value::from(1)]);
        list.write().push(Value::Collection(list.clone()));
        assert_eq!(Value::Collection(list.clone()).to_string(), "[1, <cycle>]");
        // Break the cycle so the test does not leak.
        list.write().clear();
    }

    #[test]
    fn display_nested() {
        let v = Value::map([
            (Value::from("a"), Value::collection([Value::from(true), Value::Null])),
            (Value::from(2), Value::from(0.5)),
        ]);
        assert_eq!(v.to_string(), "{\"a\": [true, null], 2: 0.5}");
    }
}
