//! Class lookup, instantiation and property enumeration.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::{Bean, DynamicBean, Value};

/// Creates an empty instance of a class.
pub type BeanFactory = Arc<dyn Fn() -> Box<dyn Bean> + Send + Sync>;

/// Everything the codec needs to know about a local class.
#[derive(Clone)]
pub struct ClassDescriptor {
    name: String,
    supertype: Option<String>,
    declared_properties: Vec<String>,
    factory: BeanFactory,
}

impl ClassDescriptor {
    /// Describes a class instantiated as a [`DynamicBean`].
    pub fn new<P: Into<String>>(
        name: impl Into<String>,
        declared_properties: impl IntoIterator<Item = P>,
    ) -> Self {
        let name = name.into();
        let factory_name = name.clone();
        Self {
            name,
            supertype: None,
            declared_properties: declared_properties.into_iter().map(Into::into).collect(),
            factory: Arc::new(move || Box::new(DynamicBean::new(factory_name.clone()))),
        }
    }

    /// Inherits the properties of another registered class, listed after
    /// the declared ones.
    pub fn extends(mut self, supertype: impl Into<String>) -> Self {
        self.supertype = Some(supertype.into());
        self
    }

    pub fn with_factory(
        mut self,
        factory: impl Fn() -> Box<dyn Bean> + Send + Sync + 'static,
    ) -> Self {
        self.factory = Arc::new(factory);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn supertype(&self) -> Option<&str> {
        self.supertype.as_deref()
    }

    pub fn declared_properties(&self) -> &[String] {
        &self.declared_properties
    }

    pub fn instantiate(&self) -> Box<dyn Bean> {
        (self.factory)()
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &self.name)
            .field("supertype", &self.supertype)
            .field("declared_properties", &self.declared_properties)
            .finish_non_exhaustive()
    }
}

/// Runtime type information used by coders, converters and bean decoding.
pub trait Introspector: Send + Sync {
    /// Class name keying coder and converter lookups.
    fn class_name_of(&self, value: &Value) -> Cow<'static, str> {
        value.class_name()
    }

    /// Resolves a local class name, `None` when unknown.
    fn class_for_name(&self, name: &str) -> Option<Arc<ClassDescriptor>>;

    /// Ordered serializable property names of a class.
    fn properties(&self, class: &ClassDescriptor) -> Arc<[String]>;
}

/// An introspector over explicitly registered classes.
///
/// Property lists are computed once per class (declared properties first,
/// then the supertype chain) and cached.
#[derive(Default)]
pub struct RegistryIntrospector {
    classes: RwLock<HashMap<String, Arc<ClassDescriptor>>>,
    properties: RwLock<HashMap<String, Arc<[String]>>>,
}

impl RegistryIntrospector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_class(self, class: ClassDescriptor) -> Self {
        self.register(class);
        self
    }

    /// Registers or replaces a class.
    pub fn register(&self, class: ClassDescriptor) {
        tracing::debug!(class = %class.name, "registering class");
        self.classes
            .write()
            .insert(class.name.clone(), Arc::new(class));
        // A supertype may have changed under already cached subclasses.
        self.properties.write().clear();
    }

    fn collect_properties(&self, class: &ClassDescriptor) -> Vec<String> {
        let mut seen_classes = HashSet::new();
        let mut seen_properties = HashSet::new();
        let mut properties = Vec::new();

        let mut current = Some(Arc::new(class.clone()));
        while let Some(class) = current {
            if !seen_classes.insert(class.name.clone()) {
                tracing::warn!(class = %class.name, "cyclic class hierarchy");
                break;
            }
            for property in &class.declared_properties {
                if seen_properties.insert(property.clone()) {
                    properties.push(property.clone());
                }
            }
            current = class
                .supertype
                .as_deref()
                .and_then(|name| self.class_for_name(name));
        }
        properties
    }
}

impl Introspector for RegistryIntrospector {
    fn class_for_name(&self, name: &str) -> Option<Arc<ClassDescriptor>> {
        self.classes.read().get(name).cloned()
    }

    fn properties(&self, class: &ClassDescriptor) -> Arc<[String]> {
        if let Some(properties) = self.properties.read().get(&class.name) {
            return properties.clone();
        }
        let properties: Arc<[String]> = self.collect_properties(class).into();
        self.properties
            .write()
            .insert(class.name.clone(), properties.clone());
        properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_class() {
        let introspector = RegistryIntrospector::new();
        assert!(introspector.class_for_name("Nope").is_none());
    }

    #[test]
    fn default_factory_builds_dynamic_beans() {
        let class = ClassDescriptor::new("Person", ["name"]);
        let bean = class.instantiate();
        assert_eq!(bean.class_name(), "Person");
        assert!(bean.downcast_ref::<DynamicBean>().is_some());
    }

    #[test]
    fn inherited_properties_follow_declared_ones() {
        let introspector = RegistryIntrospector::new()
            .with_class(ClassDescriptor::new("Entity", ["id", "version"]))
            .with_class(ClassDescriptor::new("Person", ["name", "id"]).extends("Entity"));

        let person = introspector.class_for_name("Person").unwrap();
        assert_eq!(&*introspector.properties(&person), ["name", "id", "version"]);
        // Served from the cache the second time.
        assert_eq!(&*introspector.properties(&person), ["name", "id", "version"]);
    }

    #[test]
    fn reregistering_invalidates_cached_properties() {
        let introspector =
            RegistryIntrospector::new().with_class(ClassDescriptor::new("Point", ["x"]));
        let point = introspector.class_for_name("Point").unwrap();
        assert_eq!(&*introspector.properties(&point), ["x"]);

        introspector.register(ClassDescriptor::new("Point", ["x", "y"]));
        let point = introspector.class_for_name("Point").unwrap();
        assert_eq!(&*introspector.properties(&point), ["x", "y"]);
    }

    #[test]
    fn cyclic_hierarchy_terminates() {
        let introspector = RegistryIntrospector::new()
            .with_class(ClassDescriptor::new("A", ["a"]).extends("B"))
            .with_class(ClassDescriptor::new("B", ["b"]).extends("A"));
        let a = introspector.class_for_name("A").unwrap();
        assert_eq!(&*introspector.properties(&a), ["a", "b"]);
    }
}
