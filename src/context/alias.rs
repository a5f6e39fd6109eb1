//! Local/remote class and property name aliasing.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Class name of the property alias bucket applied to every class without
/// its own aliases.
pub const WILDCARD_CLASS: &str = "*";

/// Property name map, keyed by the name being translated.
pub type PropertyAliases = Arc<HashMap<String, String>>;

/// Function computing a class name alias when no explicit mapping exists.
pub type ClassNameAliaser = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Bidirectional mapping between local and remote class and property names.
///
/// Must stay consistent for the lifetime of a [`Context`](super::Context):
/// renaming mid-stream is not supported.
pub trait AliasStrategy: Send + Sync {
    fn local_to_remote_class_name(&self, local_class_name: &str) -> String;

    fn remote_to_local_class_name(&self, remote_class_name: &str) -> String;

    /// Local-to-remote property names of a local class.
    fn local_to_remote_properties(&self, local_class_name: &str) -> PropertyAliases;

    /// Remote-to-local property names of a local class.
    fn remote_to_local_properties(&self, local_class_name: &str) -> PropertyAliases;
}

#[derive(Default)]
struct ClassNames {
    local_to_remote: HashMap<String, String>,
    remote_to_local: HashMap<String, String>,
}

/// Explicit maps first, aliaser functions (identity by default) second.
///
/// Aliaser results are cached into the maps on first use, so each function
/// runs at most once per name.
pub struct BasicAliasStrategy {
    class_names: RwLock<ClassNames>,
    local_to_remote_aliaser: ClassNameAliaser,
    remote_to_local_aliaser: ClassNameAliaser,
    local_to_remote_properties: HashMap<String, PropertyAliases>,
    remote_to_local_properties: HashMap<String, PropertyAliases>,
    no_properties: PropertyAliases,
}

impl Default for BasicAliasStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl BasicAliasStrategy {
    /// Creates an identity strategy.
    pub fn new() -> Self {
        Self {
            class_names: RwLock::new(ClassNames::default()),
            local_to_remote_aliaser: Arc::new(str::to_owned),
            remote_to_local_aliaser: Arc::new(str::to_owned),
            local_to_remote_properties: HashMap::new(),
            remote_to_local_properties: HashMap::new(),
            no_properties: PropertyAliases::default(),
        }
    }

    /// Maps a local class name to a remote one, both ways.
    pub fn class_alias(mut self, local: impl Into<String>, remote: impl Into<String>) -> Self {
        let (local, remote) = (local.into(), remote.into());
        let names = self.class_names.get_mut();
        names.remote_to_local.insert(remote.clone(), local.clone());
        names.local_to_remote.insert(local, remote);
        self
    }

    /// Adds property aliases for a local class ([`WILDCARD_CLASS`] for all
    /// classes without their own). Repeated calls for a class merge.
    pub fn properties_alias<L, R>(
        mut self,
        local_class_name: impl Into<String>,
        local_to_remote: impl IntoIterator<Item = (L, R)>,
    ) -> Self
    where
        L: Into<String>,
        R: Into<String>,
    {
        let local_class_name = local_class_name.into();
        let forward = Arc::make_mut(
            self.local_to_remote_properties
                .entry(local_class_name.clone())
                .or_default(),
        );
        let backward = Arc::make_mut(
            self.remote_to_local_properties
                .entry(local_class_name)
                .or_default(),
        );
        for (local, remote) in local_to_remote {
            let (local, remote) = (local.into(), remote.into());
            backward.insert(remote.clone(), local.clone());
            forward.insert(local, remote);
        }
        self
    }

    pub fn local_to_remote_aliaser(
        mut self,
        aliaser: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.local_to_remote_aliaser = Arc::new(aliaser);
        self
    }

    pub fn remote_to_local_aliaser(
        mut self,
        aliaser: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.remote_to_local_aliaser = Arc::new(aliaser);
        self
    }

    fn properties_of(
        &self,
        table: &HashMap<String, PropertyAliases>,
        local_class_name: &str,
    ) -> PropertyAliases {
        table
            .get(local_class_name)
            .or_else(|| table.get(WILDCARD_CLASS))
            .unwrap_or(&self.no_properties)
            .clone()
    }
}

impl AliasStrategy for BasicAliasStrategy {
    fn local_to_remote_class_name(&self, local_class_name: &str) -> String {
        if let Some(remote) = self.class_names.read().local_to_remote.get(local_class_name) {
            return remote.clone();
        }
        let remote = (self.local_to_remote_aliaser)(local_class_name);
        tracing::trace!(local = local_class_name, remote = %remote, "caching class alias");
        self.class_names
            .write()
            .local_to_remote
            .insert(local_class_name.to_owned(), remote.clone());
        remote
    }

    fn remote_to_local_class_name(&self, remote_class_name: &str) -> String {
        if let Some(local) = self.class_names.read().remote_to_local.get(remote_class_name) {
            return local.clone();
        }
        let local = (self.remote_to_local_aliaser)(remote_class_name);
        tracing::trace!(remote = remote_class_name, local = %local, "caching class alias");
        self.class_names
            .write()
            .remote_to_local
            .insert(remote_class_name.to_owned(), local.clone());
        local
    }

    fn local_to_remote_properties(&self, local_class_name: &str) -> PropertyAliases {
        self.properties_of(&self.local_to_remote_properties, local_class_name)
    }

    fn remote_to_local_properties(&self, local_class_name: &str) -> PropertyAliases {
        self.properties_of(&self.remote_to_local_properties, local_class_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn identity_by_default() {
        let aliases = BasicAliasStrategy::new();
        assert_eq!(aliases.local_to_remote_class_name("Person"), "Person");
        assert_eq!(aliases.remote_to_local_class_name("Person"), "Person");
        assert!(aliases.local_to_remote_properties("Person").is_empty());
    }

    #[test]
    fn explicit_class_aliases_work_both_ways() {
        let aliases = BasicAliasStrategy::new().class_alias("Person", "com.acme.Person");
        assert_eq!(aliases.local_to_remote_class_name("Person"), "com.acme.Person");
        assert_eq!(aliases.remote_to_local_class_name("com.acme.Person"), "Person");
    }

    #[test]
    fn aliaser_results_are_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let aliases = BasicAliasStrategy::new().remote_to_local_aliaser(move |remote| {
            counter.fetch_add(1, Ordering::SeqCst);
            remote.rsplit('.').next().unwrap_or(remote).to_owned()
        });
        assert_eq!(aliases.remote_to_local_class_name("org.acme.Order"), "Order");
        assert_eq!(aliases.remote_to_local_class_name("org.acme.Order"), "Order");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // The other direction keeps its own (identity) aliaser.
        assert_eq!(aliases.local_to_remote_class_name("Order"), "Order");
    }

    #[test]
    fn wildcard_property_bucket() {
        let aliases = BasicAliasStrategy::new()
            .properties_alias(WILDCARD_CLASS, [("id", "uid")])
            .properties_alias("Person", [("firstName", "first_name")])
            .properties_alias("Person", [("lastName", "last_name")]);

        let person = aliases.local_to_remote_properties("Person");
        assert_eq!(person.get("firstName").map(String::as_str), Some("first_name"));
        assert_eq!(person.get("lastName").map(String::as_str), Some("last_name"));
        assert_eq!(person.get("id"), None);

        let other = aliases.remote_to_local_properties("Order");
        assert_eq!(other.get("uid").map(String::as_str), Some("id"));
    }
}
