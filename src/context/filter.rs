//! Per-encode property filtering.

use std::collections::{HashMap, HashSet};

/// Restricts which properties of a class are encoded.
///
/// Classes without an entry keep all their properties. Selected properties
/// keep the introspector's order, not the order they were added in.
#[derive(Debug, Clone, Default)]
pub struct PropertyFilter {
    classes: HashMap<String, HashSet<String>>,
}

impl PropertyFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits `class_name` to `properties`, replacing any earlier selection
    /// for that class.
    pub fn add<P: Into<String>>(
        mut self,
        class_name: impl Into<String>,
        properties: impl IntoIterator<Item = P>,
    ) -> Self {
        self.classes.insert(
            class_name.into(),
            properties.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Selects from the ordered `properties` of `class_name`.
    pub fn select<'a>(&self, class_name: &str, properties: &'a [String]) -> Vec<&'a str> {
        match self.classes.get(class_name) {
            Some(allowed) => properties
                .iter()
                .filter(|p| allowed.contains(p.as_str()))
                .map(String::as_str)
                .collect(),
            None => properties.iter().map(String::as_str).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn unfiltered_class_keeps_everything() {
        let filter = PropertyFilter::new().add("Person", ["name"]);
        let properties = names(&["id", "total"]);
        assert_eq!(filter.select("Order", &properties), ["id", "total"]);
    }

    #[test]
    fn selection_keeps_introspector_order() {
        let filter = PropertyFilter::new().add("Person", ["age", "firstName"]);
        let properties = names(&["firstName", "lastName", "age"]);
        assert_eq!(filter.select("Person", &properties), ["firstName", "age"]);
    }

    #[test]
    fn adding_a_class_again_replaces_its_selection() {
        let filter = PropertyFilter::new()
            .add("Person", ["age"])
            .add("Person", ["firstName"]);
        let properties = names(&["firstName", "lastName", "age"]);
        assert_eq!(filter.select("Person", &properties), ["firstName"]);
    }
}
