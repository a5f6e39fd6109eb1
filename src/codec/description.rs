//! Bean descriptions: `<RemoteClassName>#<prop1>,<prop2>,...`.
//!
//! The description precedes a bean's property values and goes through the
//! string reference table, so repeating a class costs a back-reference.

use crate::context::AliasStrategy;
use crate::error::SpearalError;

const CLASS_SEPARATOR: char = '#';
const PROPERTY_SEPARATOR: char = ',';

/// A parsed description with both the remote and the local naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeanDescription {
    pub remote_class_name: String,
    pub local_class_name: String,
    pub remote_property_names: Vec<String>,
    pub local_property_names: Vec<String>,
}

/// Builds the wire description of a local class and its ordered properties.
pub fn describe<'a>(
    local_class_name: &str,
    local_property_names: impl IntoIterator<Item = &'a str>,
    aliases: &dyn AliasStrategy,
) -> String {
    let remote_class_name = aliases.local_to_remote_class_name(local_class_name);
    describe_as(remote_class_name, local_class_name, local_property_names, aliases)
}

/// Like [`describe`], with the remote class name already known.
pub fn describe_as<'a>(
    remote_class_name: impl Into<String>,
    local_class_name: &str,
    local_property_names: impl IntoIterator<Item = &'a str>,
    aliases: &dyn AliasStrategy,
) -> String {
    let mut description = remote_class_name.into();
    description.push(CLASS_SEPARATOR);
    let property_aliases = aliases.local_to_remote_properties(local_class_name);
    for (i, name) in local_property_names.into_iter().enumerate() {
        if i > 0 {
            description.push(PROPERTY_SEPARATOR);
        }
        description.push_str(property_aliases.get(name).map_or(name, String::as_str));
    }
    description
}

/// Parses a wire description, translating names to their local aliases.
pub fn parse(
    description: &str,
    aliases: &dyn AliasStrategy,
) -> Result<BeanDescription, SpearalError> {
    let (remote_class_name, properties) = description
        .split_once(CLASS_SEPARATOR)
        .unwrap_or((description, ""));
    if remote_class_name.is_empty() {
        return Err(SpearalError::Protocol(format!(
            "bean description without class name: {description:?}"
        )));
    }

    let local_class_name = aliases.remote_to_local_class_name(remote_class_name);
    let remote_property_names: Vec<String> = properties
        .split(PROPERTY_SEPARATOR)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect();

    let property_aliases = aliases.remote_to_local_properties(&local_class_name);
    let local_property_names = remote_property_names
        .iter()
        .map(|name| property_aliases.get(name).unwrap_or(name).clone())
        .collect();

    Ok(BeanDescription {
        remote_class_name: remote_class_name.to_owned(),
        local_class_name,
        remote_property_names,
        local_property_names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BasicAliasStrategy;

    #[test]
    fn identity_aliases() {
        let aliases = BasicAliasStrategy::new();
        let description = describe("Person", ["firstName", "age"], &aliases);
        assert_eq!(description, "Person#firstName,age");

        let parsed = parse(&description, &aliases).unwrap();
        assert_eq!(parsed.remote_class_name, "Person");
        assert_eq!(parsed.local_class_name, "Person");
        assert_eq!(parsed.local_property_names, ["firstName", "age"]);
    }

    #[test]
    fn empty_property_list() {
        let aliases = BasicAliasStrategy::new();
        assert_eq!(describe("Empty", [], &aliases), "Empty#");
        assert!(parse("Empty#", &aliases).unwrap().local_property_names.is_empty());
        assert_eq!(parse("Bare", &aliases).unwrap().local_class_name, "Bare");
    }

    #[test]
    fn aliased_names() {
        let aliases = BasicAliasStrategy::new()
            .class_alias("Person", "org.example.PersonEntity")
            .properties_alias("Person", [("firstName", "first_name")]);

        let description = describe("Person", ["firstName", "age"], &aliases);
        assert_eq!(description, "org.example.PersonEntity#first_name,age");

        let parsed = parse(&description, &aliases).unwrap();
        assert_eq!(parsed.local_class_name, "Person");
        assert_eq!(parsed.remote_property_names, ["first_name", "age"]);
        assert_eq!(parsed.local_property_names, ["firstName", "age"]);
    }

    #[test]
    fn missing_class_name() {
        let aliases = BasicAliasStrategy::new();
        assert!(parse("#a,b", &aliases).is_err());
    }
}
