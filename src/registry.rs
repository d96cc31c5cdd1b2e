//! Type registry: per-type decomposition rules
//!
//! The registry is static data. It is loaded once (usually from JSON) and
//! wrapped in a [`RegistryAccess`], which indexes it and answers the lookups
//! transformers need: which strategy governs a type, where its children live
//! inside a combined document, and which field identifies each child.

use crate::component::Component;
use crate::error::ConvertError;
use crate::types::Format;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// How a type's children are laid out across the two formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// No children; one file in either format
    #[default]
    Standalone,
    /// Every child is its own file in source format
    Decomposed,
    /// Children stay inline in one file but are addressable by key
    NonDecomposed,
    /// Split/recombine, with the recombining direction taken from the registry
    Composed,
}

/// Descriptor for a child type declared by a parent type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildTypeInfo {
    /// Child type name, e.g. "CustomField"
    pub name: String,

    /// Key under the parent's root element holding these children, e.g. "fields"
    pub element_name: String,

    /// Directory the split children are written to
    pub directory_name: String,

    /// File suffix of a split child
    pub suffix: String,

    /// Field whose value identifies a child element
    #[serde(default = "default_unique_id_field")]
    pub unique_id_field: String,
}

fn default_unique_id_field() -> String {
    String::from("fullName")
}

/// Descriptor for a top-level metadata type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub name: String,
    pub directory_name: String,
    pub suffix: String,

    #[serde(default)]
    pub strategy: Strategy,

    /// Format in which split children are recombined (composed types only)
    #[serde(default)]
    pub accumulate_on: Option<Format>,

    #[serde(default)]
    pub children: Vec<ChildTypeInfo>,
}

impl TypeInfo {
    /// The format whose conversion defers to finalize, if any
    pub fn accumulating_format(&self) -> Option<Format> {
        match self.strategy {
            Strategy::Standalone => None,
            Strategy::Decomposed | Strategy::NonDecomposed => Some(Format::Metadata),
            Strategy::Composed => self.accumulate_on,
        }
    }

    /// Find a child type by type name or element name
    pub fn child(&self, key: &str) -> Option<&ChildTypeInfo> {
        self.children
            .iter()
            .find(|child| child.name == key || child.element_name == key)
    }

    /// Full name of the child identified by `key` under `parent_full_name`
    pub fn child_full_name(&self, parent_full_name: &str, key: &str) -> String {
        match self.strategy {
            Strategy::NonDecomposed => key.to_string(),
            _ => format!("{}.{}", parent_full_name, key),
        }
    }

    /// Inverse of [`TypeInfo::child_full_name`]
    pub fn child_key<'a>(&self, parent_full_name: &str, child_full_name: &'a str) -> &'a str {
        match self.strategy {
            Strategy::NonDecomposed => child_full_name,
            _ => child_full_name
                .strip_prefix(parent_full_name)
                .and_then(|rest| rest.strip_prefix('.'))
                .unwrap_or(child_full_name),
        }
    }

    fn validate(&self) -> Result<(), ConvertError> {
        let invalid = |reason: &str| -> Result<(), ConvertError> {
            Err(ConvertError::Configuration(format!(
                "type `{}` {}",
                self.name, reason
            )))
        };

        match self.strategy {
            Strategy::Standalone if !self.children.is_empty() => {
                invalid("is standalone but declares child types")
            }
            Strategy::Decomposed | Strategy::Composed if self.children.is_empty() => {
                invalid("splits into children but declares no child types")
            }
            Strategy::NonDecomposed if self.children.len() != 1 => {
                invalid("is non-decomposed and must declare exactly one child type")
            }
            Strategy::Composed if self.accumulate_on.is_none() => {
                invalid("is composed but does not declare `accumulate_on`")
            }
            _ => Ok(()),
        }
    }
}

/// A child type resolved against its parent
#[derive(Debug, Clone, Copy)]
pub struct ChildTypeRef<'a> {
    /// Strategy of the parent type, which governs the child
    pub strategy: Strategy,
    pub parent: &'a TypeInfo,
    pub info: &'a ChildTypeInfo,
}

impl ChildTypeRef<'_> {
    pub fn unique_key_field(&self) -> &str {
        &self.info.unique_id_field
    }
}

/// Raw registry content, as loaded from configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    pub types: Vec<TypeInfo>,
}

impl Registry {
    pub fn from_json_str(json: &str) -> Result<Self, ConvertError> {
        serde_json::from_str(json)
            .map_err(|e| ConvertError::Configuration(format!("invalid registry: {e}")))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConvertError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}

/// Read-only, indexed view over a [`Registry`]
#[derive(Debug, Clone)]
pub struct RegistryAccess {
    types: HashMap<String, Arc<TypeInfo>>,

    /// Child type name -> parent type name
    parents: HashMap<String, String>,
}

impl RegistryAccess {
    pub fn new(registry: Registry) -> Result<Self, ConvertError> {
        let mut types = HashMap::new();
        let mut parents = HashMap::new();

        for type_info in registry.types {
            type_info.validate()?;

            for child in &type_info.children {
                if let Some(previous) = parents.insert(child.name.clone(), type_info.name.clone()) {
                    return Err(ConvertError::Configuration(format!(
                        "child type `{}` is declared by both `{}` and `{}`",
                        child.name, previous, type_info.name
                    )));
                }
            }

            let name = type_info.name.clone();
            if types.insert(name.clone(), Arc::new(type_info)).is_some() {
                return Err(ConvertError::Configuration(format!(
                    "type `{name}` is declared more than once"
                )));
            }
        }

        Ok(RegistryAccess { types, parents })
    }

    pub fn lookup_type(&self, name: &str) -> Result<Arc<TypeInfo>, ConvertError> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| ConvertError::unknown_type(name))
    }

    /// Resolve a child by parent type name and child type or element name
    pub fn lookup_child_type(
        &self,
        parent_name: &str,
        child_key: &str,
    ) -> Result<ChildTypeRef<'_>, ConvertError> {
        let parent = self
            .types
            .get(parent_name)
            .ok_or_else(|| ConvertError::unknown_type(parent_name))?;
        let info = parent
            .child(child_key)
            .ok_or_else(|| ConvertError::unknown_child_type(parent_name, child_key))?;

        Ok(ChildTypeRef {
            strategy: parent.strategy,
            parent: parent.as_ref(),
            info,
        })
    }

    /// The type whose strategy governs `component`
    ///
    /// Child components are governed by their parent's type.
    pub fn type_for_component(&self, component: &Component) -> Result<Arc<TypeInfo>, ConvertError> {
        if let Some(parent) = component.parent_identity() {
            let child = self.lookup_child_type(&parent.type_name, component.type_name())?;
            return self.lookup_type(&child.parent.name);
        }

        if let Some(parent_name) = self.parents.get(component.type_name()) {
            return Err(ConvertError::Configuration(format!(
                "{} is a `{}` child but has no parent component",
                component.identity(),
                parent_name
            )));
        }

        self.lookup_type(component.type_name())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::component::Component;

    pub(crate) const REGISTRY_JSON: &str = r#"{
        "types": [
            {
                "name": "CustomObject",
                "directory_name": "objects",
                "suffix": "object",
                "strategy": "decomposed",
                "children": [
                    { "name": "CustomField", "element_name": "fields",
                      "directory_name": "fields", "suffix": "field" },
                    { "name": "ListView", "element_name": "listViews",
                      "directory_name": "listViews", "suffix": "listView" }
                ]
            },
            {
                "name": "CustomLabels",
                "directory_name": "labels",
                "suffix": "labels",
                "strategy": "non_decomposed",
                "children": [
                    { "name": "CustomLabel", "element_name": "labels",
                      "directory_name": "labels", "suffix": "label" }
                ]
            },
            {
                "name": "Bot",
                "directory_name": "bots",
                "suffix": "bot",
                "strategy": "composed",
                "accumulate_on": "source",
                "children": [
                    { "name": "BotVersion", "element_name": "botVersions",
                      "directory_name": "versions", "suffix": "botVersion" }
                ]
            },
            {
                "name": "ApexClass",
                "directory_name": "classes",
                "suffix": "cls"
            }
        ]
    }"#;

    pub(crate) fn registry() -> RegistryAccess {
        RegistryAccess::new(Registry::from_json_str(REGISTRY_JSON).unwrap()).unwrap()
    }

    #[test]
    fn test_lookup_type() {
        let registry = registry();
        assert_eq!(registry.len(), 4);

        let object = registry.lookup_type("CustomObject").unwrap();
        assert_eq!(object.strategy, Strategy::Decomposed);
        assert_eq!(object.accumulating_format(), Some(Format::Metadata));

        let class = registry.lookup_type("ApexClass").unwrap();
        assert_eq!(class.strategy, Strategy::Standalone);
        assert_eq!(class.accumulating_format(), None);
    }

    #[test]
    fn test_unknown_type_is_configuration_error() {
        let err = registry().lookup_type("Nope").unwrap_err();
        assert!(matches!(err, ConvertError::Configuration(_)));
    }

    #[test]
    fn test_lookup_child_type_by_name_or_element() {
        let registry = registry();

        let by_name = registry.lookup_child_type("CustomObject", "CustomField").unwrap();
        let by_element = registry.lookup_child_type("CustomObject", "fields").unwrap();
        assert_eq!(by_name.info, by_element.info);
        assert_eq!(by_name.strategy, Strategy::Decomposed);
        assert_eq!(by_name.unique_key_field(), "fullName");

        let err = registry.lookup_child_type("CustomObject", "validationRules").unwrap_err();
        assert!(matches!(err, ConvertError::Configuration(_)));
    }

    #[test]
    fn test_composed_direction_comes_from_data() {
        let bot = registry().lookup_type("Bot").unwrap();
        assert_eq!(bot.accumulating_format(), Some(Format::Source));
    }

    #[test]
    fn test_child_full_names() {
        let registry = registry();
        let object = registry.lookup_type("CustomObject").unwrap();
        let labels = registry.lookup_type("CustomLabels").unwrap();

        assert_eq!(object.child_full_name("Account", "Industry"), "Account.Industry");
        assert_eq!(object.child_key("Account", "Account.Industry"), "Industry");
        assert_eq!(labels.child_full_name("CustomLabels", "Greeting"), "Greeting");
        assert_eq!(labels.child_key("CustomLabels", "Greeting"), "Greeting");
    }

    #[test]
    fn test_type_for_component_uses_parent_type() {
        let registry = registry();
        let parent = Component::virtual_component("CustomObject", "Account", "{}")
            .with_children(vec![Component::virtual_component(
                "CustomField",
                "Account.Industry",
                "{}",
            )]);
        let child = &parent.child_components()[0];

        assert_eq!(registry.type_for_component(child).unwrap().name, "CustomObject");
        assert_eq!(registry.type_for_component(&parent).unwrap().name, "CustomObject");

        let orphan = Component::virtual_component("CustomField", "Account.Industry", "{}");
        assert!(matches!(
            registry.type_for_component(&orphan),
            Err(ConvertError::Configuration(_))
        ));
    }

    #[test]
    fn test_invalid_registries_are_rejected() {
        let composed_without_direction = r#"{ "types": [ {
            "name": "Bot", "directory_name": "bots", "suffix": "bot", "strategy": "composed",
            "children": [ { "name": "BotVersion", "element_name": "botVersions",
                            "directory_name": "versions", "suffix": "botVersion" } ] } ] }"#;
        let decomposed_without_children = r#"{ "types": [ {
            "name": "CustomObject", "directory_name": "objects", "suffix": "object",
            "strategy": "decomposed" } ] }"#;
        let duplicate = r#"{ "types": [
            { "name": "ApexClass", "directory_name": "classes", "suffix": "cls" },
            { "name": "ApexClass", "directory_name": "classes", "suffix": "cls" } ] }"#;

        for json in [composed_without_direction, decomposed_without_children, duplicate] {
            let registry = Registry::from_json_str(json).unwrap();
            assert!(matches!(
                RegistryAccess::new(registry),
                Err(ConvertError::Configuration(_))
            ));
        }

        assert!(Registry::from_json_str("{ not json").is_err());
    }
}
