use super::{split, MetadataTransformer};
use crate::component::Component;
use crate::context::ConvertContext;
use crate::error::ConvertError;
use crate::registry::RegistryAccess;
use crate::types::{Format, WriteInfo};
use std::sync::Arc;

/// Every child is its own file in source format
///
/// Toward metadata format children are deferred and recombined under their
/// parent at finalize. Toward source format the combined document is split
/// right away.
pub struct DecomposedTransformer<'a> {
    registry: &'a RegistryAccess,
    context: &'a ConvertContext,
}

impl<'a> DecomposedTransformer<'a> {
    pub fn new(registry: &'a RegistryAccess, context: &'a ConvertContext) -> Self {
        DecomposedTransformer { registry, context }
    }
}

impl MetadataTransformer for DecomposedTransformer<'_> {
    fn to_metadata_format(&self, component: &Arc<Component>) -> Result<Vec<WriteInfo>, ConvertError> {
        split::accumulate(self.registry, self.context, component, Format::Metadata)
    }

    fn to_source_format(
        &self,
        component: &Arc<Component>,
        full_parent: Option<&Arc<Component>>,
    ) -> Result<Vec<WriteInfo>, ConvertError> {
        split::split(self.registry, self.context, component, full_parent, Format::Source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Content;
    use crate::registry::tests::registry;
    use crate::types::Identity;
    use serde_json::{json, Value};
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    const ACCOUNT: &str = r#"{"CustomObject": {
        "@xmlns": "urn:metadata",
        "label": "Account",
        "fields": [
            {"fullName": "Industry", "type": "Picklist"},
            {"@xsi:type": "RatingField", "fullName": "Rating", "type": "Text"}
        ],
        "listViews": {"fullName": "All", "filterScope": "Everything"}
    }}"#;

    fn field(name: &str) -> Component {
        Component::virtual_component(
            "CustomField",
            format!("Account.{name}"),
            json!({"CustomField": {"fullName": name}}).to_string(),
        )
    }

    #[test]
    fn test_to_metadata_format_defers_child() {
        let registry = registry();
        let context = ConvertContext::default();
        let transformer = DecomposedTransformer::new(&registry, &context);
        let account = Component::new("CustomObject", "Account", Content::Empty)
            .with_children(vec![field("Industry"), field("Rating")]);

        for child in account.child_components() {
            assert!(transformer.to_metadata_format(child).unwrap().is_empty());
        }

        let entry = context.recomposition.get(account.identity()).unwrap();
        assert_eq!(entry.children, account.children());
        assert!(Arc::ptr_eq(entry.component.as_ref().unwrap(), &account));
    }

    #[test]
    fn test_to_metadata_format_defers_parent_with_children() {
        let registry = registry();
        let context = ConvertContext::default();
        let transformer = DecomposedTransformer::new(&registry, &context);
        let account = Component::new("CustomObject", "Account", Content::Empty)
            .with_children(vec![field("Industry"), field("Rating")]);

        assert!(transformer.to_metadata_format(&account).unwrap().is_empty());
        // the same children again via their own visits
        for child in account.child_components() {
            assert!(transformer.to_metadata_format(child).unwrap().is_empty());
        }

        assert_eq!(context.recomposition.len(), 1);
        assert_eq!(context.recomposition.children_of(account.identity()).unwrap().len(), 2);

        let writes = context.finalize().unwrap();
        assert_eq!(writes.len(), 1);
        let doc: Value = serde_json::from_str(&writes[0].content).unwrap();
        assert_eq!(
            doc,
            json!({"CustomObject": {"fields": [{"fullName": "Industry"}, {"fullName": "Rating"}]}})
        );
    }

    #[test]
    fn test_to_source_format_splits_immediately() {
        let registry = registry();
        let context = ConvertContext::default();
        let transformer = DecomposedTransformer::new(&registry, &context);
        let account = Arc::new(Component::virtual_component("CustomObject", "Account", ACCOUNT));

        let writes = transformer.to_source_format(&account, None).unwrap();
        let outputs: Vec<PathBuf> = writes.iter().map(|w| w.output.clone()).collect();
        assert_eq!(
            outputs,
            vec![
                PathBuf::from("objects/Account/fields/Industry.field-meta.json"),
                PathBuf::from("objects/Account/fields/Rating.field-meta.json"),
                PathBuf::from("objects/Account/listViews/All.listView-meta.json"),
                PathBuf::from("objects/Account/Account.object-meta.json"),
            ]
        );

        let industry: Value = serde_json::from_str(&writes[0].content).unwrap();
        assert_eq!(
            industry,
            json!({"CustomField": {"@xmlns": "urn:metadata", "fullName": "Industry", "type": "Picklist"}})
        );
        let rating: Value = serde_json::from_str(&writes[1].content).unwrap();
        assert_eq!(
            rating,
            json!({"CustomField": {
                "@xmlns": "urn:metadata",
                "@xsi:type": "RatingField",
                "fullName": "Rating",
                "type": "Text"
            }})
        );
        let parent: Value = serde_json::from_str(&writes[3].content).unwrap();
        assert_eq!(
            parent,
            json!({"CustomObject": {"@xmlns": "urn:metadata", "label": "Account"}})
        );
        assert_eq!(writes[0].origin, Identity::new("CustomField", "Account.Industry"));
        assert!(context.recomposition.is_empty());
    }

    #[test]
    fn test_to_source_format_does_not_emit_twice() {
        let registry = registry();
        let context = ConvertContext::default();
        let transformer = DecomposedTransformer::new(&registry, &context);
        let account = Arc::new(Component::virtual_component("CustomObject", "Account", ACCOUNT));
        let fuller = Arc::new(Component::virtual_component(
            "CustomObject",
            "Account",
            json!({"CustomObject": {"fields": [
                {"fullName": "Industry", "type": "Picklist"},
                {"fullName": "Website", "type": "Url"}
            ]}})
            .to_string(),
        ));

        assert_eq!(transformer.to_source_format(&account, None).unwrap().len(), 4);

        // second path to the same parent: only the child not seen before is written
        let again = transformer.to_source_format(&account, Some(&fuller)).unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(
            again[0].output,
            PathBuf::from("objects/Account/fields/Website.field-meta.json")
        );
        assert_eq!(context.decomposition.emitted_count(account.identity()), 5);
    }

    #[test]
    fn test_separately_resolved_child_is_written_once() {
        let registry = registry();
        let context = ConvertContext::default();
        let transformer = DecomposedTransformer::new(&registry, &context);
        let account = Component::new("CustomObject", "Account", Content::Empty)
            .with_children(vec![field("Industry")]);
        let child = &account.child_components()[0];

        let first = transformer.to_source_format(child, None).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(
            first[0].output,
            PathBuf::from("objects/Account/fields/Industry.field-meta.json")
        );
        assert!(transformer.to_source_format(child, None).unwrap().is_empty());
    }

    #[test]
    fn test_missing_unique_key_is_data_integrity_error() {
        let registry = registry();
        let context = ConvertContext::default();
        let transformer = DecomposedTransformer::new(&registry, &context);
        let account = Arc::new(Component::virtual_component(
            "CustomObject",
            "Account",
            r#"{"CustomObject": {"fields": [{"fullName": "Industry"}, {"type": "Text"}]}}"#,
        ));

        match transformer.to_source_format(&account, None) {
            Err(ConvertError::DataIntegrity { parent, element, field }) => {
                assert_eq!(parent, Identity::new("CustomObject", "Account"));
                assert_eq!(element, "fields[1]");
                assert_eq!(field, "fullName");
            }
            other => panic!("expected data integrity error, got {other:?}"),
        }
    }

    #[test]
    fn test_element_attributes_win_over_parent_namespaces() {
        let registry = registry();
        let context = ConvertContext::default();
        let transformer = DecomposedTransformer::new(&registry, &context);
        let account = Arc::new(Component::virtual_component(
            "CustomObject",
            "Account",
            r#"{"CustomObject": {"@xmlns": "urn:metadata", "@version": "2",
                "fields": {"@xmlns": "urn:field", "fullName": "Industry"}}}"#,
        ));

        let writes = transformer.to_source_format(&account, None).unwrap();
        let industry: Value = serde_json::from_str(&writes[0].content).unwrap();
        assert_eq!(
            industry,
            json!({"CustomField": {"@xmlns": "urn:field", "fullName": "Industry"}})
        );
    }

    #[test]
    fn test_failed_split_marks_nothing() {
        let registry = registry();
        let context = ConvertContext::default();
        let transformer = DecomposedTransformer::new(&registry, &context);
        let broken = Arc::new(Component::virtual_component(
            "CustomObject",
            "Account",
            r#"{"CustomObject": {"fields": [{"fullName": "Industry"}, {"type": "Text"}]}}"#,
        ));
        let valid = Arc::new(Component::virtual_component(
            "CustomObject",
            "Account",
            r#"{"CustomObject": {"fields": [{"fullName": "Industry"}]}}"#,
        ));

        assert!(transformer.to_source_format(&broken, None).is_err());
        assert_eq!(context.decomposition.emitted_count(broken.identity()), 0);

        let writes = transformer.to_source_format(&valid, None).unwrap();
        let outputs: Vec<PathBuf> = writes.iter().map(|w| w.output.clone()).collect();
        assert_eq!(
            outputs,
            vec![
                PathBuf::from("objects/Account/fields/Industry.field-meta.json"),
                PathBuf::from("objects/Account/Account.object-meta.json"),
            ]
        );
    }

    #[test]
    fn test_round_trip_preserves_child_elements() {
        let registry = registry();
        let original: Value = serde_json::from_str(ACCOUNT).unwrap();

        let split_context = ConvertContext::default();
        let splitter = DecomposedTransformer::new(&registry, &split_context);
        let combined = Arc::new(Component::virtual_component("CustomObject", "Account", ACCOUNT));
        let writes = splitter.to_source_format(&combined, None).unwrap();

        // rebuild the source tree from the split output
        let mut parent_content = None;
        let mut children = Vec::new();
        for write in &writes {
            if write.origin.type_name == "CustomObject" {
                parent_content = Some(write.content.clone());
            } else {
                children.push(Component::virtual_component(
                    write.origin.type_name.clone(),
                    write.origin.full_name.clone(),
                    write.content.clone(),
                ));
            }
        }
        let parent = Component::virtual_component("CustomObject", "Account", parent_content.unwrap())
            .with_children(children);

        let join_context = ConvertContext::default();
        let joiner = DecomposedTransformer::new(&registry, &join_context);
        assert!(joiner.to_metadata_format(&parent).unwrap().is_empty());
        let rebuilt = join_context.finalize().unwrap();
        assert_eq!(rebuilt.len(), 1);
        let rebuilt: Value = serde_json::from_str(&rebuilt[0].content).unwrap();

        let elements = |doc: &Value, name: &str| -> BTreeSet<String> {
            let body = &doc["CustomObject"][name];
            let items = match body {
                Value::Array(items) => items.clone(),
                other => vec![other.clone()],
            };
            items.iter().map(|item| item.to_string()).collect()
        };
        for name in ["fields", "listViews"] {
            assert_eq!(elements(&original, name), elements(&rebuilt, name));
        }
        assert_eq!(rebuilt["CustomObject"]["label"], json!("Account"));
        assert_eq!(rebuilt["CustomObject"]["@xmlns"], json!("urn:metadata"));
    }
}
