use super::{split, MetadataTransformer};
use crate::component::Component;
use crate::context::ConvertContext;
use crate::document;
use crate::error::ConvertError;
use crate::registry::RegistryAccess;
use crate::types::{Format, WriteInfo};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Children stay inline in one shared file but are addressable by key
///
/// Both directions defer. Toward source format every child found, whether
/// resolved as its own component or only present in a scanned document, is
/// merged into the non-decomposition map and the shared file is written at
/// finalize.
pub struct NonDecomposedTransformer<'a> {
    registry: &'a RegistryAccess,
    context: &'a ConvertContext,
}

impl<'a> NonDecomposedTransformer<'a> {
    pub fn new(registry: &'a RegistryAccess, context: &'a ConvertContext) -> Self {
        NonDecomposedTransformer { registry, context }
    }
}

impl MetadataTransformer for NonDecomposedTransformer<'_> {
    fn to_metadata_format(&self, component: &Arc<Component>) -> Result<Vec<WriteInfo>, ConvertError> {
        split::accumulate(self.registry, self.context, component, Format::Metadata)
    }

    fn to_source_format(
        &self,
        component: &Arc<Component>,
        full_parent: Option<&Arc<Component>>,
    ) -> Result<Vec<WriteInfo>, ConvertError> {
        let type_info = self.registry.type_for_component(component)?;
        let child_type = type_info.children.first().ok_or_else(|| {
            ConvertError::Configuration(format!("type `{}` declares no child type", type_info.name))
        })?;
        let field = &child_type.unique_id_field;
        let element_name = &child_type.element_name;

        let is_child = component.parent_identity().is_some();
        let parent = component
            .parent_identity()
            .unwrap_or_else(|| component.identity())
            .clone();

        let mut documents = Vec::new();
        if !is_child {
            documents.push(component.parse()?);
        }
        if let Some(full) = full_parent {
            documents.push(full.parse()?);
        }

        let mut fragments = Vec::new();

        // unclaimed: found only by scanning documents
        for doc in documents {
            let (_, body) = document::root(doc).ok_or_else(|| ConvertError::Parse {
                component: parent.clone(),
                message: String::from("expected a single root element holding an object"),
            })?;
            for (index, element) in document::child_elements(body, element_name)
                .into_iter()
                .enumerate()
            {
                let key = document::unique_key(element, field, &parent, element_name, index)?;
                fragments.push((key, element.clone()));
            }
        }

        // claimed: resolved as components of their own
        let claimed: Vec<Arc<Component>> = if is_child {
            vec![component.clone()]
        } else {
            component.child_components().to_vec()
        };
        for child in &claimed {
            // a claimed child without the field is keyed by its own name
            let fallback = type_info.child_key(&parent.full_name, child.full_name());
            let fragment = Value::Object(
                document::keyed_fragment(child.parse()?, field, fallback).ok_or_else(|| {
                    ConvertError::Parse {
                        component: child.identity().clone(),
                        message: String::from("expected a single root element holding an object"),
                    }
                })?,
            );
            let key = document::element_key(&fragment, field).ok_or_else(|| {
                ConvertError::DataIntegrity {
                    parent: parent.clone(),
                    element: child.identity().to_string(),
                    field: field.clone(),
                }
            })?;
            fragments.push((key, fragment));
        }

        debug!(
            component = %component.identity(),
            fragments = fragments.len(),
            claimed = claimed.len(),
            "deferred non-decomposed children"
        );

        let example = if is_child {
            component.parent()
        } else {
            Some(component.clone())
        };
        self.context
            .non_decomposition
            .merge(&type_info, fragments, example.as_ref())?;

        Ok(Vec::new())
    }
}
