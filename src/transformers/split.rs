//! Machinery shared by the splitting strategies
//!
//! `accumulate` is the deferred direction: a child (or a parent with its
//! children) is recorded in the recomposition state and nothing is written
//! until finalize. `split` is the immediate direction: a combined document is
//! broken into one write per child plus one for the parent's remaining
//! content, each guarded so a child reached twice is written once.

use crate::component::{Component, ComponentSet};
use crate::context::{ConvertContext, RecomposeTarget};
use crate::document;
use crate::error::ConvertError;
use crate::paths;
use crate::registry::{RegistryAccess, TypeInfo};
use crate::types::{Format, Identity, WriteInfo};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Record `component` for recomposition in `format`; always returns no writes
pub(crate) fn accumulate(
    registry: &RegistryAccess,
    context: &ConvertContext,
    component: &Arc<Component>,
    format: Format,
) -> Result<Vec<WriteInfo>, ConvertError> {
    let type_info = registry.type_for_component(component)?;
    let target = RecomposeTarget { type_info, format };

    match component.parent_identity() {
        Some(parent) => {
            let live_parent = component.parent();
            let single: ComponentSet = std::iter::once(component.clone()).collect();
            context
                .recomposition
                .upsert(parent, &target, live_parent.as_ref(), Some(&single))?;
            debug!(child = %component.identity(), parent = %parent, "deferred child for recomposition");
        }
        None => {
            for child in component.child_components() {
                registry.lookup_child_type(component.type_name(), child.type_name())?;
            }
            context.recomposition.upsert(
                component.identity(),
                &target,
                Some(component),
                Some(&component.children()),
            )?;
            debug!(
                parent = %component.identity(),
                children = component.child_components().len(),
                "deferred parent for recomposition"
            );
        }
    }

    Ok(Vec::new())
}

/// Split `component` into per-child writes in `format`
///
/// When `full_parent` is given its document is scanned as well; children
/// found in both are written once. Every element is validated before any
/// child is marked as emitted, so a failed visit leaves nothing marked.
pub(crate) fn split(
    registry: &RegistryAccess,
    context: &ConvertContext,
    component: &Arc<Component>,
    full_parent: Option<&Arc<Component>>,
    format: Format,
) -> Result<Vec<WriteInfo>, ConvertError> {
    let type_info = registry.type_for_component(component)?;

    if let Some(parent) = component.parent_identity() {
        return split_child(registry, context, &type_info, parent, component, format);
    }

    let parent = component.identity();
    let config = context.config();

    let own = component.parse()?;
    let mut documents = vec![own];
    if let Some(full) = full_parent {
        documents.push(full.parse()?);
    }

    let mut pending = Vec::new();
    for doc in &documents {
        let (_, body) = root_of(doc, parent)?;
        let template = document::template_attributes(body);

        for child_type in &type_info.children {
            for (index, element) in document::child_elements(body, &child_type.element_name)
                .into_iter()
                .enumerate()
            {
                let key = document::unique_key(
                    element,
                    &child_type.unique_id_field,
                    parent,
                    &child_type.element_name,
                    index,
                )?;
                let child = Identity::new(
                    &child_type.name,
                    type_info.child_full_name(&parent.full_name, &key),
                );
                if context.decomposition.is_emitted(parent, &child) {
                    continue;
                }

                // the element's own attributes win over the parent's namespaces
                let mut child_body = element.as_object().cloned().unwrap_or_default();
                for (name, value) in &template {
                    child_body.entry(name.clone()).or_insert_with(|| value.clone());
                }
                let content = document::serialize(
                    &document::wrap(&child_type.name, child_body),
                    config.pretty,
                )?;
                let output = paths::split_child_path(
                    &type_info,
                    &parent.full_name,
                    child_type,
                    &key,
                    format,
                    config,
                );
                pending.push(WriteInfo::new(output, content, child));
            }
        }
    }

    let (root_name, body) = root_of(own, parent)?;
    let remainder = without_children(&type_info, body);
    let remainder = WriteInfo::new(
        paths::split_parent_path(&type_info, &parent.full_name, format, config),
        document::serialize(&document::wrap(root_name, remainder), config.pretty)?,
        parent.clone(),
    );

    let mut writes = Vec::with_capacity(pending.len() + 1);
    for write in pending {
        if context.decomposition.mark_emitted(parent, &write.origin)? {
            writes.push(write);
        }
    }
    if context.decomposition.mark_emitted(parent, parent)? {
        writes.push(remainder);
    }

    debug!(
        parent = %parent,
        writes = writes.len(),
        target = %format,
        "split component"
    );

    Ok(writes)
}

/// A child resolved on its own is written as-is
fn split_child(
    registry: &RegistryAccess,
    context: &ConvertContext,
    type_info: &TypeInfo,
    parent: &Identity,
    component: &Component,
    format: Format,
) -> Result<Vec<WriteInfo>, ConvertError> {
    let child_type = registry.lookup_child_type(&type_info.name, component.type_name())?;
    if !context.decomposition.mark_emitted(parent, component.identity())? {
        return Ok(Vec::new());
    }

    let doc = component.parse()?;
    let key = type_info.child_key(&parent.full_name, component.full_name());
    let config = context.config();
    let output = paths::split_child_path(
        type_info,
        &parent.full_name,
        child_type.info,
        key,
        format,
        config,
    );

    Ok(vec![WriteInfo::new(
        output,
        document::serialize(doc, config.pretty)?,
        component.identity().clone(),
    )])
}

fn root_of<'a>(
    doc: &'a Value,
    component: &Identity,
) -> Result<(&'a str, &'a Map<String, Value>), ConvertError> {
    document::root(doc).ok_or_else(|| ConvertError::Parse {
        component: component.clone(),
        message: String::from("expected a single root element holding an object"),
    })
}

fn without_children(type_info: &TypeInfo, body: &Map<String, Value>) -> Map<String, Value> {
    body.iter()
        .filter(|(key, _)| !type_info.children.iter().any(|c| &c.element_name == *key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
