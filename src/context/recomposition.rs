//! Recomposition: split children waiting to be combined under their parent

use super::PhaseGate;
use crate::component::{Component, ComponentSet};
use crate::document;
use crate::error::ConvertError;
use crate::paths;
use crate::registry::TypeInfo;
use crate::types::{ConvertConfig, Format, Identity, WriteInfo};
use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

/// What a recomposed parent is assembled as
#[derive(Debug, Clone)]
pub struct RecomposeTarget {
    pub type_info: Arc<TypeInfo>,

    /// Format the combined document is written in
    pub format: Format,
}

/// Accumulated contributions for one parent
#[derive(Debug, Clone)]
pub struct RecompositionEntry {
    /// The parent itself, once it has been seen
    pub component: Option<Arc<Component>>,
    pub children: ComponentSet,
    pub target: RecomposeTarget,
}

#[derive(Debug)]
pub struct RecompositionState {
    entries: DashMap<Identity, RecompositionEntry>,
    gate: Arc<PhaseGate>,
}

impl RecompositionState {
    pub(crate) fn new(gate: Arc<PhaseGate>) -> Self {
        RecompositionState {
            entries: DashMap::new(),
            gate,
        }
    }

    /// Record a parent and/or children under `parent`
    ///
    /// The first component seen for a parent is kept; children are unioned.
    /// Contributions naming a different parent are rejected.
    pub fn upsert(
        &self,
        parent: &Identity,
        target: &RecomposeTarget,
        component: Option<&Arc<Component>>,
        children: Option<&ComponentSet>,
    ) -> Result<(), ConvertError> {
        if let Some(component) = component {
            if component.identity() != parent {
                return Err(ConvertError::Programming(format!(
                    "{} contributed as the parent of {}",
                    component.identity(),
                    parent
                )));
            }
        }
        if let Some(stray) = children
            .into_iter()
            .flat_map(ComponentSet::iter)
            .find(|child| child.parent_identity().is_some_and(|p| p != parent))
        {
            return Err(ConvertError::Programming(format!(
                "{} contributed under {}, which is not its parent",
                stray.identity(),
                parent
            )));
        }

        self.gate.accumulate("recomposition upsert", || {
            let mut entry = self
                .entries
                .entry(parent.clone())
                .or_insert_with(|| RecompositionEntry {
                    component: None,
                    children: ComponentSet::new(),
                    target: target.clone(),
                });

            if entry.component.is_none() {
                entry.component = component.cloned();
            }
            if let Some(children) = children {
                entry.children.union(children);
            }

            trace!(
                parent = %parent,
                children = entry.children.len(),
                "recomposition upsert"
            );
        })
    }

    /// Snapshot of one parent's accumulated state
    pub fn get(&self, parent: &Identity) -> Option<RecompositionEntry> {
        self.entries.get(parent).map(|entry| entry.value().clone())
    }

    pub fn children_of(&self, parent: &Identity) -> Option<ComponentSet> {
        self.entries.get(parent).map(|entry| entry.children.clone())
    }

    /// Every parent with accumulated state, in identity order
    pub fn parents(&self) -> Vec<Identity> {
        let mut parents: Vec<Identity> = self.entries.iter().map(|e| e.key().clone()).collect();
        parents.sort();
        parents
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn drain(&self) -> Vec<(Identity, RecompositionEntry)> {
        self.parents()
            .into_iter()
            .filter_map(|parent| self.entries.remove(&parent))
            .collect()
    }
}

/// Build the combined document for one parent
///
/// The parent's own document is the base. Children already inline in it are
/// kept unless an accumulated child has the same full name. Each child
/// collection is written in full-name order.
pub(crate) fn assemble(
    parent: &Identity,
    entry: &RecompositionEntry,
    config: &ConvertConfig,
) -> Result<WriteInfo, ConvertError> {
    let type_info = &entry.target.type_info;

    if let Some(unknown) = entry
        .children
        .iter()
        .find(|child| type_info.child(child.type_name()).is_none())
    {
        return Err(ConvertError::unknown_child_type(&type_info.name, unknown.type_name()));
    }

    let base = match &entry.component {
        Some(component) => component.parse()?.clone(),
        None => document::empty_root(&type_info.name),
    };
    let (root_name, mut body) = document::into_root(base).ok_or_else(|| ConvertError::Parse {
        component: parent.clone(),
        message: String::from("expected a single root element holding an object"),
    })?;

    for child_type in &type_info.children {
        let mut merged: BTreeMap<String, Value> = BTreeMap::new();

        for (index, element) in document::child_elements(&body, &child_type.element_name)
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
            merged.insert(type_info.child_full_name(&parent.full_name, &key), element.clone());
        }

        for child in entry
            .children
            .iter()
            .filter(|child| child.type_name() == child_type.name)
        {
            let key = type_info.child_key(&parent.full_name, child.full_name());
            let fragment = document::keyed_fragment(child.parse()?, &child_type.unique_id_field, key)
                .ok_or_else(|| ConvertError::Parse {
                    component: child.identity().clone(),
                    message: String::from("expected a single root element holding an object"),
                })?;
            merged.insert(child.full_name().to_string(), Value::Object(fragment));
        }

        document::set_child_elements(
            &mut body,
            &child_type.element_name,
            merged.into_values().collect(),
        );
    }

    let doc = document::wrap(&root_name, body);
    let output = paths::combined_path(type_info, &parent.full_name, entry.target.format, config);

    Ok(WriteInfo::new(
        output,
        document::serialize(&doc, config.pretty)?,
        parent.clone(),
    ))
}
