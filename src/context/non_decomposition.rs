//! Non-decomposition: inline children gathered into one shared file per type

use super::PhaseGate;
use crate::component::Component;
use crate::document;
use crate::error::ConvertError;
use crate::paths;
use crate::registry::TypeInfo;
use crate::types::{ConvertConfig, Format, Identity, WriteInfo};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{trace, warn};

/// Everything gathered for one non-decomposed type
#[derive(Debug, Clone)]
pub struct NonDecompositionEntry {
    /// Unique child key -> raw child fragment
    pub children_by_unique_element: BTreeMap<String, Value>,

    /// Most recently processed parent; supplies the wrapping element and attributes
    pub example_component: Option<Arc<Component>>,

    pub type_info: Arc<TypeInfo>,
}

#[derive(Debug)]
pub struct NonDecompositionState {
    entries: Mutex<BTreeMap<String, NonDecompositionEntry>>,
    gate: Arc<PhaseGate>,
}

impl NonDecompositionState {
    pub(crate) fn new(gate: Arc<PhaseGate>) -> Self {
        NonDecompositionState {
            entries: Mutex::new(BTreeMap::new()),
            gate,
        }
    }

    /// Union `fragments` into the type's map and replace its example component
    ///
    /// The last fragment for a key wins.
    pub fn merge(
        &self,
        type_info: &Arc<TypeInfo>,
        fragments: Vec<(String, Value)>,
        example_component: Option<&Arc<Component>>,
    ) -> Result<(), ConvertError> {
        self.gate.accumulate("non-decomposition merge", || {
            let mut entries = self.entries.lock();
            let entry = entries
                .entry(type_info.name.clone())
                .or_insert_with(|| NonDecompositionEntry {
                    children_by_unique_element: BTreeMap::new(),
                    example_component: None,
                    type_info: type_info.clone(),
                });

            for (key, fragment) in fragments {
                if let Some(existing) = entry.children_by_unique_element.get(&key) {
                    if *existing != fragment {
                        warn!(
                            type_name = %type_info.name,
                            key = %key,
                            "divergent content for the same child key, keeping the latest"
                        );
                    }
                }
                entry.children_by_unique_element.insert(key, fragment);
            }

            if let Some(example) = example_component {
                entry.example_component = Some(example.clone());
            }

            trace!(
                type_name = %type_info.name,
                children = entry.children_by_unique_element.len(),
                "non-decomposition merge"
            );
        })
    }

    /// Snapshot of one type's accumulated state
    pub fn get(&self, type_name: &str) -> Option<NonDecompositionEntry> {
        self.entries.lock().get(type_name).cloned()
    }

    pub fn children_by_unique_element(&self, type_name: &str) -> BTreeMap<String, Value> {
        self.entries
            .lock()
            .get(type_name)
            .map(|entry| entry.children_by_unique_element.clone())
            .unwrap_or_default()
    }

    pub fn example_component(&self, type_name: &str) -> Option<Arc<Component>> {
        self.entries
            .lock()
            .get(type_name)
            .and_then(|entry| entry.example_component.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub(crate) fn drain(&self) -> Vec<NonDecompositionEntry> {
        std::mem::take(&mut *self.entries.lock())
            .into_values()
            .collect()
    }
}

/// Build the shared file for one non-decomposed type
///
/// Only the example component's root name and attributes are used; the body
/// is the accumulated children in key order.
pub(crate) fn assemble(
    entry: &NonDecompositionEntry,
    config: &ConvertConfig,
) -> Result<WriteInfo, ConvertError> {
    let type_info = &entry.type_info;
    let child_type = type_info.children.first().ok_or_else(|| {
        ConvertError::Configuration(format!("type `{}` declares no child type", type_info.name))
    })?;

    let (root_name, mut body, origin) = match &entry.example_component {
        Some(example) => {
            let (root_name, body) =
                document::root(example.parse()?).ok_or_else(|| ConvertError::Parse {
                    component: example.identity().clone(),
                    message: String::from("expected a single root element holding an object"),
                })?;
            (
                root_name.to_string(),
                document::attributes(body),
                example.identity().clone(),
            )
        }
        None => (
            type_info.name.clone(),
            Map::new(),
            Identity::new(&type_info.name, &type_info.name),
        ),
    };

    document::set_child_elements(
        &mut body,
        &child_type.element_name,
        entry.children_by_unique_element.values().cloned().collect(),
    );

    let doc = document::wrap(&root_name, body);
    let output = paths::combined_path(type_info, &origin.full_name, Format::Source, config);

    Ok(WriteInfo::new(
        output,
        document::serialize(&doc, config.pretty)?,
        origin,
    ))
}
