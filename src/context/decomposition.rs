//! Decomposition bookkeeping: which children a parent has already emitted

use super::PhaseGate;
use crate::error::ConvertError;
use crate::types::Identity;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug)]
pub struct DecompositionState {
    emitted: DashMap<Identity, HashSet<Identity>>,
    gate: Arc<PhaseGate>,
}

impl DecompositionState {
    pub(crate) fn new(gate: Arc<PhaseGate>) -> Self {
        DecompositionState {
            emitted: DashMap::new(),
            gate,
        }
    }

    /// Mark `child` as written under `parent`
    ///
    /// Returns true the first time, false if it was already marked. Check and
    /// mark happen under one lock, so concurrent callers agree on who writes.
    pub fn mark_emitted(&self, parent: &Identity, child: &Identity) -> Result<bool, ConvertError> {
        self.gate.accumulate("decomposition mark", || {
            self.emitted
                .entry(parent.clone())
                .or_default()
                .insert(child.clone())
        })
    }

    pub fn is_emitted(&self, parent: &Identity, child: &Identity) -> bool {
        self.emitted
            .get(parent)
            .is_some_and(|children| children.contains(child))
    }

    pub fn emitted_count(&self, parent: &Identity) -> usize {
        self.emitted.get(parent).map_or(0, |children| children.len())
    }

    pub fn is_empty(&self) -> bool {
        self.emitted.is_empty()
    }

    pub(crate) fn clear(&self) {
        self.emitted.clear();
    }
}
