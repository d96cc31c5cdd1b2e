//! Conversion context: per-run accumulated state
//!
//! Transformers run in two phases. While the driver walks the component tree
//! they only merge partial contributions into the context (accumulate). Once
//! every visit has returned, the driver calls [`ConvertContext::finalize`]
//! exactly once, which drains the accumulated state and assembles the
//! deferred documents.
//!
//! ## Concurrency
//!
//! Unrelated components may be visited in parallel. Per-parent state lives in
//! `DashMap`s, so each upsert holds only its shard lock; the non-decomposition
//! records share one mutex. A phase gate (`RwLock`) is held for reading by
//! every mutation and for writing by finalize, so no contribution can land
//! after the state has been drained. No lock is ever held across parsing.

pub mod decomposition;
pub mod non_decomposition;
pub mod recomposition;

pub use decomposition::DecompositionState;
pub use non_decomposition::{NonDecompositionEntry, NonDecompositionState};
pub use recomposition::{RecomposeTarget, RecompositionEntry, RecompositionState};

use crate::error::ConvertError;
use crate::types::{ConvertConfig, WriteInfo};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Accumulating,
    Finalized,
}

/// Guards the accumulate -> finalize transition
#[derive(Debug)]
pub(crate) struct PhaseGate {
    phase: RwLock<Phase>,
}

impl PhaseGate {
    fn new() -> Self {
        PhaseGate {
            phase: RwLock::new(Phase::Accumulating),
        }
    }

    /// Run a mutation, provided the context has not been finalized
    pub(crate) fn accumulate<T>(
        &self,
        operation: &str,
        mutation: impl FnOnce() -> T,
    ) -> Result<T, ConvertError> {
        let phase = self.phase.read();
        if *phase == Phase::Finalized {
            return Err(ConvertError::Programming(format!(
                "{operation} on a finalized conversion context"
            )));
        }
        Ok(mutation())
    }

    fn close(&self) -> Result<(), ConvertError> {
        let mut phase = self.phase.write();
        if *phase == Phase::Finalized {
            return Err(ConvertError::Programming(String::from(
                "conversion context finalized more than once",
            )));
        }
        *phase = Phase::Finalized;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        *self.phase.read() == Phase::Finalized
    }
}

/// State shared by every transformer call of one conversion run
#[derive(Debug)]
pub struct ConvertContext {
    pub recomposition: RecompositionState,
    pub decomposition: DecompositionState,
    pub non_decomposition: NonDecompositionState,
    gate: Arc<PhaseGate>,
    config: ConvertConfig,
}

impl ConvertContext {
    pub fn new(config: ConvertConfig) -> Self {
        let gate = Arc::new(PhaseGate::new());
        ConvertContext {
            recomposition: RecompositionState::new(gate.clone()),
            decomposition: DecompositionState::new(gate.clone()),
            non_decomposition: NonDecompositionState::new(gate.clone()),
            gate,
            config,
        }
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    pub fn is_finalized(&self) -> bool {
        self.gate.is_closed()
    }

    /// Assemble every deferred document
    ///
    /// Recomposed parents come first, ordered by identity, then one document
    /// per non-decomposed type, ordered by type name. A second call fails with
    /// a programming error; the first call's output is unaffected.
    pub fn finalize(&self) -> Result<Vec<WriteInfo>, ConvertError> {
        self.gate.close()?;

        let recomposed = self.recomposition.drain();
        let non_decomposed = self.non_decomposition.drain();
        self.decomposition.clear();

        let mut writes = Vec::with_capacity(recomposed.len() + non_decomposed.len());
        for (parent, entry) in &recomposed {
            writes.push(recomposition::assemble(parent, entry, &self.config)?);
        }
        for entry in &non_decomposed {
            writes.push(non_decomposition::assemble(entry, &self.config)?);
        }

        info!(
            recomposed = recomposed.len(),
            non_decomposed = non_decomposed.len(),
            writes = writes.len(),
            "finalized conversion context"
        );

        Ok(writes)
    }
}

impl Default for ConvertContext {
    fn default() -> Self {
        ConvertContext::new(ConvertConfig::default())
    }
}
