//! Drives one conversion run over a set of components
//!
//! A [`ComponentConverter`] owns the run's [`ConvertContext`]. Components are
//! visited (on the rayon pool when [`ConvertConfig::parallel`] is set), their
//! immediate writes collected, and [`ComponentConverter::finish`] finalizes the
//! context exactly once to produce the deferred writes.

use crate::component::Component;
use crate::context::ConvertContext;
use crate::error::ConvertError;
use crate::registry::RegistryAccess;
use crate::transformers::{MetadataTransformer, Transformer};
use crate::types::{ConvertConfig, Format, WriteInfo};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};

pub struct ComponentConverter<'r> {
    registry: &'r RegistryAccess,
    context: ConvertContext,
}

impl<'r> ComponentConverter<'r> {
    pub fn new(registry: &'r RegistryAccess, config: ConvertConfig) -> Self {
        ComponentConverter {
            registry,
            context: ConvertContext::new(config),
        }
    }

    pub fn context(&self) -> &ConvertContext {
        &self.context
    }

    /// Visit one component; returns the writes that were not deferred
    pub fn convert(
        &self,
        component: &Arc<Component>,
        target: Format,
        full_parent: Option<&Arc<Component>>,
    ) -> Result<Vec<WriteInfo>, ConvertError> {
        let transformer = Transformer::for_component(self.registry, &self.context, component)?;
        debug!(
            component = %component.identity(),
            strategy = ?transformer.strategy(),
            target = %target,
            "converting component"
        );
        transformer.convert(component, target, full_parent)
    }

    /// Visit every component in `components`
    ///
    /// Writes come back in input order whether or not the visits ran in
    /// parallel. The first error stops the run.
    pub fn convert_all(
        &self,
        components: &[Arc<Component>],
        target: Format,
    ) -> Result<Vec<WriteInfo>, ConvertError> {
        let per_component: Vec<Vec<WriteInfo>> = if self.context.config().parallel {
            components
                .par_iter()
                .map(|component| self.convert(component, target, None))
                .collect::<Result<_, _>>()?
        } else {
            components
                .iter()
                .map(|component| self.convert(component, target, None))
                .collect::<Result<_, _>>()?
        };

        Ok(per_component.into_iter().flatten().collect())
    }

    /// Finalize the run and return the deferred writes
    pub fn finish(self) -> Result<Vec<WriteInfo>, ConvertError> {
        let writes = self.context.finalize()?;
        info!(writes = writes.len(), "conversion finished");
        Ok(writes)
    }
}
