//! Per-strategy conversion of one component
//!
//! Each registry [`Strategy`] has a transformer. The set is closed, so the
//! driver picks one through [`Transformer::for_component`] and dispatches by
//! match; the [`MetadataTransformer`] trait is the seam every variant shares.

pub mod composed;
pub mod decomposed;
pub mod non_decomposed;
mod split;
pub mod standalone;

pub use composed::ComposedTransformer;
pub use decomposed::DecomposedTransformer;
pub use non_decomposed::NonDecomposedTransformer;
pub use standalone::StandaloneTransformer;

use crate::component::Component;
use crate::context::ConvertContext;
use crate::error::ConvertError;
use crate::registry::{RegistryAccess, Strategy};
use crate::types::{Format, WriteInfo};
use std::sync::Arc;

/// Convert one component in either direction
///
/// An empty result means the work was deferred to
/// [`ConvertContext::finalize`].
pub trait MetadataTransformer {
    fn to_metadata_format(&self, component: &Arc<Component>) -> Result<Vec<WriteInfo>, ConvertError>;

    /// `full_parent` is an alternate, fuller document of the same parent to
    /// scan for children in addition to the component's own.
    fn to_source_format(
        &self,
        component: &Arc<Component>,
        full_parent: Option<&Arc<Component>>,
    ) -> Result<Vec<WriteInfo>, ConvertError>;

    fn convert(
        &self,
        component: &Arc<Component>,
        target: Format,
        full_parent: Option<&Arc<Component>>,
    ) -> Result<Vec<WriteInfo>, ConvertError> {
        match target {
            Format::Metadata => self.to_metadata_format(component),
            Format::Source => self.to_source_format(component, full_parent),
        }
    }
}

pub enum Transformer<'a> {
    Standalone(StandaloneTransformer<'a>),
    Decomposed(DecomposedTransformer<'a>),
    NonDecomposed(NonDecomposedTransformer<'a>),
    Composed(ComposedTransformer<'a>),
}

impl<'a> Transformer<'a> {
    /// The transformer for the strategy of the component's type
    ///
    /// A child resolves through its parent's type.
    pub fn for_component(
        registry: &'a RegistryAccess,
        context: &'a ConvertContext,
        component: &Component,
    ) -> Result<Self, ConvertError> {
        let type_info = registry.type_for_component(component)?;
        Ok(match type_info.strategy {
            Strategy::Standalone => Transformer::Standalone(StandaloneTransformer::new(registry, context)),
            Strategy::Decomposed => Transformer::Decomposed(DecomposedTransformer::new(registry, context)),
            Strategy::NonDecomposed => {
                Transformer::NonDecomposed(NonDecomposedTransformer::new(registry, context))
            }
            Strategy::Composed => Transformer::Composed(ComposedTransformer::new(registry, context)),
        })
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            Transformer::Standalone(_) => Strategy::Standalone,
            Transformer::Decomposed(_) => Strategy::Decomposed,
            Transformer::NonDecomposed(_) => Strategy::NonDecomposed,
            Transformer::Composed(_) => Strategy::Composed,
        }
    }
}

impl MetadataTransformer for Transformer<'_> {
    fn to_metadata_format(&self, component: &Arc<Component>) -> Result<Vec<WriteInfo>, ConvertError> {
        match self {
            Transformer::Standalone(t) => t.to_metadata_format(component),
            Transformer::Decomposed(t) => t.to_metadata_format(component),
            Transformer::NonDecomposed(t) => t.to_metadata_format(component),
            Transformer::Composed(t) => t.to_metadata_format(component),
        }
    }

    fn to_source_format(
        &self,
        component: &Arc<Component>,
        full_parent: Option<&Arc<Component>>,
    ) -> Result<Vec<WriteInfo>, ConvertError> {
        match self {
            Transformer::Standalone(t) => t.to_source_format(component, full_parent),
            Transformer::Decomposed(t) => t.to_source_format(component, full_parent),
            Transformer::NonDecomposed(t) => t.to_source_format(component, full_parent),
            Transformer::Composed(t) => t.to_source_format(component, full_parent),
        }
    }
}
