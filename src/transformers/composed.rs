use super::{split, MetadataTransformer};
use crate::component::Component;
use crate::context::ConvertContext;
use crate::error::ConvertError;
use crate::registry::RegistryAccess;
use crate::types::{Format, WriteInfo};
use std::sync::Arc;

/// Split/recombine where the registry says which direction recombines
///
/// Converting toward the type's `accumulate_on` format defers to finalize;
/// converting the other way splits immediately.
pub struct ComposedTransformer<'a> {
    registry: &'a RegistryAccess,
    context: &'a ConvertContext,
}

impl<'a> ComposedTransformer<'a> {
    pub fn new(registry: &'a RegistryAccess, context: &'a ConvertContext) -> Self {
        ComposedTransformer { registry, context }
    }

    fn convert(
        &self,
        component: &Arc<Component>,
        full_parent: Option<&Arc<Component>>,
        format: Format,
    ) -> Result<Vec<WriteInfo>, ConvertError> {
        let type_info = self.registry.type_for_component(component)?;
        if type_info.accumulating_format() == Some(format) {
            split::accumulate(self.registry, self.context, component, format)
        } else {
            split::split(self.registry, self.context, component, full_parent, format)
        }
    }
}

impl MetadataTransformer for ComposedTransformer<'_> {
    fn to_metadata_format(&self, component: &Arc<Component>) -> Result<Vec<WriteInfo>, ConvertError> {
        self.convert(component, None, Format::Metadata)
    }

    fn to_source_format(
        &self,
        component: &Arc<Component>,
        full_parent: Option<&Arc<Component>>,
    ) -> Result<Vec<WriteInfo>, ConvertError> {
        self.convert(component, full_parent, Format::Source)
    }
}
