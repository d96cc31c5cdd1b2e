use super::MetadataTransformer;
use crate::component::Component;
use crate::context::ConvertContext;
use crate::document;
use crate::error::ConvertError;
use crate::paths;
use crate::registry::RegistryAccess;
use crate::types::{Format, WriteInfo};
use std::sync::Arc;

/// Types without children: one file in, one file out, nothing deferred
pub struct StandaloneTransformer<'a> {
    registry: &'a RegistryAccess,
    context: &'a ConvertContext,
}

impl<'a> StandaloneTransformer<'a> {
    pub fn new(registry: &'a RegistryAccess, context: &'a ConvertContext) -> Self {
        StandaloneTransformer { registry, context }
    }

    fn rewrite(&self, component: &Component, format: Format) -> Result<Vec<WriteInfo>, ConvertError> {
        let type_info = self.registry.type_for_component(component)?;
        let config = self.context.config();
        let content = document::serialize(component.parse()?, config.pretty)?;
        let output = paths::combined_path(&type_info, component.full_name(), format, config);

        Ok(vec![WriteInfo::new(output, content, component.identity().clone())])
    }
}

impl MetadataTransformer for StandaloneTransformer<'_> {
    fn to_metadata_format(&self, component: &Arc<Component>) -> Result<Vec<WriteInfo>, ConvertError> {
        self.rewrite(component, Format::Metadata)
    }

    fn to_source_format(
        &self,
        component: &Arc<Component>,
        _full_parent: Option<&Arc<Component>>,
    ) -> Result<Vec<WriteInfo>, ConvertError> {
        self.rewrite(component, Format::Source)
    }
}
