//! # Metaconv - Metadata Format Conversion
//!
//! Converts metadata components between two physical layouts:
//!
//! - **metadata format**: one combined document per component
//! - **source format**: composite components split into one file per child
//!
//! How a type's children are laid out is declared per type in a
//! [`Registry`]. Conversion is two-phase: components are visited (in
//! parallel where possible) and either written immediately or merged into a
//! shared [`ConvertContext`]; finalize then assembles everything that had to
//! wait for all contributions.
//!
//! ## Modules
//!
//! - **registry**: type descriptors and strategy lookup
//! - **component**: the component tree and lazily parsed content
//! - **context**: accumulated state and finalize
//! - **transformers**: one transformer per strategy
//! - **driver**: visits components and finishes the run
//! - **writer**: sinks for the resulting writes
//!
//! ## Quick Start
//!
//! ```rust
//! use metaconv::{convert_components, Component, ConvertConfig, Format, Registry, RegistryAccess, StreamWriter};
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let registry = RegistryAccess::new(Registry::from_json_str(r#"{"types": [{
//!     "name": "CustomObject", "directory_name": "objects", "suffix": "object",
//!     "strategy": "decomposed",
//!     "children": [{"name": "CustomField", "element_name": "fields",
//!                   "directory_name": "fields", "suffix": "field"}]
//! }]}"#)?)?;
//!
//! let account = Arc::new(Component::virtual_component(
//!     "CustomObject",
//!     "Account",
//!     r#"{"CustomObject": {"label": "Account", "fields": [{"fullName": "Industry"}]}}"#,
//! ));
//!
//! let mut sink = StreamWriter::new(Vec::new());
//! let written = convert_components(&registry, &[account], Format::Source, ConvertConfig::default(), &mut sink)?;
//!
//! // objects/Account/fields/Industry.field-meta.json
//! // objects/Account/Account.object-meta.json
//! assert_eq!(written, 2);
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

pub mod component;
pub mod context;
pub mod document;
pub mod driver;
pub mod error;
pub mod paths;
pub mod registry;
pub mod transformers;
pub mod types;
pub mod writer;

// Re-export commonly used types for convenience
pub use component::{Component, ComponentSet, Content};
pub use context::ConvertContext;
pub use driver::ComponentConverter;
pub use error::ConvertError;
pub use registry::{ChildTypeInfo, Registry, RegistryAccess, Strategy, TypeInfo};
pub use transformers::{MetadataTransformer, Transformer};
pub use types::{ConvertConfig, Format, Identity, WriteInfo};
pub use writer::{DirectoryWriter, StreamWriter, WriteSink};

/// Main entry point: convert `components` to `target` and hand every write
/// to `sink`
///
/// Immediate writes come first in input order, followed by the deferred
/// writes assembled at finalize. Returns the number of writes.
pub fn convert_components<W: WriteSink>(
    registry: &RegistryAccess,
    components: &[Arc<Component>],
    target: Format,
    config: ConvertConfig,
    sink: &mut W,
) -> Result<usize> {
    let converter = ComponentConverter::new(registry, config);

    let mut writes = converter
        .convert_all(components, target)
        .context("Failed to convert components")?;
    writes.extend(converter.finish().context("Failed to finalize conversion")?);

    let count = writes.len();
    sink.write_all(writes)?;
    sink.flush()?;

    info!(components = components.len(), writes = count, target = %target, "converted components");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::registry;
    use serde_json::{json, Value};

    #[test]
    fn test_convert_components_to_directory() {
        let registry = registry();
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectoryWriter::new(dir.path()).unwrap();

        let labels = Arc::new(Component::virtual_component(
            "CustomLabels",
            "CustomLabels",
            json!({"CustomLabels": {"labels": [{"fullName": "B"}, {"fullName": "A"}]}}).to_string(),
        ));
        let class = Arc::new(Component::virtual_component(
            "ApexClass",
            "Hello",
            r#"{"ApexClass": {"apiVersion": "60.0"}}"#,
        ));

        let written = convert_components(
            &registry,
            &[labels, class],
            Format::Source,
            ConvertConfig::default(),
            &mut sink,
        )
        .unwrap();
        assert_eq!(written, 2);

        let shared = std::fs::read_to_string(dir.path().join("labels/CustomLabels.labels-meta.json")).unwrap();
        let doc: Value = serde_json::from_str(&shared).unwrap();
        assert_eq!(
            doc,
            json!({"CustomLabels": {"labels": [{"fullName": "A"}, {"fullName": "B"}]}})
        );
        assert!(dir.path().join("classes/Hello.cls-meta.json").exists());
    }

    #[test]
    fn test_convert_components_reports_error_context() {
        let registry = registry();
        let mut sink = StreamWriter::new(Vec::new());
        let broken = Arc::new(Component::virtual_component("ApexClass", "Broken", "{not json"));

        let err = convert_components(&registry, &[broken], Format::Source, ConvertConfig::default(), &mut sink)
            .unwrap_err();
        assert!(err.to_string().contains("Failed to convert components"));
        assert!(matches!(
            err.downcast_ref::<ConvertError>(),
            Some(ConvertError::Parse { .. })
        ));
        assert!(sink.into_inner().is_empty());
    }
}
