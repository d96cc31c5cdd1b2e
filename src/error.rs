//! Conversion errors
//!
//! Four kinds matter to callers:
//!
//! - **Configuration**: the registry cannot describe a type or child, so the
//!   whole run must stop.
//! - **Parse**: a component's backing content is malformed.
//! - **DataIntegrity**: a child element lacks the field that identifies it.
//! - **Programming**: the driver broke the accumulate/finalize protocol.

use crate::types::Identity;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    /// Unknown type or child type, or an invalid registry entry
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Backing content could not be parsed
    #[error("failed to parse {component}: {message}")]
    Parse { component: Identity, message: String },

    /// A declared child element is missing its unique-identifying field
    #[error("child element `{element}` of {parent} is missing its `{field}` field")]
    DataIntegrity {
        parent: Identity,
        element: String,
        field: String,
    },

    /// The accumulate/finalize protocol was violated
    #[error("programming error: {0}")]
    Programming(String),

    /// Backing content could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An assembled document could not be serialized
    #[error("failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ConvertError {
    pub fn unknown_type(name: &str) -> Self {
        ConvertError::Configuration(format!("unknown metadata type `{name}`"))
    }

    pub fn unknown_child_type(parent: &str, child: &str) -> Self {
        ConvertError::Configuration(format!("type `{parent}` declares no child type `{child}`"))
    }

    /// True for errors that indicate a driver bug rather than bad input
    pub fn is_programming(&self) -> bool {
        matches!(self, ConvertError::Programming(_))
    }
}
