use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Identifies a component within a conversion run: `(type name, full name)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// The metadata type name, e.g. "CustomObject", "CustomField"
    pub type_name: String,

    /// The component's full name, e.g. "Account", "Account.Industry"
    pub full_name: String,
}

impl Identity {
    pub fn new(type_name: impl Into<String>, full_name: impl Into<String>) -> Self {
        Identity {
            type_name: type_name.into(),
            full_name: full_name.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_name, self.full_name)
    }
}

/// The two physical layouts a component can be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Split, one file per decomposed unit
    Source,
    /// One combined document per component
    Metadata,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Source => write!(f, "source"),
            Format::Metadata => write!(f, "metadata"),
        }
    }
}

/// A deferred write produced by a conversion, consumed by a writer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteInfo {
    /// Destination path fragment, relative to the writer's root
    pub output: PathBuf,

    /// Serialized document
    pub content: String,

    /// The component this write was produced for
    pub origin: Identity,
}

impl WriteInfo {
    pub fn new(output: impl Into<PathBuf>, content: String, origin: Identity) -> Self {
        WriteInfo {
            output: output.into(),
            content,
            origin,
        }
    }
}

/// Configuration for a conversion run
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Marker appended to file names written in source format
    pub source_marker: String,

    /// Pretty-print emitted documents
    pub pretty: bool,

    /// Visit components on the rayon pool instead of one at a time
    pub parallel: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        ConvertConfig {
            source_marker: String::from("-meta.json"),
            pretty: true,
            parallel: true,
        }
    }
}
