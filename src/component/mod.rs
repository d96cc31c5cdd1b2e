//! Component model
//!
//! A [`Component`] is one logical metadata unit: a typed, named node backed by
//! a file or an in-memory buffer. Its parsed document is cached on first
//! parse. Components are shared as `Arc<Component>`; a child keeps a weak
//! reference to its parent so trees never form ownership cycles.

pub mod set;

pub use set::ComponentSet;

use crate::document;
use crate::error::ConvertError;
use crate::types::Identity;
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::{Arc, Weak};

/// Where a component's content lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// A file on disk, read on first parse
    Path(PathBuf),
    /// Content already in memory
    Inline(String),
    /// No backing content; parses to an empty root element
    Empty,
}

#[derive(Debug)]
pub struct Component {
    identity: Identity,
    content: Content,
    parsed: OnceCell<Value>,
    parent: Option<Weak<Component>>,
    parent_identity: Option<Identity>,
    children: Vec<Arc<Component>>,
}

impl Component {
    pub fn new(type_name: impl Into<String>, full_name: impl Into<String>, content: Content) -> Self {
        Component {
            identity: Identity::new(type_name, full_name),
            content,
            parsed: OnceCell::new(),
            parent: None,
            parent_identity: None,
            children: Vec::new(),
        }
    }

    pub fn from_path(
        type_name: impl Into<String>,
        full_name: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self::new(type_name, full_name, Content::Path(path.into()))
    }

    /// A component whose content is held in memory
    pub fn virtual_component(
        type_name: impl Into<String>,
        full_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(type_name, full_name, Content::Inline(content.into()))
    }

    /// Attach children and share the component
    ///
    /// Each child gets a weak reference back to this component.
    pub fn with_children(mut self, children: Vec<Component>) -> Arc<Component> {
        let parent_identity = self.identity.clone();
        Arc::new_cyclic(|weak| {
            self.children = children
                .into_iter()
                .map(|mut child| {
                    child.parent = Some(weak.clone());
                    child.parent_identity = Some(parent_identity.clone());
                    Arc::new(child)
                })
                .collect();
            self
        })
    }

    /// Mark this component as a child of `parent` without a live parent reference
    ///
    /// Used for children resolved on their own, before or without their parent.
    pub fn with_parent_identity(mut self, parent: Identity) -> Self {
        self.parent_identity = Some(parent);
        self
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn type_name(&self) -> &str {
        &self.identity.type_name
    }

    pub fn full_name(&self) -> &str {
        &self.identity.full_name
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Parse the backing content, reusing the cached document when present
    ///
    /// A failed parse leaves the cache empty, so a later call retries.
    pub fn parse(&self) -> Result<&Value, ConvertError> {
        self.parsed.get_or_try_init(|| self.read_and_parse())
    }

    /// Same as [`Component::parse`]; parsing never suspends
    pub fn parse_sync(&self) -> Result<&Value, ConvertError> {
        self.parse()
    }

    pub fn is_parsed(&self) -> bool {
        self.parsed.get().is_some()
    }

    fn read_and_parse(&self) -> Result<Value, ConvertError> {
        let raw = match &self.content {
            Content::Path(path) => {
                std::fs::read_to_string(path).map_err(|source| ConvertError::Io {
                    path: path.clone(),
                    source,
                })?
            }
            Content::Inline(text) => text.clone(),
            Content::Empty => return Ok(document::empty_root(self.type_name())),
        };

        tracing::trace!(component = %self.identity, "parsing component content");

        document::parse_document(&raw).map_err(|message| ConvertError::Parse {
            component: self.identity.clone(),
            message,
        })
    }

    /// The child components supplied by the resolver
    pub fn children(&self) -> ComponentSet {
        self.children.iter().cloned().collect()
    }

    pub fn child_components(&self) -> &[Arc<Component>] {
        &self.children
    }

    /// The parent component, if it is still alive
    pub fn parent(&self) -> Option<Arc<Component>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn parent_identity(&self) -> Option<&Identity> {
        self.parent_identity.as_ref()
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for Component {}

impl Hash for Component {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}
