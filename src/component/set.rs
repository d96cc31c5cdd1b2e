use crate::component::Component;
use crate::types::Identity;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A set of components keyed by identity
///
/// Iterates in identity order.
#[derive(Debug, Clone, Default)]
pub struct ComponentSet {
    components: BTreeMap<Identity, Arc<Component>>,
}

impl ComponentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component; returns false if its identity was already present
    ///
    /// The component already in the set is kept.
    pub fn add(&mut self, component: Arc<Component>) -> bool {
        let identity = component.identity().clone();
        if self.components.contains_key(&identity) {
            return false;
        }
        self.components.insert(identity, component);
        true
    }

    /// Add every member of `other`
    pub fn union(&mut self, other: &ComponentSet) {
        for component in other.iter() {
            self.add(component.clone());
        }
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.components.contains_key(identity)
    }

    pub fn get(&self, identity: &Identity) -> Option<&Arc<Component>> {
        self.components.get(identity)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Component>> {
        self.components.values()
    }

    pub fn identities(&self) -> impl Iterator<Item = &Identity> {
        self.components.keys()
    }
}

impl PartialEq for ComponentSet {
    fn eq(&self, other: &Self) -> bool {
        self.components.len() == other.components.len()
            && self.components.keys().eq(other.components.keys())
    }
}

impl Eq for ComponentSet {}

impl FromIterator<Arc<Component>> for ComponentSet {
    fn from_iter<I: IntoIterator<Item = Arc<Component>>>(iter: I) -> Self {
        let mut set = ComponentSet::new();
        set.extend(iter);
        set
    }
}

impl Extend<Arc<Component>> for ComponentSet {
    fn extend<I: IntoIterator<Item = Arc<Component>>>(&mut self, iter: I) {
        for component in iter {
            self.add(component);
        }
    }
}

impl<'a> IntoIterator for &'a ComponentSet {
    type Item = &'a Arc<Component>;
    type IntoIter = std::collections::btree_map::Values<'a, Identity, Arc<Component>>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.values()
    }
}
