use derive_more::{Deref, DerefMut};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

///
/// LinkStore
///
/// One store per junction relation: unique (subject id, target id) pairs.
/// Membership is symmetric in representation but queried directionally.
///

#[derive(Clone, Debug, Default, Deref, DerefMut, Serialize, Deserialize)]
pub struct LinkStore(BTreeSet<(u64, u64)>);

impl LinkStore {
    /// Link a pair; false when the pair already existed.
    pub fn add(&mut self, subject: u64, target: u64) -> bool {
        self.0.insert((subject, target))
    }

    /// Unlink a pair; false when it was not linked.
    pub fn delete(&mut self, subject: u64, target: u64) -> bool {
        self.0.remove(&(subject, target))
    }

    #[must_use]
    pub fn is_linked(&self, subject: u64, target: u64) -> bool {
        self.0.contains(&(subject, target))
    }

    /// Target ids linked from one subject, ascending.
    #[must_use]
    pub fn targets_of(&self, subject: u64) -> Vec<u64> {
        self.0
            .range((subject, u64::MIN)..=(subject, u64::MAX))
            .map(|(_, target)| *target)
            .collect()
    }

    /// Drop every pair with this subject id.
    pub fn remove_subject(&mut self, id: u64) {
        self.0.retain(|(subject, _)| *subject != id);
    }

    /// Drop every pair with this target id.
    pub fn remove_target(&mut self, id: u64) {
        self.0.retain(|(_, target)| *target != id);
    }
}

/// Registry key for the link store of one junction relation.
#[must_use]
pub fn link_key(entity: &str, relation: &str) -> String {
    format!("{entity}/{relation}")
}

///
/// LinkStoreRegistry
///

#[derive(Clone, Debug, Default, Deref, DerefMut, Serialize, Deserialize)]
pub struct LinkStoreRegistry(BTreeMap<String, LinkStore>);

impl LinkStoreRegistry {
    #[must_use]
    pub fn store(&self, entity: &str, relation: &str) -> Option<&LinkStore> {
        self.0.get(&link_key(entity, relation))
    }

    pub fn store_mut(&mut self, entity: &str, relation: &str) -> &mut LinkStore {
        self.0.entry(link_key(entity, relation)).or_default()
    }

    /// Target ids for one subject; absent stores read as unlinked.
    #[must_use]
    pub fn targets_of(&self, entity: &str, relation: &str, subject: u64) -> Vec<u64> {
        self.store(entity, relation)
            .map_or_else(Vec::new, |s| s.targets_of(subject))
    }
}

///
/// TESTS
///
