use derive_more::{Deref, DerefMut};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// IdSequences
///
/// Monotonic per-entity id assignment. Ids start at 1 and are never
/// recycled, including after deletes.
///

#[derive(Clone, Debug, Default, Deref, DerefMut, Serialize, Deserialize)]
pub struct IdSequences(BTreeMap<String, u64>);

impl IdSequences {
    pub fn next(&mut self, entity: &str) -> u64 {
        let counter = self.0.entry(entity.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }
}

///
/// TESTS
///
