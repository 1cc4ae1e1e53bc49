use crate::{
    db::publication::PublicationStatus,
    types::Timestamp,
    value::Value,
};
use claydb_schema::system;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// Record
///
/// An open attribute-name → value mapping plus the system attributes every
/// record carries (`id`, `publicationStatus`, `publishedAt`, `updatedAt`).
/// The entity definition is interpreted against this at the read/write
/// boundaries; the record itself is schema-free.
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

const NULL: Value = Value::Null;

impl Record {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&NULL)
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    // ======================================================================
    // System attributes
    // ======================================================================

    #[must_use]
    pub fn id(&self) -> Option<u64> {
        self.get(system::ID).as_id()
    }

    pub fn set_id(&mut self, id: u64) {
        self.set(system::ID, Value::from(id));
    }

    #[must_use]
    pub fn updated_at(&self) -> Option<Timestamp> {
        self.get(system::UPDATED_AT).as_timestamp()
    }

    pub fn set_updated_at(&mut self, ts: Timestamp) {
        self.set(system::UPDATED_AT, Value::Timestamp(ts));
    }

    #[must_use]
    pub fn publication_status(&self) -> Option<PublicationStatus> {
        self.get(system::PUBLICATION_STATUS)
            .as_text()
            .and_then(PublicationStatus::parse)
    }

    pub fn set_publication_status(&mut self, status: PublicationStatus) {
        self.set(system::PUBLICATION_STATUS, Value::text(status.as_str()));
    }

    #[must_use]
    pub fn published_at(&self) -> Option<Timestamp> {
        self.get(system::PUBLISHED_AT).as_timestamp()
    }

    pub fn set_published_at(&mut self, ts: Option<Timestamp>) {
        let value = ts.map_or(Value::Null, Value::Timestamp);
        self.set(system::PUBLISHED_AT, value);
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

///
/// TESTS
///
