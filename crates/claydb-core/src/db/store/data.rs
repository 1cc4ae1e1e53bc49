use crate::{error::Error, record::Record};
use derive_more::{Deref, DerefMut};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Max serialized bytes for a single row to keep decode bounded.
pub const MAX_ROW_BYTES: usize = 4 * 1024 * 1024;

///
/// RawRow
///
/// CBOR-encoded record bytes as persisted in a data store.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RawRow(Vec<u8>);

impl RawRow {
    pub fn encode(record: &Record) -> Result<Self, Error> {
        let bytes = serde_cbor::to_vec(record)?;
        if bytes.len() > MAX_ROW_BYTES {
            return Err(Error::Store(format!(
                "row exceeds max size: {} bytes (limit {MAX_ROW_BYTES})",
                bytes.len()
            )));
        }

        Ok(Self(bytes))
    }

    pub fn try_decode(&self) -> Result<Record, Error> {
        if self.0.len() > MAX_ROW_BYTES {
            return Err(Error::Store(format!(
                "row exceeds max size: {} bytes (limit {MAX_ROW_BYTES})",
                self.0.len()
            )));
        }

        Ok(serde_cbor::from_slice(&self.0)?)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

///
/// DataStore
///
/// One physical store per entity: record id → encoded row.
///

#[derive(Clone, Debug, Default, Deref, DerefMut, Serialize, Deserialize)]
pub struct DataStore(BTreeMap<u64, RawRow>);

impl DataStore {
    pub fn get_record(&self, id: u64) -> Result<Option<Record>, Error> {
        self.0.get(&id).map(RawRow::try_decode).transpose()
    }

    pub fn put_record(&mut self, id: u64, record: &Record) -> Result<(), Error> {
        self.0.insert(id, RawRow::encode(record)?);
        Ok(())
    }

    /// Decode every row in id order.
    pub fn records(&self) -> Result<Vec<Record>, Error> {
        self.0.values().map(RawRow::try_decode).collect()
    }
}

///
/// DataStoreRegistry
///

#[derive(Clone, Debug, Default, Deref, DerefMut, Serialize, Deserialize)]
pub struct DataStoreRegistry(BTreeMap<String, DataStore>);

impl DataStoreRegistry {
    /// Store for an entity; absent means no rows were ever written.
    #[must_use]
    pub fn store(&self, entity: &str) -> Option<&DataStore> {
        self.0.get(entity)
    }

    pub fn store_mut(&mut self, entity: &str) -> &mut DataStore {
        self.0.entry(entity.to_string()).or_default()
    }

    pub fn record(&self, entity: &str, id: u64) -> Result<Option<Record>, Error> {
        self.store(entity).map_or(Ok(None), |s| s.get_record(id))
    }

    /// All records of an entity in id order; an absent store reads empty.
    pub fn records(&self, entity: &str) -> Result<Vec<Record>, Error> {
        self.store(entity).map_or_else(|| Ok(Vec::new()), DataStore::records)
    }
}

///
/// TESTS
///
