use crate::{
    db::{
        registry::SchemaRegistry,
        store::{DataStoreRegistry, IdSequences, LinkStoreRegistry},
    },
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

///
/// Snapshot
///
/// Full persisted state: schema metadata (the version lineages), one data
/// store per entity, one link store per junction relation, and the id
/// sequences. Written and restored as one CBOR document so a restart
/// resumes exactly where the last flush left off; wiring an actual
/// database driver replaces this module, not its callers.
///

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema: SchemaRegistry,
    pub data: DataStoreRegistry,
    pub links: LinkStoreRegistry,
    pub sequences: IdSequences,
}

///
/// SnapshotRef
///
/// Borrowed view with the same wire shape as [`Snapshot`], so a flush
/// never clones the stores.
///

#[derive(Debug, Serialize)]
pub struct SnapshotRef<'a> {
    pub schema: &'a SchemaRegistry,
    pub data: &'a DataStoreRegistry,
    pub links: &'a LinkStoreRegistry,
    pub sequences: &'a IdSequences,
}

impl SnapshotRef<'_> {
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let bytes = serde_cbor::to_vec(self)
            .map_err(|err| Error::Store(format!("snapshot encode: {err}")))?;

        // Write-then-rename so a failed flush never truncates the
        // previous snapshot.
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, bytes)
            .map_err(|err| Error::Store(format!("snapshot write {}: {err}", tmp.display())))?;
        std::fs::rename(&tmp, path)
            .map_err(|err| Error::Store(format!("snapshot rename {}: {err}", path.display())))
    }
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let bytes = std::fs::read(path)
            .map_err(|err| Error::Store(format!("snapshot read {}: {err}", path.display())))?;
        serde_cbor::from_slice(&bytes)
            .map_err(|err| Error::Store(format!("snapshot decode {}: {err}", path.display())))
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{record::Record, value::Value};

    #[test]
    fn snapshot_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.db");

        let mut snapshot = Snapshot::default();
        let id = snapshot.sequences.next("post");
        let mut record = Record::new();
        record.set_id(id);
        record.set("name", Value::text("post1"));
        snapshot.data.store_mut("post").put_record(id, &record).unwrap();
        snapshot.links.store_mut("post", "tags").add(1, 1);

        SnapshotRef {
            schema: &snapshot.schema,
            data: &snapshot.data,
            links: &snapshot.links,
            sequences: &snapshot.sequences,
        }
        .save(&path)
        .unwrap();

        let mut loaded = Snapshot::load(&path).unwrap();
        assert_eq!(loaded.data.record("post", 1).unwrap(), Some(record));
        assert_eq!(loaded.links.targets_of("post", "tags", 1), vec![1]);
        assert_eq!(loaded.sequences.next("post"), 2);
    }

    #[test]
    fn missing_snapshot_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Snapshot::load(&dir.path().join("absent.db")).unwrap_err();
        assert!(matches!(err, crate::error::Error::Store(_)));
    }
}
