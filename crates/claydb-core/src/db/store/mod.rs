mod data;
mod link;
mod sequence;
mod snapshot;

pub use data::{DataStore, DataStoreRegistry, MAX_ROW_BYTES, RawRow};
pub use link::{LinkStore, LinkStoreRegistry, link_key};
pub use sequence::IdSequences;
pub use snapshot::{Snapshot, SnapshotRef};
