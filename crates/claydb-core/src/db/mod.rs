pub mod coerce;
pub mod cursor;
pub mod executor;
pub mod publication;
pub mod query;
pub mod registry;
pub mod response;
pub mod store;

use crate::{
    clock::Clock,
    db::{
        executor::{LoadExecutor, Resolver, SaveExecutor, junction},
        publication::PublicationStatus,
        query::{ListQuery, QueryMode},
        registry::SchemaRegistry,
        response::{JsonMap, ListResponse, LookupListResponse},
        store::{DataStoreRegistry, IdSequences, LinkStoreRegistry, Snapshot, SnapshotRef},
    },
    error::Error,
    record::Record,
    types::Timestamp,
};
use claydb_schema::{entity::EntityDefinition, relation::Relation, version::SchemaMode};
use std::{
    path::PathBuf,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// Page size for typeahead lookup lists.
pub const DEFAULT_PAGE_SIZE: u64 = 20;

///
/// DbInner
///
/// The shared state behind one database handle: schema registry, data and
/// link stores, id sequences, and the token clock. All access goes through
/// the outer `RwLock`, which is what makes registry publishes atomic for
/// concurrent readers.
///

pub(crate) struct DbInner {
    pub(crate) registry: SchemaRegistry,
    pub(crate) data: DataStoreRegistry,
    pub(crate) links: LinkStoreRegistry,
    pub(crate) sequences: IdSequences,
    pub(crate) clock: Clock,
}

impl DbInner {
    fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            registry: snapshot.schema,
            data: snapshot.data,
            links: snapshot.links,
            sequences: snapshot.sequences,
            clock: Clock::new(),
        }
    }
}

impl Default for DbInner {
    fn default() -> Self {
        Self::from_snapshot(Snapshot::default())
    }
}

impl query::RelationSource for DbInner {
    fn related(
        &self,
        owner_entity: &str,
        relation: &Relation,
        record: &Record,
    ) -> Result<Vec<Record>, Error> {
        use claydb_schema::relation::RelationKind;

        match &relation.kind {
            RelationKind::Lookup { target } => {
                let Some(id) = record.get(&relation.name).as_id() else {
                    return Ok(Vec::new());
                };
                Ok(self.data.record(target, id)?.into_iter().collect())
            }
            RelationKind::Collection {
                target,
                link_attribute,
            } => self.children_by_link(target, link_attribute, record.id()),
            RelationKind::Tree { link_attribute } => {
                self.children_by_link(owner_entity, link_attribute, record.id())
            }
            RelationKind::Junction { target } => {
                let Some(subject) = record.id() else {
                    return Ok(Vec::new());
                };
                let mut out = Vec::new();
                for target_id in self.links.targets_of(owner_entity, &relation.name, subject) {
                    if let Some(rec) = self.data.record(target, target_id)? {
                        out.push(rec);
                    }
                }
                Ok(out)
            }
        }
    }
}

impl DbInner {
    fn children_by_link(
        &self,
        target: &str,
        link_attribute: &str,
        parent: Option<u64>,
    ) -> Result<Vec<Record>, Error> {
        let Some(parent) = parent else {
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        for child in self.data.records(target)? {
            if child.get(link_attribute).as_id() == Some(parent) {
                out.push(child);
            }
        }
        Ok(out)
    }
}

///
/// Db
///
/// The database handle: schema management, structured queries, and record
/// writes over runtime-defined entities. Cheap to clone; clones share
/// state.
///

#[derive(Clone)]
pub struct Db {
    inner: Arc<RwLock<DbInner>>,
    path: Option<PathBuf>,
}

impl Default for Db {
    fn default() -> Self {
        Self::new()
    }
}

impl Db {
    /// In-memory database.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(DbInner::default())),
            path: None,
        }
    }

    /// Open a persistent database, restoring the snapshot when one exists.
    /// Every successful mutation flushes back to the same path.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let inner = if path.exists() {
            DbInner::from_snapshot(Snapshot::load(&path)?)
        } else {
            DbInner::default()
        };

        Ok(Self {
            inner: Arc::new(RwLock::new(inner)),
            path: Some(path),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, DbInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DbInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // Mutations flush inside the write critical section, so a reader never
    // observes state that could be lost by a crash mid-request.
    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut DbInner) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut inner = self.write();
        let out = op(&mut inner)?;

        if let Some(path) = &self.path {
            SnapshotRef {
                schema: &inner.registry,
                data: &inner.data,
                links: &inner.links,
                sequences: &inner.sequences,
            }
            .save(path)?;
        }

        Ok(out)
    }

    // ======================================================================
    // Schema management
    // ======================================================================

    /// Idempotent create-or-update of an entity definition (§ registry for
    /// the publish-on-first-definition behavior).
    pub fn ensure_entity(&self, definition: EntityDefinition) -> Result<(), Error> {
        self.mutate(|inner| inner.registry.ensure(definition))
    }

    pub fn publish_entity(&self, entity: &str) -> Result<(), Error> {
        self.mutate(|inner| inner.registry.publish(entity))
    }

    pub fn unpublish_entity(&self, entity: &str) -> Result<(), Error> {
        self.mutate(|inner| inner.registry.unpublish(entity))
    }

    /// Resolved definition for inspection.
    pub fn entity_definition(
        &self,
        entity: &str,
        mode: SchemaMode,
    ) -> Result<EntityDefinition, Error> {
        self.read().registry.resolve(entity, mode).cloned()
    }

    // ======================================================================
    // Queries
    // ======================================================================

    /// Execute a structured list query.
    pub fn query(&self, query: &ListQuery) -> Result<ListResponse, Error> {
        LoadExecutor::new(&self.read()).query(query)
    }

    /// Admin offset listing without filters.
    pub fn list(&self, entity: &str, offset: u64, limit: u64) -> Result<ListResponse, Error> {
        LoadExecutor::new(&self.read()).list(entity, offset, limit)
    }

    /// One record, lookups resolved one level deep.
    pub fn single(&self, entity: &str, id: u64) -> Result<JsonMap, Error> {
        LoadExecutor::new(&self.read()).single(entity, id)
    }

    /// Typeahead candidates matching a title prefix.
    pub fn lookup_list(&self, entity: &str, prefix: &str) -> Result<LookupListResponse, Error> {
        let inner = self.read();
        let def = inner.registry.resolve(entity, SchemaMode::Sandbox)?;
        Resolver::new(&inner, QueryMode::Preview, Timestamp::wall_now()).lookup_list(def, prefix)
    }

    /// Full nested tree of a tree-bearing entity.
    pub fn list_as_tree(&self, entity: &str) -> Result<Vec<serde_json::Value>, Error> {
        let inner = self.read();
        let def = inner.registry.resolve(entity, SchemaMode::Sandbox)?;
        Resolver::new(&inner, QueryMode::Preview, Timestamp::wall_now()).list_as_tree(def)
    }

    /// Children of one parent through a collection/tree relation.
    pub fn collection_list(
        &self,
        entity: &str,
        relation: &str,
        parent_id: u64,
    ) -> Result<ListResponse, Error> {
        let query = ListQuery::new(entity)
            .select(vec![
                query::FieldSelection::leaf("id"),
                query::FieldSelection::nested(relation, Vec::new()),
            ])
            .filter(query::FilterNode::clause(
                "id",
                query::FilterOp::Equals,
                serde_json::Value::from(parent_id),
            ))
            .in_mode(QueryMode::Preview);

        let response = self.query(&query)?;
        let items = response
            .items
            .first()
            .and_then(|item| item.get(relation))
            .and_then(serde_json::Value::as_array)
            .map(|children| {
                children
                    .iter()
                    .filter_map(|c| c.as_object().cloned())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let total = items.len() as u64;
        Ok(ListResponse {
            items,
            total_records: total,
            cursor: None,
        })
    }

    /// Continue one relation group from a relation cursor.
    pub fn relation_part(
        &self,
        entity: &str,
        relation: &str,
        cursor: &str,
        limit: u64,
    ) -> Result<ListResponse, Error> {
        let inner = self.read();
        let def = inner.registry.resolve(entity, SchemaMode::Sandbox)?;
        Resolver::new(&inner, QueryMode::Preview, Timestamp::wall_now())
            .relation_part(def, relation, cursor, limit)
    }

    // ======================================================================
    // Junction operations
    // ======================================================================

    pub fn junction_add(
        &self,
        entity: &str,
        relation: &str,
        subject_id: u64,
        target_id: u64,
    ) -> Result<(), Error> {
        self.mutate(|inner| junction::add(inner, entity, relation, subject_id, target_id))
    }

    pub fn junction_delete(
        &self,
        entity: &str,
        relation: &str,
        subject_id: u64,
        target_id: u64,
    ) -> Result<(), Error> {
        self.mutate(|inner| junction::delete(inner, entity, relation, subject_id, target_id))
    }

    pub fn junction_list(
        &self,
        entity: &str,
        relation: &str,
        subject_id: u64,
        exclude_assigned: bool,
    ) -> Result<ListResponse, Error> {
        junction::list(&self.read(), entity, relation, subject_id, exclude_assigned)
    }

    pub fn junction_target_ids(
        &self,
        entity: &str,
        relation: &str,
        subject_id: u64,
    ) -> Result<Vec<u64>, Error> {
        junction::target_ids(&self.read(), entity, relation, subject_id)
    }

    // ======================================================================
    // Writes
    // ======================================================================

    pub fn insert(&self, entity: &str, fields: &serde_json::Value) -> Result<JsonMap, Error> {
        self.mutate(|inner| SaveExecutor::new(inner).insert(entity, fields))
    }

    /// Update with an optimistic-concurrency token (the `updatedAt` value
    /// last observed by the caller).
    pub fn update(
        &self,
        entity: &str,
        id: u64,
        fields: &serde_json::Value,
        updated_at: &str,
    ) -> Result<JsonMap, Error> {
        self.mutate(|inner| SaveExecutor::new(inner).update(entity, id, fields, updated_at))
    }

    pub fn delete(&self, entity: &str, id: u64, updated_at: &str) -> Result<(), Error> {
        self.mutate(|inner| SaveExecutor::new(inner).delete(entity, id, updated_at))
    }

    pub fn collection_insert(
        &self,
        entity: &str,
        relation: &str,
        parent_id: u64,
        fields: &serde_json::Value,
    ) -> Result<JsonMap, Error> {
        self.mutate(|inner| {
            SaveExecutor::new(inner).collection_insert(entity, relation, parent_id, fields)
        })
    }

    pub fn save_publication_settings(
        &self,
        entity: &str,
        id: u64,
        status: PublicationStatus,
        published_at: Option<&str>,
    ) -> Result<JsonMap, Error> {
        let published_at = published_at
            .map(Timestamp::parse)
            .transpose()
            .map_err(Error::ValidationFailure)?;

        self.mutate(|inner| {
            SaveExecutor::new(inner).save_publication_settings(entity, id, status, published_at)
        })
    }
}
