use crate::{
    db::{
        DbInner,
        coerce::{check_rules, check_title, coerce_fields},
        executor::project_scalars,
        publication::{self, PublicationStatus},
        response::JsonMap,
    },
    error::Error,
    record::Record,
    types::Timestamp,
    value::Value,
};
use claydb_schema::{
    entity::EntityDefinition,
    relation::RelationKind,
    version::SchemaMode,
};
use std::collections::BTreeMap;
use tracing::debug;

///
/// SaveExecutor
///
/// All record mutations: insert, update, delete, collection-insert, and
/// publication-settings saves. Validation runs before the concurrency
/// check, which runs before persistence; a failure anywhere leaves the
/// store untouched.
///

pub(in crate::db) struct SaveExecutor<'a> {
    inner: &'a mut DbInner,
}

impl<'a> SaveExecutor<'a> {
    pub(in crate::db) const fn new(inner: &'a mut DbInner) -> Self {
        Self { inner }
    }

    // Writes edit against the latest schema version; the admin surface
    // always sees the newest structure.
    fn definition(&self, entity: &str) -> Result<EntityDefinition, Error> {
        self.inner
            .registry
            .resolve(entity, SchemaMode::Sandbox)
            .cloned()
    }

    pub(in crate::db) fn insert(
        &mut self,
        entity: &str,
        fields: &serde_json::Value,
    ) -> Result<JsonMap, Error> {
        let def = self.definition(entity)?;

        let candidate = coerce_fields(&def, fields)?;
        check_rules(&def, &candidate, false)?;
        check_title(&def, &candidate)?;
        self.check_references(&def, &candidate)?;

        let id = self.inner.sequences.next(entity);
        let now = self.inner.clock.next();

        let mut record: Record = candidate.into_iter().collect();
        record.set_id(id);
        let status = publication::initial_status(def.publication_enabled);
        record.set_publication_status(status);
        record.set_published_at((status == PublicationStatus::Published).then_some(now));
        record.set_updated_at(now);

        self.inner.data.store_mut(entity).put_record(id, &record)?;
        debug!(entity, id, "record inserted");

        Ok(project_scalars(&def, &record))
    }

    pub(in crate::db) fn update(
        &mut self,
        entity: &str,
        id: u64,
        fields: &serde_json::Value,
        updated_at: &str,
    ) -> Result<JsonMap, Error> {
        let def = self.definition(entity)?;

        // Validation precedes the concurrency check and persistence.
        let candidate = coerce_fields(&def, fields)?;
        check_rules(&def, &candidate, true)?;
        if candidate.contains_key(&def.title_attribute) {
            check_title(&def, &candidate)?;
        }
        self.check_references(&def, &candidate)?;

        let mut record = self
            .inner
            .data
            .record(entity, id)?
            .ok_or_else(|| Error::unknown_record(entity, id))?;
        check_token(entity, id, &record, updated_at)?;

        for (name, value) in candidate {
            record.set(name, value);
        }
        record.set_updated_at(self.inner.clock.next());

        self.inner.data.store_mut(entity).put_record(id, &record)?;
        debug!(entity, id, "record updated");

        Ok(project_scalars(&def, &record))
    }

    pub(in crate::db) fn delete(
        &mut self,
        entity: &str,
        id: u64,
        updated_at: &str,
    ) -> Result<(), Error> {
        let record = self
            .inner
            .data
            .record(entity, id)?
            .ok_or_else(|| Error::unknown_record(entity, id))?;
        check_token(entity, id, &record, updated_at)?;

        self.inner.data.store_mut(entity).remove(&id);
        self.unlink_everywhere(entity, id);
        debug!(entity, id, "record deleted");

        Ok(())
    }

    // Junction membership must stay exact after a delete: drop pairs the
    // record held on the subject side and pairs targeting it.
    fn unlink_everywhere(&mut self, entity: &str, id: u64) {
        let junctions: Vec<(String, String, String)> = self
            .inner
            .registry
            .latest_definitions()
            .flat_map(|def| {
                def.relations.iter().filter_map(|relation| {
                    if let RelationKind::Junction { target } = &relation.kind {
                        Some((def.name.clone(), relation.name.clone(), target.clone()))
                    } else {
                        None
                    }
                })
            })
            .collect();

        for (owner, relation, target) in junctions {
            if owner == entity {
                self.inner.links.store_mut(&owner, &relation).remove_subject(id);
            }
            if target == entity {
                self.inner.links.store_mut(&owner, &relation).remove_target(id);
            }
        }
    }

    /// Insert a child through a collection/tree relation: the child's
    /// back-reference is set to the parent id.
    pub(in crate::db) fn collection_insert(
        &mut self,
        entity: &str,
        relation_name: &str,
        parent_id: u64,
        fields: &serde_json::Value,
    ) -> Result<JsonMap, Error> {
        let def = self.definition(entity)?;
        let relation = def.get_relation(relation_name).ok_or_else(|| {
            Error::RelationIntegrity(format!(
                "entity '{entity}' has no relation '{relation_name}'"
            ))
        })?;

        let (target, link_attribute) = match &relation.kind {
            RelationKind::Collection {
                target,
                link_attribute,
            } => (target.clone(), link_attribute.clone()),
            RelationKind::Tree { link_attribute } => {
                (entity.to_string(), link_attribute.clone())
            }
            RelationKind::Lookup { .. } | RelationKind::Junction { .. } => {
                return Err(Error::RelationIntegrity(format!(
                    "collection-insert against relation '{relation_name}', which is not a collection"
                )));
            }
        };

        if self.inner.data.record(entity, parent_id)?.is_none() {
            return Err(Error::unknown_record(entity, parent_id));
        }

        let mut child = fields
            .as_object()
            .cloned()
            .ok_or_else(|| {
                Error::ValidationFailure("write payload must be a JSON object".to_string())
            })?;
        child.insert(link_attribute, serde_json::Value::from(parent_id));

        self.insert(&target, &serde_json::Value::Object(child))
    }

    /// Apply the publication state machine to one record.
    ///
    /// No token is required (the settings payload carries none), but the
    /// write still refreshes `updatedAt` like every successful mutation.
    pub(in crate::db) fn save_publication_settings(
        &mut self,
        entity: &str,
        id: u64,
        status: PublicationStatus,
        published_at: Option<Timestamp>,
    ) -> Result<JsonMap, Error> {
        let def = self.definition(entity)?;
        let mut record = self
            .inner
            .data
            .record(entity, id)?
            .ok_or_else(|| Error::unknown_record(entity, id))?;

        let now = self.inner.clock.next();
        publication::apply_settings(&mut record, status, published_at, now)?;
        record.set_updated_at(now);

        self.inner.data.store_mut(entity).put_record(id, &record)?;
        debug!(entity, id, status = %status, "publication settings saved");

        Ok(project_scalars(&def, &record))
    }

    // Lookup references must point at live records at write time.
    fn check_references(
        &self,
        def: &EntityDefinition,
        candidate: &BTreeMap<String, Value>,
    ) -> Result<(), Error> {
        for relation in &def.relations {
            if relation.is_to_many() {
                continue;
            }
            let Some(value) = candidate.get(&relation.name) else {
                continue;
            };
            if value.is_null() {
                continue;
            }

            let target_id = value.as_id().ok_or_else(|| {
                Error::RelationIntegrity(format!(
                    "relation '{}' expects a record id",
                    relation.name
                ))
            })?;
            let target = relation.target_entity(&def.name);
            if self.inner.data.record(target, target_id)?.is_none() {
                return Err(Error::RelationIntegrity(format!(
                    "relation '{}' references missing record {target}/{target_id}",
                    relation.name
                )));
            }
        }

        Ok(())
    }
}

// Compare the caller's token against the stored one; stale or malformed
// tokens never mutate anything.
fn check_token(entity: &str, id: u64, record: &Record, updated_at: &str) -> Result<(), Error> {
    let supplied = Timestamp::parse(updated_at)
        .map_err(|err| Error::ConcurrencyConflict(format!("malformed updatedAt token: {err}")))?;

    match record.updated_at() {
        Some(current) if current == supplied => Ok(()),
        _ => Err(Error::stale_token(entity, id)),
    }
}
