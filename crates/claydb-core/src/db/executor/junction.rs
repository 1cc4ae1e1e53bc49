use crate::{
    db::{
        DbInner,
        executor::project_scalars,
        response::ListResponse,
    },
    error::Error,
};
use claydb_schema::{entity::EntityDefinition, relation::RelationKind, version::SchemaMode};
use std::collections::BTreeSet;
use tracing::debug;

///
/// Junction operations
///
/// add / delete / list / target_ids over one junction relation's link
/// store. Kind mismatches are relation-integrity failures; absent records
/// are not-found failures.
///

fn junction_target(
    def: &EntityDefinition,
    relation_name: &str,
) -> Result<String, Error> {
    let relation = def.get_relation(relation_name).ok_or_else(|| {
        Error::RelationIntegrity(format!(
            "entity '{}' has no relation '{relation_name}'",
            def.name
        ))
    })?;

    match &relation.kind {
        RelationKind::Junction { target } => Ok(target.clone()),
        _ => Err(Error::RelationIntegrity(format!(
            "junction operation against relation '{relation_name}', which is not a junction"
        ))),
    }
}

fn require_record(inner: &DbInner, entity: &str, id: u64) -> Result<(), Error> {
    if inner.data.record(entity, id)?.is_none() {
        return Err(Error::unknown_record(entity, id));
    }
    Ok(())
}

pub(in crate::db) fn add(
    inner: &mut DbInner,
    entity: &str,
    relation_name: &str,
    subject_id: u64,
    target_id: u64,
) -> Result<(), Error> {
    let def = inner.registry.resolve(entity, SchemaMode::Sandbox)?.clone();
    let target = junction_target(&def, relation_name)?;

    require_record(inner, entity, subject_id)?;
    require_record(inner, &target, target_id)?;

    inner
        .links
        .store_mut(entity, relation_name)
        .add(subject_id, target_id);
    debug!(entity, relation = relation_name, subject_id, target_id, "junction linked");

    Ok(())
}

/// Unlink a pair; removing an absent pair is a no-op, and neither endpoint
/// record is ever deleted.
pub(in crate::db) fn delete(
    inner: &mut DbInner,
    entity: &str,
    relation_name: &str,
    subject_id: u64,
    target_id: u64,
) -> Result<(), Error> {
    let def = inner.registry.resolve(entity, SchemaMode::Sandbox)?.clone();
    junction_target(&def, relation_name)?;
    require_record(inner, entity, subject_id)?;

    inner
        .links
        .store_mut(entity, relation_name)
        .delete(subject_id, target_id);
    debug!(entity, relation = relation_name, subject_id, target_id, "junction unlinked");

    Ok(())
}

/// Raw linked id set, without hydrating target records.
pub(in crate::db) fn target_ids(
    inner: &DbInner,
    entity: &str,
    relation_name: &str,
    subject_id: u64,
) -> Result<Vec<u64>, Error> {
    let def = inner.registry.resolve(entity, SchemaMode::Sandbox)?;
    junction_target(def, relation_name)?;
    require_record(inner, entity, subject_id)?;

    Ok(inner.links.targets_of(entity, relation_name, subject_id))
}

/// Linked targets (`exclude_assigned = false`) or unlinked candidates
/// (`exclude_assigned = true`); the two partition the target set.
pub(in crate::db) fn list(
    inner: &DbInner,
    entity: &str,
    relation_name: &str,
    subject_id: u64,
    exclude_assigned: bool,
) -> Result<ListResponse, Error> {
    let def = inner.registry.resolve(entity, SchemaMode::Sandbox)?;
    let target = junction_target(def, relation_name)?;
    require_record(inner, entity, subject_id)?;

    let linked: BTreeSet<u64> = inner
        .links
        .targets_of(entity, relation_name, subject_id)
        .into_iter()
        .collect();

    let target_def = inner.registry.resolve(&target, SchemaMode::Sandbox)?;
    let mut items = Vec::new();
    for record in inner.data.records(&target)? {
        let assigned = record.id().is_some_and(|id| linked.contains(&id));
        if assigned == exclude_assigned {
            continue;
        }
        items.push(project_scalars(target_def, &record));
    }

    let total = items.len() as u64;
    Ok(ListResponse {
        items,
        total_records: total,
        cursor: None,
    })
}
