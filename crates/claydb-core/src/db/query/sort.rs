use crate::{
    db::query::eval::RelationSource,
    error::Error,
    record::Record,
    value::{Value, compare},
};
use claydb_schema::relation::Relation;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

///
/// SortOrder
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

///
/// SortField
///
/// One `(field path, direction)` pair of a sort spec. Paths may traverse
/// to-one relations; to-many paths are rejected at compile time.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,

    #[serde(default)]
    pub order: SortOrder,
}

///
/// CompiledSortField
///
/// A validated sort key: resolved relation steps plus the terminal
/// attribute.
///

#[derive(Clone, Debug)]
pub struct CompiledSortField {
    pub(in crate::db) steps: Vec<(String, Relation)>,
    pub(in crate::db) attribute: String,
    pub(in crate::db) order: SortOrder,
}

impl CompiledSortField {
    /// Sort-key value for one record, walking to-one steps with a null
    /// fallback for dangling references.
    pub(in crate::db) fn key_of(
        &self,
        record: &Record,
        src: &impl RelationSource,
    ) -> Result<Value, Error> {
        let mut current = record.clone();
        for (owner, relation) in &self.steps {
            match src.related(owner, relation, &current)?.into_iter().next() {
                Some(next) => current = next,
                None => return Ok(Value::Null),
            }
        }

        Ok(current.get(&self.attribute).clone())
    }
}

/// Order records by the compiled sort spec, ties broken by ascending id.
///
/// Keys are computed once per record before the sort; the comparator never
/// touches the store.
pub fn order_records(
    records: &mut Vec<Record>,
    sort: &[CompiledSortField],
    src: &impl RelationSource,
) -> Result<(), Error> {
    let mut keyed = Vec::with_capacity(records.len());
    for record in records.drain(..) {
        let mut keys = Vec::with_capacity(sort.len());
        for field in sort {
            keys.push(field.key_of(&record, src)?);
        }
        keyed.push((keys, record));
    }

    keyed.sort_by(|(a_keys, a_rec), (b_keys, b_rec)| {
        for (idx, field) in sort.iter().enumerate() {
            let ord = compare(&a_keys[idx], &b_keys[idx]);
            let ord = match field.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        a_rec.id().cmp(&b_rec.id())
    });

    records.extend(keyed.into_iter().map(|(_, record)| record));

    Ok(())
}

/// Boundary comparison for cursor continuation: is `record` strictly after
/// the boundary key values under this sort spec?
pub(in crate::db) fn after_boundary(
    record: &Record,
    record_keys: &[Value],
    sort: &[CompiledSortField],
    boundary: &[Value],
) -> bool {
    for (idx, field) in sort.iter().enumerate() {
        let Some(bound) = boundary.get(idx) else {
            return false;
        };
        let ord = compare(&record_keys[idx], bound);
        let ord = match field.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        };
        match ord {
            Ordering::Greater => return true,
            Ordering::Less => return false,
            Ordering::Equal => {}
        }
    }

    // All sort keys tie; the trailing boundary slot is the id tiebreaker.
    let bound_id = boundary.get(sort.len()).and_then(Value::as_id);
    match (record.id(), bound_id) {
        (Some(id), Some(bound)) => id > bound,
        _ => false,
    }
}
