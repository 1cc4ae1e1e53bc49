pub(in crate::db) mod junction;
mod load;
mod relation;
mod save;

pub(in crate::db) use load::LoadExecutor;
pub(in crate::db) use relation::Resolver;
pub(in crate::db) use save::SaveExecutor;

use crate::{db::response::JsonMap, record::Record, value::value_to_json};
use claydb_schema::{entity::EntityDefinition, system};

/// Project every attribute plus the system attributes of one record.
///
/// Relations are projected only on request (query selections) or by the
/// dedicated accessors (`single` resolves lookups one level).
pub(in crate::db) fn project_scalars(def: &EntityDefinition, record: &Record) -> JsonMap {
    let mut out = JsonMap::new();

    for name in system::ALL {
        out.insert((*name).to_string(), value_to_json(record.get(name)));
    }
    for attr in &def.attributes {
        out.insert(attr.name.clone(), value_to_json(record.get(&attr.name)));
    }

    out
}
