use crate::{
    db::{
        query::{
            FieldSelection, ListQuery,
            filter::{FilterClause, FilterNode, FilterOp},
            sort::{CompiledSortField, SortField},
        },
        registry::SchemaRegistry,
    },
    error::Error,
    types::Timestamp,
    value::Value,
};
use claydb_schema::{
    attribute::DataType,
    entity::EntityDefinition,
    relation::Relation,
    system,
    version::SchemaMode,
};

///
/// Query compilation
///
/// Schema-aware validation of filter, sort, and field selections. All
/// path/operator/type failures surface here, before any row is read, as
/// `InvalidFilter` naming the offending path.
///

///
/// CompiledQuery
///

#[derive(Debug)]
pub struct CompiledQuery<'a> {
    pub def: &'a EntityDefinition,
    pub filter: Option<CompiledFilter>,
    pub sort: Vec<CompiledSortField>,
}

///
/// CompiledFilter
///

#[derive(Clone, Debug)]
pub struct CompiledFilter {
    pub(in crate::db) root: CompiledNode,
    /// Unique relation chains that fan out (traverse a to-many relation).
    pub(in crate::db) chains: Vec<ChainSpec>,
}

impl CompiledFilter {
    /// Whether evaluation can duplicate parent rows (join fan-out).
    #[must_use]
    pub fn has_fan_out(&self) -> bool {
        !self.chains.is_empty()
    }
}

#[derive(Clone, Debug)]
pub(in crate::db) enum CompiledNode {
    All(Vec<CompiledNode>),
    Any(Vec<CompiledNode>),
    Clause(CompiledClause),
}

#[derive(Clone, Debug)]
pub(in crate::db) struct CompiledClause {
    /// Owner entity + relation for each traversed step.
    pub(in crate::db) steps: Vec<(String, Relation)>,
    /// Chain key when the steps fan out; tuple evaluation joins on it.
    pub(in crate::db) chain: Option<String>,
    pub(in crate::db) attribute: String,
    pub(in crate::db) op: FilterOp,
    pub(in crate::db) operand: Value,
}

#[derive(Clone, Debug)]
pub(in crate::db) struct ChainSpec {
    pub(in crate::db) key: String,
    pub(in crate::db) steps: Vec<(String, Relation)>,
}

///
/// TargetType
///
/// Scalar family of a resolved field path, used for operand coercion.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum TargetType {
    Int,
    Decimal,
    Text,
    Bool,
    Datetime,
}

pub fn compile_query<'a>(
    registry: &'a SchemaRegistry,
    query: &ListQuery,
) -> Result<CompiledQuery<'a>, Error> {
    let mode = query.mode.schema_mode();
    let def = registry.resolve(&query.entity, mode)?;

    if query.cursor.is_some() && query.offset.is_some() {
        return Err(Error::InvalidFilter(
            "offset and cursor pagination are mutually exclusive".to_string(),
        ));
    }

    validate_selections(registry, mode, def, &query.fields)?;

    let filter = query
        .filter_expr
        .as_ref()
        .map(|node| compile_filter(registry, mode, def, node))
        .transpose()?;

    let mut sort = Vec::with_capacity(query.sort.len());
    for field in &query.sort {
        sort.push(compile_sort_field(registry, mode, def, field)?);
    }

    Ok(CompiledQuery { def, filter, sort })
}

/// Validate a nested field selection against the resolved schema version.
///
/// A selection naming a field the version does not carry fails cleanly
/// here rather than returning partial data.
pub fn validate_selections(
    registry: &SchemaRegistry,
    mode: SchemaMode,
    def: &EntityDefinition,
    selections: &[FieldSelection],
) -> Result<(), Error> {
    for selection in selections {
        let name = selection.field.as_str();

        if system::ALL.contains(&name) || def.get_attribute(name).is_some() {
            if !selection.selections.is_empty() {
                return Err(Error::invalid_path(name, "scalar fields take no sub-selection"));
            }
            continue;
        }

        if let Some(relation) = def.get_relation(name) {
            let target = registry.resolve(relation.target_entity(&def.name), mode)?;
            validate_selections(registry, mode, target, &selection.selections)?;
            continue;
        }

        return Err(Error::invalid_path(
            name,
            &format!("unknown field on entity '{}'", def.name),
        ));
    }

    Ok(())
}

pub fn compile_filter(
    registry: &SchemaRegistry,
    mode: SchemaMode,
    def: &EntityDefinition,
    node: &FilterNode,
) -> Result<CompiledFilter, Error> {
    let root = compile_node(registry, mode, def, node)?;

    let mut chains: Vec<ChainSpec> = Vec::new();
    collect_chains(&root, &mut chains);

    Ok(CompiledFilter { root, chains })
}

fn collect_chains(node: &CompiledNode, chains: &mut Vec<ChainSpec>) {
    match node {
        CompiledNode::All(nodes) | CompiledNode::Any(nodes) => {
            for node in nodes {
                collect_chains(node, chains);
            }
        }
        CompiledNode::Clause(clause) => {
            if let Some(key) = &clause.chain
                && !chains.iter().any(|c| &c.key == key)
            {
                chains.push(ChainSpec {
                    key: key.clone(),
                    steps: clause.steps.clone(),
                });
            }
        }
    }
}

fn compile_node(
    registry: &SchemaRegistry,
    mode: SchemaMode,
    def: &EntityDefinition,
    node: &FilterNode,
) -> Result<CompiledNode, Error> {
    match node {
        FilterNode::All { match_all } => {
            let nodes = match_all
                .iter()
                .map(|n| compile_node(registry, mode, def, n))
                .collect::<Result<_, _>>()?;
            Ok(CompiledNode::All(nodes))
        }
        FilterNode::Any { match_any } => {
            let nodes = match_any
                .iter()
                .map(|n| compile_node(registry, mode, def, n))
                .collect::<Result<_, _>>()?;
            Ok(CompiledNode::Any(nodes))
        }
        FilterNode::Clause(clause) => {
            Ok(CompiledNode::Clause(compile_clause(registry, mode, def, clause)?))
        }
    }
}

fn compile_clause(
    registry: &SchemaRegistry,
    mode: SchemaMode,
    def: &EntityDefinition,
    clause: &FilterClause,
) -> Result<CompiledClause, Error> {
    let (steps, attribute, target) = resolve_path(registry, mode, def, &clause.field)?;

    check_operator(&clause.field, clause.op, target)?;
    let operand = compile_operand(&clause.field, clause.op, target, clause.value.as_ref())?;

    let fan_out = steps.iter().any(|(_, r)| r.is_to_many());
    let chain = fan_out.then(|| {
        steps
            .iter()
            .map(|(_, r)| r.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    });

    Ok(CompiledClause {
        steps,
        chain,
        attribute,
        op: clause.op,
        operand,
    })
}

fn compile_sort_field(
    registry: &SchemaRegistry,
    mode: SchemaMode,
    def: &EntityDefinition,
    field: &SortField,
) -> Result<CompiledSortField, Error> {
    let (steps, attribute, _) = resolve_path(registry, mode, def, &field.field)?;

    if steps.iter().any(|(_, r)| r.is_to_many()) {
        return Err(Error::invalid_path(
            &field.field,
            "cannot sort across a to-many relation",
        ));
    }

    Ok(CompiledSortField {
        steps,
        attribute,
        order: field.order,
    })
}

/// Resolve a dot-separated field path: every segment but the last names a
/// relation, the last names an attribute (or system attribute, or a lookup
/// relation read as its stored id).
fn resolve_path(
    registry: &SchemaRegistry,
    mode: SchemaMode,
    def: &EntityDefinition,
    path: &str,
) -> Result<(Vec<(String, Relation)>, String, TargetType), Error> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(Error::invalid_path(path, "empty path segment"));
    }

    let mut steps = Vec::new();
    let mut current = def;

    for segment in &segments[..segments.len() - 1] {
        let relation = current.get_relation(segment).ok_or_else(|| {
            Error::invalid_path(
                path,
                &format!("'{segment}' is not a relation of entity '{}'", current.name),
            )
        })?;
        let owner = current.name.clone();
        current = registry.resolve(relation.target_entity(&current.name), mode)?;
        steps.push((owner, relation.clone()));
    }

    let last = segments[segments.len() - 1];
    let target = field_type(current, last).ok_or_else(|| {
        Error::invalid_path(
            path,
            &format!("'{last}' is not a field of entity '{}'", current.name),
        )
    })?;

    Ok((steps, last.to_string(), target))
}

fn field_type(def: &EntityDefinition, name: &str) -> Option<TargetType> {
    match name {
        system::ID => return Some(TargetType::Int),
        system::PUBLISHED_AT | system::UPDATED_AT => return Some(TargetType::Datetime),
        system::PUBLICATION_STATUS => return Some(TargetType::Text),
        _ => {}
    }

    if let Some(attr) = def.get_attribute(name) {
        let target = match attr.data_type {
            DataType::Int => TargetType::Int,
            DataType::Decimal => TargetType::Decimal,
            DataType::Text => TargetType::Text,
            DataType::Bool => TargetType::Bool,
            DataType::Datetime => TargetType::Datetime,
        };
        return Some(target);
    }

    // A terminal lookup reads as the stored foreign id.
    if let Some(relation) = def.get_relation(name)
        && !relation.is_to_many()
    {
        return Some(TargetType::Int);
    }

    None
}

fn check_operator(path: &str, op: FilterOp, target: TargetType) -> Result<(), Error> {
    if op.is_textual() && target != TargetType::Text {
        return Err(Error::invalid_path(
            path,
            &format!("operator {op:?} requires a text field"),
        ));
    }

    if op.is_temporal() && target != TargetType::Datetime {
        return Err(Error::invalid_path(
            path,
            &format!("operator {op:?} requires a datetime field"),
        ));
    }

    Ok(())
}

fn compile_operand(
    path: &str,
    op: FilterOp,
    target: TargetType,
    value: Option<&serde_json::Value>,
) -> Result<Value, Error> {
    if op.is_nullary() {
        return Ok(Value::Null);
    }

    let value = value.ok_or_else(|| {
        Error::invalid_path(path, &format!("operator {op:?} requires an operand"))
    })?;

    if op.takes_set() {
        let items = value.as_array().ok_or_else(|| {
            Error::invalid_path(path, &format!("operator {op:?} takes a list operand"))
        })?;
        let coerced = items
            .iter()
            .map(|item| coerce_scalar_operand(path, target, item))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Value::List(coerced));
    }

    coerce_scalar_operand(path, target, value)
}

fn coerce_scalar_operand(
    path: &str,
    target: TargetType,
    value: &serde_json::Value,
) -> Result<Value, Error> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let mismatch =
        || Error::invalid_path(path, &format!("operand {value} does not fit a {target:?} field"));

    match target {
        TargetType::Int => value.as_i64().map(Value::Int).ok_or_else(mismatch),
        TargetType::Decimal => value.as_f64().map(Value::decimal).ok_or_else(mismatch),
        TargetType::Text => value
            .as_str()
            .map(Value::text)
            .ok_or_else(mismatch),
        TargetType::Bool => value.as_bool().map(Value::Bool).ok_or_else(mismatch),
        TargetType::Datetime => {
            let raw = value.as_str().ok_or_else(mismatch)?;
            Timestamp::parse(raw)
                .map(Value::Timestamp)
                .map_err(|reason| Error::invalid_path(path, &reason))
        }
    }
}

///
/// TESTS
///
