mod compile;
mod eval;
mod filter;
mod sort;
mod window;

pub use compile::{CompiledFilter, CompiledQuery, compile_query};
pub use eval::{RelationSource, evaluate_filter};
pub use filter::{FilterClause, FilterNode, FilterOp};
pub use sort::{CompiledSortField, SortField, SortOrder, order_records};
pub(in crate::db) use sort::after_boundary;
pub(in crate::db) use window::{PageWindow, compute_page_window};

use claydb_schema::version::SchemaMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// QueryMode
///
/// Default sees published schema + published data; preview sees published
/// schema + unpublished data; sandbox sees the latest (possibly draft)
/// schema without relaxing data visibility.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryMode {
    #[default]
    Default,
    Preview,
    Sandbox,
}

impl QueryMode {
    #[must_use]
    pub const fn schema_mode(self) -> SchemaMode {
        match self {
            Self::Default | Self::Preview => SchemaMode::Default,
            Self::Sandbox => SchemaMode::Sandbox,
        }
    }
}

///
/// ResponseMode
///
/// Rows only, count only, or (absent) both.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseMode {
    Items,
    Count,
}

///
/// FieldSelection
///
/// One selected field; relation selections nest. An empty selection list
/// on the query selects every scalar attribute plus the system attributes.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FieldSelection {
    pub field: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selections: Vec<FieldSelection>,
}

impl FieldSelection {
    #[must_use]
    pub fn leaf(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            selections: Vec::new(),
        }
    }

    #[must_use]
    pub fn nested(field: impl Into<String>, selections: Vec<Self>) -> Self {
        Self {
            field: field.into(),
            selections,
        }
    }
}

///
/// RelationArgs
///
/// Per-relation-path windowing (`relationName.limit` and a relation-keyed
/// continuation cursor).
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

///
/// ListQuery
///
/// The structured query request consumed from the transport layer.
/// Offset and cursor pagination are mutually exclusive.
///

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub entity: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSelection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_expr: Option<FilterNode>,

    #[serde(default)]
    pub distinct: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortField>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,

    #[serde(default)]
    pub mode: QueryMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mode: Option<ResponseMode>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relation_args: BTreeMap<String, RelationArgs>,
}

impl ListQuery {
    #[must_use]
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn select(mut self, fields: Vec<FieldSelection>) -> Self {
        self.fields = fields;
        self
    }

    #[must_use]
    pub fn filter(mut self, node: FilterNode) -> Self {
        self.filter_expr = Some(node);
        self
    }

    #[must_use]
    pub const fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push(SortField {
            field: field.into(),
            order,
        });
        self
    }

    #[must_use]
    pub const fn page(mut self, offset: u64, limit: u64) -> Self {
        self.offset = Some(offset);
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn after(mut self, cursor: impl Into<String>, limit: u64) -> Self {
        self.cursor = Some(cursor.into());
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn in_mode(mut self, mode: QueryMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub const fn respond(mut self, mode: ResponseMode) -> Self {
        self.response_mode = Some(mode);
        self
    }

    #[must_use]
    pub fn relation_limit(mut self, relation: impl Into<String>, limit: u64) -> Self {
        self.relation_args.entry(relation.into()).or_default().limit = Some(limit);
        self
    }
}

///
/// TESTS
///
