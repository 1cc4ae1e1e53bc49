use serde::{Deserialize, Serialize};

///
/// FilterOp
///
/// The closed leaf-operator vocabulary. Date operators exclude the
/// boundary instant; `valueIn`/`valueNotIn` take a list operand.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOp {
    Equals,
    NotEquals,
    Lt,
    Lte,
    Gt,
    Gte,
    StartsWith,
    Contains,
    DateAfter,
    DateBefore,
    ValueIn,
    ValueNotIn,
    IsNull,
    IsNotNull,
}

impl FilterOp {
    /// Operators that carry no operand.
    #[must_use]
    pub const fn is_nullary(self) -> bool {
        matches!(self, Self::IsNull | Self::IsNotNull)
    }

    /// Operators whose operand must be a list.
    #[must_use]
    pub const fn takes_set(self) -> bool {
        matches!(self, Self::ValueIn | Self::ValueNotIn)
    }

    /// Operators restricted to text attributes.
    #[must_use]
    pub const fn is_textual(self) -> bool {
        matches!(self, Self::StartsWith | Self::Contains)
    }

    /// Operators restricted to datetime attributes.
    #[must_use]
    pub const fn is_temporal(self) -> bool {
        matches!(self, Self::DateAfter | Self::DateBefore)
    }
}

///
/// FilterClause
///
/// One leaf: a dot-separated field path (which may traverse relations),
/// an operator, and a JSON operand coerced against the target attribute
/// at compile time.
///

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    pub field: String,
    pub op: FilterOp,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

///
/// FilterNode
///
/// AND/OR groups over leaf clauses. The untagged representation keeps the
/// wire shape flat: `{"matchAll": [...]}` / `{"matchAny": [...]}` /
/// `{"field": ..., "op": ..., "value": ...}`.
///

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", untagged)]
pub enum FilterNode {
    All {
        #[serde(rename = "matchAll")]
        match_all: Vec<FilterNode>,
    },
    Any {
        #[serde(rename = "matchAny")]
        match_any: Vec<FilterNode>,
    },
    Clause(FilterClause),
}

impl FilterNode {
    #[must_use]
    pub fn all(nodes: Vec<Self>) -> Self {
        Self::All { match_all: nodes }
    }

    #[must_use]
    pub fn any(nodes: Vec<Self>) -> Self {
        Self::Any { match_any: nodes }
    }

    #[must_use]
    pub fn clause(field: impl Into<String>, op: FilterOp, value: serde_json::Value) -> Self {
        Self::Clause(FilterClause {
            field: field.into(),
            op,
            value: Some(value),
        })
    }

    #[must_use]
    pub fn nullary(field: impl Into<String>, op: FilterOp) -> Self {
        Self::Clause(FilterClause {
            field: field.into(),
            op,
            value: None,
        })
    }

    /// Leaf clauses in document order.
    #[must_use]
    pub fn clauses(&self) -> Vec<&FilterClause> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Self::All { match_all: nodes } | Self::Any { match_any: nodes } => {
                    stack.extend(nodes.iter().rev());
                }
                Self::Clause(clause) => out.push(clause),
            }
        }
        out
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn untagged_wire_forms_deserialize() {
        let node: FilterNode = serde_json::from_value(json!({
            "matchAll": [
                {"field": "name", "op": "startsWith", "value": "post"},
                {"matchAny": [
                    {"field": "id", "op": "gt", "value": 3},
                    {"field": "start", "op": "isNull"}
                ]}
            ]
        }))
        .unwrap();

        let clauses = node.clauses();
        assert_eq!(clauses.len(), 3);
        assert_eq!(clauses[0].field, "name");
        assert_eq!(clauses[2].op, FilterOp::IsNull);
        assert!(clauses[2].value.is_none());
    }

    #[test]
    fn operator_families() {
        assert!(FilterOp::IsNull.is_nullary());
        assert!(FilterOp::ValueIn.takes_set());
        assert!(FilterOp::StartsWith.is_textual());
        assert!(FilterOp::DateAfter.is_temporal());
        assert!(!FilterOp::Equals.is_textual());
    }

    #[test]
    fn round_trips_through_serde() {
        let node = FilterNode::any(vec![
            FilterNode::clause("a", FilterOp::Equals, json!(1)),
            FilterNode::nullary("b", FilterOp::IsNotNull),
        ]);
        let json = serde_json::to_value(&node).unwrap();
        let back: FilterNode = serde_json::from_value(json).unwrap();
        assert_eq!(node, back);
    }
}
