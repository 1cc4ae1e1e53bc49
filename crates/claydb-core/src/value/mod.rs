mod compare;
mod json;

#[cfg(test)]
mod tests;

pub use compare::compare;
pub use json::{json_to_value, value_to_json};

use crate::types::Timestamp;
use serde::{Deserialize, Serialize};

///
/// Decimal
///
/// Bit-stable f64 wrapper so `Value` stays `Eq`; ordering is IEEE total
/// order (see `compare`).
///

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Decimal(pub f64);

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Decimal {}

///
/// Value
///
/// Runtime attribute value. Records are open string-keyed maps of these;
/// the declared `DataType`/`DisplayType` pair decides which shapes a given
/// attribute accepts at the write boundary.
///
/// Null → the attribute has no value (SQL NULL).
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Text(String),
    Timestamp(Timestamp),
    /// Ordered list; used for multiselect/gallery attributes.
    List(Vec<Self>),
    /// Canonical map: entries sorted by key, keys unique.
    Map(Vec<(String, Self)>),
    Null,
}

impl Value {
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    #[must_use]
    pub const fn decimal(f: f64) -> Self {
        Self::Decimal(Decimal(f))
    }

    /// Build a canonical map: entries sorted by key, first occurrence of a
    /// duplicate key wins.
    #[must_use]
    pub fn map(entries: impl IntoIterator<Item = (String, Self)>) -> Self {
        let mut entries: Vec<(String, Self)> = entries.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.dedup_by(|a, b| a.0 == b.0);
        Self::Map(entries)
    }

    #[must_use]
    pub const fn tag(&self) -> ValueTag {
        match self {
            Self::Bool(_) => ValueTag::Bool,
            Self::Int(_) => ValueTag::Int,
            Self::Decimal(_) => ValueTag::Decimal,
            Self::Text(_) => ValueTag::Text,
            Self::Timestamp(_) => ValueTag::Timestamp,
            Self::List(_) => ValueTag::List,
            Self::Map(_) => ValueTag::Map,
            Self::Null => ValueTag::Null,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Record-id view: ids are non-negative ints.
    #[must_use]
    pub const fn as_id(&self) -> Option<u64> {
        match self {
            Self::Int(n) if *n >= 0 => Some(n.unsigned_abs()),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Timestamp> for Value {
    fn from(ts: Timestamp) -> Self {
        Self::Timestamp(ts)
    }
}

///
/// ValueTag
///
/// Rank order is the cross-type sort order when a column holds mixed tags;
/// Null sorts first so absent values group together.
///

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum ValueTag {
    Null,
    Bool,
    Int,
    Decimal,
    Timestamp,
    Text,
    List,
    Map,
}

impl std::fmt::Display for ValueTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Decimal => "decimal",
            Self::Timestamp => "timestamp",
            Self::Text => "text",
            Self::List => "list",
            Self::Map => "map",
        };
        f.write_str(label)
    }
}
