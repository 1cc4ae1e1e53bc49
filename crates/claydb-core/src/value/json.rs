use crate::value::{Decimal, Value};
use serde_json::Value as Json;

///
/// JSON boundary conversion
///
/// Schema-free mapping between `Value` and `serde_json::Value`. Write-side
/// coercion (which consults the attribute's declared types) lives in
/// `db::coerce`; this module is the untyped fallback used for dictionary
/// entries, filter operands, and the response surface.
///

/// Untyped JSON → Value.
#[must_use]
pub fn json_to_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => n.as_i64().map_or_else(
            || Value::Decimal(Decimal(n.as_f64().unwrap_or(f64::NAN))),
            Value::Int,
        ),
        Json::String(s) => Value::Text(s.clone()),
        Json::Array(items) => Value::List(items.iter().map(json_to_value).collect()),
        Json::Object(entries) => Value::map(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), json_to_value(v))),
        ),
    }
}

/// Value → response JSON. Timestamps render as RFC-3339 strings.
#[must_use]
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(n) => Json::from(*n),
        Value::Decimal(d) => {
            serde_json::Number::from_f64(d.0).map_or(Json::Null, Json::Number)
        }
        Value::Text(s) => Json::String(s.clone()),
        Value::Timestamp(ts) => Json::String(ts.to_rfc3339()),
        Value::List(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Map(entries) => Json::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
    }
}

///
/// TESTS
///
