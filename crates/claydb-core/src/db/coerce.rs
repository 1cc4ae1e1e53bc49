use crate::{
    error::Error,
    types::Timestamp,
    value::{Value, compare, json_to_value},
};
use claydb_schema::{
    attribute::{Attribute, DataType},
    entity::EntityDefinition,
    rule::{CmpOp, Cond, Operand, Rule},
    system,
};
use std::collections::BTreeMap;

///
/// Write-boundary coercion & rule evaluation
///
/// Submitted JSON is interpreted against the entity definition here: each
/// provided field must name an attribute or a lookup relation, values are
/// coerced to the declared semantic type, and validation rules run against
/// the candidate values before anything touches the store.
///

/// Coerce a write payload into candidate attribute values.
pub fn coerce_fields(
    def: &EntityDefinition,
    input: &serde_json::Value,
) -> Result<BTreeMap<String, Value>, Error> {
    let object = input.as_object().ok_or_else(|| {
        Error::ValidationFailure("write payload must be a JSON object".to_string())
    })?;

    let mut out = BTreeMap::new();
    for (name, json) in object {
        if system::ALL.contains(&name.as_str()) {
            return Err(Error::ValidationFailure(format!(
                "system attribute '{name}' cannot be written directly"
            )));
        }

        if let Some(attr) = def.get_attribute(name) {
            out.insert(name.clone(), coerce_attribute(attr, json)?);
            continue;
        }

        // Lookup relations store their target id under the relation name.
        if let Some(relation) = def.get_relation(name) {
            if relation.is_to_many() {
                return Err(Error::ValidationFailure(format!(
                    "relation '{name}' is managed through relation operations, not record writes"
                )));
            }
            out.insert(name.clone(), coerce_reference(name, json)?);
            continue;
        }

        return Err(Error::ValidationFailure(format!(
            "unknown attribute '{name}' on entity '{}'",
            def.name
        )));
    }

    Ok(out)
}

fn coerce_reference(name: &str, json: &serde_json::Value) -> Result<Value, Error> {
    if json.is_null() {
        return Ok(Value::Null);
    }

    json.as_i64().map(Value::Int).ok_or_else(|| {
        Error::ValidationFailure(format!("relation '{name}' expects a record id"))
    })
}

fn coerce_attribute(attr: &Attribute, json: &serde_json::Value) -> Result<Value, Error> {
    if json.is_null() {
        return Ok(Value::Null);
    }

    if attr.display_type.is_list() {
        let items = json.as_array().ok_or_else(|| mismatch(attr, "a list"))?;
        let coerced = items
            .iter()
            .map(|item| coerce_scalar(attr, item))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Value::List(coerced));
    }

    if attr.display_type.is_map() {
        let entries = json.as_object().ok_or_else(|| mismatch(attr, "an object"))?;
        return Ok(Value::map(
            entries.iter().map(|(k, v)| (k.clone(), json_to_value(v))),
        ));
    }

    coerce_scalar(attr, json)
}

fn coerce_scalar(attr: &Attribute, json: &serde_json::Value) -> Result<Value, Error> {
    if json.is_null() {
        return Ok(Value::Null);
    }

    match attr.data_type {
        DataType::Text => {
            let text = json.as_str().ok_or_else(|| mismatch(attr, "text"))?;
            if !attr.choice_allowed(text) {
                return Err(Error::ValidationFailure(format!(
                    "'{text}' is not one of the declared choices for attribute '{}'",
                    attr.name
                )));
            }
            Ok(Value::text(text))
        }
        DataType::Int => json
            .as_i64()
            .map(Value::Int)
            .ok_or_else(|| mismatch(attr, "an integer")),
        DataType::Decimal => json
            .as_f64()
            .map(Value::decimal)
            .ok_or_else(|| mismatch(attr, "a number")),
        DataType::Bool => json
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| mismatch(attr, "a boolean")),
        DataType::Datetime => {
            let raw = json.as_str().ok_or_else(|| mismatch(attr, "a datetime"))?;
            Timestamp::parse(raw)
                .map(Value::Timestamp)
                .map_err(Error::ValidationFailure)
        }
    }
}

fn mismatch(attr: &Attribute, expected: &str) -> Error {
    Error::ValidationFailure(format!(
        "attribute '{}' expects {expected} value",
        attr.name
    ))
}

/// Run validation rules against candidate values.
///
/// Inserts evaluate every ruled attribute (absent reads as null); updates
/// restrict to the attributes the patch touches. The first non-empty rule
/// message aborts the write, carried verbatim.
pub fn check_rules(
    def: &EntityDefinition,
    candidate: &BTreeMap<String, Value>,
    patch_only: bool,
) -> Result<(), Error> {
    for attr in &def.attributes {
        let Some(rule) = &attr.validation else {
            continue;
        };
        if patch_only && !candidate.contains_key(&attr.name) {
            continue;
        }

        let value = candidate.get(&attr.name).unwrap_or(&Value::Null);
        let message = eval_rule(rule, value);
        if !message.is_empty() {
            return Err(Error::ValidationFailure(message));
        }
    }

    Ok(())
}

/// The title attribute must carry a value on insert.
pub fn check_title(
    def: &EntityDefinition,
    candidate: &BTreeMap<String, Value>,
) -> Result<(), Error> {
    let present = candidate
        .get(&def.title_attribute)
        .is_some_and(|v| !v.is_null());
    if present {
        Ok(())
    } else {
        Err(Error::ValidationFailure(format!(
            "title attribute '{}' must have a value",
            def.title_attribute
        )))
    }
}

fn eval_rule(rule: &Rule, value: &Value) -> String {
    let branch = if eval_cond(&rule.cond, value) {
        &rule.on_true
    } else {
        &rule.on_false
    };
    branch.clone()
}

fn eval_cond(cond: &Cond, value: &Value) -> bool {
    match cond {
        Cond::Compare { lhs, op, rhs } => {
            let lhs = operand_value(lhs, value);
            let rhs = operand_value(rhs, value);
            eval_cmp(*op, &lhs, &rhs)
        }
        Cond::Matches { pattern, .. } => value.as_text().is_some_and(|text| {
            regex::Regex::new(pattern).is_ok_and(|re| re.is_match(text))
        }),
        Cond::LenGt { min, .. } => value
            .as_text()
            .is_some_and(|text| text.chars().count() as i64 > *min),
        Cond::LenLt { max, .. } => value
            .as_text()
            .is_some_and(|text| (text.chars().count() as i64) < *max),
        Cond::Not(inner) => !eval_cond(inner, value),
    }
}

fn operand_value(operand: &Operand, value: &Value) -> Value {
    match operand {
        Operand::Attribute(_) => value.clone(),
        Operand::Text(s) => Value::text(s.clone()),
        Operand::Number(n) => Value::Int(*n),
        Operand::Null => Value::Null,
    }
}

fn eval_cmp(op: CmpOp, lhs: &Value, rhs: &Value) -> bool {
    use std::cmp::Ordering;

    let null_involved = lhs.is_null() || rhs.is_null();
    match op {
        CmpOp::Eq => {
            if null_involved {
                return lhs.is_null() && rhs.is_null();
            }
            compare(lhs, rhs) == Ordering::Equal
        }
        CmpOp::Ne => {
            if null_involved {
                return !(lhs.is_null() && rhs.is_null());
            }
            compare(lhs, rhs) != Ordering::Equal
        }
        CmpOp::Lt => !null_involved && compare(lhs, rhs) == Ordering::Less,
        CmpOp::Lte => !null_involved && compare(lhs, rhs) != Ordering::Greater,
        CmpOp::Gt => !null_involved && compare(lhs, rhs) == Ordering::Greater,
        CmpOp::Gte => !null_involved && compare(lhs, rhs) != Ordering::Less,
    }
}

///
/// TESTS
///
