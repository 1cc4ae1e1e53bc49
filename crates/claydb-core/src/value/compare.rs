use crate::value::{Value, ValueTag};
use std::cmp::Ordering;

///
/// Value ordering
///
/// Total order used by sorting, cursor boundaries, and range operators.
/// Int and Decimal compare within one numeric family; everything else
/// compares within its own tag, and mixed tags fall back to tag rank.
/// Not exposed as `Ord` because numeric cross-family equality (2 == 2.0
/// under this order) would disagree with the derived `Eq`.
///

#[must_use]
pub fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Decimal(x), Value::Decimal(y)) => x.0.total_cmp(&y.0),
        #[allow(clippy::cast_precision_loss)]
        (Value::Int(x), Value::Decimal(y)) => (*x as f64).total_cmp(&y.0),
        #[allow(clippy::cast_precision_loss)]
        (Value::Decimal(x), Value::Int(y)) => x.0.total_cmp(&(*y as f64)),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Timestamp(x), Value::Timestamp(y)) => x.cmp(y),
        (Value::List(x), Value::List(y)) => compare_slices(x, y),
        (Value::Map(x), Value::Map(y)) => compare_entries(x, y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn compare_slices(a: &[Value], b: &[Value]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = compare(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

fn compare_entries(a: &[(String, Value)], b: &[(String, Value)]) -> Ordering {
    for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
        let ord = ka.cmp(kb).then_with(|| compare(va, vb));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

const fn rank(value: &Value) -> ValueTag {
    value.tag()
}

///
/// TESTS
///
