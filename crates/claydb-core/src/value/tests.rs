use crate::value::{compare, json_to_value, value_to_json, Value};
use proptest::prelude::*;
use std::cmp::Ordering;

fn scalar_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| Value::Int(n.into())),
        any::<f64>().prop_map(Value::decimal),
        "[a-z]{0,12}".prop_map(Value::Text),
        (0u64..=4_102_444_800_000_000)
            .prop_map(|us| Value::Timestamp(crate::types::Timestamp::from_micros(us))),
    ]
}

proptest! {
    #[test]
    fn compare_is_a_total_order(a in scalar_value(), b in scalar_value(), c in scalar_value()) {
        // Antisymmetry.
        prop_assert_eq!(compare(&a, &b), compare(&b, &a).reverse());

        // Transitivity over one triple.
        if compare(&a, &b) != Ordering::Greater && compare(&b, &c) != Ordering::Greater {
            prop_assert_ne!(compare(&a, &c), Ordering::Greater);
        }
    }

    #[test]
    fn compare_is_reflexive(a in scalar_value()) {
        prop_assert_eq!(compare(&a, &a), Ordering::Equal);
    }

    #[test]
    fn cbor_round_trip(a in scalar_value()) {
        let bytes = serde_cbor::to_vec(&a).unwrap();
        let back: Value = serde_cbor::from_slice(&bytes).unwrap();
        prop_assert_eq!(a, back);
    }
}

#[test]
fn json_round_trip_preserves_dictionary_ints() {
    let json = serde_json::json!({"a": 1, "b": 2});
    let value = json_to_value(&json);
    assert_eq!(value_to_json(&value), json);
}
