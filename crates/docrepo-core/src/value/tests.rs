use super::*;
use std::cmp::Ordering;

#[test]
fn json_integers_keep_exact_representation() {
    let json = serde_json::json!({ "a": 7, "b": u64::MAX, "c": 1.5 });
    let Value::Map(map) = Value::from_json(&json) else {
        panic!("expected map value");
    };

    assert_eq!(map["a"], Value::Int(7));
    assert_eq!(map["b"], Value::Uint(u64::MAX));
    assert_eq!(map["c"], Value::Float64(1.5));
}

#[test]
fn numeric_equality_widens_across_representations() {
    assert!(compare_eq(&Value::Int(3), &Value::Uint(3), false));
    assert!(compare_eq(&Value::Float64(3.0), &Value::Int(3), false));
    assert!(!compare_eq(&Value::Int(-1), &Value::Uint(u64::MAX), false));
}

#[test]
fn normalized_folds_unsigned_into_json_representation() {
    assert_eq!(Value::from(5u32).normalized(), Value::from_json(&serde_json::json!(5)));
    assert_eq!(Value::Uint(u64::MAX).normalized(), Value::Uint(u64::MAX));
    assert_eq!(
        Value::List(vec![Value::Uint(1), Value::from("a")]).normalized(),
        Value::List(vec![Value::Int(1), Value::from("a")])
    );
}

#[test]
fn text_equality_honours_ignore_case() {
    let left = Value::from("Seattle");
    let right = Value::from("SEATTLE");

    assert!(!compare_eq(&left, &right, false));
    assert!(compare_eq(&left, &right, true));
}

#[test]
fn mismatched_variants_are_not_orderable() {
    assert_eq!(compare_order(&Value::from("a"), &Value::Int(1)), None);
    assert_eq!(
        compare_order(&Value::Int(1), &Value::Float64(2.5)),
        Some(Ordering::Less)
    );
}

#[test]
fn canonical_cmp_ranks_null_before_everything() {
    let mut values = vec![
        Value::from("b"),
        Value::Int(2),
        Value::Null,
        Value::Bool(true),
        Value::from("a"),
    ];
    values.sort_by(canonical_cmp);

    assert_eq!(
        values,
        vec![
            Value::Null,
            Value::Bool(true),
            Value::Int(2),
            Value::from("a"),
            Value::from("b"),
        ]
    );
}

#[test]
fn text_ops_reject_non_text_operands() {
    assert!(!compare_text(&Value::Int(10), &Value::from("1"), TextOp::StartsWith, false));
    assert!(compare_text(
        &Value::from("Department2"),
        &Value::from("DEPART"),
        TextOp::StartsWith,
        true
    ));
}
