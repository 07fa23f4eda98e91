use crate::value::Value;
use std::cmp::Ordering;

/// Total canonical comparator used for document ordering.
///
/// Ordering rules:
/// 1. Canonical variant rank (null < bool < number < text < list < map)
/// 2. Variant-specific comparison for same-ranked values
///
/// Numbers of different representations compare by numeric value.
#[must_use]
pub fn canonical_cmp(left: &Value, right: &Value) -> Ordering {
    let rank = left.canonical_rank().cmp(&right.canonical_rank());
    if rank != Ordering::Equal {
        return rank;
    }

    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Text(a), Value::Text(b)) => a.cmp(b),
        (Value::List(a), Value::List(b)) => canonical_cmp_list(a, b),
        (Value::Map(a), Value::Map(b)) => a.len().cmp(&b.len()),
        _ => compare_numeric(left, right).unwrap_or(Ordering::Equal),
    }
}

fn canonical_cmp_list(left: &[Value], right: &[Value]) -> Ordering {
    for (left, right) in left.iter().zip(right.iter()) {
        let cmp = canonical_cmp(left, right);
        if cmp != Ordering::Equal {
            return cmp;
        }
    }

    left.len().cmp(&right.len())
}

/// Ordering comparison for predicate evaluation.
///
/// Returns `None` for mismatched or non-orderable variants; such pairs
/// never satisfy a range predicate.
#[must_use]
pub fn compare_order(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        _ if left.is_numeric() && right.is_numeric() => compare_numeric(left, right),
        _ => None,
    }
}

/// Equality comparison for predicate evaluation.
#[must_use]
pub fn compare_eq(left: &Value, right: &Value, ignore_case: bool) -> bool {
    match (left, right) {
        (Value::Text(a), Value::Text(b)) if ignore_case => a.to_lowercase() == b.to_lowercase(),
        _ if left.is_numeric() && right.is_numeric() => {
            compare_numeric(left, right) == Some(Ordering::Equal)
        }
        _ => left == right,
    }
}

///
/// TextOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TextOp {
    Contains,
    StartsWith,
    EndsWith,
}

/// Text operator evaluation; non-text operands never match.
#[must_use]
pub fn compare_text(left: &Value, right: &Value, op: TextOp, ignore_case: bool) -> bool {
    let (Some(haystack), Some(needle)) = (left.as_text(), right.as_text()) else {
        return false;
    };

    let (haystack, needle) = if ignore_case {
        (haystack.to_lowercase(), needle.to_lowercase())
    } else {
        (haystack.to_string(), needle.to_string())
    };

    match op {
        TextOp::Contains => haystack.contains(&needle),
        TextOp::StartsWith => haystack.starts_with(&needle),
        TextOp::EndsWith => haystack.ends_with(&needle),
    }
}

#[allow(clippy::cast_precision_loss)]
fn compare_numeric(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Uint(a), Value::Uint(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Uint(b)) => Some(i128::from(*a).cmp(&i128::from(*b))),
        (Value::Uint(a), Value::Int(b)) => Some(i128::from(*a).cmp(&i128::from(*b))),
        (Value::Float64(a), Value::Float64(b)) => a.partial_cmp(b),
        (Value::Float64(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Float64(a), Value::Uint(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Int(a), Value::Float64(b)) => (*a as f64).partial_cmp(b),
        (Value::Uint(a), Value::Float64(b)) => (*a as f64).partial_cmp(b),
        _ => None,
    }
}
