//! Deterministic SHA-256 over the paging-relevant shape of a query.
#![expect(clippy::cast_possible_truncation)]

use crate::{
    cursor::codec::encode_hex,
    query::{Criteria, Direction, DocumentQuery},
    value::Value,
};
use sha2::{Digest, Sha256};
use std::fmt;

const SIGNATURE_VERSION: u8 = 1;

///
/// ShapeSignature
///
/// Hash of collection, criteria, sort, partition-key restriction and page
/// size. The store continuation itself is excluded.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ShapeSignature([u8; 32]);

impl ShapeSignature {
    #[must_use]
    pub fn compute(
        collection: &str,
        query: &DocumentQuery,
        partition_key: Option<&Value>,
        page_size: u32,
    ) -> Self {
        let mut hasher = Sha256::new();
        write_tag(&mut hasher, SIGNATURE_VERSION);
        write_str(&mut hasher, collection);

        match query.criteria() {
            Some(criteria) => {
                write_tag(&mut hasher, 0x01);
                write_criteria(&mut hasher, criteria);
            }
            None => write_tag(&mut hasher, 0x00),
        }

        let orders = query.sort().orders();
        write_u32(&mut hasher, orders.len() as u32);
        for order in orders {
            write_str(&mut hasher, &order.property);
            write_tag(
                &mut hasher,
                match order.direction {
                    Direction::Asc => 0x01,
                    Direction::Desc => 0x02,
                },
            );
        }

        match partition_key {
            Some(value) => {
                write_tag(&mut hasher, 0x01);
                write_value(&mut hasher, &value.normalized());
            }
            None => write_tag(&mut hasher, 0x00),
        }
        write_u32(&mut hasher, page_size);

        Self(hasher.finalize().into())
    }

    pub(crate) const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub(crate) const fn into_bytes(self) -> [u8; 32] {
        self.0
    }

    #[must_use]
    pub fn as_hex(&self) -> String {
        encode_hex(&self.0)
    }
}

impl fmt::Display for ShapeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_hex())
    }
}

fn write_criteria(hasher: &mut Sha256, criteria: &Criteria) {
    match criteria {
        Criteria::Leaf {
            subject,
            kind,
            operands,
            ignore_case,
        } => {
            write_tag(hasher, 0x10);
            write_str(hasher, subject);
            write_tag(hasher, kind.tag());
            write_tag(hasher, u8::from(*ignore_case));
            write_u32(hasher, operands.len() as u32);
            for operand in operands {
                write_value(hasher, operand);
            }
        }
        Criteria::Node {
            connector,
            left,
            right,
        } => {
            write_tag(hasher, 0x20);
            write_str(hasher, connector.as_sql());
            write_criteria(hasher, left);
            write_criteria(hasher, right);
        }
    }
}

fn write_value(hasher: &mut Sha256, value: &Value) {
    match value {
        Value::Null => write_tag(hasher, 0x00),
        Value::Bool(b) => {
            write_tag(hasher, 0x01);
            write_tag(hasher, u8::from(*b));
        }
        Value::Int(i) => {
            write_tag(hasher, 0x02);
            hasher.update(i.to_be_bytes());
        }
        Value::Uint(u) => {
            write_tag(hasher, 0x03);
            hasher.update(u.to_be_bytes());
        }
        Value::Float64(f) => {
            write_tag(hasher, 0x04);
            hasher.update(f.to_bits().to_be_bytes());
        }
        Value::Text(s) => {
            write_tag(hasher, 0x05);
            write_str(hasher, s);
        }
        Value::List(items) => {
            write_tag(hasher, 0x06);
            write_u32(hasher, items.len() as u32);
            for item in items {
                write_value(hasher, item);
            }
        }
        Value::Map(map) => {
            write_tag(hasher, 0x07);
            write_u32(hasher, map.len() as u32);
            for (key, item) in map {
                write_str(hasher, key);
                write_value(hasher, item);
            }
        }
    }
}

fn write_str(hasher: &mut Sha256, value: &str) {
    write_u32(hasher, value.len() as u32);
    hasher.update(value.as_bytes());
}

fn write_u32(hasher: &mut Sha256, value: u32) {
    hasher.update(value.to_be_bytes());
}

fn write_tag(hasher: &mut Sha256, tag: u8) {
    hasher.update([tag]);
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{CriteriaType, Sort};

    fn city(value: &str) -> DocumentQuery {
        DocumentQuery::new(Some(
            Criteria::leaf("city", CriteriaType::Equal, vec![Value::from(value)], false).unwrap(),
        ))
    }

    #[test]
    fn signature_is_deterministic() {
        let a = ShapeSignature::compute("addresses", &city("A"), None, 3);
        let b = ShapeSignature::compute("addresses", &city("A"), None, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn every_shape_component_changes_the_signature() {
        let base = ShapeSignature::compute("addresses", &city("A"), None, 3);
        let pk = Value::from("A");

        assert_ne!(base, ShapeSignature::compute("people", &city("A"), None, 3));
        assert_ne!(base, ShapeSignature::compute("addresses", &city("B"), None, 3));
        assert_ne!(base, ShapeSignature::compute("addresses", &city("A"), Some(&pk), 3));
        assert_ne!(base, ShapeSignature::compute("addresses", &city("A"), None, 1));
        assert_ne!(
            base,
            ShapeSignature::compute("addresses", &city("A").with_sort(Sort::asc("street")), None, 3)
        );
    }

    #[test]
    fn partition_key_is_signed_by_value() {
        let signed = Value::Int(7);
        let unsigned = Value::Uint(7);

        assert_eq!(
            ShapeSignature::compute("addresses", &city("A"), Some(&signed), 3),
            ShapeSignature::compute("addresses", &city("A"), Some(&unsigned), 3)
        );
    }
}
