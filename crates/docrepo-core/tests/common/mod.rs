#![allow(dead_code)]

use docrepo_core::{
    config::RepositoryConfig,
    entity::{EntityKind, EntityModel},
    repository::RepositoryFactory,
};
use serde::{Deserialize, Serialize};
use std::sync::Once;

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness, filtered by `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn factory() -> RepositoryFactory {
    init_tracing();
    RepositoryFactory::new(RepositoryConfig::default()).expect("default config is valid")
}

///
/// Address
///

pub static ADDRESS: EntityModel = EntityModel::new("tests::Address", "addresses")
    .with_id_field("postalCode")
    .with_partition_key("city")
    .with_fields(&["postalCode", "street", "city"]);

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub postal_code: String,
    pub street: String,
    pub city: String,
}

impl Address {
    pub fn new(postal_code: &str, street: &str, city: &str) -> Self {
        Self {
            postal_code: postal_code.to_string(),
            street: street.to_string(),
            city: city.to_string(),
        }
    }

    /// Four addresses: two in city A, one each in B and C.
    pub fn seed() -> Vec<Self> {
        vec![
            Self::new("111", "North", "A"),
            Self::new("222", "East", "A"),
            Self::new("333", "South", "B"),
            Self::new("444", "West", "C"),
        ]
    }
}

impl EntityKind for Address {
    const MODEL: &'static EntityModel = &ADDRESS;
}

///
/// Course
///

pub static COURSE: EntityModel = EntityModel::new("tests::Course", "courses")
    .with_id_field("courseId")
    .with_partition_key("department")
    .with_fields(&["courseId", "name", "department"]);

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub course_id: String,
    pub name: String,
    pub department: String,
}

impl Course {
    pub fn new(course_id: &str, name: &str, department: &str) -> Self {
        Self {
            course_id: course_id.to_string(),
            name: name.to_string(),
            department: department.to_string(),
        }
    }
}

impl EntityKind for Course {
    const MODEL: &'static EntityModel = &COURSE;
}
