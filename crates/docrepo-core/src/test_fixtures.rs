//! Shared entity models for unit tests.

use crate::entity::{EntityKind, EntityModel};
use serde::{Deserialize, Serialize};

pub(crate) static ADDRESS_MODEL: EntityModel =
    EntityModel::new("test_fixtures::Address", "addresses")
        .with_id_field("postalCode")
        .with_partition_key("city")
        .with_fields(&["postalCode", "street", "city"]);

pub(crate) static COURSE_MODEL: EntityModel = EntityModel::new("test_fixtures::Course", "courses")
    .with_id_field("courseId")
    .with_partition_key("department")
    .with_fields(&["courseId", "name", "department"]);

///
/// Address
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Address {
    pub(crate) postal_code: String,
    pub(crate) street: String,
    pub(crate) city: String,
}

impl Address {
    pub(crate) fn new(postal_code: &str, street: &str, city: &str) -> Self {
        Self {
            postal_code: postal_code.to_string(),
            street: street.to_string(),
            city: city.to_string(),
        }
    }
}

impl EntityKind for Address {
    const MODEL: &'static EntityModel = &ADDRESS_MODEL;
}

///
/// Course
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Course {
    pub(crate) course_id: String,
    pub(crate) name: String,
    pub(crate) department: String,
}

impl Course {
    pub(crate) fn new(course_id: &str, name: &str, department: &str) -> Self {
        Self {
            course_id: course_id.to_string(),
            name: name.to_string(),
            department: department.to_string(),
        }
    }
}

impl EntityKind for Course {
    const MODEL: &'static EntityModel = &COURSE_MODEL;
}
