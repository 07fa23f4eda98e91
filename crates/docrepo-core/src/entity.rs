//! Entity metadata: the static model each persisted type declares, and the
//! resolved per-repository information derived from it.

use crate::{
    error::{ErrorOrigin, InternalError},
    expression::ExpressionResolver,
    storage::{CollectionSpec, Document},
    value::Value,
};
use serde::{Serialize, de::DeserializeOwned};

///
/// EntityModel
///
/// Static description of one persisted entity type.
/// `collection` may carry `${..}` / `#{..}` expressions; it is resolved once
/// per repository through an [`ExpressionResolver`].
///

#[derive(Debug)]
pub struct EntityModel {
    pub path: &'static str,
    pub collection: &'static str,
    pub id_field: &'static str,
    pub partition_key: Option<&'static str>,
    /// Queryable property paths, dot-separated for nested documents.
    /// Empty means "accept any property verbatim".
    pub fields: &'static [&'static str],
}

impl EntityModel {
    #[must_use]
    pub const fn new(path: &'static str, collection: &'static str) -> Self {
        Self {
            path,
            collection,
            id_field: "id",
            partition_key: None,
            fields: &[],
        }
    }

    #[must_use]
    pub const fn with_id_field(mut self, id_field: &'static str) -> Self {
        self.id_field = id_field;
        self
    }

    #[must_use]
    pub const fn with_partition_key(mut self, field: &'static str) -> Self {
        self.partition_key = Some(field);
        self
    }

    #[must_use]
    pub const fn with_fields(mut self, fields: &'static [&'static str]) -> Self {
        self.fields = fields;
        self
    }

    #[must_use]
    pub const fn declares_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Resolve a capitalised property expression from a method name
    /// (`AddressCity`, `Address_City`) to a declared property path.
    #[must_use]
    pub fn resolve_property(&self, expression: &str) -> Option<String> {
        let explicit: Vec<&str> = expression.split('_').filter(|s| !s.is_empty()).collect();
        if explicit.is_empty() {
            return None;
        }

        if !self.declares_fields() {
            let path: Vec<String> = explicit.iter().map(|s| uncapitalize(s)).collect();
            return Some(path.join("."));
        }

        self.fields
            .iter()
            .find(|field| field_matches(field, &explicit))
            .map(|field| (*field).to_string())
    }
}

// Match a declared path against `_`-separated expression segments.
// A single segment matches the camel-joined path; several segments must
// align with the path segments one to one.
fn field_matches(field: &str, explicit: &[&str]) -> bool {
    let segments: Vec<&str> = field.split('.').collect();

    if let [single] = explicit {
        let joined: String = segments.iter().map(|s| capitalize(s)).collect();
        return joined == capitalize(single);
    }

    segments.len() == explicit.len()
        && segments
            .iter()
            .zip(explicit)
            .all(|(seg, exp)| capitalize(seg) == capitalize(exp))
}

pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

pub(crate) fn uncapitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_lowercase().chain(chars).collect()
    })
}

///
/// EntityKind
///
/// Ties a Rust type to its static [`EntityModel`].
///

pub trait EntityKind: Serialize + DeserializeOwned + Send + Sync + 'static {
    const MODEL: &'static EntityModel;
}

///
/// EntityInformation
///
/// Entity model plus the collection name resolved for this repository.
/// Resolution happens once; every query method built for the repository
/// shares the cached name.
///

#[derive(Clone, Debug)]
pub struct EntityInformation {
    model: &'static EntityModel,
    collection_name: String,
}

impl EntityInformation {
    pub fn resolve(
        model: &'static EntityModel,
        resolver: &ExpressionResolver,
    ) -> Result<Self, InternalError> {
        let collection_name = resolver.resolve(model.collection)?;

        Ok(Self {
            model,
            collection_name,
        })
    }

    #[must_use]
    pub const fn model(&self) -> &'static EntityModel {
        self.model
    }

    #[must_use]
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    #[must_use]
    pub const fn id_field(&self) -> &'static str {
        self.model.id_field
    }

    #[must_use]
    pub const fn partition_key_field(&self) -> Option<&'static str> {
        self.model.partition_key
    }

    #[must_use]
    pub fn collection_spec(&self) -> CollectionSpec {
        CollectionSpec {
            name: self.collection_name.clone(),
            id_field: self.model.id_field,
            partition_key: self.model.partition_key,
        }
    }

    /// Read the document id through the model's id field.
    pub fn id_of(&self, document: &Document) -> Result<String, InternalError> {
        document
            .id(self.model.id_field)
            .map(str::to_string)
            .ok_or_else(|| {
                InternalError::invalid_argument(
                    ErrorOrigin::Convert,
                    format!(
                        "document for '{}' has no string id field '{}'",
                        self.model.path, self.model.id_field
                    ),
                )
            })
    }

    /// Read the partition-key value, if the collection is partitioned.
    #[must_use]
    pub fn partition_key_of(&self, document: &Document) -> Option<Value> {
        self.model
            .partition_key
            .and_then(|field| document.value_at(field))
    }
}

///
/// TESTS
///
