//! Entity ↔ document conversion.

use crate::{
    error::{ErrorOrigin, InternalError},
    storage::Document,
};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error as ThisError;

///
/// ConvertError
///

#[derive(Debug, ThisError)]
pub enum ConvertError {
    #[error("failed to write '{entity}' as a document: {source}")]
    Write {
        entity: &'static str,
        source: serde_json::Error,
    },

    #[error("failed to read '{entity}' from a document: {source}")]
    Read {
        entity: &'static str,
        source: serde_json::Error,
    },

    #[error("'{entity}' did not serialize to a JSON object")]
    NotAnObject { entity: &'static str },
}

impl From<ConvertError> for InternalError {
    fn from(err: ConvertError) -> Self {
        Self::new(
            crate::error::ErrorClass::Internal,
            ErrorOrigin::Convert,
            err.to_string(),
        )
    }
}

///
/// EntityConverter
///
/// Bidirectional mapping between domain values and stored documents.
/// `entity` is the entity path used in diagnostics.
///

pub trait EntityConverter: Send + Sync {
    fn to_document<T: Serialize>(
        &self,
        entity: &'static str,
        value: &T,
    ) -> Result<Document, ConvertError>;

    fn from_document<T: DeserializeOwned>(
        &self,
        entity: &'static str,
        document: Document,
    ) -> Result<T, ConvertError>;
}

///
/// JsonConverter
/// serde_json mapping; entities must serialize to JSON objects.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct JsonConverter;

impl EntityConverter for JsonConverter {
    fn to_document<T: Serialize>(
        &self,
        entity: &'static str,
        value: &T,
    ) -> Result<Document, ConvertError> {
        let json =
            serde_json::to_value(value).map_err(|source| ConvertError::Write { entity, source })?;
        if !json.is_object() {
            return Err(ConvertError::NotAnObject { entity });
        }

        Ok(Document::new(json))
    }

    fn from_document<T: DeserializeOwned>(
        &self,
        entity: &'static str,
        document: Document,
    ) -> Result<T, ConvertError> {
        serde_json::from_value(document.into_json())
            .map_err(|source| ConvertError::Read { entity, source })
    }
}

///
/// TESTS
///
