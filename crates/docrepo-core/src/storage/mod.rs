//! Storage collaborator contracts.
//!
//! The repository layer talks to a document store through these traits
//! only. [`MemoryStore`] implements both for tests and local runs.

mod memory;

pub use memory::MemoryStore;

use crate::{
    error::InternalError,
    query::DocumentQuery,
    value::Value,
};
use async_trait::async_trait;
use derive_more::Deref;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Document
///
/// One stored JSON document.
///

#[derive(Clone, Debug, Deref, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Document(serde_json::Value);

impl Document {
    #[must_use]
    pub const fn new(json: serde_json::Value) -> Self {
        Self(json)
    }

    #[must_use]
    pub fn into_json(self) -> serde_json::Value {
        self.0
    }

    /// String id stored under `field`.
    #[must_use]
    pub fn id(&self, field: &str) -> Option<&str> {
        self.0.get(field)?.as_str()
    }

    /// JSON node at a dot-separated path. `None` when any segment is missing.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<&serde_json::Value> {
        path.split('.')
            .try_fold(&self.0, |node, segment| node.get(segment))
    }

    /// Operand view of the node at `path`; `None` when the path is undefined.
    #[must_use]
    pub fn value_at(&self, path: &str) -> Option<Value> {
        self.lookup(path).map(Value::from_json)
    }
}

///
/// CollectionSpec
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CollectionSpec {
    pub name: String,
    pub id_field: &'static str,
    pub partition_key: Option<&'static str>,
}

///
/// FeedOptions
/// Per-call feed controls for one page of query results.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeedOptions {
    pub max_item_count: u32,
    pub continuation: Option<String>,
    pub partition_key: Option<Value>,
}

///
/// FeedPage
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeedPage {
    pub items: Vec<Document>,
    /// Store-native continuation; absent once the feed is exhausted.
    pub continuation: Option<String>,
}

///
/// StorageError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum StorageError {
    #[error("document '{id}' not found in '{collection}'")]
    NotFound { collection: String, id: String },

    #[error("collection '{collection}' is partitioned; a partition key is required")]
    PartitionKeyRequired { collection: String },

    #[error("invalid document for '{collection}': {reason}")]
    InvalidDocument { collection: String, reason: String },

    #[error("invalid store continuation '{continuation}'")]
    InvalidContinuation { continuation: String },

    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl From<StorageError> for InternalError {
    fn from(err: StorageError) -> Self {
        Self::storage_access(err.to_string())
    }
}

///
/// DocumentStore
///
/// Blocking document-store contract.
///

pub trait DocumentStore: Send + Sync {
    fn ensure_collection(&self, collection: &CollectionSpec) -> Result<(), StorageError>;

    /// One page of documents matching `query`, in the query's sort order.
    fn query_page(
        &self,
        collection: &CollectionSpec,
        query: &DocumentQuery,
        options: &FeedOptions,
    ) -> Result<FeedPage, StorageError>;

    fn count(
        &self,
        collection: &CollectionSpec,
        query: &DocumentQuery,
        partition_key: Option<&Value>,
    ) -> Result<u64, StorageError>;

    /// Read one document. `Ok(None)` is not-found.
    fn read(
        &self,
        collection: &CollectionSpec,
        id: &str,
        partition_key: Option<&Value>,
    ) -> Result<Option<Document>, StorageError>;

    fn upsert(&self, collection: &CollectionSpec, document: Document)
    -> Result<Document, StorageError>;

    /// Delete one document. A missing document is [`StorageError::NotFound`].
    fn delete(
        &self,
        collection: &CollectionSpec,
        id: &str,
        partition_key: Option<&Value>,
    ) -> Result<(), StorageError>;

    fn delete_all(&self, collection: &CollectionSpec) -> Result<u64, StorageError>;
}

///
/// ReactiveDocumentStore
///
/// Asynchronous mirror of [`DocumentStore`].
///

#[async_trait]
pub trait ReactiveDocumentStore: Send + Sync {
    async fn ensure_collection(&self, collection: &CollectionSpec) -> Result<(), StorageError>;

    async fn query_page(
        &self,
        collection: &CollectionSpec,
        query: &DocumentQuery,
        options: &FeedOptions,
    ) -> Result<FeedPage, StorageError>;

    async fn count(
        &self,
        collection: &CollectionSpec,
        query: &DocumentQuery,
        partition_key: Option<&Value>,
    ) -> Result<u64, StorageError>;

    async fn read(
        &self,
        collection: &CollectionSpec,
        id: &str,
        partition_key: Option<&Value>,
    ) -> Result<Option<Document>, StorageError>;

    async fn upsert(
        &self,
        collection: &CollectionSpec,
        document: Document,
    ) -> Result<Document, StorageError>;

    async fn delete(
        &self,
        collection: &CollectionSpec,
        id: &str,
        partition_key: Option<&Value>,
    ) -> Result<(), StorageError>;

    async fn delete_all(&self, collection: &CollectionSpec) -> Result<u64, StorageError>;
}
