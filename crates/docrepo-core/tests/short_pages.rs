mod common;

use async_trait::async_trait;
use common::{Address, factory};
use docrepo_core::{
    error::ErrorClass,
    query::DocumentQuery,
    repository::{MethodSignature, ReactiveRepository, Repository, ReturnShape},
    storage::{
        CollectionSpec, Document, DocumentStore, FeedOptions, FeedPage, MemoryStore,
        ReactiveDocumentStore, StorageError,
    },
    value::Value,
};
use futures::TryStreamExt;
use std::sync::Arc;

///
/// ShortPages
///
/// Serves an empty first page that still carries a continuation, then one
/// document per page.
///

#[derive(Debug, Default)]
struct ShortPages {
    inner: MemoryStore,
}

impl ShortPages {
    fn page(
        &self,
        collection: &CollectionSpec,
        query: &DocumentQuery,
        options: &FeedOptions,
    ) -> Result<FeedPage, StorageError> {
        if options.continuation.is_none() {
            return Ok(FeedPage {
                items: Vec::new(),
                continuation: Some("0".to_string()),
            });
        }

        let options = FeedOptions {
            max_item_count: 1,
            ..options.clone()
        };
        DocumentStore::query_page(&self.inner, collection, query, &options)
    }
}

impl DocumentStore for ShortPages {
    fn ensure_collection(&self, collection: &CollectionSpec) -> Result<(), StorageError> {
        DocumentStore::ensure_collection(&self.inner, collection)
    }

    fn query_page(
        &self,
        collection: &CollectionSpec,
        query: &DocumentQuery,
        options: &FeedOptions,
    ) -> Result<FeedPage, StorageError> {
        self.page(collection, query, options)
    }

    fn count(
        &self,
        collection: &CollectionSpec,
        query: &DocumentQuery,
        partition_key: Option<&Value>,
    ) -> Result<u64, StorageError> {
        DocumentStore::count(&self.inner, collection, query, partition_key)
    }

    fn read(
        &self,
        collection: &CollectionSpec,
        id: &str,
        partition_key: Option<&Value>,
    ) -> Result<Option<Document>, StorageError> {
        DocumentStore::read(&self.inner, collection, id, partition_key)
    }

    fn upsert(
        &self,
        collection: &CollectionSpec,
        document: Document,
    ) -> Result<Document, StorageError> {
        DocumentStore::upsert(&self.inner, collection, document)
    }

    fn delete(
        &self,
        collection: &CollectionSpec,
        id: &str,
        partition_key: Option<&Value>,
    ) -> Result<(), StorageError> {
        DocumentStore::delete(&self.inner, collection, id, partition_key)
    }

    fn delete_all(&self, collection: &CollectionSpec) -> Result<u64, StorageError> {
        DocumentStore::delete_all(&self.inner, collection)
    }
}

#[async_trait]
impl ReactiveDocumentStore for ShortPages {
    async fn ensure_collection(&self, collection: &CollectionSpec) -> Result<(), StorageError> {
        DocumentStore::ensure_collection(self, collection)
    }

    async fn query_page(
        &self,
        collection: &CollectionSpec,
        query: &DocumentQuery,
        options: &FeedOptions,
    ) -> Result<FeedPage, StorageError> {
        self.page(collection, query, options)
    }

    async fn count(
        &self,
        collection: &CollectionSpec,
        query: &DocumentQuery,
        partition_key: Option<&Value>,
    ) -> Result<u64, StorageError> {
        DocumentStore::count(self, collection, query, partition_key)
    }

    async fn read(
        &self,
        collection: &CollectionSpec,
        id: &str,
        partition_key: Option<&Value>,
    ) -> Result<Option<Document>, StorageError> {
        DocumentStore::read(self, collection, id, partition_key)
    }

    async fn upsert(
        &self,
        collection: &CollectionSpec,
        document: Document,
    ) -> Result<Document, StorageError> {
        DocumentStore::upsert(self, collection, document)
    }

    async fn delete(
        &self,
        collection: &CollectionSpec,
        id: &str,
        partition_key: Option<&Value>,
    ) -> Result<(), StorageError> {
        DocumentStore::delete(self, collection, id, partition_key)
    }

    async fn delete_all(&self, collection: &CollectionSpec) -> Result<u64, StorageError> {
        DocumentStore::delete_all(self, collection)
    }
}

fn seed() -> Vec<Address> {
    vec![
        Address::new("1", "North", "A"),
        Address::new("2", "North", "B"),
        Address::new("3", "South", "A"),
    ]
}

fn signatures() -> Vec<MethodSignature> {
    vec![
        MethodSignature::new("findByStreet", ReturnShape::Single).value(),
        MethodSignature::new("existsByStreet", ReturnShape::Exists).value(),
        MethodSignature::new("deleteByStreet", ReturnShape::Many).value(),
    ]
}

fn blocking() -> Repository<Address, ShortPages> {
    let builder = signatures()
        .into_iter()
        .fold(factory().builder::<Address>().unwrap(), |b, sig| b.method(sig));
    let repo = builder.build(Arc::new(ShortPages::default())).unwrap();
    repo.save_all(&seed()).unwrap();

    repo
}

async fn reactive() -> ReactiveRepository<Address, ShortPages> {
    let builder = signatures()
        .into_iter()
        .fold(factory().builder::<Address>().unwrap(), |b, sig| b.method(sig));
    let repo = builder.build_reactive(Arc::new(ShortPages::default())).await.unwrap();
    repo.save_all(&seed()).try_collect::<Vec<_>>().await.unwrap();

    repo
}

#[test]
fn single_entity_reads_past_short_pages() {
    let repo = blocking();

    let err = repo.find_one("findByStreet", vec!["North".into()]).unwrap_err();
    assert_eq!(err.class, ErrorClass::IncorrectResultSize);

    let south = repo.find_one("findByStreet", vec!["South".into()]).unwrap();
    assert_eq!(south, Some(Address::new("3", "South", "A")));
}

#[test]
fn exists_reads_past_an_empty_first_page() {
    let repo = blocking();

    assert!(repo.exists_by("existsByStreet", vec!["South".into()]).unwrap());
    assert!(!repo.exists_by("existsByStreet", vec!["Nowhere".into()]).unwrap());
}

#[test]
fn delete_drains_short_pages() {
    let repo = blocking();

    let removed = repo.delete_by("deleteByStreet", vec!["North".into()]).unwrap();
    assert_eq!(removed.len(), 2);
    assert_eq!(repo.count().unwrap(), 1);
}

#[tokio::test]
async fn reactive_reads_follow_continuations() {
    let repo = reactive().await;

    let err = repo
        .find_one("findByStreet", vec!["North".into()])
        .unwrap()
        .await
        .unwrap_err();
    assert_eq!(err.class, ErrorClass::IncorrectResultSize);

    assert!(repo.exists_by("existsByStreet", vec!["South".into()]).unwrap().await.unwrap());
}

#[tokio::test]
async fn reactive_delete_follows_empty_pages() {
    let repo = reactive().await;

    let removed: Vec<Address> = repo
        .delete_by("deleteByStreet", vec!["North".into()])
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(removed.len(), 2);
    assert_eq!(repo.count().await.unwrap(), 1);
}
