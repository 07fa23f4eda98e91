use crate::{
    DEFAULT_FEED_PAGE_SIZE,
    query::{Connector, Criteria, CriteriaType, Direction, DocumentQuery, Sort},
    storage::{
        CollectionSpec, Document, DocumentStore, FeedOptions, FeedPage, ReactiveDocumentStore,
        StorageError,
    },
    value::{TextOp, Value, canonical_cmp, compare_eq, compare_order, compare_text},
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::{
    cmp::Ordering,
    collections::BTreeMap,
    sync::atomic::{AtomicU64, Ordering as AtomicOrdering},
};

///
/// MemoryStore
///
/// In-process document store. Documents keep insertion order; an upsert
/// of an existing (id, partition key) replaces the document in place.
/// Store continuations are decimal offsets into the filtered, sorted feed.
///

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, Collection>>,
    unavailable: Mutex<Option<String>>,
    feed_requests: AtomicU64,
}

#[derive(Debug)]
struct Collection {
    id_field: &'static str,
    partition_key: Option<&'static str>,
    documents: Vec<StoredDocument>,
}

#[derive(Debug)]
struct StoredDocument {
    id: String,
    partition_key: Option<Value>,
    document: Document,
}

impl StoredDocument {
    fn in_partition(&self, partition_key: &Value) -> bool {
        self.partition_key
            .as_ref()
            .is_some_and(|stored| compare_eq(stored, partition_key, false))
    }
}

impl Collection {
    const fn new(spec: &CollectionSpec) -> Self {
        Self {
            id_field: spec.id_field,
            partition_key: spec.partition_key,
            documents: Vec::new(),
        }
    }

    fn position(&self, id: &str, partition_key: Option<&Value>) -> Option<usize> {
        self.documents.iter().position(|stored| {
            stored.id == id && partition_key.is_none_or(|pk| stored.in_partition(pk))
        })
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`StorageError::Unavailable`],
    /// or restore service with `None`.
    pub fn set_unavailable(&self, reason: Option<&str>) {
        *self.unavailable.lock() = reason.map(str::to_string);
    }

    /// Number of feed pages served so far.
    #[must_use]
    pub fn feed_requests(&self) -> u64 {
        self.feed_requests.load(AtomicOrdering::Relaxed)
    }

    /// Number of documents currently stored in `collection`.
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, |c| c.documents.len())
    }

    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn check_available(&self) -> Result<(), StorageError> {
        match self.unavailable.lock().as_ref() {
            Some(reason) => Err(StorageError::Unavailable {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn matching(
        &self,
        collection: &CollectionSpec,
        query: &DocumentQuery,
        partition_key: Option<&Value>,
    ) -> Vec<Document> {
        let collections = self.collections.read();
        let Some(stored) = collections.get(&collection.name) else {
            return Vec::new();
        };

        let mut matched: Vec<Document> = stored
            .documents
            .iter()
            .filter(|doc| partition_key.is_none_or(|pk| doc.in_partition(pk)))
            .filter(|doc| query.criteria().is_none_or(|c| evaluate(c, &doc.document)))
            .map(|doc| doc.document.clone())
            .collect();

        sort_documents(&mut matched, query.sort());
        matched
    }
}

impl DocumentStore for MemoryStore {
    fn ensure_collection(&self, collection: &CollectionSpec) -> Result<(), StorageError> {
        self.check_available()?;
        self.collections
            .write()
            .entry(collection.name.clone())
            .or_insert_with(|| Collection::new(collection));

        Ok(())
    }

    fn query_page(
        &self,
        collection: &CollectionSpec,
        query: &DocumentQuery,
        options: &FeedOptions,
    ) -> Result<FeedPage, StorageError> {
        self.check_available()?;
        self.feed_requests.fetch_add(1, AtomicOrdering::Relaxed);

        let offset = match options.continuation.as_deref() {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| StorageError::InvalidContinuation {
                    continuation: token.to_string(),
                })?,
            None => 0,
        };
        let size = if options.max_item_count == 0 {
            DEFAULT_FEED_PAGE_SIZE
        } else {
            options.max_item_count
        };
        let size = usize::try_from(size).unwrap_or(usize::MAX);

        let matched = self.matching(collection, query, options.partition_key.as_ref());
        let end = offset.saturating_add(size).min(matched.len());
        let items = matched.get(offset..end).map(<[Document]>::to_vec).unwrap_or_default();
        let continuation = (end < matched.len()).then(|| end.to_string());

        Ok(FeedPage {
            items,
            continuation,
        })
    }

    fn count(
        &self,
        collection: &CollectionSpec,
        query: &DocumentQuery,
        partition_key: Option<&Value>,
    ) -> Result<u64, StorageError> {
        self.check_available()?;

        Ok(self.matching(collection, query, partition_key).len() as u64)
    }

    fn read(
        &self,
        collection: &CollectionSpec,
        id: &str,
        partition_key: Option<&Value>,
    ) -> Result<Option<Document>, StorageError> {
        self.check_available()?;

        let collections = self.collections.read();
        Ok(collections.get(&collection.name).and_then(|stored| {
            stored
                .position(id, partition_key)
                .map(|idx| stored.documents[idx].document.clone())
        }))
    }

    fn upsert(
        &self,
        collection: &CollectionSpec,
        document: Document,
    ) -> Result<Document, StorageError> {
        self.check_available()?;

        let mut collections = self.collections.write();
        let stored = collections
            .entry(collection.name.clone())
            .or_insert_with(|| Collection::new(collection));

        let id = document
            .id(stored.id_field)
            .ok_or_else(|| StorageError::InvalidDocument {
                collection: collection.name.clone(),
                reason: format!("missing string id field '{}'", stored.id_field),
            })?
            .to_string();
        let partition_key = stored
            .partition_key
            .and_then(|field| document.value_at(field))
            .map(|pk| pk.normalized());

        let entry = StoredDocument {
            id,
            partition_key,
            document: document.clone(),
        };
        let existing = stored
            .documents
            .iter()
            .position(|d| {
                d.id == entry.id
                    && match &entry.partition_key {
                        Some(pk) => d.in_partition(pk),
                        None => d.partition_key.is_none(),
                    }
            });

        match existing {
            Some(idx) => stored.documents[idx] = entry,
            None => stored.documents.push(entry),
        }

        Ok(document)
    }

    fn delete(
        &self,
        collection: &CollectionSpec,
        id: &str,
        partition_key: Option<&Value>,
    ) -> Result<(), StorageError> {
        self.check_available()?;

        if collection.partition_key.is_some() && partition_key.is_none() {
            return Err(StorageError::PartitionKeyRequired {
                collection: collection.name.clone(),
            });
        }

        let mut collections = self.collections.write();
        let position = collections
            .get(&collection.name)
            .and_then(|stored| stored.position(id, partition_key));

        match (collections.get_mut(&collection.name), position) {
            (Some(stored), Some(idx)) => {
                stored.documents.remove(idx);
                Ok(())
            }
            _ => Err(StorageError::NotFound {
                collection: collection.name.clone(),
                id: id.to_string(),
            }),
        }
    }

    fn delete_all(&self, collection: &CollectionSpec) -> Result<u64, StorageError> {
        self.check_available()?;

        let mut collections = self.collections.write();
        let removed = collections
            .get_mut(&collection.name)
            .map_or(0, |stored| std::mem::take(&mut stored.documents).len());

        Ok(removed as u64)
    }
}

#[async_trait]
impl ReactiveDocumentStore for MemoryStore {
    async fn ensure_collection(&self, collection: &CollectionSpec) -> Result<(), StorageError> {
        DocumentStore::ensure_collection(self, collection)
    }

    async fn query_page(
        &self,
        collection: &CollectionSpec,
        query: &DocumentQuery,
        options: &FeedOptions,
    ) -> Result<FeedPage, StorageError> {
        DocumentStore::query_page(self, collection, query, options)
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

//
// Criteria evaluation
//

fn evaluate(criteria: &Criteria, document: &Document) -> bool {
    match criteria {
        Criteria::Node {
            connector,
            left,
            right,
        } => match connector {
            Connector::And => evaluate(left, document) && evaluate(right, document),
            Connector::Or => evaluate(left, document) || evaluate(right, document),
        },
        Criteria::Leaf {
            subject,
            kind,
            operands,
            ignore_case,
        } => evaluate_leaf(document.value_at(subject), *kind, operands, *ignore_case),
    }
}

// `field` is `None` when the path is undefined on the document.
// Comparisons against an undefined field are false; `IsNotNull` holds.
fn evaluate_leaf(
    field: Option<Value>,
    kind: CriteriaType,
    operands: &[Value],
    ignore_case: bool,
) -> bool {
    let operand = operands.first();

    match kind {
        CriteriaType::IsNull => field.is_some_and(|v| v.is_null()),
        CriteriaType::IsNotNull => !field.is_some_and(|v| v.is_null()),
        CriteriaType::Exists => field.is_some(),
        CriteriaType::True => field == Some(Value::Bool(true)),
        CriteriaType::False => field == Some(Value::Bool(false)),
        _ => {
            let Some(field) = field else {
                return false;
            };
            evaluate_defined(&field, kind, operand, operands, ignore_case)
        }
    }
}

fn evaluate_defined(
    field: &Value,
    kind: CriteriaType,
    operand: Option<&Value>,
    operands: &[Value],
    ignore_case: bool,
) -> bool {
    let ordered = |accept: fn(Ordering) -> bool| {
        operand
            .and_then(|op| compare_order(field, op))
            .is_some_and(accept)
    };

    match kind {
        CriteriaType::Equal => operand.is_some_and(|op| compare_eq(field, op, ignore_case)),
        CriteriaType::NotEqual => operand.is_some_and(|op| !compare_eq(field, op, ignore_case)),
        CriteriaType::LessThan => ordered(Ordering::is_lt),
        CriteriaType::LessThanEqual => ordered(Ordering::is_le),
        CriteriaType::GreaterThan => ordered(Ordering::is_gt),
        CriteriaType::GreaterThanEqual => ordered(Ordering::is_ge),
        CriteriaType::Between => match operands {
            [low, high] => {
                compare_order(field, low).is_some_and(Ordering::is_ge)
                    && compare_order(field, high).is_some_and(Ordering::is_le)
            }
            _ => false,
        },
        CriteriaType::In => operands.iter().any(|op| compare_eq(field, op, ignore_case)),
        CriteriaType::NotIn => !operands.iter().any(|op| compare_eq(field, op, ignore_case)),
        CriteriaType::Containing => operand.is_some_and(|op| contains(field, op, ignore_case)),
        CriteriaType::NotContaining => operand.is_some_and(|op| !contains(field, op, ignore_case)),
        CriteriaType::StartsWith => {
            operand.is_some_and(|op| compare_text(field, op, TextOp::StartsWith, ignore_case))
        }
        CriteriaType::EndsWith => {
            operand.is_some_and(|op| compare_text(field, op, TextOp::EndsWith, ignore_case))
        }
        CriteriaType::IsNull
        | CriteriaType::IsNotNull
        | CriteriaType::Exists
        | CriteriaType::True
        | CriteriaType::False => false,
    }
}

// Substring match on text fields, element match on array fields.
fn contains(field: &Value, operand: &Value, ignore_case: bool) -> bool {
    match field {
        Value::List(items) => items.iter().any(|item| compare_eq(item, operand, ignore_case)),
        _ => compare_text(field, operand, TextOp::Contains, ignore_case),
    }
}

fn sort_documents(documents: &mut [Document], sort: &Sort) {
    if !sort.is_sorted() {
        return;
    }

    documents.sort_by(|a, b| {
        for order in sort.orders() {
            let left = a.value_at(&order.property);
            let right = b.value_at(&order.property);
            let ord = match (&left, &right) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(l), Some(r)) => canonical_cmp(l, r),
            };
            let ord = match order.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }

        Ordering::Equal
    });
}

///
/// TESTS
///
