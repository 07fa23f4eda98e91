//! Execution dispatch: derivation kind → storage calls → shaped result.

use crate::{
    cursor::{ContinuationToken, CursorError, Page, PageRequest, ShapeSignature},
    entity::EntityInformation,
    error::{ErrorClass, ErrorOrigin, InternalError},
    obs::sink::{self, ExecKind, MetricsEvent, Span},
    query::{DocumentQuery, PartTree, SqlQuerySpec},
    repository::method::{QueryMethod, ReturnShape},
    storage::{CollectionSpec, Document, DocumentStore, FeedOptions, FeedPage},
    value::Value,
};

///
/// ExecutionMode
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecutionMode {
    Blocking,
    Reactive,
}

///
/// ExecutionKind
///
/// Closed set of execution strategies. Selection order is fixed:
/// delete, paged, exists, count, then single or multi entity by the
/// declared return shape.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecutionKind {
    Delete,
    Paged,
    Exists,
    Count,
    SingleEntity,
    MultiEntity,
}

impl ExecutionKind {
    #[must_use]
    pub fn select(tree: &PartTree, method: &QueryMethod) -> Self {
        if tree.is_delete() {
            Self::Delete
        } else if method.is_page_query() {
            Self::Paged
        } else if tree.is_exists() {
            Self::Exists
        } else if tree.is_count() {
            Self::Count
        } else if method.return_shape() == ReturnShape::Single {
            Self::SingleEntity
        } else {
            Self::MultiEntity
        }
    }

    pub(crate) const fn exec_kind(self) -> ExecKind {
        match self {
            Self::Delete => ExecKind::Delete,
            Self::Exists => ExecKind::Exists,
            Self::Count => ExecKind::Count,
            Self::Paged | Self::SingleEntity | Self::MultiEntity => ExecKind::Load,
        }
    }
}

///
/// QueryResult
///
/// Raw documents shaped by execution kind, before entity conversion.
///

#[derive(Clone, Debug, PartialEq)]
pub enum QueryResult {
    Many(Vec<Document>),
    One(Option<Document>),
    Page(Page<Document>),
    Count(u64),
    Exists(bool),
    /// Documents removed by a delete derivation, in match order.
    Deleted(Vec<Document>),
}

impl QueryResult {
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Many(_) => "many",
            Self::One(_) => "single",
            Self::Page(_) => "page",
            Self::Count(_) => "count",
            Self::Exists(_) => "exists",
            Self::Deleted(_) => "deleted",
        }
    }

    pub fn into_documents(self) -> Result<Vec<Document>, InternalError> {
        match self {
            Self::Many(docs) | Self::Deleted(docs) => Ok(docs),
            Self::One(doc) => Ok(doc.into_iter().collect()),
            other => Err(other.mismatch("documents")),
        }
    }

    pub fn into_single(self) -> Result<Option<Document>, InternalError> {
        match self {
            Self::One(doc) => Ok(doc),
            other => Err(other.mismatch("a single document")),
        }
    }

    pub fn into_page(self) -> Result<Page<Document>, InternalError> {
        match self {
            Self::Page(page) => Ok(page),
            other => Err(other.mismatch("a page")),
        }
    }

    pub fn into_count(self) -> Result<u64, InternalError> {
        match self {
            Self::Count(n) => Ok(n),
            Self::Deleted(docs) => Ok(docs.len() as u64),
            other => Err(other.mismatch("a count")),
        }
    }

    pub fn into_exists(self) -> Result<bool, InternalError> {
        match self {
            Self::Exists(found) => Ok(found),
            other => Err(other.mismatch("an existence flag")),
        }
    }

    fn mismatch(&self, wanted: &str) -> InternalError {
        InternalError::invalid_argument(
            ErrorOrigin::Repository,
            format!("method returns {}, caller asked for {wanted}", self.kind_label()),
        )
    }
}

///
/// QueryExecutor
///
/// Storage-facing half of a repository call. Holds no mutable state;
/// one executor serves any number of concurrent calls.
///

#[derive(Clone, Copy, Debug)]
pub(crate) struct QueryExecutor<'a> {
    entity: &'a EntityInformation,
    feed_page_size: u32,
    max_page_size: u32,
}

impl<'a> QueryExecutor<'a> {
    pub(crate) const fn new(
        entity: &'a EntityInformation,
        feed_page_size: u32,
        max_page_size: u32,
    ) -> Self {
        Self {
            entity,
            feed_page_size,
            max_page_size,
        }
    }

    pub(crate) fn entity_path(&self) -> &'static str {
        self.entity.model().path
    }

    /// Partition restriction for a query: the page request's explicit key,
    /// else an equality on the partition-key field pinned by the criteria.
    /// Returned in normalized form.
    pub(crate) fn partition_key(&self, query: &DocumentQuery) -> Option<Value> {
        if let Some(pk) = query.page().and_then(PageRequest::partition_key) {
            return Some(pk.normalized());
        }
        let field = self.entity.partition_key_field()?;

        query.pinned_partition_key(field).map(Value::normalized)
    }

    pub(crate) fn feed_options(&self, query: &DocumentQuery, max_item_count: u32) -> FeedOptions {
        FeedOptions {
            max_item_count,
            continuation: None,
            partition_key: self.partition_key(query),
        }
    }

    pub(crate) fn drain_options(&self, query: &DocumentQuery) -> FeedOptions {
        self.feed_options(query, self.feed_page_size)
    }

    /// Validate the page request and decode its continuation.
    pub(crate) fn page_plan(&self, query: &DocumentQuery) -> Result<PagePlan, InternalError> {
        let request = query
            .page()
            .ok_or_else(|| InternalError::executor_invariant("paged execution without a page request"))?
            .clone();
        if request.size() > self.max_page_size {
            return Err(CursorError::PageSizeTooLarge {
                size: request.size(),
                max: self.max_page_size,
            }
            .into());
        }

        let collection = self.entity.collection_name();
        let partition_key = self.partition_key(query);
        let signature =
            ShapeSignature::compute(collection, query, partition_key.as_ref(), request.size());
        let continuation = request
            .continuation()
            .map(|token| {
                ContinuationToken::decode_for(token, signature, collection)
                    .map(|decoded| decoded.store().to_string())
            })
            .transpose()?;

        Ok(PagePlan {
            options: FeedOptions {
                max_item_count: request.size(),
                continuation,
                partition_key,
            },
            signature,
            request,
        })
    }

    pub(crate) fn record_feed_page(&self, page: &FeedPage) {
        sink::record(MetricsEvent::FeedPage {
            entity_path: self.entity_path(),
            items: page.items.len() as u64,
        });
    }

    /// Account for a failed call; storage failures are counted and logged.
    pub(crate) fn record_failure(&self, err: &InternalError) {
        if err.is_storage_access() {
            sink::record(MetricsEvent::StorageError {
                entity_path: self.entity_path(),
            });
            tracing::warn!(
                entity = self.entity_path(),
                collection = self.entity.collection_name(),
                error = %err,
                "storage call failed"
            );
        }
    }

    /// Run one execution against a blocking store.
    pub(crate) fn execute<S: DocumentStore + ?Sized>(
        &self,
        store: &S,
        kind: ExecutionKind,
        query: &DocumentQuery,
    ) -> Result<QueryResult, InternalError> {
        let spec = self.entity.collection_spec();
        let mut span = Span::new(kind.exec_kind(), self.entity_path());
        tracing::debug!(
            collection = %spec.name,
            ?kind,
            sql = %SqlQuerySpec::select(query),
            "executing derived query"
        );

        let result = self
            .dispatch(store, &spec, kind, query)
            .inspect_err(|err| self.record_failure(err))?;
        span.set_rows(rows_touched(&result));

        Ok(result)
    }

    fn dispatch<S: DocumentStore + ?Sized>(
        &self,
        store: &S,
        spec: &CollectionSpec,
        kind: ExecutionKind,
        query: &DocumentQuery,
    ) -> Result<QueryResult, InternalError> {
        match kind {
            ExecutionKind::Delete => {
                let matched = self.drain(store, spec, query)?;
                for document in &matched {
                    self.delete_document(store, spec, document)?;
                }

                Ok(QueryResult::Deleted(matched))
            }
            ExecutionKind::Paged => {
                let plan = self.page_plan(query)?;
                let feed = store.query_page(spec, query, &plan.options)?;
                self.record_feed_page(&feed);

                Ok(QueryResult::Page(plan.finish(feed)?))
            }
            ExecutionKind::Exists => {
                let found = self.read_up_to(store, spec, query, 1)?;

                Ok(QueryResult::Exists(!found.is_empty()))
            }
            ExecutionKind::Count => {
                let partition_key = self.partition_key(query);
                let count = store.count(spec, query, partition_key.as_ref())?;

                Ok(QueryResult::Count(count))
            }
            ExecutionKind::SingleEntity => {
                let found = self.read_up_to(store, spec, query, 2)?;

                Ok(QueryResult::One(self.single(found)?))
            }
            ExecutionKind::MultiEntity => Ok(QueryResult::Many(self.drain(store, spec, query)?)),
        }
    }

    /// Follow store continuations until the feed is exhausted.
    pub(crate) fn drain<S: DocumentStore + ?Sized>(
        &self,
        store: &S,
        spec: &CollectionSpec,
        query: &DocumentQuery,
    ) -> Result<Vec<Document>, InternalError> {
        let mut options = self.drain_options(query);
        let mut out = Vec::new();

        loop {
            let feed = store.query_page(spec, query, &options)?;
            self.record_feed_page(&feed);
            out.extend(feed.items);

            match feed.continuation {
                Some(continuation) => options.continuation = Some(continuation),
                None => break,
            }
        }

        Ok(out)
    }

    /// Follow store continuations until `limit` documents are collected or
    /// the feed is exhausted. Pages may come back short or empty.
    fn read_up_to<S: DocumentStore + ?Sized>(
        &self,
        store: &S,
        spec: &CollectionSpec,
        query: &DocumentQuery,
        limit: u32,
    ) -> Result<Vec<Document>, InternalError> {
        let mut options = self.feed_options(query, limit);
        let mut out = Vec::new();

        while out.len() < limit as usize {
            let feed = store.query_page(spec, query, &options)?;
            self.record_feed_page(&feed);
            out.extend(feed.items);

            match feed.continuation {
                Some(continuation) => options.continuation = Some(continuation),
                None => break,
            }
        }

        Ok(out)
    }

    pub(crate) fn delete_document<S: DocumentStore + ?Sized>(
        &self,
        store: &S,
        spec: &CollectionSpec,
        document: &Document,
    ) -> Result<(), InternalError> {
        let id = self.entity.id_of(document)?;
        let partition_key = self.entity.partition_key_of(document);
        store.delete(spec, &id, partition_key.as_ref())?;

        Ok(())
    }

    /// At most one match for a single-entity method.
    pub(crate) fn single(&self, items: Vec<Document>) -> Result<Option<Document>, InternalError> {
        if items.len() > 1 {
            return Err(InternalError::new(
                ErrorClass::IncorrectResultSize,
                ErrorOrigin::Executor,
                format!(
                    "single-result query on '{}' matched more than one document",
                    self.entity_path()
                ),
            ));
        }

        Ok(items.into_iter().next())
    }
}

///
/// PagePlan
/// Feed options for one page plus what is needed to sign the next cursor.
///

#[derive(Debug)]
pub(crate) struct PagePlan {
    pub(crate) options: FeedOptions,
    signature: ShapeSignature,
    request: PageRequest,
}

impl PagePlan {
    pub(crate) fn finish(self, feed: FeedPage) -> Result<Page<Document>, InternalError> {
        let next = match feed.continuation {
            Some(store) => {
                let token = ContinuationToken::new(self.signature, store).encode()?;
                Some(self.request.next(token))
            }
            None => None,
        };

        Ok(Page::new(feed.items, self.request, next))
    }
}

pub(crate) fn rows_touched(result: &QueryResult) -> u64 {
    match result {
        QueryResult::Many(docs) | QueryResult::Deleted(docs) => docs.len() as u64,
        QueryResult::One(doc) => u64::from(doc.is_some()),
        QueryResult::Page(page) => page.len() as u64,
        QueryResult::Count(_) | QueryResult::Exists(_) => 0,
    }
}
