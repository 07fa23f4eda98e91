use crate::{
    convert::{EntityConverter, JsonConverter},
    entity::{EntityInformation, EntityKind},
    error::{ErrorOrigin, InternalError},
    obs::sink::{ExecKind, Span},
    query::{DocumentQuery, Sort},
    repository::{
        RepositoryCore,
        execution::{ExecutionKind, QueryExecutor},
        parameters::Arg,
        query::PartTreeQuery,
    },
    storage::{Document, ReactiveDocumentStore},
    value::Value,
};
use futures::{
    FutureExt, Stream, StreamExt, TryStreamExt,
    future::{self, BoxFuture},
    stream::BoxStream,
};
use serde::de::DeserializeOwned;
use std::{marker::PhantomData, sync::Arc};

/// Deferred multi-value result.
pub type ResultStream<T> = BoxStream<'static, Result<T, InternalError>>;

/// Deferred single-value result.
pub type ResultFuture<T> = BoxFuture<'static, Result<T, InternalError>>;

///
/// ReactiveResult
///
/// Lazily-subscribed result of a reactive derived query. Nothing touches
/// storage until the stream is polled or the future awaited.
///

pub enum ReactiveResult {
    Many(ResultStream<Document>),
    One(ResultFuture<Option<Document>>),
    Count(ResultFuture<u64>),
    Exists(ResultFuture<bool>),
}

impl ReactiveResult {
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Many(_) => "stream",
            Self::One(_) => "single",
            Self::Count(_) => "count",
            Self::Exists(_) => "exists",
        }
    }

    pub fn into_stream(self) -> Result<ResultStream<Document>, InternalError> {
        match self {
            Self::Many(stream) => Ok(stream),
            other => Err(other.mismatch("a stream")),
        }
    }

    pub fn into_single(self) -> Result<ResultFuture<Option<Document>>, InternalError> {
        match self {
            Self::One(single) => Ok(single),
            other => Err(other.mismatch("a single document")),
        }
    }

    /// A count, or the number of items a delete stream yields.
    pub fn into_count(self) -> Result<ResultFuture<u64>, InternalError> {
        match self {
            Self::Count(count) => Ok(count),
            Self::Many(stream) => Ok(stream
                .try_fold(0u64, |n, _| future::ok(n.saturating_add(1)))
                .boxed()),
            other => Err(other.mismatch("a count")),
        }
    }

    pub fn into_exists(self) -> Result<ResultFuture<bool>, InternalError> {
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

impl std::fmt::Debug for ReactiveResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ReactiveResult").field(&self.kind_label()).finish()
    }
}

///
/// ReactiveRepository
///
/// Asynchronous repository for one entity type. Translation happens at
/// call time; storage I/O is deferred to subscription. Dropping a stream
/// stops further feed requests but does not undo committed deletes.
///

pub struct ReactiveRepository<T, S, C = JsonConverter>
where
    T: EntityKind,
    S: ReactiveDocumentStore + ?Sized + 'static,
    C: EntityConverter + Clone + 'static,
{
    core: RepositoryCore,
    store: Arc<S>,
    converter: C,
    _marker: PhantomData<fn() -> T>,
}

impl<T, S, C> ReactiveRepository<T, S, C>
where
    T: EntityKind,
    S: ReactiveDocumentStore + ?Sized + 'static,
    C: EntityConverter + Clone + 'static,
{
    pub(crate) const fn new(core: RepositoryCore, store: Arc<S>, converter: C) -> Self {
        Self {
            core,
            store,
            converter,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn entity(&self) -> &EntityInformation {
        &self.core.entity
    }

    #[must_use]
    pub fn collection_name(&self) -> &str {
        self.core.entity.collection_name()
    }

    pub fn query(&self, method: &str) -> Result<&PartTreeQuery, InternalError> {
        self.core.query(method)
    }

    // ------------------------------------------------------------------
    // Derived queries
    // ------------------------------------------------------------------

    /// Translate a derived call and return its deferred result.
    ///
    /// Translation failures (unsupported shapes, bad arguments) are
    /// returned here, before any stream exists.
    pub fn invoke(&self, method: &str, args: Vec<Arg>) -> Result<ReactiveResult, InternalError> {
        let query = self.core.query(method)?;
        let document_query = query.create_query(args)?;
        let ctx = self.context();

        let result = match query.execution_kind() {
            ExecutionKind::Delete => ReactiveResult::Many(delete_stream(ctx, document_query).boxed()),
            ExecutionKind::MultiEntity => {
                ReactiveResult::Many(feed_stream(ctx, document_query).boxed())
            }
            ExecutionKind::SingleEntity => {
                ReactiveResult::One(read_single(ctx, document_query).boxed())
            }
            ExecutionKind::Exists => ReactiveResult::Exists(read_exists(ctx, document_query).boxed()),
            ExecutionKind::Count => ReactiveResult::Count(read_count(ctx, document_query).boxed()),
            ExecutionKind::Paged => {
                return Err(InternalError::unsupported(
                    ErrorOrigin::Repository,
                    format!("{method}: paging is not supported in reactive mode"),
                ));
            }
        };

        Ok(result)
    }

    pub fn find(&self, method: &str, args: Vec<Arg>) -> Result<ResultStream<T>, InternalError> {
        let stream = self.invoke(method, args)?.into_stream()?;

        Ok(self.convert_stream(stream))
    }

    pub fn find_one(
        &self,
        method: &str,
        args: Vec<Arg>,
    ) -> Result<ResultFuture<Option<T>>, InternalError> {
        let single = self.invoke(method, args)?.into_single()?;
        let (converter, path) = (self.converter.clone(), self.entity_path());

        Ok(async move {
            single
                .await?
                .map(|doc| decode(&converter, path, doc))
                .transpose()
        }
        .boxed())
    }

    pub fn count_by(&self, method: &str, args: Vec<Arg>) -> Result<ResultFuture<u64>, InternalError> {
        self.invoke(method, args)?.into_count()
    }

    pub fn exists_by(&self, method: &str, args: Vec<Arg>) -> Result<ResultFuture<bool>, InternalError> {
        self.invoke(method, args)?.into_exists()
    }

    /// Stream of removed entities; each is deleted before it is yielded.
    pub fn delete_by(&self, method: &str, args: Vec<Arg>) -> Result<ResultStream<T>, InternalError> {
        self.find(method, args)
    }

    // ------------------------------------------------------------------
    // CRUD
    // ------------------------------------------------------------------

    pub fn save(&self, entity: &T) -> ResultFuture<T> {
        let document = self.encode(entity);
        let (ctx, converter, path) = (self.context(), self.converter.clone(), self.entity_path());

        async move {
            let mut span = Span::new(ExecKind::Save, path);
            let stored = upsert(&ctx, document?).await?;
            span.set_rows(1);

            decode(&converter, path, stored)
        }
        .boxed()
    }

    /// Upsert each entity in order; the stream stops at the first failure.
    pub fn save_all<'a>(&self, entities: impl IntoIterator<Item = &'a T>) -> ResultStream<T> {
        let documents: Vec<_> = entities.into_iter().map(|e| self.encode(e)).collect();
        let (ctx, converter, path) = (self.context(), self.converter.clone(), self.entity_path());

        let stream = async_stream::try_stream! {
            let mut span = Span::new(ExecKind::Save, path);
            for document in documents {
                let stored = upsert(&ctx, document?).await?;
                span.add_rows(1);
                let entity = decode::<T, C>(&converter, path, stored)?;

                yield entity;
            }
        };

        stream.boxed()
    }

    pub fn find_by_id(&self, id: &str) -> ResultFuture<Option<T>> {
        self.read(id, None)
    }

    pub fn find_by_id_and_partition_key(
        &self,
        id: &str,
        partition_key: impl Into<Value>,
    ) -> ResultFuture<Option<T>> {
        self.read(id, Some(partition_key.into()))
    }

    pub fn exists_by_id(&self, id: &str) -> ResultFuture<bool> {
        let (ctx, id) = (self.context(), id.to_string());

        async move {
            let spec = ctx.entity.collection_spec();
            let found = ctx
                .store
                .read(&spec, &id, None)
                .await
                .map_err(InternalError::from)
                .inspect_err(|err| ctx.executor().record_failure(err))?;

            Ok(found.is_some())
        }
        .boxed()
    }

    pub fn find_all(&self) -> ResultStream<T> {
        self.find_all_sorted(Sort::unsorted())
    }

    pub fn find_all_sorted(&self, sort: Sort) -> ResultStream<T> {
        let query = DocumentQuery::all().with_sort(sort);

        self.convert_stream(feed_stream(self.context(), query).boxed())
    }

    pub fn count(&self) -> ResultFuture<u64> {
        read_count(self.context(), DocumentQuery::all()).boxed()
    }

    pub fn delete_by_id(&self, id: &str) -> ResultFuture<()> {
        remove(self.context(), id.to_string(), None).boxed()
    }

    pub fn delete_by_id_and_partition_key(
        &self,
        id: &str,
        partition_key: impl Into<Value>,
    ) -> ResultFuture<()> {
        remove(self.context(), id.to_string(), Some(partition_key.into())).boxed()
    }

    pub fn delete(&self, entity: &T) -> ResultFuture<()> {
        let target = self.encode(entity).and_then(|document| {
            let id = self.core.entity.id_of(&document)?;
            Ok((id, self.core.entity.partition_key_of(&document)))
        });
        let ctx = self.context();

        async move {
            let (id, partition_key) = target?;
            remove(ctx, id, partition_key).await
        }
        .boxed()
    }

    pub fn delete_all(&self) -> ResultFuture<u64> {
        let ctx = self.context();

        async move {
            let executor = ctx.executor();
            let mut span = Span::new(ExecKind::Delete, executor.entity_path());
            let removed = ctx
                .store
                .delete_all(&ctx.entity.collection_spec())
                .await
                .map_err(InternalError::from)
                .inspect_err(|err| executor.record_failure(err))?;
            span.set_rows(removed);

            Ok(removed)
        }
        .boxed()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn entity_path(&self) -> &'static str {
        self.core.entity.model().path
    }

    fn context(&self) -> Context<S> {
        Context {
            store: Arc::clone(&self.store),
            entity: Arc::clone(&self.core.entity),
            feed_page_size: self.core.feed_page_size,
            max_page_size: self.core.max_page_size,
        }
    }

    fn encode(&self, entity: &T) -> Result<Document, InternalError> {
        let document = self.converter.to_document(self.entity_path(), entity)?;
        self.core.entity.id_of(&document)?;

        Ok(document)
    }

    fn convert_stream(&self, stream: ResultStream<Document>) -> ResultStream<T> {
        let (converter, path) = (self.converter.clone(), self.entity_path());

        stream
            .map(move |item| item.and_then(|doc| decode(&converter, path, doc)))
            .boxed()
    }

    fn read(&self, id: &str, partition_key: Option<Value>) -> ResultFuture<Option<T>> {
        let (ctx, converter, path) = (self.context(), self.converter.clone(), self.entity_path());
        let id = id.to_string();

        async move {
            let executor = ctx.executor();
            let mut span = Span::new(ExecKind::Load, path);
            let found = ctx
                .store
                .read(&ctx.entity.collection_spec(), &id, partition_key.as_ref())
                .await
                .map_err(InternalError::from)
                .inspect_err(|err| executor.record_failure(err))?;
            span.set_rows(u64::from(found.is_some()));

            found.map(|doc| decode(&converter, path, doc)).transpose()
        }
        .boxed()
    }
}

///
/// Context
/// Owned handles moved into deferred storage work.
///

struct Context<S: ?Sized> {
    store: Arc<S>,
    entity: Arc<EntityInformation>,
    feed_page_size: u32,
    max_page_size: u32,
}

impl<S: ?Sized> Context<S> {
    fn executor(&self) -> QueryExecutor<'_> {
        QueryExecutor::new(&self.entity, self.feed_page_size, self.max_page_size)
    }
}

fn decode<T, C>(converter: &C, path: &'static str, document: Document) -> Result<T, InternalError>
where
    T: DeserializeOwned,
    C: EntityConverter,
{
    Ok(converter.from_document(path, document)?)
}

/// Every matching document, one feed page at a time.
fn feed_stream<S>(
    ctx: Context<S>,
    query: DocumentQuery,
) -> impl Stream<Item = Result<Document, InternalError>> + Send + 'static
where
    S: ReactiveDocumentStore + ?Sized + 'static,
{
    async_stream::try_stream! {
        let executor = ctx.executor();
        let spec = ctx.entity.collection_spec();
        let mut span = Span::new(ExecKind::Load, executor.entity_path());
        let mut options = executor.drain_options(&query);

        loop {
            let feed = ctx
                .store
                .query_page(&spec, &query, &options)
                .await
                .map_err(InternalError::from)
                .inspect_err(|err| executor.record_failure(err))?;
            executor.record_feed_page(&feed);
            span.add_rows(feed.items.len() as u64);

            for document in feed.items {
                yield document;
            }

            match feed.continuation {
                Some(continuation) => options.continuation = Some(continuation),
                None => break,
            }
        }
    }
}

/// Delete matches until the feed is exhausted. Each removal shifts the
/// feed, so the head page is re-read after every non-empty page; an empty
/// page that still carries a continuation is followed.
fn delete_stream<S>(
    ctx: Context<S>,
    query: DocumentQuery,
) -> impl Stream<Item = Result<Document, InternalError>> + Send + 'static
where
    S: ReactiveDocumentStore + ?Sized + 'static,
{
    async_stream::try_stream! {
        let executor = ctx.executor();
        let spec = ctx.entity.collection_spec();
        let mut span = Span::new(ExecKind::Delete, executor.entity_path());
        let mut options = executor.drain_options(&query);

        loop {
            let feed = ctx
                .store
                .query_page(&spec, &query, &options)
                .await
                .map_err(InternalError::from)
                .inspect_err(|err| executor.record_failure(err))?;
            executor.record_feed_page(&feed);
            if feed.items.is_empty() {
                match feed.continuation {
                    Some(continuation) => {
                        options.continuation = Some(continuation);
                        continue;
                    }
                    None => break,
                }
            }
            options.continuation = None;

            for document in feed.items {
                let id = ctx.entity.id_of(&document)?;
                let partition_key = ctx.entity.partition_key_of(&document);
                ctx.store
                    .delete(&spec, &id, partition_key.as_ref())
                    .await
                    .map_err(InternalError::from)
                    .inspect_err(|err| executor.record_failure(err))?;
                span.add_rows(1);

                yield document;
            }
        }
    }
}

async fn read_single<S>(ctx: Context<S>, query: DocumentQuery) -> Result<Option<Document>, InternalError>
where
    S: ReactiveDocumentStore + ?Sized + 'static,
{
    let executor = ctx.executor();
    let mut span = Span::new(ExecKind::Load, executor.entity_path());
    let found = read_up_to(&ctx, &query, 2).await?;

    let found = executor.single(found)?;
    span.set_rows(u64::from(found.is_some()));

    Ok(found)
}

async fn read_exists<S>(ctx: Context<S>, query: DocumentQuery) -> Result<bool, InternalError>
where
    S: ReactiveDocumentStore + ?Sized + 'static,
{
    let executor = ctx.executor();
    let _span = Span::new(ExecKind::Exists, executor.entity_path());
    let found = read_up_to(&ctx, &query, 1).await?;

    Ok(!found.is_empty())
}

/// Follow continuations until `limit` documents are collected or the feed
/// is exhausted.
async fn read_up_to<S>(
    ctx: &Context<S>,
    query: &DocumentQuery,
    limit: u32,
) -> Result<Vec<Document>, InternalError>
where
    S: ReactiveDocumentStore + ?Sized + 'static,
{
    let executor = ctx.executor();
    let spec = ctx.entity.collection_spec();
    let mut options = executor.feed_options(query, limit);
    let mut out = Vec::new();

    while out.len() < limit as usize {
        let feed = ctx
            .store
            .query_page(&spec, query, &options)
            .await
            .map_err(InternalError::from)
            .inspect_err(|err| executor.record_failure(err))?;
        executor.record_feed_page(&feed);
        out.extend(feed.items);

        match feed.continuation {
            Some(continuation) => options.continuation = Some(continuation),
            None => break,
        }
    }

    Ok(out)
}

async fn read_count<S>(ctx: Context<S>, query: DocumentQuery) -> Result<u64, InternalError>
where
    S: ReactiveDocumentStore + ?Sized + 'static,
{
    let executor = ctx.executor();
    let _span = Span::new(ExecKind::Count, executor.entity_path());
    let partition_key = executor.partition_key(&query);
    let count = ctx
        .store
        .count(&ctx.entity.collection_spec(), &query, partition_key.as_ref())
        .await
        .map_err(InternalError::from)
        .inspect_err(|err| executor.record_failure(err))?;

    Ok(count)
}

async fn upsert<S>(ctx: &Context<S>, document: Document) -> Result<Document, InternalError>
where
    S: ReactiveDocumentStore + ?Sized + 'static,
{
    let stored = ctx
        .store
        .upsert(&ctx.entity.collection_spec(), document)
        .await
        .map_err(InternalError::from)
        .inspect_err(|err| ctx.executor().record_failure(err))?;

    Ok(stored)
}

async fn remove<S>(
    ctx: Context<S>,
    id: String,
    partition_key: Option<Value>,
) -> Result<(), InternalError>
where
    S: ReactiveDocumentStore + ?Sized + 'static,
{
    let executor = ctx.executor();
    let mut span = Span::new(ExecKind::Delete, executor.entity_path());
    ctx.store
        .delete(&ctx.entity.collection_spec(), &id, partition_key.as_ref())
        .await
        .map_err(InternalError::from)
        .inspect_err(|err| executor.record_failure(err))?;
    span.set_rows(1);

    Ok(())
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::RepositoryConfig,
        cursor::PageRequest,
        repository::{MethodSignature, RepositoryFactory, ReturnShape},
        storage::MemoryStore,
        test_fixtures::Course,
    };

    async fn repository() -> (Arc<MemoryStore>, ReactiveRepository<Course, MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let repo = RepositoryFactory::new(RepositoryConfig::default())
            .unwrap()
            .builder::<Course>()
            .unwrap()
            .method(MethodSignature::new("findByDepartmentIn", ReturnShape::Many).collection())
            .method(MethodSignature::new("findByName", ReturnShape::Single).value())
            .method(MethodSignature::new("findByDepartment", ReturnShape::Page).value().pageable())
            .method(MethodSignature::new("deleteByDepartment", ReturnShape::Many).value())
            .method(MethodSignature::new("existsByName", ReturnShape::Exists).value())
            .build_reactive(Arc::clone(&store))
            .await
            .unwrap();

        let saved: Vec<Course> = repo
            .save_all(&[
                Course::new("c1", "Algebra", "Math"),
                Course::new("c2", "Geometry", "Math"),
                Course::new("c3", "Painting", "Art"),
                Course::new("c4", "Mechanics", "Physics"),
            ])
            .try_collect()
            .await
            .unwrap();
        assert_eq!(saved.len(), 4);

        (store, repo)
    }

    #[tokio::test]
    async fn in_query_streams_matching_courses() {
        let (_, repo) = repository().await;
        let courses: Vec<Course> = repo
            .find("findByDepartmentIn", vec![vec!["Math", "Art"].into()])
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        let mut ids: Vec<_> = courses.into_iter().map(|c| c.course_id).collect();
        ids.sort();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
    }

    #[tokio::test]
    async fn nothing_runs_until_subscription() {
        let (store, repo) = repository().await;
        let before = store.feed_requests();

        let stream = repo.find("findByDepartmentIn", vec![vec!["Math"].into()]).unwrap();
        assert_eq!(store.feed_requests(), before);

        let courses: Vec<Course> = stream.try_collect().await.unwrap();
        assert_eq!(courses.len(), 2);
        assert_eq!(store.feed_requests(), before + 1);
    }

    #[tokio::test]
    async fn paging_fails_fast_in_reactive_mode() {
        let (store, repo) = repository().await;
        let before = store.feed_requests();

        let err = repo
            .invoke(
                "findByDepartment",
                vec!["Math".into(), PageRequest::of_size(1).unwrap().into()],
            )
            .unwrap_err();

        assert!(err.is_unsupported());
        assert_eq!(store.feed_requests(), before);
    }

    #[tokio::test]
    async fn delete_stream_yields_each_removed_course() {
        let (store, repo) = repository().await;
        let removed: Vec<Course> = repo
            .delete_by("deleteByDepartment", vec!["Math".into()])
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(removed.len(), 2);
        assert_eq!(store.len("courses"), 2);
        assert!(!repo.exists_by("existsByName", vec!["Algebra".into()]).unwrap().await.unwrap());
    }

    #[tokio::test]
    async fn delete_by_id_on_missing_course_terminates_with_storage_error() {
        let (_, repo) = repository().await;

        let err = repo.delete_by_id_and_partition_key("missing", "Math").await.unwrap_err();
        assert!(err.is_storage_access());

        repo.delete_by_id_and_partition_key("c1", "Math").await.unwrap();
        assert_eq!(repo.find_by_id("c1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn single_and_count_resolve_lazily() {
        let (_, repo) = repository().await;

        let found = repo.find_one("findByName", vec!["Painting".into()]).unwrap().await.unwrap();
        assert_eq!(found, Some(Course::new("c3", "Painting", "Art")));
        assert_eq!(repo.count().await.unwrap(), 4);
        assert_eq!(repo.delete_all().await.unwrap(), 4);
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
