//! Repository runtime: method registration, validation at build time, and
//! the blocking and reactive execution surfaces.

mod blocking;
mod execution;
mod method;
mod parameters;
mod query;
mod reactive;

pub use blocking::Repository;
pub use execution::{ExecutionKind, ExecutionMode, QueryResult};
pub use method::{MethodSignature, QueryMethod, ReturnShape};
pub use parameters::{Arg, ParameterAccessor, ParameterKind, Parameters};
pub use query::PartTreeQuery;
pub use reactive::{ReactiveRepository, ReactiveResult, ResultFuture, ResultStream};

use crate::{
    config::RepositoryConfig,
    convert::{EntityConverter, JsonConverter},
    entity::{EntityInformation, EntityKind},
    error::{ErrorOrigin, InternalError},
    expression::ExpressionResolver,
    storage::{DocumentStore, ReactiveDocumentStore},
};
use execution::QueryExecutor;
use std::{collections::BTreeMap, marker::PhantomData, sync::Arc};

///
/// RepositoryFactory
///
/// Validated configuration plus the expression context used to resolve
/// collection names. One factory builds any number of repositories.
///

#[derive(Clone, Debug)]
pub struct RepositoryFactory {
    config: RepositoryConfig,
    resolver: ExpressionResolver,
}

impl RepositoryFactory {
    pub fn new(config: RepositoryConfig) -> Result<Self, InternalError> {
        config.validate()?;
        let resolver = ExpressionResolver::from_config(&config);

        Ok(Self { config, resolver })
    }

    #[must_use]
    pub const fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    #[must_use]
    pub const fn resolver(&self) -> &ExpressionResolver {
        &self.resolver
    }

    /// Start a repository for `T`, resolving its collection name now.
    pub fn builder<T: EntityKind>(&self) -> Result<RepositoryBuilder<T>, InternalError> {
        let entity = EntityInformation::resolve(T::MODEL, &self.resolver)?;

        Ok(RepositoryBuilder {
            entity: Arc::new(entity),
            signatures: Vec::new(),
            feed_page_size: self.config.default_page_size,
            max_page_size: self.config.max_page_size,
            _marker: PhantomData,
        })
    }
}

///
/// RepositoryBuilder
///
/// Collects method signatures. Every derived method is parsed and checked
/// when the repository is built, so wiring errors never reach call time.
///

#[derive(Debug)]
pub struct RepositoryBuilder<T: EntityKind> {
    entity: Arc<EntityInformation>,
    signatures: Vec<MethodSignature>,
    feed_page_size: u32,
    max_page_size: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T: EntityKind> RepositoryBuilder<T> {
    #[must_use]
    pub fn method(mut self, signature: MethodSignature) -> Self {
        self.signatures.push(signature);
        self
    }

    pub fn build<S>(self, store: Arc<S>) -> Result<Repository<T, S>, InternalError>
    where
        S: DocumentStore + ?Sized,
    {
        self.build_with_converter(store, JsonConverter)
    }

    pub fn build_with_converter<S, C>(
        self,
        store: Arc<S>,
        converter: C,
    ) -> Result<Repository<T, S, C>, InternalError>
    where
        S: DocumentStore + ?Sized,
        C: EntityConverter,
    {
        let core = self.finish(ExecutionMode::Blocking)?;
        store.ensure_collection(&core.entity.collection_spec())?;

        Ok(Repository::new(core, store, converter))
    }

    pub async fn build_reactive<S>(
        self,
        store: Arc<S>,
    ) -> Result<ReactiveRepository<T, S>, InternalError>
    where
        S: ReactiveDocumentStore + ?Sized + 'static,
    {
        self.build_reactive_with_converter(store, JsonConverter).await
    }

    pub async fn build_reactive_with_converter<S, C>(
        self,
        store: Arc<S>,
        converter: C,
    ) -> Result<ReactiveRepository<T, S, C>, InternalError>
    where
        S: ReactiveDocumentStore + ?Sized + 'static,
        C: EntityConverter + Clone + 'static,
    {
        let core = self.finish(ExecutionMode::Reactive)?;
        store
            .ensure_collection(&core.entity.collection_spec())
            .await?;

        Ok(ReactiveRepository::new(core, store, converter))
    }

    fn finish(self, mode: ExecutionMode) -> Result<RepositoryCore, InternalError> {
        let mut methods = BTreeMap::new();

        for signature in self.signatures {
            let name = signature.name().to_string();
            if methods.contains_key(&name) {
                return Err(InternalError::configuration(
                    ErrorOrigin::Repository,
                    format!(
                        "method '{name}' registered twice on '{}'",
                        self.entity.model().path
                    ),
                ));
            }

            let method = QueryMethod::new(signature, Arc::clone(&self.entity))?;
            methods.insert(name, PartTreeQuery::new(method, mode)?);
        }

        tracing::debug!(
            entity = self.entity.model().path,
            collection = self.entity.collection_name(),
            methods = methods.len(),
            ?mode,
            "repository built"
        );

        Ok(RepositoryCore {
            entity: self.entity,
            methods,
            feed_page_size: self.feed_page_size,
            max_page_size: self.max_page_size,
        })
    }
}

///
/// RepositoryCore
/// State shared by both repository surfaces.
///

#[derive(Debug)]
pub(crate) struct RepositoryCore {
    entity: Arc<EntityInformation>,
    methods: BTreeMap<String, PartTreeQuery>,
    feed_page_size: u32,
    max_page_size: u32,
}

impl RepositoryCore {
    fn query(&self, method: &str) -> Result<&PartTreeQuery, InternalError> {
        self.methods.get(method).ok_or_else(|| {
            InternalError::invalid_argument(
                ErrorOrigin::Repository,
                format!(
                    "no derived method '{method}' registered on '{}'",
                    self.entity.model().path
                ),
            )
        })
    }

    fn executor(&self) -> QueryExecutor<'_> {
        QueryExecutor::new(&self.entity, self.feed_page_size, self.max_page_size)
    }
}
