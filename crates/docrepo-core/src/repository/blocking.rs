use crate::{
    convert::{EntityConverter, JsonConverter},
    cursor::{Page, PageRequest},
    entity::{EntityInformation, EntityKind},
    error::InternalError,
    obs::sink::{ExecKind, Span},
    query::{DocumentQuery, Sort},
    repository::{
        RepositoryCore,
        execution::{ExecutionKind, QueryResult},
        parameters::Arg,
        query::PartTreeQuery,
    },
    storage::{Document, DocumentStore},
    value::Value,
};
use std::{marker::PhantomData, sync::Arc};

///
/// Repository
///
/// Blocking repository for one entity type. Derived methods are invoked
/// by their registered name; CRUD operations are always available.
///

pub struct Repository<T, S, C = JsonConverter>
where
    T: EntityKind,
    S: DocumentStore + ?Sized,
    C: EntityConverter,
{
    core: RepositoryCore,
    store: Arc<S>,
    converter: C,
    _marker: PhantomData<fn() -> T>,
}

impl<T, S, C> Repository<T, S, C>
where
    T: EntityKind,
    S: DocumentStore + ?Sized,
    C: EntityConverter,
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

    /// Look up a registered derived-query method.
    pub fn query(&self, method: &str) -> Result<&PartTreeQuery, InternalError> {
        self.core.query(method)
    }

    // ------------------------------------------------------------------
    // Derived queries
    // ------------------------------------------------------------------

    /// Run a derived method and return its raw shaped result.
    pub fn invoke(&self, method: &str, args: Vec<Arg>) -> Result<QueryResult, InternalError> {
        let query = self.core.query(method)?;
        let document_query = query.create_query(args)?;

        self.core
            .executor()
            .execute(self.store.as_ref(), query.execution_kind(), &document_query)
    }

    pub fn find(&self, method: &str, args: Vec<Arg>) -> Result<Vec<T>, InternalError> {
        let documents = self.invoke(method, args)?.into_documents()?;

        self.convert_all(documents)
    }

    pub fn find_one(&self, method: &str, args: Vec<Arg>) -> Result<Option<T>, InternalError> {
        self.invoke(method, args)?
            .into_single()?
            .map(|doc| self.convert(doc))
            .transpose()
    }

    pub fn find_page(&self, method: &str, args: Vec<Arg>) -> Result<Page<T>, InternalError> {
        self.invoke(method, args)?
            .into_page()?
            .try_map(|doc| self.convert(doc))
    }

    pub fn count_by(&self, method: &str, args: Vec<Arg>) -> Result<u64, InternalError> {
        self.invoke(method, args)?.into_count()
    }

    pub fn exists_by(&self, method: &str, args: Vec<Arg>) -> Result<bool, InternalError> {
        self.invoke(method, args)?.into_exists()
    }

    /// Run a delete derivation and return the removed entities.
    pub fn delete_by(&self, method: &str, args: Vec<Arg>) -> Result<Vec<T>, InternalError> {
        let documents = self.invoke(method, args)?.into_documents()?;

        self.convert_all(documents)
    }

    // ------------------------------------------------------------------
    // CRUD
    // ------------------------------------------------------------------

    pub fn save(&self, entity: &T) -> Result<T, InternalError> {
        let mut span = Span::new(ExecKind::Save, self.entity_path());
        let saved = self.upsert(entity)?;
        span.set_rows(1);

        Ok(saved)
    }

    pub fn save_all<'a>(
        &self,
        entities: impl IntoIterator<Item = &'a T>,
    ) -> Result<Vec<T>, InternalError> {
        let mut span = Span::new(ExecKind::Save, self.entity_path());
        let mut saved = Vec::new();
        for entity in entities {
            saved.push(self.upsert(entity)?);
            span.add_rows(1);
        }

        Ok(saved)
    }

    /// Cross-partition read by id.
    pub fn find_by_id(&self, id: &str) -> Result<Option<T>, InternalError> {
        self.read(id, None)
    }

    pub fn find_by_id_and_partition_key(
        &self,
        id: &str,
        partition_key: impl Into<Value>,
    ) -> Result<Option<T>, InternalError> {
        self.read(id, Some(partition_key.into()))
    }

    pub fn exists_by_id(&self, id: &str) -> Result<bool, InternalError> {
        let spec = self.core.entity.collection_spec();
        let found = self
            .store
            .read(&spec, id, None)
            .map_err(InternalError::from)
            .inspect_err(|err| self.core.executor().record_failure(err))?;

        Ok(found.is_some())
    }

    pub fn find_all(&self) -> Result<Vec<T>, InternalError> {
        self.find_all_sorted(Sort::unsorted())
    }

    pub fn find_all_sorted(&self, sort: Sort) -> Result<Vec<T>, InternalError> {
        let query = DocumentQuery::all().with_sort(sort);
        let documents = self
            .core
            .executor()
            .execute(self.store.as_ref(), ExecutionKind::MultiEntity, &query)?
            .into_documents()?;

        self.convert_all(documents)
    }

    /// Page through the whole collection under the usual cursor rules.
    pub fn find_all_paged(&self, request: PageRequest) -> Result<Page<T>, InternalError> {
        let query = DocumentQuery::all()
            .with_sort(request.sort().clone())
            .with_page(Some(request));

        self.core
            .executor()
            .execute(self.store.as_ref(), ExecutionKind::Paged, &query)?
            .into_page()?
            .try_map(|doc| self.convert(doc))
    }

    pub fn count(&self) -> Result<u64, InternalError> {
        self.core
            .executor()
            .execute(self.store.as_ref(), ExecutionKind::Count, &DocumentQuery::all())?
            .into_count()
    }

    /// Delete one document by id. On a partitioned collection the store
    /// cannot address the document without its key, so this fails.
    pub fn delete_by_id(&self, id: &str) -> Result<(), InternalError> {
        self.remove(id, None)
    }

    pub fn delete_by_id_and_partition_key(
        &self,
        id: &str,
        partition_key: impl Into<Value>,
    ) -> Result<(), InternalError> {
        self.remove(id, Some(partition_key.into()))
    }

    /// Delete the stored document addressed by this entity's id and key.
    pub fn delete(&self, entity: &T) -> Result<(), InternalError> {
        let document = self.converter.to_document(self.entity_path(), entity)?;
        let id = self.core.entity.id_of(&document)?;
        let partition_key = self.core.entity.partition_key_of(&document);

        self.remove(&id, partition_key)
    }

    pub fn delete_all(&self) -> Result<u64, InternalError> {
        let mut span = Span::new(ExecKind::Delete, self.entity_path());
        let spec = self.core.entity.collection_spec();
        let removed = self
            .store
            .delete_all(&spec)
            .map_err(InternalError::from)
            .inspect_err(|err| self.core.executor().record_failure(err))?;
        span.set_rows(removed);

        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn entity_path(&self) -> &'static str {
        self.core.entity.model().path
    }

    fn convert(&self, document: Document) -> Result<T, InternalError> {
        Ok(self.converter.from_document(self.entity_path(), document)?)
    }

    fn convert_all(&self, documents: Vec<Document>) -> Result<Vec<T>, InternalError> {
        documents.into_iter().map(|doc| self.convert(doc)).collect()
    }

    fn upsert(&self, entity: &T) -> Result<T, InternalError> {
        let document = self.converter.to_document(self.entity_path(), entity)?;
        self.core.entity.id_of(&document)?;

        let spec = self.core.entity.collection_spec();
        let stored = self
            .store
            .upsert(&spec, document)
            .map_err(InternalError::from)
            .inspect_err(|err| self.core.executor().record_failure(err))?;

        self.convert(stored)
    }

    fn read(&self, id: &str, partition_key: Option<Value>) -> Result<Option<T>, InternalError> {
        let mut span = Span::new(ExecKind::Load, self.entity_path());
        let spec = self.core.entity.collection_spec();
        let found = self
            .store
            .read(&spec, id, partition_key.as_ref())
            .map_err(InternalError::from)
            .inspect_err(|err| self.core.executor().record_failure(err))?;
        span.set_rows(u64::from(found.is_some()));

        found.map(|doc| self.convert(doc)).transpose()
    }

    fn remove(&self, id: &str, partition_key: Option<Value>) -> Result<(), InternalError> {
        let mut span = Span::new(ExecKind::Delete, self.entity_path());
        let spec = self.core.entity.collection_spec();
        self.store
            .delete(&spec, id, partition_key.as_ref())
            .map_err(InternalError::from)
            .inspect_err(|err| self.core.executor().record_failure(err))?;
        span.set_rows(1);

        Ok(())
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::RepositoryConfig,
        repository::{MethodSignature, RepositoryFactory, ReturnShape},
        storage::MemoryStore,
        test_fixtures::Address,
    };

    fn repository() -> (Arc<MemoryStore>, Repository<Address, MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let repo = RepositoryFactory::new(RepositoryConfig::default())
            .unwrap()
            .builder::<Address>()
            .unwrap()
            .method(MethodSignature::new("findByCity", ReturnShape::Page).value().pageable())
            .method(MethodSignature::new("findByStreet", ReturnShape::Single).value())
            .method(MethodSignature::new("deleteByCity", ReturnShape::Count).value())
            .build(Arc::clone(&store))
            .unwrap();

        repo.save_all(&[
            Address::new("1", "North", "A"),
            Address::new("2", "East", "A"),
            Address::new("3", "South", "B"),
            Address::new("4", "West", "C"),
        ])
        .unwrap();

        (store, repo)
    }

    fn paged(repo: &Repository<Address, MemoryStore>, request: PageRequest) -> Page<Address> {
        repo.find_page("findByCity", vec!["A".into(), request.into()]).unwrap()
    }

    #[test]
    fn page_size_three_returns_one_last_page() {
        let (_, repo) = repository();
        let page = paged(&repo, PageRequest::of_size(3).unwrap());

        assert_eq!(page.len(), 2);
        assert!(page.is_last());
        assert!(page.content().iter().all(|a| a.city == "A"));
    }

    #[test]
    fn page_size_one_splits_without_overlap() {
        let (_, repo) = repository();
        let first = paged(&repo, PageRequest::of_size(1).unwrap());
        assert_eq!(first.len(), 1);
        assert!(first.has_more());

        let second = paged(&repo, first.next_request().unwrap().clone());
        assert_eq!(second.len(), 1);
        assert!(second.is_last());

        let mut codes: Vec<_> = first
            .into_content()
            .into_iter()
            .chain(second.into_content())
            .map(|a| a.postal_code)
            .collect();
        codes.sort();
        assert_eq!(codes, vec!["1", "2"]);
    }

    #[test]
    fn single_entity_rejects_ambiguous_match() {
        let (_, repo) = repository();
        repo.save(&Address::new("5", "North", "D")).unwrap();

        let err = repo.find_one("findByStreet", vec!["North".into()]).unwrap_err();
        assert_eq!(err.class, crate::error::ErrorClass::IncorrectResultSize);
        assert_eq!(
            repo.find_one("findByStreet", vec!["West".into()]).unwrap(),
            Some(Address::new("4", "West", "C"))
        );
        assert_eq!(repo.find_one("findByStreet", vec!["Nowhere".into()]).unwrap(), None);
    }

    #[test]
    fn delete_derivation_removes_matches_and_reports_count() {
        let (store, repo) = repository();

        assert_eq!(repo.count_by("deleteByCity", vec!["A".into()]).unwrap(), 2);
        assert_eq!(store.len("addresses"), 2);
        assert_eq!(repo.count_by("deleteByCity", vec!["A".into()]).unwrap(), 0);
    }

    #[test]
    fn delete_by_id_needs_the_partition_key() {
        let (_, repo) = repository();

        assert!(repo.delete_by_id("1").unwrap_err().is_storage_access());
        repo.delete_by_id_and_partition_key("1", "A").unwrap();
        assert_eq!(repo.find_by_id("1").unwrap(), None);
        assert!(
            repo.delete_by_id_and_partition_key("1", "A")
                .unwrap_err()
                .is_storage_access()
        );
    }

    #[test]
    fn delete_by_entity_uses_its_id_and_key() {
        let (_, repo) = repository();
        let address = repo.find_by_id("3").unwrap().unwrap();

        repo.delete(&address).unwrap();
        assert!(!repo.exists_by_id("3").unwrap());
        assert!(repo.delete(&address).unwrap_err().is_storage_access());
    }

    #[test]
    fn unknown_method_is_an_invalid_argument() {
        let (_, repo) = repository();
        let err = repo.find("findByNothing", vec![]).unwrap_err();

        assert_eq!(err.class, crate::error::ErrorClass::InvalidArgument);
    }

    #[test]
    fn find_all_paged_covers_the_collection() {
        let (_, repo) = repository();
        let mut request = Some(PageRequest::of_size(3).unwrap().with_sort(Sort::asc("postalCode")));
        let mut seen = Vec::new();

        while let Some(next) = request {
            let page = repo.find_all_paged(next).unwrap();
            request = page.next_request().cloned();
            seen.extend(page.into_content().into_iter().map(|a| a.postal_code));
        }

        assert_eq!(seen, vec!["1", "2", "3", "4"]);
        assert_eq!(repo.count().unwrap(), 4);
    }

    #[test]
    fn storage_failures_surface_as_storage_access() {
        let (store, repo) = repository();
        store.set_unavailable(Some("maintenance"));

        assert!(repo.find_all().unwrap_err().is_storage_access());
        assert!(repo.find_by_id("1").unwrap_err().is_storage_access());

        store.set_unavailable(None);
        assert_eq!(repo.find_all().unwrap().len(), 4);
    }
}
