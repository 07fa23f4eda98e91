use crate::{
    cursor::PageRequest,
    query::{criteria::Criteria, sort::Sort},
    value::Value,
};

///
/// DocumentQuery
///
/// One executable query: optional criteria (absent matches every document),
/// sort orders, and the page request for paged executions.
/// Built fresh per call and owned by that execution.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentQuery {
    criteria: Option<Criteria>,
    sort: Sort,
    page: Option<PageRequest>,
}

impl DocumentQuery {
    #[must_use]
    pub fn new(criteria: Option<Criteria>) -> Self {
        Self {
            criteria,
            ..Self::default()
        }
    }

    /// Query matching every document.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Append sort orders after any already present.
    #[must_use]
    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = self.sort.and(sort);
        self
    }

    #[must_use]
    pub fn with_page(mut self, page: Option<PageRequest>) -> Self {
        self.page = page;
        self
    }

    #[must_use]
    pub const fn criteria(&self) -> Option<&Criteria> {
        self.criteria.as_ref()
    }

    #[must_use]
    pub const fn sort(&self) -> &Sort {
        &self.sort
    }

    #[must_use]
    pub const fn page(&self) -> Option<&PageRequest> {
        self.page.as_ref()
    }

    /// Partition-key value every match must carry, if the criteria pin one.
    #[must_use]
    pub fn pinned_partition_key(&self, field: &str) -> Option<&Value> {
        self.criteria.as_ref()?.pinned_equality(field)
    }
}
