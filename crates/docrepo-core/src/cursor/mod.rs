//! Cursor paging: page requests, page results and continuation tokens.

mod codec;
mod error;
mod signature;
mod token;

pub use codec::{HexDecodeError, decode_hex, encode_hex};
pub use error::CursorError;
pub use signature::ShapeSignature;
pub(crate) use token::ContinuationToken;

use crate::{query::Sort, value::Value};
use serde::{Deserialize, Serialize};

///
/// PageRequest
///
/// Page size, zero-based page number, optional sort, optional
/// partition-key restriction and the continuation token of the previous
/// page. The first request of a sequence carries no token; later requests
/// are obtained from [`Page::next_request`] and passed back verbatim.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PageRequest {
    page: u32,
    size: u32,
    sort: Sort,
    continuation: Option<String>,
    partition_key: Option<Value>,
}

impl PageRequest {
    pub fn of_size(size: u32) -> Result<Self, CursorError> {
        if size == 0 {
            return Err(CursorError::ZeroPageSize);
        }

        Ok(Self {
            page: 0,
            size,
            sort: Sort::unsorted(),
            continuation: None,
            partition_key: None,
        })
    }

    #[must_use]
    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Restrict the paged read to one partition.
    #[must_use]
    pub fn with_partition_key(mut self, partition_key: impl Into<Value>) -> Self {
        self.partition_key = Some(partition_key.into());
        self
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    #[must_use]
    pub const fn sort(&self) -> &Sort {
        &self.sort
    }

    #[must_use]
    pub fn continuation(&self) -> Option<&str> {
        self.continuation.as_deref()
    }

    #[must_use]
    pub const fn partition_key(&self) -> Option<&Value> {
        self.partition_key.as_ref()
    }

    #[must_use]
    pub const fn is_first(&self) -> bool {
        self.continuation.is_none()
    }

    // Request for the page after this one, carrying `continuation`.
    pub(crate) fn next(&self, continuation: String) -> Self {
        Self {
            page: self.page.saturating_add(1),
            continuation: Some(continuation),
            ..self.clone()
        }
    }
}

///
/// Page
///
/// One page of results. `next` is absent on the last page.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    content: Vec<T>,
    request: PageRequest,
    next: Option<PageRequest>,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn new(content: Vec<T>, request: PageRequest, next: Option<PageRequest>) -> Self {
        Self {
            content,
            request,
            next,
        }
    }

    #[must_use]
    pub fn content(&self) -> &[T] {
        &self.content
    }

    #[must_use]
    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    #[must_use]
    pub const fn request(&self) -> &PageRequest {
        &self.request
    }

    #[must_use]
    pub const fn next_request(&self) -> Option<&PageRequest> {
        self.next.as_ref()
    }

    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.next.is_some()
    }

    #[must_use]
    pub const fn is_last(&self) -> bool {
        self.next.is_none()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.content.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Convert every item, keeping the page position.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        let content = self.content.into_iter().map(f).collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            content,
            request: self.request,
            next: self.next,
        })
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_page_size_is_rejected() {
        assert_eq!(PageRequest::of_size(0), Err(CursorError::ZeroPageSize));
    }

    #[test]
    fn next_request_advances_page_and_keeps_shape() {
        let first = PageRequest::of_size(3)
            .unwrap()
            .with_sort(Sort::asc("city"))
            .with_partition_key("A");
        let second = first.next("token".to_string());

        assert!(first.is_first());
        assert_eq!(second.page(), 1);
        assert_eq!(second.size(), 3);
        assert_eq!(second.sort(), first.sort());
        assert_eq!(second.partition_key(), Some(&Value::from("A")));
        assert_eq!(second.continuation(), Some("token"));
    }

    #[test]
    fn has_more_tracks_next_request() {
        let request = PageRequest::of_size(2).unwrap();
        let last: Page<u8> = Page::new(vec![1], request.clone(), None);
        assert!(last.is_last());
        assert!(!last.has_more());

        let more = Page::new(vec![1, 2], request.clone(), Some(request.next("t".into())));
        let mapped: Page<String> = more.try_map(|n| Ok::<_, ()>(n.to_string())).unwrap();
        assert!(mapped.has_more());
        assert_eq!(mapped.content(), ["1".to_string(), "2".to_string()]);
    }
}
