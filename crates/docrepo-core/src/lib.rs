//! Core runtime for docrepo: derived-query parsing, criteria construction,
//! execution dispatch, cursor paging, and the storage collaborator contracts.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod config;
pub mod convert;
pub mod cursor;
pub mod entity;
pub mod error;
pub mod expression;
pub mod obs;
pub mod query;
pub mod repository;
pub mod storage;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// CONSTANTS
///

/// Crate version, embedded in the connection user agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Page size used when a multi-entity execution drains the store feed.
pub const DEFAULT_FEED_PAGE_SIZE: u32 = 100;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No executors, stores, or error internals are re-exported here.
///

pub mod prelude {
    pub use crate::{
        cursor::{Page, PageRequest},
        entity::{EntityKind, EntityModel},
        query::{Direction, Order, Sort},
        repository::{Arg, MethodSignature, ParameterKind, ReturnShape},
        value::Value,
    };
}
