//! Derived-query translation: method name → part tree → criteria → query.

mod creator;
mod criteria;
mod document_query;
mod part;
mod sort;
mod sql;
mod tree;

pub use creator::QueryCreator;
pub use criteria::{Connector, Criteria, CriteriaType};
pub use document_query::DocumentQuery;
pub use part::{Part, PartType};
pub use sort::{Direction, Order, Sort};
pub use sql::SqlQuerySpec;
pub use tree::{OrPart, PartTree, SubjectKind, TreeError};
