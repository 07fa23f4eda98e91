//! ## Crate layout
//! - `core`: derived-query parsing, criteria, execution, cursors, storage contracts.
//! - `error`: the stable public error taxonomy.
//!
//! Repository methods are registered explicitly by name and parameter roles;
//! every derived method is parsed and validated when the repository is built.
//!
//! The `prelude` module carries the types application code touches when
//! declaring entities and calling repositories.

pub use docrepo_core as core;

pub mod error;

pub use error::{Error, ErrorKind, ErrorOrigin};

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result alias over the public [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::{
        config::{ConnectionConfig, RepositoryConfig},
        cursor::{Page, PageRequest},
        entity::{EntityKind, EntityModel},
        query::{Direction, Order, Sort},
        repository::{
            Arg, MethodSignature, ReactiveRepository, Repository, RepositoryFactory, ReturnShape,
        },
        storage::MemoryStore,
        value::Value,
    };
    pub use crate::{Error, ErrorKind};
    pub use serde::{Deserialize, Serialize};
}
