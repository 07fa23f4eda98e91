use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Every subsystem error folds into this type at the repository boundary.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Construct a configuration error raised while wiring a repository.
    pub(crate) fn configuration(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Configuration, origin, message)
    }

    /// Construct an error for a recognised but deliberately unimplemented shape.
    pub(crate) fn unsupported(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, origin, message)
    }

    /// Construct a store-origin access error.
    pub fn storage_access(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::StorageAccess, ErrorOrigin::Store, message)
    }

    /// Construct a call-time argument error.
    pub(crate) fn invalid_argument(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidArgument, origin, message)
    }

    /// Construct a query-origin invariant violation.
    pub(crate) fn query_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Query, message)
    }

    /// Construct an executor-origin invariant violation.
    pub(crate) fn executor_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Executor, message)
    }

    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self.class, ErrorClass::Configuration)
    }

    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self.class, ErrorClass::Unsupported)
    }

    #[must_use]
    pub const fn is_storage_access(&self) -> bool {
        matches!(self.class, ErrorClass::StorageAccess)
    }

    #[must_use]
    pub const fn is_invalid_cursor(&self) -> bool {
        matches!(self.class, ErrorClass::InvalidCursor)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// Malformed repository wiring, surfaced when the repository is built.
    Configuration,
    /// Recognised but deliberately unimplemented derivation shape.
    Unsupported,
    /// Any failure reported by the storage collaborator.
    StorageAccess,
    /// Continuation token rejected for this query shape.
    InvalidCursor,
    /// Call-time arguments do not fit the declared signature.
    InvalidArgument,
    /// Single-result method matched more than one document.
    IncorrectResultSize,
    InvariantViolation,
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Configuration => "configuration",
            Self::Unsupported => "unsupported",
            Self::StorageAccess => "storage_access",
            Self::InvalidCursor => "invalid_cursor",
            Self::InvalidArgument => "invalid_argument",
            Self::IncorrectResultSize => "incorrect_result_size",
            Self::InvariantViolation => "invariant_violation",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Config,
    Convert,
    Cursor,
    Executor,
    Expression,
    Query,
    Repository,
    Store,
    Tree,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Config => "config",
            Self::Convert => "convert",
            Self::Cursor => "cursor",
            Self::Executor => "executor",
            Self::Expression => "expression",
            Self::Query => "query",
            Self::Repository => "repository",
            Self::Store => "store",
            Self::Tree => "tree",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
