use derive_more::Display;
use docrepo_core::error::{ErrorClass, ErrorOrigin as CoreErrorOrigin, InternalError};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        Self::new(err.class.into(), err.origin.into(), err.message)
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    /// A repository method or configuration is malformed.
    Configuration,

    /// Recognised derivation shape that is deliberately not executable.
    Unsupported,

    StorageAccess,
    InvalidCursor,
    InvalidArgument,

    /// A single-result method matched more than one document.
    IncorrectResultSize,

    /// The caller cannot remediate this.
    Internal,
}

impl From<ErrorClass> for ErrorKind {
    fn from(class: ErrorClass) -> Self {
        match class {
            ErrorClass::Configuration => Self::Configuration,
            ErrorClass::Unsupported => Self::Unsupported,
            ErrorClass::StorageAccess => Self::StorageAccess,
            ErrorClass::InvalidCursor => Self::InvalidCursor,
            ErrorClass::InvalidArgument => Self::InvalidArgument,
            ErrorClass::IncorrectResultSize => Self::IncorrectResultSize,
            ErrorClass::InvariantViolation | ErrorClass::Internal => Self::Internal,
        }
    }
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Config,
    Convert,
    Cursor,
    Executor,
    Expression,
    Query,
    Repository,
    Store,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Config => Self::Config,
            CoreErrorOrigin::Convert => Self::Convert,
            CoreErrorOrigin::Cursor => Self::Cursor,
            CoreErrorOrigin::Executor => Self::Executor,
            CoreErrorOrigin::Expression => Self::Expression,
            CoreErrorOrigin::Query | CoreErrorOrigin::Tree => Self::Query,
            CoreErrorOrigin::Repository => Self::Repository,
            CoreErrorOrigin::Store => Self::Store,
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use docrepo_core::storage::StorageError;

    #[test]
    fn core_classes_map_to_public_kinds() {
        let err: Error = InternalError::storage_access("store unavailable: throttled").into();

        assert_eq!(err.kind, ErrorKind::StorageAccess);
        assert_eq!(err.origin, ErrorOrigin::Store);
        assert_eq!(err.to_string(), "store unavailable: throttled");
    }

    #[test]
    fn store_rejections_share_the_storage_access_kind() {
        let missing = StorageError::NotFound {
            collection: "addresses".to_string(),
            id: "999".to_string(),
        };
        let err: Error = InternalError::from(missing).into();

        assert_eq!(err.kind, ErrorKind::StorageAccess);
        assert_eq!(err.message, "document '999' not found in 'addresses'");
    }

    #[test]
    fn invariant_violations_surface_as_internal() {
        let err: Error = InternalError::new(
            ErrorClass::InvariantViolation,
            CoreErrorOrigin::Executor,
            "broken",
        )
        .into();

        assert_eq!(err.kind, ErrorKind::Internal);
    }

    #[test]
    fn error_round_trips_through_json() {
        let err = Error::new(ErrorKind::InvalidCursor, ErrorOrigin::Cursor, "stale token");
        let json = serde_json::to_string(&err).unwrap();

        assert_eq!(serde_json::from_str::<Error>(&json).unwrap(), err);
    }
}
