use crate::{
    cursor::codec::HexDecodeError,
    error::{ErrorClass, ErrorOrigin, InternalError},
};
use thiserror::Error as ThisError;

///
/// CursorError
///
/// Page request and continuation-token validation failures.
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum CursorError {
    #[error("page size must be greater than zero")]
    ZeroPageSize,

    #[error("page size {size} exceeds the configured maximum {max}")]
    PageSizeTooLarge { size: u32, max: u32 },

    #[error("invalid continuation token: {0}")]
    Decode(#[from] HexDecodeError),

    #[error("invalid continuation token payload: {reason}")]
    Payload { reason: String },

    #[error("unsupported continuation token version: {version}")]
    Version { version: u8 },

    /// Token was issued for a different collection, criteria, sort,
    /// partition key or page size.
    #[error("continuation token does not match query shape for '{collection}'")]
    SignatureMismatch { collection: String },
}

impl From<CursorError> for InternalError {
    fn from(err: CursorError) -> Self {
        let class = match err {
            CursorError::ZeroPageSize | CursorError::PageSizeTooLarge { .. } => {
                ErrorClass::InvalidArgument
            }
            _ => ErrorClass::InvalidCursor,
        };

        Self::new(class, ErrorOrigin::Cursor, err.to_string())
    }
}
