use thiserror::Error;

/// Status code reported for a successful operation.
pub const STATUS_OK: i32 = 0;

/// Errors reported by the containers in this crate.
///
/// Every variant maps onto one of the small integer status codes returned by
/// [`CollectionError::code`], so callers that speak in status codes (a game
/// loop, a C shim) can keep doing so.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionError {
    #[error("Required argument is missing")]
    NullArgument,
    #[error("Failed to allocate storage")]
    AllocationFailure,
    #[error("Index is out of bounds")]
    OutOfBounds,
    #[error("Operation is undefined for the current state")]
    InvalidState,
    #[error("Failed to acquire the reader/writer lock")]
    LockFailure,
    #[error("Unexpected failure")]
    GenericFailure,
}

impl CollectionError {
    /// Returns the integer status code for this error.
    pub fn code(&self) -> i32 {
        match self {
            CollectionError::GenericFailure => -1,
            CollectionError::NullArgument => 1,
            CollectionError::AllocationFailure => 2,
            CollectionError::OutOfBounds => 3,
            CollectionError::InvalidState => 4,
            CollectionError::LockFailure => 6,
        }
    }

    /// Whether repeating the operation later may succeed.
    ///
    /// Allocation and lock failures depend on the environment; bounds, state
    /// and argument errors will fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CollectionError::AllocationFailure | CollectionError::LockFailure
        )
    }
}

impl From<std::collections::TryReserveError> for CollectionError {
    fn from(_: std::collections::TryReserveError) -> Self {
        CollectionError::AllocationFailure
    }
}

/// Collapses an operation result into its integer status code.
pub fn status_code<T>(result: &Result<T, CollectionError>) -> i32 {
    match result {
        Ok(_) => STATUS_OK,
        Err(e) => e.code(),
    }
}

pub type Result<T, E = CollectionError> = std::result::Result<T, E>;
