use thiserror::Error;

/// Errors produced by connection acquisition, SQL execution and transactions.
///
/// Shared across the pool, drivers and ORM crates so a caller composing all three
/// sees one coherent set of variants for the lower half of the error taxonomy.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to connect: {0}")]
    ConnectFailed(String),

    #[error("timed out waiting for a pooled connection")]
    AcquireTimeout,

    #[error("connection pool is closed")]
    PoolClosed,

    #[error("syntax error: {0}")]
    SyntaxError(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("column {0:?} is not nullable but value was NULL")]
    NullForNonNullable(String),

    #[error("type mismatch decoding column {column:?}: expected {expected}")]
    TypeMismatch { column: String, expected: &'static str },

    #[error("query builder was already consumed by a prior terminal call")]
    BuilderConsumed,

    #[error("nested transactions are not supported")]
    NestedTransaction,

    #[error("unsafe query rejected: {0}")]
    UnsafeQuery(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DbError {
    /// Whether a caller may reasonably retry this operation unchanged.
    pub fn is_retriable(&self) -> bool {
        matches!(self, DbError::ConnectFailed(_) | DbError::AcquireTimeout)
    }
}
