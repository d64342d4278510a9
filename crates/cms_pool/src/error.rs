use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to open connection: {0}")]
    ConnectFailed(String),

    #[error("timed out after {waited_ms}ms waiting for a pooled connection")]
    AcquireTimeout { waited_ms: u64 },

    #[error("connection pool is closed")]
    PoolClosed,
}

impl From<PoolError> for cms_core::DbError {
    fn from(e: PoolError) -> Self {
        match e {
            PoolError::ConnectFailed(msg) => cms_core::DbError::ConnectFailed(msg),
            PoolError::AcquireTimeout { .. } => cms_core::DbError::AcquireTimeout,
            PoolError::PoolClosed => cms_core::DbError::PoolClosed,
        }
    }
}
