#![allow(clippy::result_large_err)]

pub mod error;
pub mod pool;
pub mod stats;

pub use error::PoolError;
pub use pool::{ConnectionFactory, Pool, PooledConnection};
pub use stats::PoolStats;
