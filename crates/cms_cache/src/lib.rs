#![allow(clippy::result_large_err)]

pub mod cache;
pub mod worker;

pub use cache::Cache;
pub use worker::CleanupWorker;
