#![allow(clippy::result_large_err)]

pub mod query_builder;
pub mod repository;
pub mod result_mapper;
pub mod transaction;

pub use query_builder::{CmpOp, OrderDir, QueryBuilder};
pub use repository::{all, delete, find, save};
pub use result_mapper::{map_rows, optional_i64, optional_string, require_bool, require_f64, require_i64, require_string, List};
pub use transaction::transaction;
