pub mod coercion;
pub mod crud;
pub mod dynamic_row;
pub mod error;

pub use crud::{DynamicCrud, DynamicResultSet, ListParams, OrderDir};
pub use dynamic_row::DynamicRow;
pub use error::CrudError;
