use thiserror::Error;

use cms_core::DbError;

#[derive(Debug, Error)]
pub enum CrudError {
    #[error("table {0:?} is not in the dynamic CRUD whitelist")]
    TableForbidden(String),

    #[error("table {0:?} does not exist")]
    TableNotFound(String),

    #[error("table {table:?} has no column {field:?}")]
    FieldNotFound { table: String, field: String },

    #[error("invalid value for field {field:?}: {reason}")]
    InvalidFieldValue { field: String, reason: String },

    #[error(transparent)]
    Db(#[from] DbError),
}
