use crate::error::DbError;
use crate::schema::TableSchema;
use crate::sql_dialect::SqlDialect;
use crate::value::Value;

/// The shape of a completed SQL execution: column names plus materialized rows,
/// or the affected-row/generated-id counters for a mutating statement.
#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
}

/// A single owned database session. Implemented once per backend; the ORM,
/// dynamic CRUD layer and connection pool all operate against this trait object
/// rather than a concrete driver type.
pub trait DbConnection: Send {
    fn dialect(&self) -> &'static dyn SqlDialect;

    /// Cheap liveness probe used by the pool's idle health check.
    fn ping(&mut self) -> bool;

    /// Executes `sql` with bound `params`. `params[i]` corresponds to the i-th
    /// `?` placeholder in `sql`, in order.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<QueryOutcome, DbError>;

    fn begin(&mut self) -> Result<(), DbError>;
    fn commit(&mut self) -> Result<(), DbError>;
    fn rollback(&mut self) -> Result<(), DbError>;

    fn get_tables(&mut self) -> Result<Vec<String>, DbError>;
    fn get_table_schema(&mut self, table: &str) -> Result<TableSchema, DbError>;
}
