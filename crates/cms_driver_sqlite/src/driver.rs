use std::path::PathBuf;

use cms_core::{ColumnInfo, DbConnection, DbError, QueryOutcome, SqlDialect, SqliteDialect, TableSchema, Value};
use cms_pool::{ConnectionFactory, PoolError};
use rusqlite::types::ValueRef;
use rusqlite::{Connection as RusqliteConnection, ToSql};

static SQLITE_DIALECT: SqliteDialect = SqliteDialect;

fn format_sqlite_error(e: &rusqlite::Error) -> DbError {
    match e {
        rusqlite::Error::SqliteFailure(err, msg) => {
            let text = msg.clone().unwrap_or_else(|| err.to_string());
            if text.contains("UNIQUE") || text.contains("FOREIGN KEY") || text.contains("CHECK") {
                DbError::ConstraintViolation(text)
            } else {
                DbError::SyntaxError(text)
            }
        }
        other => DbError::SyntaxError(other.to_string()),
    }
}

fn value_to_sql(value: &Value) -> Box<dyn ToSql> {
    match value {
        Value::Null => Box::new(Option::<i64>::None),
        Value::Bool(b) => Box::new(*b as i64),
        Value::Int(v) => Box::new(*v),
        Value::Float(v) => Box::new(*v),
        Value::Text(s) => Box::new(s.clone()),
    }
}

fn sqlite_value_to_value(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Text(String::from_utf8_lossy(b).into_owned()),
    }
}

/// An owned SQLite session. `rusqlite::Connection` is `!Sync` but single-owner
/// usage under the pool's `PooledConnection` guard never shares it across threads
/// concurrently, so no internal mutex is needed here (unlike the MySQL driver,
/// which wraps a blocking `mysql::Conn` the same way).
pub struct SqliteConnection {
    conn: RusqliteConnection,
    #[allow(dead_code)]
    path: PathBuf,
    in_transaction: bool,
}

impl SqliteConnection {
    fn run(&self, sql: &str, params: &[Value]) -> Result<QueryOutcome, DbError> {
        let bound: Vec<Box<dyn ToSql>> = params.iter().map(value_to_sql).collect();
        let param_refs: Vec<&dyn ToSql> = bound.iter().map(|b| b.as_ref()).collect();

        let mut stmt = self.conn.prepare(sql).map_err(|e| format_sqlite_error(&e))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

        if columns.is_empty() {
            let rows_affected = stmt
                .execute(param_refs.as_slice())
                .map_err(|e| format_sqlite_error(&e))? as u64;
            return Ok(QueryOutcome {
                columns: Vec::new(),
                rows: Vec::new(),
                rows_affected,
                last_insert_id: Some(self.conn.last_insert_rowid()),
            });
        }

        let column_count = columns.len();
        let mut rows = Vec::new();
        let mut mapped = stmt
            .query_map(param_refs.as_slice(), move |row| {
                let mut values = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    values.push(sqlite_value_to_value(row.get_ref(i)?));
                }
                Ok(values)
            })
            .map_err(|e| format_sqlite_error(&e))?;

        while let Some(row) = mapped.next() {
            rows.push(row.map_err(|e| format_sqlite_error(&e))?);
        }

        Ok(QueryOutcome {
            columns,
            rows_affected: rows.len() as u64,
            rows,
            last_insert_id: None,
        })
    }
}

impl DbConnection for SqliteConnection {
    fn dialect(&self) -> &'static dyn SqlDialect {
        &SQLITE_DIALECT
    }

    fn ping(&mut self) -> bool {
        self.conn.execute_batch("SELECT 1").is_ok()
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<QueryOutcome, DbError> {
        self.run(sql, params)
    }

    fn begin(&mut self) -> Result<(), DbError> {
        if self.in_transaction {
            return Err(DbError::NestedTransaction);
        }
        self.conn.execute_batch("BEGIN").map_err(|e| format_sqlite_error(&e))?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DbError> {
        self.conn.execute_batch("COMMIT").map_err(|e| format_sqlite_error(&e))?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DbError> {
        self.conn.execute_batch("ROLLBACK").map_err(|e| format_sqlite_error(&e))?;
        self.in_transaction = false;
        Ok(())
    }

    fn get_tables(&mut self) -> Result<Vec<String>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .map_err(|e| format_sqlite_error(&e))?;

        let names = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| format_sqlite_error(&e))?
            .filter_map(|r: Result<String, _>| r.ok())
            .collect();

        Ok(names)
    }

    fn get_table_schema(&mut self, table: &str) -> Result<TableSchema, DbError> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info('{}')", table))
            .map_err(|e| format_sqlite_error(&e))?;

        let columns: Vec<ColumnInfo> = stmt
            .query_map([], |row| {
                Ok(ColumnInfo {
                    name: row.get(1)?,
                    type_name: row.get::<_, String>(2).unwrap_or_default(),
                    nullable: row.get::<_, i64>(3).unwrap_or(1) == 0,
                    is_primary_key: row.get::<_, i64>(5).unwrap_or(0) == 1,
                    default_value: row.get::<_, Option<String>>(4).unwrap_or(None),
                })
            })
            .map_err(|e| format_sqlite_error(&e))?
            .filter_map(|r| r.ok())
            .collect();

        if columns.is_empty() {
            return Err(DbError::SyntaxError(format!("table not found: {table}")));
        }

        Ok(TableSchema { table: table.to_string(), columns })
    }
}

/// Opens fresh [`SqliteConnection`]s against a fixed file path. Used as a
/// [`cms_pool::ConnectionFactory`] so the pool can grow/shrink its SQLite
/// connections without the caller ever opening `rusqlite::Connection` directly.
pub struct SqliteFactory {
    path: PathBuf,
}

impl SqliteFactory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConnectionFactory for SqliteFactory {
    type Conn = Box<dyn DbConnection>;

    fn open(&self) -> Result<Self::Conn, PoolError> {
        let conn = RusqliteConnection::open(&self.path)
            .map_err(|e| PoolError::ConnectFailed(e.to_string()))?;
        Ok(Box::new(SqliteConnection { conn, path: self.path.clone(), in_transaction: false }))
    }

    fn ping(&self, conn: &mut Self::Conn) -> bool {
        conn.ping()
    }
}
