use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use cms_core::{is_valid_identifier, CrudConfig, DbConnection, TableSchema, Value};

use crate::coercion::coerce_value;
use crate::dynamic_row::DynamicRow;
use crate::error::CrudError;

/// Sort direction for [`DynamicCrud::list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDir {
    Asc,
    Desc,
}

impl OrderDir {
    fn as_sql(self) -> &'static str {
        match self {
            OrderDir::Asc => "ASC",
            OrderDir::Desc => "DESC",
        }
    }
}

/// Pagination, ordering and equality-filter parameters for [`DynamicCrud::list`].
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub page: u64,
    pub page_size: u64,
    pub order_by: Option<String>,
    pub order_dir: OrderDir,
    pub filters: HashMap<String, Value>,
}

impl Default for OrderDir {
    fn default() -> Self {
        OrderDir::Asc
    }
}

/// A page of dynamic rows plus the total row count across the whole
/// (filtered, unpaginated) result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicResultSet {
    pub rows: Vec<DynamicRow>,
    pub total: i64,
}

/// Schema-driven CRUD over whitelisted tables only. Every operation validates
/// the table against the whitelist and the fields against the cached schema
/// before a single byte of SQL reaches the connection.
pub struct DynamicCrud {
    allowed_tables: HashSet<String>,
    schema_cache: RwLock<HashMap<String, TableSchema>>,
}

impl DynamicCrud {
    pub fn new(config: &CrudConfig) -> Self {
        Self {
            allowed_tables: config.allowed_tables.iter().cloned().collect(),
            schema_cache: RwLock::new(HashMap::new()),
        }
    }

    fn check_allowed(&self, table: &str) -> Result<(), CrudError> {
        if !self.allowed_tables.contains(table) {
            return Err(CrudError::TableForbidden(table.to_string()));
        }
        Ok(())
    }

    /// Returns the cached schema for `table`, discovering and caching it on
    /// first use. Never called unless `table` already passed the whitelist.
    fn get_schema(&self, conn: &mut dyn DbConnection, table: &str) -> Result<TableSchema, CrudError> {
        if let Some(schema) = self.schema_cache.read().unwrap().get(table) {
            return Ok(schema.clone());
        }

        let schema = conn.get_table_schema(table).map_err(|err| {
            log::warn!("[CRUD] schema lookup failed for {table:?}: {err}");
            CrudError::TableNotFound(table.to_string())
        })?;

        self.schema_cache.write().unwrap().insert(table.to_string(), schema.clone());
        Ok(schema)
    }

    /// Invalidates the cached schema for `table`, forcing rediscovery on next use.
    pub fn invalidate_schema(&self, table: &str) {
        self.schema_cache.write().unwrap().remove(table);
    }

    fn validate_fields(
        &self,
        schema: &TableSchema,
        fields: &HashMap<String, Value>,
    ) -> Result<Vec<(String, Value)>, CrudError> {
        let mut coerced = Vec::with_capacity(fields.len());
        for (name, raw) in fields {
            if !is_valid_identifier(name) {
                return Err(CrudError::FieldNotFound {
                    table: schema.table.clone(),
                    field: name.clone(),
                });
            }
            let column = schema.column(name).ok_or_else(|| CrudError::FieldNotFound {
                table: schema.table.clone(),
                field: name.clone(),
            })?;
            coerced.push((name.clone(), coerce_value(column, raw.clone())?));
        }
        Ok(coerced)
    }

    /// Paginated, filtered, ordered listing. Validates `order_by` and every
    /// filter key against the table's schema before any SQL is emitted, then
    /// issues a count query (over the same filters) alongside the page query.
    pub fn list(
        &self,
        conn: &mut dyn DbConnection,
        table: &str,
        params: ListParams,
    ) -> Result<DynamicResultSet, CrudError> {
        self.check_allowed(table)?;
        let schema = self.get_schema(conn, table)?;
        let filters = self.validate_fields(&schema, &params.filters)?;

        if let Some(order_by) = &params.order_by {
            if !is_valid_identifier(order_by) || schema.column(order_by).is_none() {
                return Err(CrudError::FieldNotFound { table: table.to_string(), field: order_by.clone() });
            }
        }

        let dialect = conn.dialect();
        let quoted_table = dialect.quote_identifier(table);
        let (where_sql, where_args) = if filters.is_empty() {
            (String::new(), Vec::new())
        } else {
            let clauses: Vec<String> =
                filters.iter().map(|(name, _)| format!("{} = ?", dialect.quote_identifier(name))).collect();
            let args: Vec<Value> = filters.iter().map(|(_, v)| v.clone()).collect();
            (format!(" WHERE {}", clauses.join(" AND ")), args)
        };

        let count_sql = format!("SELECT COUNT(*) FROM {quoted_table}{where_sql}");
        let count_outcome = conn.execute(&count_sql, &where_args)?;
        let total = count_outcome
            .rows
            .first()
            .and_then(|row| row.first())
            .and_then(|v| v.as_i64())
            .unwrap_or(0);

        let mut sql = format!("SELECT * FROM {quoted_table}{where_sql}");
        if let Some(order_by) = &params.order_by {
            sql.push_str(&format!(" ORDER BY {} {}", dialect.quote_identifier(order_by), params.order_dir.as_sql()));
        }
        sql.push_str(" LIMIT ? OFFSET ?");

        let page_size = params.page_size.max(1);
        let mut args = where_args;
        args.push(Value::Int(page_size as i64));
        args.push(Value::Int((params.page * page_size) as i64));

        let outcome = conn.execute(&sql, &args)?;
        let rows = rows_to_dynamic(&outcome.columns, outcome.rows, &schema);
        Ok(DynamicResultSet { rows, total })
    }

    pub fn get(&self, conn: &mut dyn DbConnection, table: &str, id: Value) -> Result<Option<DynamicRow>, CrudError> {
        self.check_allowed(table)?;
        let schema = self.get_schema(conn, table)?;
        let pk = schema.primary_key().ok_or_else(|| CrudError::FieldNotFound {
            table: table.to_string(),
            field: "<primary key>".to_string(),
        })?;
        let quoted_table = conn.dialect().quote_identifier(table);
        let quoted_pk = conn.dialect().quote_identifier(&pk.name);
        let sql = format!("SELECT * FROM {quoted_table} WHERE {quoted_pk} = ?");
        let outcome = conn.execute(&sql, &[id])?;
        Ok(rows_to_dynamic(&outcome.columns, outcome.rows, &schema).into_iter().next())
    }

    pub fn create(
        &self,
        conn: &mut dyn DbConnection,
        table: &str,
        fields: HashMap<String, Value>,
    ) -> Result<i64, CrudError> {
        self.check_allowed(table)?;
        let schema = self.get_schema(conn, table)?;
        let coerced = self.validate_fields(&schema, &fields)?;

        let dialect = conn.dialect();
        let quoted_table = dialect.quote_identifier(table);
        let columns: Vec<String> = coerced.iter().map(|(name, _)| dialect.quote_identifier(name)).collect();
        let placeholders: Vec<&str> = coerced.iter().map(|_| "?").collect();
        let sql = format!(
            "INSERT INTO {quoted_table} ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );
        let values: Vec<Value> = coerced.into_iter().map(|(_, value)| value).collect();
        let outcome = conn.execute(&sql, &values)?;
        Ok(outcome.last_insert_id.unwrap_or_default())
    }

    pub fn update(
        &self,
        conn: &mut dyn DbConnection,
        table: &str,
        id: Value,
        fields: HashMap<String, Value>,
    ) -> Result<u64, CrudError> {
        self.check_allowed(table)?;
        let schema = self.get_schema(conn, table)?;
        let coerced = self.validate_fields(&schema, &fields)?;
        let pk = schema.primary_key().ok_or_else(|| CrudError::FieldNotFound {
            table: table.to_string(),
            field: "<primary key>".to_string(),
        })?;

        let dialect = conn.dialect();
        let quoted_table = dialect.quote_identifier(table);
        let quoted_pk = dialect.quote_identifier(&pk.name);
        let assignments: Vec<String> = coerced
            .iter()
            .map(|(name, _)| format!("{} = ?", dialect.quote_identifier(name)))
            .collect();
        let sql = format!("UPDATE {quoted_table} SET {} WHERE {quoted_pk} = ?", assignments.join(", "));
        let mut values: Vec<Value> = coerced.into_iter().map(|(_, value)| value).collect();
        values.push(id);
        let outcome = conn.execute(&sql, &values)?;
        Ok(outcome.rows_affected)
    }

    /// Deletes every row whose primary key is in `ids`, as a single batch.
    /// `ids` must be non-empty; an empty batch is a no-op that never touches
    /// the database.
    pub fn delete(&self, conn: &mut dyn DbConnection, table: &str, ids: &[Value]) -> Result<u64, CrudError> {
        self.check_allowed(table)?;
        if ids.is_empty() {
            return Ok(0);
        }
        let schema = self.get_schema(conn, table)?;
        let pk = schema.primary_key().ok_or_else(|| CrudError::FieldNotFound {
            table: table.to_string(),
            field: "<primary key>".to_string(),
        })?;
        let quoted_table = conn.dialect().quote_identifier(table);
        let quoted_pk = conn.dialect().quote_identifier(&pk.name);
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("DELETE FROM {quoted_table} WHERE {quoted_pk} IN ({placeholders})");
        let outcome = conn.execute(&sql, ids)?;
        Ok(outcome.rows_affected)
    }
}

fn rows_to_dynamic(columns: &[String], rows: Vec<Vec<Value>>, _schema: &TableSchema) -> Vec<DynamicRow> {
    rows.into_iter()
        .map(|row| DynamicRow::new(columns.iter().cloned().zip(row).collect()))
        .collect()
}
