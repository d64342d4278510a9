use std::marker::PhantomData;

use cms_core::{is_valid_identifier, DbConnection, DbError, Entity, SqlDialect, Value};

use crate::result_mapper::{map_rows, List};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
}

impl CmpOp {
    fn as_sql(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "<>",
            CmpOp::Lt => "<",
            CmpOp::Lte => "<=",
            CmpOp::Gt => ">",
            CmpOp::Gte => ">=",
            CmpOp::Like => "LIKE",
        }
    }
}

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

enum WhereCond {
    Cmp { field: String, op: CmpOp, value: Value },
    In { field: String, values: Vec<Value> },
    IsNull { field: String, negated: bool },
    Raw { fragment: String, args: Vec<Value> },
}

#[derive(Default)]
struct Plan {
    select_columns: Vec<String>,
    wheres: Vec<WhereCond>,
    order: Vec<(String, OrderDir)>,
    joins: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    group_by: Vec<String>,
    having: Option<String>,
}

/// Fluent accumulator for a single query against `E`'s table. Every chain method
/// returns `Self`; the first invalid identifier poisons the builder so the error
/// surfaces at the terminal call instead of forcing every intermediate method to
/// return a `Result`.
pub struct QueryBuilder<'d, E: Entity> {
    dialect: &'d dyn SqlDialect,
    plan: Plan,
    consumed: bool,
    error: Option<DbError>,
    _marker: PhantomData<E>,
}

impl<'d, E: Entity> QueryBuilder<'d, E> {
    pub fn new(dialect: &'d dyn SqlDialect) -> Self {
        Self {
            dialect,
            plan: Plan::default(),
            consumed: false,
            error: None,
            _marker: PhantomData,
        }
    }

    fn check_identifier(&mut self, name: &str) {
        if self.error.is_none() && !is_valid_identifier(name) {
            self.error = Some(DbError::InvalidIdentifier(name.to_string()));
        }
    }

    pub fn where_(mut self, field: &str, op: CmpOp, value: impl Into<Value>) -> Self {
        self.check_identifier(field);
        self.plan.wheres.push(WhereCond::Cmp { field: field.to_string(), op, value: value.into() });
        self
    }

    pub fn where_in(mut self, field: &str, values: Vec<Value>) -> Self {
        self.check_identifier(field);
        self.plan.wheres.push(WhereCond::In { field: field.to_string(), values });
        self
    }

    pub fn where_null(mut self, field: &str) -> Self {
        self.check_identifier(field);
        self.plan.wheres.push(WhereCond::IsNull { field: field.to_string(), negated: false });
        self
    }

    pub fn where_not_null(mut self, field: &str) -> Self {
        self.check_identifier(field);
        self.plan.wheres.push(WhereCond::IsNull { field: field.to_string(), negated: true });
        self
    }

    pub fn where_raw(mut self, fragment: &str, args: Vec<Value>) -> Self {
        self.plan.wheres.push(WhereCond::Raw { fragment: fragment.to_string(), args });
        self
    }

    pub fn order_by(mut self, field: &str, dir: OrderDir) -> Self {
        self.check_identifier(field);
        self.plan.order.push((field.to_string(), dir));
        self
    }

    pub fn join(mut self, clause: &str) -> Self {
        self.plan.joins.push(clause.to_string());
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.plan.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.plan.offset = Some(n);
        self
    }

    pub fn group_by(mut self, fields: &[&str]) -> Self {
        for f in fields {
            self.check_identifier(f);
        }
        self.plan.group_by = fields.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn having(mut self, fragment: &str) -> Self {
        self.plan.having = Some(fragment.to_string());
        self
    }

    fn take_consumed(&mut self) -> Result<(), DbError> {
        if self.consumed {
            return Err(DbError::BuilderConsumed);
        }
        self.consumed = true;
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        Ok(())
    }

    fn where_clause(&self) -> (String, Vec<Value>) {
        if self.plan.wheres.is_empty() {
            return (String::new(), Vec::new());
        }
        let mut clauses = Vec::new();
        let mut args = Vec::new();

        for cond in &self.plan.wheres {
            match cond {
                WhereCond::Cmp { field, op, value } => {
                    clauses.push(format!("{} {} ?", self.dialect.quote_identifier(field), op.as_sql()));
                    args.push(value.clone());
                }
                WhereCond::In { field, values } => {
                    let placeholders = vec!["?"; values.len()].join(", ");
                    clauses.push(format!("{} IN ({placeholders})", self.dialect.quote_identifier(field)));
                    args.extend(values.iter().cloned());
                }
                WhereCond::IsNull { field, negated } => {
                    let not = if *negated { " NOT" } else { "" };
                    clauses.push(format!("{}{not} IS NULL", self.dialect.quote_identifier(field)));
                }
                WhereCond::Raw { fragment, args: raw_args } => {
                    clauses.push(fragment.clone());
                    args.extend(raw_args.iter().cloned());
                }
            }
        }

        (format!(" WHERE {}", clauses.join(" AND ")), args)
    }

    fn from_clause(&self) -> String {
        let mut sql = self.dialect.quote_identifier(E::table_name());
        for join in &self.plan.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        sql
    }

    fn tail_clause(&self) -> String {
        let mut sql = String::new();
        if !self.plan.group_by.is_empty() {
            let cols: Vec<String> = self.plan.group_by.iter().map(|c| self.dialect.quote_identifier(c)).collect();
            sql.push_str(&format!(" GROUP BY {}", cols.join(", ")));
        }
        if let Some(having) = &self.plan.having {
            sql.push_str(&format!(" HAVING {having}"));
        }
        if !self.plan.order.is_empty() {
            let cols: Vec<String> = self
                .plan
                .order
                .iter()
                .map(|(c, d)| format!("{} {}", self.dialect.quote_identifier(c), d.as_sql()))
                .collect();
            sql.push_str(&format!(" ORDER BY {}", cols.join(", ")));
        }
        if let Some(limit) = self.plan.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.plan.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        sql
    }

    fn emit_select(&self, columns: &[&str]) -> (String, Vec<Value>) {
        let select = if columns.is_empty() {
            "*".to_string()
        } else {
            columns.iter().map(|c| self.dialect.quote_identifier(c)).collect::<Vec<_>>().join(", ")
        };
        let (where_sql, args) = self.where_clause();
        let sql = format!("SELECT {select} FROM {}{where_sql}{}", self.from_clause(), self.tail_clause());
        (sql, args)
    }

    pub fn all(mut self, conn: &mut dyn DbConnection) -> Result<List<E>, DbError> {
        self.take_consumed()?;
        let (sql, args) = self.emit_select(E::columns());
        let outcome = conn.execute(&sql, &args)?;
        map_rows(&outcome.columns, outcome.rows)
    }

    pub fn first(mut self, conn: &mut dyn DbConnection) -> Result<Option<E>, DbError> {
        self.plan.limit = Some(1);
        self.take_consumed()?;
        let (sql, args) = self.emit_select(E::columns());
        let outcome = conn.execute(&sql, &args)?;
        let list: List<E> = map_rows(&outcome.columns, outcome.rows)?;
        Ok(list.into_items().into_iter().next())
    }

    pub fn count(mut self, conn: &mut dyn DbConnection) -> Result<i64, DbError> {
        self.take_consumed()?;
        let (where_sql, args) = self.where_clause();
        let sql = format!("SELECT COUNT(*) FROM {}{where_sql}", self.from_clause());
        let outcome = conn.execute(&sql, &args)?;
        outcome
            .rows
            .first()
            .and_then(|row| row.first())
            .and_then(|v| v.as_i64())
            .ok_or_else(|| DbError::TypeMismatch { column: "COUNT(*)".to_string(), expected: "i64" })
    }

    /// Paginated listing: returns the page plus the unfiltered-by-page total.
    pub fn get(mut self, conn: &mut dyn DbConnection, page: u64, page_size: u64) -> Result<(List<E>, i64), DbError> {
        self.plan.limit = Some(page_size);
        self.plan.offset = Some(page * page_size);
        self.take_consumed()?;

        let (where_sql, where_args) = self.where_clause();
        let count_sql = format!("SELECT COUNT(*) FROM {}{where_sql}", self.from_clause());
        let count_outcome = conn.execute(&count_sql, &where_args)?;
        let total = count_outcome
            .rows
            .first()
            .and_then(|row| row.first())
            .and_then(|v| v.as_i64())
            .unwrap_or(0);

        let (sql, args) = self.emit_select(E::columns());
        let outcome = conn.execute(&sql, &args)?;
        let list = map_rows(&outcome.columns, outcome.rows)?;
        Ok((list, total))
    }

    pub fn update(mut self, conn: &mut dyn DbConnection, fields: &[(&str, Value)]) -> Result<u64, DbError> {
        for (field, _) in fields {
            self.check_identifier(field);
        }
        self.take_consumed()?;

        let assignments: Vec<String> = fields.iter().map(|(f, _)| format!("{} = ?", self.dialect.quote_identifier(f))).collect();
        let mut args: Vec<Value> = fields.iter().map(|(_, v)| v.clone()).collect();
        let (where_sql, where_args) = self.where_clause();
        args.extend(where_args);

        let sql = format!("UPDATE {} SET {}{where_sql}", self.from_clause(), assignments.join(", "));
        let outcome = conn.execute(&sql, &args)?;
        Ok(outcome.rows_affected)
    }

    pub fn delete(mut self, conn: &mut dyn DbConnection) -> Result<u64, DbError> {
        self.take_consumed()?;
        let (where_sql, args) = self.where_clause();
        let sql = format!("DELETE FROM {}{where_sql}", self.from_clause());
        let outcome = conn.execute(&sql, &args)?;
        Ok(outcome.rows_affected)
    }
}
