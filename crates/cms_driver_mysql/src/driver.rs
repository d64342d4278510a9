use cms_core::{ColumnInfo, DbConnection, DbError, MySqlDialect, QueryOutcome, SqlDialect, TableSchema, Value};
use cms_pool::{ConnectionFactory, PoolError};
use mysql::prelude::*;
use mysql::{Conn, Opts, OptsBuilder, Params, Value as MyValue};

static MYSQL_DIALECT: MySqlDialect = MySqlDialect;

fn format_mysql_error(e: mysql::Error) -> DbError {
    match &e {
        mysql::Error::MySqlError(err) => {
            // MySQL error codes 1062 (duplicate key) and 1452 (FK) are constraint
            // violations; everything else surfaces as a syntax/execution error.
            if err.code == 1062 || err.code == 1452 || err.code == 1048 {
                DbError::ConstraintViolation(err.message.clone())
            } else {
                DbError::SyntaxError(err.message.clone())
            }
        }
        other => DbError::SyntaxError(other.to_string()),
    }
}

fn value_to_mysql(value: &Value) -> MyValue {
    match value {
        Value::Null => MyValue::NULL,
        Value::Bool(b) => MyValue::Int(*b as i64),
        Value::Int(v) => MyValue::Int(*v),
        Value::Float(v) => MyValue::Double(*v),
        Value::Text(s) => MyValue::Bytes(s.clone().into_bytes()),
    }
}

fn mysql_to_value(value: MyValue) -> Value {
    match value {
        MyValue::NULL => Value::Null,
        MyValue::Int(i) => Value::Int(i),
        MyValue::UInt(u) => {
            if u <= i64::MAX as u64 {
                Value::Int(u as i64)
            } else {
                Value::Text(u.to_string())
            }
        }
        MyValue::Float(f) => Value::Float(f as f64),
        MyValue::Double(d) => Value::Float(d),
        MyValue::Bytes(b) => Value::Text(String::from_utf8_lossy(&b).into_owned()),
        MyValue::Date(year, month, day, hour, min, sec, micro) => Value::Text(format!(
            "{year:04}-{month:02}-{day:02} {hour:02}:{min:02}:{sec:02}.{micro:06}"
        )),
        MyValue::Time(neg, days, hour, min, sec, micro) => {
            let sign = if neg { "-" } else { "" };
            Value::Text(format!("{sign}{days}d {hour:02}:{min:02}:{sec:02}.{micro:06}"))
        }
    }
}

/// An owned MySQL session. Raw `mysql::Conn`, matching the teacher's driver;
/// pooling discipline (one `Conn` per caller at a time) is enforced by the
/// surrounding [`cms_pool::Pool`], not by an internal mutex here.
pub struct MysqlConnection {
    conn: Conn,
    database: String,
    in_transaction: bool,
}

impl MysqlConnection {
    fn run(&mut self, sql: &str, params: &[Value]) -> Result<QueryOutcome, DbError> {
        let bound: Vec<MyValue> = params.iter().map(value_to_mysql).collect();
        let mysql_params = if bound.is_empty() { Params::Empty } else { Params::Positional(bound) };

        let mut result = self
            .conn
            .exec_iter(sql, mysql_params)
            .map_err(format_mysql_error)?;

        let columns: Vec<String> = result
            .columns()
            .as_ref()
            .map(|cols| cols.iter().map(|c| c.name_str().into_owned()).collect())
            .unwrap_or_default();

        let mut rows = Vec::new();
        for row in result.by_ref() {
            let row = row.map_err(format_mysql_error)?;
            let values: Vec<Value> = row.unwrap().into_iter().map(mysql_to_value).collect();
            rows.push(values);
        }

        let rows_affected = result.affected_rows();
        let last_insert_id = {
            let id = result.last_insert_id();
            id.filter(|v| *v > 0).map(|v| v as i64)
        };

        Ok(QueryOutcome { columns, rows, rows_affected, last_insert_id })
    }
}

impl DbConnection for MysqlConnection {
    fn dialect(&self) -> &'static dyn SqlDialect {
        &MYSQL_DIALECT
    }

    fn ping(&mut self) -> bool {
        self.conn.ping()
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<QueryOutcome, DbError> {
        self.run(sql, params)
    }

    fn begin(&mut self) -> Result<(), DbError> {
        if self.in_transaction {
            return Err(DbError::NestedTransaction);
        }
        self.run("BEGIN", &[])?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DbError> {
        self.run("COMMIT", &[])?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DbError> {
        self.run("ROLLBACK", &[])?;
        self.in_transaction = false;
        Ok(())
    }

    fn get_tables(&mut self) -> Result<Vec<String>, DbError> {
        let outcome = self.run(
            "SELECT table_name FROM information_schema.tables WHERE table_schema = ? ORDER BY table_name",
            &[Value::Text(self.database.clone())],
        )?;
        Ok(outcome
            .rows
            .into_iter()
            .filter_map(|mut row| row.pop())
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect())
    }

    fn get_table_schema(&mut self, table: &str) -> Result<TableSchema, DbError> {
        let outcome = self.run(
            "SELECT column_name, column_type, is_nullable, column_default, column_key \
             FROM information_schema.columns WHERE table_schema = ? AND table_name = ? \
             ORDER BY ordinal_position",
            &[Value::Text(self.database.clone()), Value::Text(table.to_string())],
        )?;

        if outcome.rows.is_empty() {
            return Err(DbError::SyntaxError(format!("table not found: {table}")));
        }

        let columns = outcome
            .rows
            .into_iter()
            .map(|row| ColumnInfo {
                name: row[0].as_str().unwrap_or_default().to_string(),
                type_name: row[1].as_str().unwrap_or_default().to_string(),
                nullable: row[2].as_str() == Some("YES"),
                is_primary_key: row[4].as_str() == Some("PRI"),
                default_value: row[3].as_str().map(|s| s.to_string()),
            })
            .collect();

        Ok(TableSchema { table: table.to_string(), columns })
    }
}

/// Opens fresh [`MysqlConnection`]s against a fixed host/credential set.
pub struct MysqlFactory {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    database: String,
}

impl MysqlFactory {
    pub fn new(host: impl Into<String>, port: u16, user: impl Into<String>, password: Option<String>, database: impl Into<String>) -> Self {
        Self { host: host.into(), port, user: user.into(), password, database: database.into() }
    }
}

impl ConnectionFactory for MysqlFactory {
    type Conn = Box<dyn DbConnection>;

    fn open(&self) -> Result<Self::Conn, PoolError> {
        let opts = OptsBuilder::default()
            .ip_or_hostname(Some(self.host.clone()))
            .tcp_port(self.port)
            .user(Some(self.user.clone()))
            .pass(self.password.clone())
            .db_name(Some(self.database.clone()));

        let conn = Conn::new(Opts::from(opts)).map_err(|e| PoolError::ConnectFailed(e.to_string()))?;
        Ok(Box::new(MysqlConnection { conn, database: self.database.clone(), in_transaction: false }))
    }

    fn ping(&self, conn: &mut Self::Conn) -> bool {
        conn.ping()
    }
}
