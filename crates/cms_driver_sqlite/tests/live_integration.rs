use cms_core::{DbConnection, Value};
use cms_pool::ConnectionFactory;
use cms_driver_sqlite::SqliteFactory;

fn connect() -> Box<dyn DbConnection> {
    let path = cms_test_support::temp_sqlite_path();
    let factory = SqliteFactory::new(path);
    factory.open().expect("open sqlite connection")
}

#[test]
fn file_backed_connect_ping_query_and_schema() {
    let mut conn = connect();
    assert!(conn.ping());

    conn.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)", &[])
        .unwrap();
    conn.execute("INSERT INTO users (name) VALUES (?)", &[Value::Text("alice".into())])
        .unwrap();

    let result = conn.execute("SELECT id, name FROM users", &[]).unwrap();
    assert_eq!(result.rows.len(), 1);

    let tables = conn.get_tables().unwrap();
    assert_eq!(tables, vec!["users".to_string()]);

    let schema = conn.get_table_schema("users").unwrap();
    assert_eq!(schema.primary_key().unwrap().name, "id");
}

#[test]
fn transaction_rolls_back_on_failure() {
    let mut conn = connect();
    conn.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT UNIQUE)", &[])
        .unwrap();

    conn.begin().unwrap();
    conn.execute("INSERT INTO users (name) VALUES (?)", &[Value::Text("bob".into())])
        .unwrap();
    let dup = conn.execute("INSERT INTO users (name) VALUES (?)", &[Value::Text("bob".into())]);
    assert!(dup.is_err());
    conn.rollback().unwrap();

    let count = conn.execute("SELECT COUNT(*) FROM users", &[]).unwrap();
    assert_eq!(count.rows[0][0], Value::Int(0));
}
