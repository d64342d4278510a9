use std::collections::HashMap;

use cms_core::{CrudConfig, DbConnection, Value};
use cms_crud::{CrudError, DynamicCrud, ListParams, OrderDir};
use cms_driver_sqlite::SqliteFactory;
use cms_pool::ConnectionFactory;

fn seeded_crud() -> (DynamicCrud, Box<dyn DbConnection>) {
    let factory = SqliteFactory::new(cms_test_support::temp_sqlite_path());
    let mut conn = factory.open().unwrap();
    conn.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)", &[]).unwrap();
    conn.execute("CREATE TABLE secrets (id INTEGER PRIMARY KEY, token TEXT NOT NULL)", &[]).unwrap();

    let config = CrudConfig { allowed_tables: vec!["users".to_string()] };
    (DynamicCrud::new(&config), conn)
}

#[test]
fn non_whitelisted_table_is_rejected_on_every_operation_before_touching_the_db() {
    let (crud, mut conn) = seeded_crud();

    let mut fields = HashMap::new();
    fields.insert("token".to_string(), Value::Text("x".to_string()));
    assert!(matches!(crud.create(conn.as_mut(), "secrets", fields.clone()), Err(CrudError::TableForbidden(_))));
    assert!(matches!(crud.get(conn.as_mut(), "secrets", Value::Int(1)), Err(CrudError::TableForbidden(_))));
    assert!(matches!(
        crud.list(conn.as_mut(), "secrets", ListParams::default()),
        Err(CrudError::TableForbidden(_))
    ));
    assert!(matches!(crud.update(conn.as_mut(), "secrets", Value::Int(1), fields), Err(CrudError::TableForbidden(_))));
    assert!(matches!(crud.delete(conn.as_mut(), "secrets", &[Value::Int(1)]), Err(CrudError::TableForbidden(_))));

    let outcome = conn.execute("SELECT COUNT(*) FROM secrets", &[]).unwrap();
    assert_eq!(outcome.rows[0][0], Value::Int(0));
}

#[test]
fn an_attacker_controlled_field_name_cannot_smuggle_sql() {
    let (crud, mut conn) = seeded_crud();
    let mut fields = HashMap::new();
    fields.insert("name; DROP TABLE users; --".to_string(), Value::Text("x".to_string()));

    let result = crud.create(conn.as_mut(), "users", fields);
    assert!(matches!(result, Err(CrudError::FieldNotFound { .. })));

    // users table must still exist and be empty
    let page = crud.list(conn.as_mut(), "users", ListParams::default()).unwrap();
    assert_eq!(page.total, 0);
}

#[test]
fn full_crud_cycle_against_a_whitelisted_table() {
    let (crud, mut conn) = seeded_crud();

    let mut ids = Vec::new();
    for name in ["Alice", "Bob", "Carol"] {
        let mut fields = HashMap::new();
        fields.insert("name".to_string(), Value::Text(name.to_string()));
        ids.push(Value::Int(crud.create(conn.as_mut(), "users", fields).unwrap()));
    }

    let page = crud
        .list(
            conn.as_mut(),
            "users",
            ListParams {
                page: 0,
                page_size: 2,
                order_by: Some("name".to_string()),
                order_dir: OrderDir::Asc,
                filters: HashMap::new(),
            },
        )
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.rows[0].get("name"), Some(&Value::Text("Alice".to_string())));

    let mut patch = HashMap::new();
    patch.insert("name".to_string(), Value::Text("Alicia".to_string()));
    let affected = crud.update(conn.as_mut(), "users", ids[0].clone(), patch).unwrap();
    assert_eq!(affected, 1);

    let deleted = crud.delete(conn.as_mut(), "users", &ids[1..]).unwrap();
    assert_eq!(deleted, 2);

    let remaining = crud.list(conn.as_mut(), "users", ListParams::default()).unwrap();
    assert_eq!(remaining.total, 1);
    assert_eq!(remaining.rows[0].get("name"), Some(&Value::Text("Alicia".to_string())));
}
