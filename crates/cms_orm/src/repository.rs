use cms_core::{DbConnection, DbError, Entity, SqlDialect, Value};

use crate::query_builder::{CmpOp, QueryBuilder};

/// `SELECT * FROM <table> WHERE <pk> = ? LIMIT 1`, mapped to `E`.
pub fn find<E: Entity>(conn: &mut dyn DbConnection, dialect: &dyn SqlDialect, id: i64) -> Result<Option<E>, DbError> {
    QueryBuilder::<E>::new(dialect).where_(E::primary_key_field(), CmpOp::Eq, id).first(conn)
}

pub fn all<E: Entity>(conn: &mut dyn DbConnection, dialect: &dyn SqlDialect) -> Result<Vec<E>, DbError> {
    Ok(QueryBuilder::<E>::new(dialect).all(conn)?.into_items())
}

/// Inserts a new row when `entity.is_new()`, otherwise updates by primary key.
/// On insert, assigns the backend-generated id back onto `entity`.
pub fn save<E: Entity>(conn: &mut dyn DbConnection, dialect: &dyn SqlDialect, entity: &mut E) -> Result<(), DbError> {
    let pairs = entity.into_values();

    if entity.is_new() {
        let columns: Vec<&str> = pairs.iter().map(|(c, _)| *c).collect();
        let quoted: Vec<String> = columns.iter().map(|c| dialect.quote_identifier(c)).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            dialect.quote_identifier(E::table_name()),
            quoted.join(", ")
        );
        let args: Vec<Value> = pairs.into_iter().map(|(_, v)| v).collect();

        let id = if dialect.supports_returning() {
            sql.push_str(&format!(" RETURNING {}", dialect.quote_identifier(E::primary_key_field())));
            let outcome = conn.execute(&sql, &args)?;
            outcome
                .rows
                .first()
                .and_then(|row| row.first())
                .and_then(|v| v.as_i64())
                .ok_or_else(|| DbError::SyntaxError("RETURNING clause produced no generated id".to_string()))?
        } else {
            let outcome = conn.execute(&sql, &args)?;
            outcome
                .last_insert_id
                .ok_or_else(|| DbError::SyntaxError("insert did not return a generated id".to_string()))?
        };
        entity.set_id(id);
        Ok(())
    } else {
        let id = entity.id().expect("is_new() false implies id is set");
        let fields: Vec<(&str, Value)> = pairs;
        QueryBuilder::<E>::new(dialect)
            .where_(E::primary_key_field(), CmpOp::Eq, id)
            .update(conn, &fields)
            .map(|_| ())
    }
}

pub fn delete<E: Entity>(conn: &mut dyn DbConnection, dialect: &dyn SqlDialect, id: i64) -> Result<u64, DbError> {
    QueryBuilder::<E>::new(dialect).where_(E::primary_key_field(), CmpOp::Eq, id).delete(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cms_core::SqliteDialect;
    use cms_driver_sqlite::SqliteFactory;
    use cms_pool::ConnectionFactory;

    struct User {
        id: Option<i64>,
        name: String,
        age: Option<i64>,
    }

    impl Entity for User {
        fn table_name() -> &'static str {
            "users"
        }

        fn id(&self) -> Option<i64> {
            self.id
        }

        fn set_id(&mut self, id: i64) {
            self.id = Some(id);
        }

        fn columns() -> &'static [&'static str] {
            &["id", "name", "age"]
        }

        fn from_row<F>(get: F) -> Result<Self, DbError>
        where
            F: Fn(&str) -> Option<Value>,
        {
            Ok(User {
                id: crate::result_mapper::optional_i64(get("id")),
                name: crate::result_mapper::require_string(get("name")),
                age: crate::result_mapper::optional_i64(get("age")),
            })
        }

        fn into_values(&self) -> Vec<(&'static str, Value)> {
            vec![("name", Value::Text(self.name.clone())), ("age", self.age.into())]
        }
    }

    static DIALECT: SqliteDialect = SqliteDialect;

    #[test]
    fn insert_then_find_round_trips() {
        let factory = SqliteFactory::new(cms_test_support::temp_sqlite_path());
        let mut conn = factory.open().unwrap();
        conn.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, age INTEGER)", &[]).unwrap();

        let mut user = User { id: None, name: "Alice".to_string(), age: Some(30) };
        save(conn.as_mut(), &DIALECT, &mut user).unwrap();
        assert_eq!(user.id, Some(1));

        let found: User = find(conn.as_mut(), &DIALECT, 1).unwrap().unwrap();
        assert_eq!(found.name, "Alice");
        assert_eq!(found.age, Some(30));
    }

    #[test]
    fn save_on_existing_row_updates() {
        let factory = SqliteFactory::new(cms_test_support::temp_sqlite_path());
        let mut conn = factory.open().unwrap();
        conn.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, age INTEGER)", &[]).unwrap();

        let mut user = User { id: None, name: "Bob".to_string(), age: None };
        save(conn.as_mut(), &DIALECT, &mut user).unwrap();

        user.age = Some(41);
        save(conn.as_mut(), &DIALECT, &mut user).unwrap();

        let found: User = find(conn.as_mut(), &DIALECT, user.id.unwrap()).unwrap().unwrap();
        assert_eq!(found.age, Some(41));
    }
}
