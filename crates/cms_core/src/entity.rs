use crate::error::DbError;
use crate::value::Value;

/// A statically declared record type with a table name and a primary key.
///
/// Implementors are typically hand-written (the teacher's codebase favors explicit
/// wiring over derive macros): each entity knows its table, its primary-key field
/// name, how to read itself out of a mapped row, and how to decompose itself into
/// column/value pairs for `INSERT`/`UPDATE`.
pub trait Entity: Sized {
    /// Table this entity maps to.
    fn table_name() -> &'static str;

    /// Name of the primary-key column. Convention: `id`, a nullable integer.
    fn primary_key_field() -> &'static str {
        "id"
    }

    /// Current primary key value, if this instance has been persisted.
    fn id(&self) -> Option<i64>;

    /// Assigns a primary key after a successful insert.
    fn set_id(&mut self, id: i64);

    /// Column names in a stable, declaration order (excluding the primary key on insert).
    fn columns() -> &'static [&'static str];

    /// Builds the record from a column-name -> Value lookup, as produced by the
    /// result mapper. A NULL hitting a non-nullable field or an unexpected
    /// stored type must surface as the matching `DbError` variant, not be
    /// collapsed into a generic failure.
    fn from_row<F>(get: F) -> Result<Self, DbError>
    where
        F: Fn(&str) -> Option<Value>;

    /// Decomposes this instance into `(column, value)` pairs for INSERT/UPDATE,
    /// excluding the primary key column.
    fn into_values(&self) -> Vec<(&'static str, Value)>;

    fn is_new(&self) -> bool {
        !matches!(self.id(), Some(id) if id > 0)
    }
}
