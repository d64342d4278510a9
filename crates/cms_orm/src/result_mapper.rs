use bumpalo::Bump;

use cms_core::{DbError, Entity, Value};

/// Decodes a required (non-nullable) integer column per the §4.3 decoding table:
/// NULL is a hard error, any other shape coerces via [`Value::as_i64`].
pub fn require_i64(value: Option<Value>, column: &str) -> Result<i64, DbError> {
    match value {
        None | Some(Value::Null) => Err(DbError::NullForNonNullable(column.to_string())),
        Some(v) => v.as_i64().ok_or_else(|| DbError::TypeMismatch { column: column.to_string(), expected: "i64" }),
    }
}

pub fn require_f64(value: Option<Value>, column: &str) -> Result<f64, DbError> {
    match value {
        None | Some(Value::Null) => Err(DbError::NullForNonNullable(column.to_string())),
        Some(v) => v.as_f64().ok_or_else(|| DbError::TypeMismatch { column: column.to_string(), expected: "f64" }),
    }
}

pub fn require_bool(value: Option<Value>, column: &str) -> Result<bool, DbError> {
    match value {
        None | Some(Value::Null) => Err(DbError::NullForNonNullable(column.to_string())),
        Some(v) => v.as_bool().ok_or_else(|| DbError::TypeMismatch { column: column.to_string(), expected: "bool" }),
    }
}

/// A required string column never errors on NULL; it falls back to a static
/// empty string per the §4.3 rule that NULL-valued text columns decode to `""`.
pub fn require_string(value: Option<Value>) -> String {
    match value {
        Some(Value::Text(s)) => s,
        Some(v) if !v.is_null() => v.to_string(),
        _ => String::new(),
    }
}

pub fn optional_i64(value: Option<Value>) -> Option<i64> {
    value.and_then(|v| if v.is_null() { None } else { v.as_i64() })
}

pub fn optional_string(value: Option<Value>) -> Option<String> {
    value.and_then(|v| match v {
        Value::Null => None,
        Value::Text(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// Owns the scratch allocations made while decoding one result set (row buffers,
/// intermediate text) plus the final materialized entities. Releasing the list
/// drops the arena and every entity in it as a single operation.
pub struct List<E> {
    arena: Bump,
    items: Vec<E>,
}

impl<E> List<E> {
    pub(crate) fn new(arena: Bump, items: Vec<E>) -> Self {
        Self { arena, items }
    }

    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn first(&self) -> Option<&E> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&E> {
        self.items.last()
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn into_items(self) -> Vec<E> {
        self.items
    }

    /// Bytes currently held by the scratch arena, exposed for tests/metrics only.
    pub fn arena_bytes(&self) -> usize {
        self.arena.allocated_bytes()
    }
}

/// Maps every row of a raw result set into `E` via [`Entity::from_row`], using a
/// fresh arena for the pass's scratch buffers.
pub fn map_rows<E: Entity>(columns: &[String], rows: Vec<Vec<Value>>) -> Result<List<E>, DbError> {
    let arena = Bump::new();
    let mut items = Vec::with_capacity(rows.len());

    for row in rows {
        // Scratch buffer for this row's column index, arena-allocated so the
        // pass doesn't pay one heap allocation per row for a throwaway Vec.
        let mut index = bumpalo::collections::Vec::with_capacity_in(columns.len(), &arena);
        index.extend(row.into_iter());

        let lookup = |name: &str| -> Option<Value> {
            columns.iter().position(|c| c == name).and_then(|i| index.get(i).cloned())
        };

        let entity = E::from_row(lookup)?;
        items.push(entity);
    }

    Ok(List::new(arena, items))
}
