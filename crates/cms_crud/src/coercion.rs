use cms_core::{ColumnInfo, Value};

use crate::error::CrudError;

/// Coerces `raw` to the Field Value variant implied by `column`'s declared
/// database type family, per the §4.4 type-inference table.
pub fn coerce_value(column: &ColumnInfo, raw: Value) -> Result<Value, CrudError> {
    if raw.is_null() {
        if !column.nullable {
            return Err(CrudError::InvalidFieldValue {
                field: column.name.clone(),
                reason: "column is not nullable".to_string(),
            });
        }
        return Ok(Value::Null);
    }

    let family = column.type_name.to_ascii_uppercase();

    let coerced = if family.contains("INT") {
        raw.as_i64().map(Value::Int)
    } else if family.contains("DECIMAL") || family.contains("NUMERIC") || family.contains("FLOAT") || family.contains("DOUBLE") {
        raw.as_f64().map(Value::Float)
    } else if family.contains("BOOL") {
        raw.as_bool().map(Value::Bool)
    } else if family.contains("VARCHAR") || family.contains("TEXT") || family.contains("CHAR") || family.contains("BLOB") {
        Some(Value::Text(raw.to_string()))
    } else if family.contains("DATE") || family.contains("TIME") {
        raw.as_i64().map(Value::Int).or_else(|| Some(Value::Text(raw.to_string())))
    } else {
        log::warn!("[CRUD] unrecognized column type {family:?} for {}, treating as text", column.name);
        Some(Value::Text(raw.to_string()))
    };

    coerced.ok_or_else(|| CrudError::InvalidFieldValue {
        field: column.name.clone(),
        reason: format!("cannot coerce value to {family}"),
    })
}
