use serde_json::{Map, Value};
use sqlx::MySqlPool;

use crate::error::{ApiError, ApiResult};

/// SQL bindable value
#[derive(Debug, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    F64(f64),
    Bool(bool),
    Null,
}

/// What a column accepts from JSON.
#[derive(Debug, Clone, Copy)]
pub enum ColumnKind {
    Text,
    NullableText,
    /// Non-negative whole number
    Count,
    NullableCount,
    /// Non-negative number of days, half-day values allowed
    Days,
    Bool,
    NullableId,
}

/// A JSON field that may be written to a table column.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub field: &'static str,
    pub column: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    pub const fn new(field: &'static str, column: &'static str, kind: ColumnKind) -> Self {
        Self {
            field,
            column,
            kind,
        }
    }
}

#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

fn convert(column: &Column, value: &Value) -> ApiResult<SqlValue> {
    let invalid = || ApiError::bad_request(format!("Invalid value for {}", column.field));

    let converted = match (column.kind, value) {
        (ColumnKind::NullableText | ColumnKind::NullableCount | ColumnKind::NullableId, Value::Null) => {
            SqlValue::Null
        }
        (ColumnKind::Text, Value::String(s)) if !s.trim().is_empty() => {
            SqlValue::String(s.trim().to_string())
        }
        (ColumnKind::NullableText, Value::String(s)) => SqlValue::String(s.trim().to_string()),
        (ColumnKind::Count | ColumnKind::NullableCount, Value::Number(n)) => {
            // INT columns
            let count = n
                .as_i64()
                .filter(|v| (0..=i64::from(i32::MAX)).contains(v))
                .ok_or_else(invalid)?;
            SqlValue::I64(count)
        }
        (ColumnKind::NullableId, Value::Number(n)) => {
            SqlValue::I64(n.as_i64().filter(|v| *v > 0).ok_or_else(invalid)?)
        }
        (ColumnKind::Days, Value::Number(n)) => {
            let days = n.as_f64().filter(|v| *v >= 0.0 && v.is_finite()).ok_or_else(invalid)?;
            if (days * 2.0).fract() != 0.0 {
                return Err(invalid());
            }
            SqlValue::F64(days)
        }
        (ColumnKind::Bool, Value::Bool(b)) => SqlValue::Bool(*b),
        _ => return Err(invalid()),
    };

    Ok(converted)
}

/// Builds `UPDATE {table} SET ... WHERE {id_column} = ?` from the allowed
/// fields present in `payload`. Unknown fields are ignored.
pub fn build_update_sql(
    table: &str,
    allowed: &[Column],
    payload: &Value,
    id_column: &str,
    id_value: u64,
) -> ApiResult<SqlUpdate> {
    let obj: &Map<String, Value> = payload
        .as_object()
        .ok_or_else(|| ApiError::bad_request("Payload must be a JSON object"))?;

    let mut assignments = Vec::new();
    let mut values = Vec::new();

    for column in allowed {
        if let Some(value) = obj.get(column.field) {
            values.push(convert(column, value)?);
            assignments.push(format!("{} = ?", column.column));
        }
    }

    if assignments.is_empty() {
        return Err(ApiError::bad_request("No valid fields to update"));
    }

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table,
        assignments.join(", "),
        id_column
    );
    values.push(SqlValue::I64(id_value as i64));

    Ok(SqlUpdate { sql, values })
}

/// Executes the update. MySQL reports changed rows, so callers check existence first.
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}
