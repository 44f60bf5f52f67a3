//! Conversion between Quill values and the driver's `Any` types

use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, Column, Row as _, ValueRef};

use crate::{Result, Row, Value};

/// Bind values to a query in order
pub(crate) fn bind_values<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    params: &'q [Value],
) -> Query<'q, Any, AnyArguments<'q>> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<i64>),
            Value::Bool(b) => query.bind(*b),
            Value::I32(i) => query.bind(*i),
            Value::I64(i) => query.bind(*i),
            Value::F32(f) => query.bind(*f),
            Value::F64(f) => query.bind(*f),
            Value::String(s) => query.bind(s.as_str()),
            Value::Bytes(b) => query.bind(b.as_slice()),
            // the Any driver has no JSON type; send the text
            Value::Json(j) => query.bind(j.to_string()),
        };
    }
    query
}

/// Decode every column of a driver row, keeping column order
pub(crate) fn decode_row(row: &AnyRow) -> Result<Row> {
    let mut out = Row::with_capacity(row.len());
    for column in row.columns() {
        let value = decode_column(row, column.ordinal())?;
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

fn decode_column(row: &AnyRow, index: usize) -> Result<Value> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    if let Ok(i) = row.try_get::<i64, _>(index) {
        return Ok(Value::I64(i));
    }
    if let Ok(f) = row.try_get::<f64, _>(index) {
        return Ok(Value::F64(f));
    }
    if let Ok(s) = row.try_get::<String, _>(index) {
        return Ok(Value::String(s));
    }
    if let Ok(b) = row.try_get::<bool, _>(index) {
        return Ok(Value::Bool(b));
    }

    let bytes = row.try_get::<Vec<u8>, _>(index)?;
    Ok(Value::Bytes(bytes))
}
