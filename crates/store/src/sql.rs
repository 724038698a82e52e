//! Run sea-query builders against rusqlite.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use sea_query::Value;
use tallyback_api::db::Built;

/// Convert `sea_query::Values` into rusqlite bind params.
pub(crate) fn bind_values(values: &sea_query::Values) -> Vec<SqlValue> {
    values
        .0
        .iter()
        .map(|v| match v {
            Value::Bool(Some(b)) => SqlValue::Integer(i64::from(*b)),
            Value::TinyInt(Some(i)) => SqlValue::Integer(i64::from(*i)),
            Value::SmallInt(Some(i)) => SqlValue::Integer(i64::from(*i)),
            Value::Int(Some(i)) => SqlValue::Integer(i64::from(*i)),
            Value::BigInt(Some(i)) => SqlValue::Integer(*i),
            Value::TinyUnsigned(Some(i)) => SqlValue::Integer(i64::from(*i)),
            Value::SmallUnsigned(Some(i)) => SqlValue::Integer(i64::from(*i)),
            Value::Unsigned(Some(i)) => SqlValue::Integer(i64::from(*i)),
            Value::BigUnsigned(Some(i)) => SqlValue::Integer(i64::try_from(*i).unwrap_or(i64::MAX)),
            Value::Float(Some(f)) => SqlValue::Real(f64::from(*f)),
            Value::Double(Some(f)) => SqlValue::Real(*f),
            Value::String(Some(s)) => SqlValue::Text(s.as_ref().clone()),
            Value::Char(Some(c)) => SqlValue::Text(c.to_string()),
            Value::Bytes(Some(b)) => SqlValue::Blob(b.as_ref().clone()),
            _ => SqlValue::Null,
        })
        .collect()
}

pub(crate) fn execute(conn: &Connection, (sql, values): Built) -> rusqlite::Result<usize> {
    conn.execute(&sql, params_from_iter(bind_values(&values)))
}

pub(crate) fn query_opt<T, F>(conn: &Connection, (sql, values): Built, f: F) -> rusqlite::Result<Option<T>>
where
    F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
{
    conn.query_row(&sql, params_from_iter(bind_values(&values)), f)
        .optional()
}

pub(crate) fn query_all<T, F>(conn: &Connection, (sql, values): Built, f: F) -> rusqlite::Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(bind_values(&values)), f)?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_cover_the_types_builders_emit() {
        let values = sea_query::Values(vec![
            true.into(),
            7i64.into(),
            2.5f64.into(),
            "x".into(),
            Option::<String>::None.into(),
        ]);
        assert_eq!(
            bind_values(&values),
            vec![
                SqlValue::Integer(1),
                SqlValue::Integer(7),
                SqlValue::Real(2.5),
                SqlValue::Text("x".to_string()),
                SqlValue::Null,
            ]
        );
    }
}
