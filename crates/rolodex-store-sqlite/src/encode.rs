//! Encoding helpers between core [`Value`]s and SQLite, plus the SQL text
//! built from core queries and batch operations.
//!
//! Selections arrive as fully rendered predicates (literals inlined by the
//! core crate). Update values are bound as parameters.

use rolodex_core::{
  Error as CoreError,
  field::Table,
  predicate::Predicate,
  store::TableQuery,
  value::Value,
};
use rusqlite::types::{Value as SqlValue, ValueRef};

use crate::Result;

// ─── Values ──────────────────────────────────────────────────────────────────

/// Read one column. Reals surface as text; blobs are not part of the data
/// model and read as null.
pub fn decode_value(value: ValueRef<'_>) -> Value {
  match value {
    ValueRef::Null | ValueRef::Blob(_) => Value::Null,
    ValueRef::Integer(i) => Value::Integer(i),
    ValueRef::Real(f) => Value::Text(f.to_string()),
    ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
  }
}

/// Lists only exist on the right hand side of `IN` and cannot be bound.
pub fn encode_value(value: &Value) -> Result<SqlValue> {
  match value {
    Value::Null => Ok(SqlValue::Null),
    Value::Integer(i) => Ok(SqlValue::Integer(*i)),
    Value::Text(s) => Ok(SqlValue::Text(s.clone())),
    Value::List(_) => Err(
      CoreError::IllegalArgument("a list cannot be stored in a column".into())
        .into(),
    ),
  }
}

// ─── Tables ──────────────────────────────────────────────────────────────────

/// The relation a read against `table` runs on.
pub fn source_name(table: Table) -> &'static str {
  match table {
    Table::Contacts => "contacts",
    Table::RawContacts => "raw_contacts",
    Table::Data => "data_view",
    Table::AggregationExceptions => "aggregation_exceptions",
  }
}

// ─── Statements ──────────────────────────────────────────────────────────────

fn where_clause(selection: Option<&Predicate>) -> Result<String> {
  Ok(match selection {
    Some(p) => format!(" WHERE {}", p.to_sql()?),
    None => String::new(),
  })
}

/// Rows are decoded by position, so an empty projection is rejected.
pub fn select_sql(query: &TableQuery) -> Result<String> {
  if query.columns.is_empty() {
    return Err(CoreError::IllegalArgument("empty projection".into()).into());
  }
  let columns = query.columns.join(", ");
  let mut sql = format!(
    "SELECT {columns} FROM {}{}",
    source_name(query.table),
    where_clause(query.selection.as_ref())?
  );
  if let Some(order) = &query.sort_order {
    sql.push_str(" ORDER BY ");
    sql.push_str(order);
  }
  Ok(sql)
}

/// `UPDATE` with one positional parameter per value, in order.
///
/// Data updates are written to the base table; the selection is evaluated
/// against the view so it may reference RawContact and Contact columns.
pub fn update_sql(
  table: Table,
  selection: &Predicate,
  columns: impl IntoIterator<Item = &'static str>,
) -> Result<String> {
  let set = columns
    .into_iter()
    .enumerate()
    .map(|(i, c)| format!("{c} = ?{}", i + 1))
    .collect::<Vec<_>>()
    .join(", ");
  let selection = selection.to_sql()?;
  Ok(match table {
    Table::Data => format!(
      "UPDATE data SET {set} WHERE _id IN (SELECT _id FROM data_view WHERE {selection})"
    ),
    other => format!("UPDATE {} SET {set} WHERE {selection}", source_name(other)),
  })
}
