//! Untyped column values — the currency of the store-adapter boundary.
//!
//! Rows coming out of a store and literals going into a predicate are both
//! expressed as [`Value`]s. Nothing above the mapper layer sees them.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A single column value as understood by the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
  Null,
  Integer(i64),
  Text(String),
  /// Only valid as the right hand side of `IN` / `NOT IN`.
  List(Vec<Value>),
}

impl Value {
  pub fn is_null(&self) -> bool { matches!(self, Self::Null) }

  /// Integer view of the value. Numeric text is accepted because the store
  /// is dynamically typed and type codes are sometimes written as text.
  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Self::Integer(i) => Some(*i),
      Self::Text(s) => s.trim().parse().ok(),
      Self::Null | Self::List(_) => None,
    }
  }

  pub fn as_text(&self) -> Option<String> {
    match self {
      Self::Text(s) => Some(s.clone()),
      Self::Integer(i) => Some(i.to_string()),
      Self::Null | Self::List(_) => None,
    }
  }

  /// Booleans are stored as `0` / `1`.
  pub fn as_bool(&self) -> Option<bool> { self.as_i64().map(|i| i != 0) }

  /// Render as an SQL literal. Strings are single-quoted with embedded quotes
  /// doubled; when `redact` is set every literal is replaced by `'*'`.
  pub fn to_sql_literal(&self, redact: bool) -> String {
    match self {
      Self::Null => "NULL".to_owned(),
      Self::Integer(_) | Self::Text(_) if redact => "'*'".to_owned(),
      Self::Integer(i) => i.to_string(),
      Self::Text(s) => quote(s),
      Self::List(items) => {
        let inner: Vec<String> =
          items.iter().map(|v| v.to_sql_literal(redact)).collect();
        format!("({})", inner.join(", "))
      }
    }
  }

  /// Total order used by in-memory sorting.
  ///
  /// Nulls sort after every non-null value. Integers sort before text.
  /// Text comparison folds case when `ignore_case` is set.
  pub fn compare(&self, other: &Self, ignore_case: bool) -> Ordering {
    match (self, other) {
      (Self::Null, Self::Null) => Ordering::Equal,
      (Self::Null, _) => Ordering::Greater,
      (_, Self::Null) => Ordering::Less,
      (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
      (Self::Integer(_), _) => Ordering::Less,
      (_, Self::Integer(_)) => Ordering::Greater,
      (Self::Text(a), Self::Text(b)) => {
        if ignore_case {
          a.to_lowercase().cmp(&b.to_lowercase())
        } else {
          a.cmp(b)
        }
      }
      (Self::Text(_), Self::List(_)) => Ordering::Less,
      (Self::List(_), Self::Text(_)) => Ordering::Greater,
      (Self::List(a), Self::List(b)) => {
        for (x, y) in a.iter().zip(b) {
          let ord = x.compare(y, ignore_case);
          if ord != Ordering::Equal {
            return ord;
          }
        }
        a.len().cmp(&b.len())
      }
    }
  }
}

fn quote(s: &str) -> String { format!("'{}'", s.replace('\'', "''")) }

// ─── Conversions ─────────────────────────────────────────────────────────────

impl From<i64> for Value {
  fn from(v: i64) -> Self { Self::Integer(v) }
}

impl From<i32> for Value {
  fn from(v: i32) -> Self { Self::Integer(v.into()) }
}

impl From<u32> for Value {
  fn from(v: u32) -> Self { Self::Integer(v.into()) }
}

impl From<bool> for Value {
  fn from(v: bool) -> Self { Self::Integer(i64::from(v)) }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self { Self::Text(v.to_owned()) }
}

impl From<String> for Value {
  fn from(v: String) -> Self { Self::Text(v) }
}

impl From<&String> for Value {
  fn from(v: &String) -> Self { Self::Text(v.clone()) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(v: Option<T>) -> Self { v.map_or(Self::Null, Into::into) }
}

impl From<crate::kind::Kind> for Value {
  fn from(k: crate::kind::Kind) -> Self { Self::Text(k.tag().to_owned()) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn text_literal_escapes_quotes() {
    let v = Value::from("O'Brien");
    assert_eq!(v.to_sql_literal(false), "'O''Brien'");
  }

  #[test]
  fn redacted_literal_hides_content() {
    let v = Value::List(vec![Value::from(1), Value::from("x")]);
    assert_eq!(v.to_sql_literal(true), "('*', '*')");
    assert_eq!(Value::Null.to_sql_literal(true), "NULL");
  }

  #[test]
  fn nulls_sort_last() {
    assert_eq!(
      Value::Null.compare(&Value::from("a"), false),
      Ordering::Greater
    );
    assert_eq!(
      Value::from(3).compare(&Value::Null, false),
      Ordering::Less
    );
  }

  #[test]
  fn ignore_case_folds_text() {
    let a = Value::from("alice");
    let b = Value::from("ALICE");
    assert_eq!(a.compare(&b, true), Ordering::Equal);
    assert_ne!(a.compare(&b, false), Ordering::Equal);
  }

  #[test]
  fn numeric_text_reads_as_integer() {
    assert_eq!(Value::from("2").as_i64(), Some(2));
    assert_eq!(Value::from("x").as_i64(), None);
  }
}
