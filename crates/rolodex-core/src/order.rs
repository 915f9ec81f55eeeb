//! Orderings, usable both as a native `ORDER BY` and as an in-memory
//! comparator.
//!
//! Native ordering is unsound for per-kind fields since a generic column
//! holds unrelated values across kinds, so resolved results are always
//! re-sorted with [`CompoundOrderBy::compare`]. Both paths resolve the field
//! to the same [`Column`].

use std::{cmp::Ordering, fmt};

use crate::{
  entity::Contact,
  field::{Column, Field, domain},
  fields,
  value::Value,
};

/// Anything that can report the values it holds for a column.
pub trait ColumnValues {
  /// Non-null values for `column`, in a stable order.
  fn column_values(&self, column: &Column) -> Vec<Value>;
}

impl ColumnValues for Contact {
  fn column_values(&self, column: &Column) -> Vec<Value> {
    Contact::column_values(self, column)
  }
}

pub enum OrderBy<D> {
  Ascending { field: Field<D>, ignore_case: bool },
  Descending { field: Field<D>, ignore_case: bool },
}

impl<D> OrderBy<D> {
  pub fn field(&self) -> Field<D> {
    match self {
      Self::Ascending { field, .. } | Self::Descending { field, .. } => *field,
    }
  }

  pub fn ignore_case(&self) -> bool {
    match self {
      Self::Ascending { ignore_case, .. }
      | Self::Descending { ignore_case, .. } => *ignore_case,
    }
  }

  pub fn is_ascending(&self) -> bool { matches!(self, Self::Ascending { .. }) }

  pub fn case_sensitive(self) -> Self {
    match self {
      Self::Ascending { field, .. } => {
        Self::Ascending { field, ignore_case: false }
      }
      Self::Descending { field, .. } => {
        Self::Descending { field, ignore_case: false }
      }
    }
  }

  /// Render as one `ORDER BY` term.
  pub fn to_sql(&self) -> String {
    let collate = if self.ignore_case() { " COLLATE NOCASE" } else { "" };
    let direction = if self.is_ascending() { "ASC" } else { "DESC" };
    format!("{}{collate} {direction}", self.field().column())
  }

  /// Compare two entities on this key. Entities with no value for the field
  /// sort last in both directions.
  pub fn compare<E: ColumnValues>(&self, a: &E, b: &E) -> Ordering {
    let column = self.field().column();
    let (a, b) = (a.column_values(&column), b.column_values(&column));
    match (a.is_empty(), b.is_empty()) {
      (true, true) => Ordering::Equal,
      (true, false) => Ordering::Greater,
      (false, true) => Ordering::Less,
      (false, false) => {
        let ord =
          Value::List(a).compare(&Value::List(b), self.ignore_case());
        if self.is_ascending() { ord } else { ord.reverse() }
      }
    }
  }
}

impl<D> Clone for OrderBy<D> {
  fn clone(&self) -> Self { *self }
}

impl<D> Copy for OrderBy<D> {}

impl<D> PartialEq for OrderBy<D> {
  fn eq(&self, other: &Self) -> bool {
    self.field() == other.field()
      && self.is_ascending() == other.is_ascending()
      && self.ignore_case() == other.ignore_case()
  }
}

impl<D> fmt::Debug for OrderBy<D> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.to_sql())
  }
}

impl<D> Field<D> {
  /// Ascending, case-insensitive.
  pub fn asc(self) -> OrderBy<D> {
    OrderBy::Ascending { field: self, ignore_case: true }
  }

  /// Descending, case-insensitive.
  pub fn desc(self) -> OrderBy<D> {
    OrderBy::Descending { field: self, ignore_case: true }
  }
}

/// An ordered list of keys; the first key that tells two entities apart
/// decides.
pub struct CompoundOrderBy<D>(Vec<OrderBy<D>>);

impl<D> CompoundOrderBy<D> {
  pub fn new(keys: impl IntoIterator<Item = OrderBy<D>>) -> Self {
    Self(keys.into_iter().collect())
  }

  pub fn keys(&self) -> &[OrderBy<D>] { &self.0 }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn to_sql(&self) -> String {
    self.0.iter().map(OrderBy::to_sql).collect::<Vec<_>>().join(", ")
  }

  pub fn compare<E: ColumnValues>(&self, a: &E, b: &E) -> Ordering {
    self
      .0
      .iter()
      .map(|key| key.compare(a, b))
      .find(|ord| ord.is_ne())
      .unwrap_or(Ordering::Equal)
  }

  /// Stable in-memory sort.
  pub fn sort<E: ColumnValues>(&self, items: &mut [E]) {
    items.sort_by(|a, b| self.compare(a, b));
  }
}

impl CompoundOrderBy<domain::Data> {
  /// Ascending by Contact id.
  pub fn by_contact_id() -> Self { Self(vec![fields::contact::ID.asc()]) }
}

impl<D> Clone for CompoundOrderBy<D> {
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<D> fmt::Debug for CompoundOrderBy<D> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list().entries(&self.0).finish()
  }
}

impl<D> From<OrderBy<D>> for CompoundOrderBy<D> {
  fn from(key: OrderBy<D>) -> Self { Self(vec![key]) }
}
