//! The `ContactsStore` trait and the types that cross the store boundary.
//!
//! The trait is implemented by storage backends (e.g.
//! `rolodex-store-sqlite`). The resolution and linking engines depend on this
//! abstraction, not on any concrete backend.

use std::{collections::BTreeMap, ops::ControlFlow};

use crate::{
  entity::{ExceptionType, RawContactId},
  field::Table,
  predicate::Predicate,
  value::Value,
};

// ─── Rows ────────────────────────────────────────────────────────────────────

/// One flat result row: column name to value.
///
/// Columns that were not projected read as [`Value::Null`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
  values: BTreeMap<&'static str, Value>,
}

static NULL: Value = Value::Null;

impl Row {
  pub fn new() -> Self { Self::default() }

  pub fn insert(&mut self, column: &'static str, value: Value) {
    self.values.insert(column, value);
  }

  pub fn get(&self, column: &str) -> &Value {
    self.values.get(column).unwrap_or(&NULL)
  }
}

impl FromIterator<(&'static str, Value)> for Row {
  fn from_iter<I: IntoIterator<Item = (&'static str, Value)>>(iter: I) -> Self {
    Self { values: iter.into_iter().collect() }
  }
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// A single-table read.
#[derive(Debug, Clone, PartialEq)]
pub struct TableQuery {
  pub table:      Table,
  pub columns:    Vec<&'static str>,
  pub selection:  Option<Predicate>,
  /// A native `ORDER BY` expression. Only ever a hint: results are always
  /// re-sorted in memory.
  pub sort_order: Option<String>,
}

impl TableQuery {
  pub fn new(table: Table, columns: impl IntoIterator<Item = &'static str>) -> Self {
    Self {
      table,
      columns: columns.into_iter().collect(),
      selection: None,
      sort_order: None,
    }
  }

  pub fn selection(mut self, selection: Option<Predicate>) -> Self {
    self.selection = selection;
    self
  }

  pub fn sort_order(mut self, sort_order: impl Into<String>) -> Self {
    self.sort_order = Some(sort_order.into());
    self
  }
}

// ─── Batches ─────────────────────────────────────────────────────────────────

/// One step of an atomic write batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
  /// Insert or replace the directive for an unordered RawContact pair.
  AggregationException {
    raw_contact_id1: RawContactId,
    raw_contact_id2: RawContactId,
    r#type:          ExceptionType,
  },
  /// Set `values` on every row of `table` matching `selection`.
  Update {
    table:     Table,
    selection: Predicate,
    values:    Vec<(&'static str, Value)>,
  },
}

/// Outcome of one applied [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationResult {
  /// Rows touched by the operation.
  pub count: usize,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Read/write permission checks. `false` is never an error: the engines
/// turn it into an empty or failed result.
pub trait Capabilities {
  fn can_read(&self) -> bool;

  fn can_write(&self) -> bool;
}

/// Abstraction over a contacts store backend.
///
/// Every call blocks on I/O. Callers on a latency-sensitive thread should
/// dispatch onto a worker of their own.
pub trait ContactsStore: Capabilities {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Run `query`, handing each row to `on_row` until it returns
  /// [`ControlFlow::Break`] or the rows run out. Implementations release
  /// the underlying statement on every exit path.
  fn query(
    &self,
    query: &TableQuery,
    on_row: &mut dyn FnMut(&Row) -> ControlFlow<()>,
  ) -> Result<(), Self::Error>;

  /// Apply `operations` as one atomic unit. `None` means nothing was
  /// applied.
  fn apply_batch(&self, operations: &[Operation])
  -> Option<Vec<OperationResult>>;
}
