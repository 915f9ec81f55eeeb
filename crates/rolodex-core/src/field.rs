//! The schema model: tables, field domains, fields and field sets.
//!
//! A [`Field`] binds a physical column to an optional [`Kind`]. Fields are
//! typed by a *domain* marker so that predicates, projections and orderings
//! built for one table cannot be handed to an API expecting another.

use std::{fmt, hash::Hash, marker::PhantomData};

use crate::kind::Kind;

// ─── Tables ──────────────────────────────────────────────────────────────────

/// The tables (or views) the engine reads from and writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
  Contacts,
  RawContacts,
  /// The Data rows joined with their RawContact and Contact columns.
  Data,
  AggregationExceptions,
}

// ─── Domains ─────────────────────────────────────────────────────────────────

/// A compile-time field domain.
pub trait Domain: 'static {
  const TABLE: Table;

  /// Columns the engine always fetches for this domain.
  fn required() -> &'static [Field<Self>]
  where
    Self: Sized;
}

pub mod domain {
  //! Uninhabited marker types naming every field domain.

  /// Every column of the Data view, per-kind or not.
  #[derive(Debug)]
  pub enum Data {}

  /// Data columns of the group membership kind only.
  #[derive(Debug)]
  pub enum GroupMembership {}

  #[derive(Debug)]
  pub enum RawContacts {}

  #[derive(Debug)]
  pub enum Contacts {}

  #[derive(Debug)]
  pub enum AggregationExceptions {}
}

impl Domain for domain::Data {
  const TABLE: Table = Table::Data;

  fn required() -> &'static [Field<Self>] { crate::fields::REQUIRED.all }
}

impl Domain for domain::GroupMembership {
  const TABLE: Table = Table::Data;

  fn required() -> &'static [Field<Self>] { &[] }
}

impl Domain for domain::RawContacts {
  const TABLE: Table = Table::RawContacts;

  fn required() -> &'static [Field<Self>] {
    crate::fields::raw_contacts::REQUIRED.all
  }
}

impl Domain for domain::Contacts {
  const TABLE: Table = Table::Contacts;

  fn required() -> &'static [Field<Self>] {
    crate::fields::contacts::REQUIRED.all
  }
}

impl Domain for domain::AggregationExceptions {
  const TABLE: Table = Table::AggregationExceptions;

  fn required() -> &'static [Field<Self>] { &[] }
}

// ─── Column ──────────────────────────────────────────────────────────────────

/// The untyped part of a field: what the store actually sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Column {
  pub name:     &'static str,
  /// Set for per-kind ("common data") columns. Every predicate leaf over such
  /// a column is rendered together with a kind-tag check.
  pub kind:     Option<Kind>,
  pub required: bool,
}

impl Column {
  pub const fn new(name: &'static str) -> Self {
    Self { name, kind: None, required: false }
  }

  pub const fn of_kind(kind: Kind, name: &'static str) -> Self {
    Self { name, kind: Some(kind), required: false }
  }

  pub const fn required(name: &'static str) -> Self {
    Self { name, kind: None, required: true }
  }
}

impl fmt::Display for Column {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name)
  }
}

// ─── Field ───────────────────────────────────────────────────────────────────

/// A [`Column`] tagged with its domain `D`.
pub struct Field<D> {
  column:  Column,
  _domain: PhantomData<fn() -> D>,
}

impl<D> Field<D> {
  pub const fn new(column: Column) -> Self {
    Self { column, _domain: PhantomData }
  }

  pub const fn column(&self) -> Column { self.column }

  pub const fn name(&self) -> &'static str { self.column.name }

  pub const fn kind(&self) -> Option<Kind> { self.column.kind }

  /// Move this field to another domain. Only used internally where the two
  /// domains share a physical column.
  pub(crate) const fn retype<R>(self) -> Field<R> { Field::new(self.column) }
}

impl From<Field<domain::GroupMembership>> for Field<domain::Data> {
  fn from(f: Field<domain::GroupMembership>) -> Self { f.retype() }
}

// Manual impls: derives would put bounds on the uninhabited marker.

impl<D> Clone for Field<D> {
  fn clone(&self) -> Self { *self }
}

impl<D> Copy for Field<D> {}

impl<D> PartialEq for Field<D> {
  fn eq(&self, other: &Self) -> bool { self.column == other.column }
}

impl<D> Eq for Field<D> {}

impl<D> Hash for Field<D> {
  fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
    self.column.hash(state);
  }
}

impl<D> fmt::Debug for Field<D> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("Field").field(&self.column).finish()
  }
}

// ─── FieldSet ────────────────────────────────────────────────────────────────

/// A named group of related fields, e.g. every Address field.
pub struct FieldSet<D: 'static> {
  /// Every field the set owns.
  pub all:          &'static [Field<D>],
  /// The subset safe for free-text matching: no booleans, type codes or ids.
  pub for_matching: &'static [Field<D>],
}

impl<D: 'static> FieldSet<D> {
  pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
    self.all.iter().map(Field::column)
  }
}

impl<D: 'static> Clone for FieldSet<D> {
  fn clone(&self) -> Self { *self }
}

impl<D: 'static> Copy for FieldSet<D> {}

impl<D: 'static> fmt::Debug for FieldSet<D> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FieldSet")
      .field("all", &self.all)
      .field("for_matching", &self.for_matching)
      .finish()
  }
}
