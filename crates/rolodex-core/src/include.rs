//! Projections: which physical columns a query fetches.

use std::{collections::BTreeSet, fmt, marker::PhantomData};

use crate::{
  field::{Domain, Field, domain},
  fields,
  kind::Kind,
};

/// A de-duplicated set of physical columns for domain `D`, always including
/// the domain's required columns.
///
/// Per-kind fields that share a generic column collapse to one entry; the
/// kinds they came from are remembered so rows of other kinds can be
/// skipped.
pub struct Include<D> {
  columns: BTreeSet<&'static str>,
  kinds:   BTreeSet<Kind>,
  _domain: PhantomData<fn() -> D>,
}

impl<D: Domain> Include<D> {
  pub fn new(fields: impl IntoIterator<Item = Field<D>>) -> Self {
    let mut include = Self {
      columns: BTreeSet::new(),
      kinds:   BTreeSet::new(),
      _domain: PhantomData,
    };
    for field in D::required().iter().copied().chain(fields) {
      include.columns.insert(field.name());
      include.kinds.extend(field.kind());
    }
    include
  }

  pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.columns.iter().copied()
  }

  pub fn contains(&self, column: &str) -> bool { self.columns.contains(column) }

  /// Kinds whose fields were requested.
  pub fn kinds(&self) -> &BTreeSet<Kind> { &self.kinds }
}

impl Include<domain::Data> {
  /// Every Data field of every kind, plus the contact-level columns.
  pub fn all() -> Self {
    let mut include = Self::new(fields::KIND_SETS.iter().flat_map(|s| s.all).copied());
    include.extend(fields::contact::SET.all.iter().copied());
    include.extend(fields::raw_contact::SET.all.iter().copied());
    include.extend(
      fields::group_membership::SET
        .all
        .iter()
        .copied()
        .map(Field::<domain::Data>::from),
    );
    include
  }

  fn extend(&mut self, fields: impl IntoIterator<Item = Field<domain::Data>>) {
    for field in fields {
      self.columns.insert(field.name());
      self.kinds.extend(field.kind());
    }
  }

  /// The Contacts-table columns matching the contact-level columns of this
  /// projection. The table id is always included.
  pub(crate) fn for_contacts_table(&self) -> Include<domain::Contacts> {
    Include::new(
      fields::contacts::SET
        .all
        .iter()
        .copied()
        .filter(|f| self.contains(f.name())),
    )
  }

  /// The RawContacts-table columns matching this projection. The table and
  /// parent ids are always included.
  pub(crate) fn for_raw_contacts_table(&self) -> Include<domain::RawContacts> {
    Include::new(
      fields::raw_contacts::SET
        .all
        .iter()
        .copied()
        .filter(|f| self.contains(f.name())),
    )
  }
}

impl<D> Clone for Include<D> {
  fn clone(&self) -> Self {
    Self {
      columns: self.columns.clone(),
      kinds:   self.kinds.clone(),
      _domain: PhantomData,
    }
  }
}

impl<D> fmt::Debug for Include<D> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Include")
      .field("columns", &self.columns)
      .field("kinds", &self.kinds)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fields::{contact, name, phone};

  #[test]
  fn required_columns_are_always_present() {
    let include = Include::new([name::GIVEN_NAME]);
    for field in fields::REQUIRED.all {
      assert!(include.contains(field.name()));
    }
    assert!(include.contains("data2"));
  }

  #[test]
  fn shared_generic_columns_collapse() {
    let include = Include::new([name::DISPLAY_NAME, phone::NUMBER]);
    let data1 = include.columns().filter(|c| *c == "data1").count();
    assert_eq!(data1, 1);
    assert_eq!(
      include.kinds().iter().copied().collect::<Vec<_>>(),
      vec![Kind::Name, Kind::Phone]
    );
  }

  #[test]
  fn all_covers_every_kind() {
    let include = Include::all();
    assert_eq!(include.kinds().len(), 14);
    assert!(include.contains("data14"));
    assert!(include.contains("display_name"));
  }

  #[test]
  fn contacts_table_projection_follows_contact_columns() {
    let include = Include::new([contact::DISPLAY_NAME_PRIMARY, name::GIVEN_NAME]);
    let contacts: Vec<_> = include.for_contacts_table().columns().collect();
    assert_eq!(contacts, vec!["_id", "display_name"]);

    let raw: Vec<_> = include.for_raw_contacts_table().columns().collect();
    assert_eq!(raw, vec!["_id", "contact_id"]);
  }
}
