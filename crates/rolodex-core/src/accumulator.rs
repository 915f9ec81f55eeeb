//! The per-resolution accumulator that merges rows from several tables into
//! one Contact graph.
//!
//! Rows may arrive from the Data view, the Contacts table and the
//! RawContacts table in any order, and the same row may be merged more than
//! once. Every merge is keyed by id, so the result depends on neither.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
  entity::{Contact, ContactId, DataId, DataItem, RawContact, RawContactId},
  kind::Kind,
  mapper::{ContactColumns, DataRow, RawContactColumns},
};

#[derive(Debug, Default)]
struct ContactBuilder {
  columns:      ContactColumns,
  raw_contacts: BTreeMap<RawContactId, RawContactBuilder>,
}

#[derive(Debug)]
struct RawContactBuilder {
  columns: RawContactColumns,
  items:   BTreeMap<DataId, DataItem>,
}

/// Fill every `None` in `into` from `from`.
fn merge_contact_columns(into: &mut ContactColumns, from: ContactColumns) {
  fn fill<T>(slot: &mut Option<T>, v: Option<T>) {
    if slot.is_none() {
      *slot = v;
    }
  }
  fill(&mut into.lookup_key, from.lookup_key);
  fill(&mut into.display_name_primary, from.display_name_primary);
  fill(&mut into.display_name_alt, from.display_name_alt);
  fill(&mut into.starred, from.starred);
  fill(&mut into.last_updated, from.last_updated);
}

#[derive(Debug)]
pub(crate) struct Accumulator {
  /// Kinds whose rows become Data items; rows of other kinds only register
  /// their RawContact.
  kinds:    BTreeSet<Kind>,
  contacts: BTreeMap<ContactId, ContactBuilder>,
}

impl Accumulator {
  pub fn new(kinds: BTreeSet<Kind>) -> Self {
    Self { kinds, contacts: BTreeMap::new() }
  }

  pub fn len(&self) -> usize { self.contacts.len() }

  fn raw_contact(
    &mut self,
    columns: RawContactColumns,
  ) -> &mut RawContactBuilder {
    let contact = self.contacts.entry(columns.contact_id).or_default();
    let raw = contact
      .raw_contacts
      .entry(columns.id)
      .or_insert_with(|| RawContactBuilder {
        columns: columns.clone(),
        items:   BTreeMap::new(),
      });
    if raw.columns.account.is_none() {
      raw.columns.account = columns.account;
    }
    raw
  }

  pub fn add_data_row(&mut self, row: DataRow) {
    let DataRow { contact, raw_contact, item } = row;
    let contact_id = raw_contact.contact_id;
    let kinds = &self.kinds;
    let item = item.filter(|item| kinds.contains(&item.kind()));
    let raw = self.raw_contact(raw_contact);
    if let Some(item) = item {
      raw.items.insert(item.meta().id, item);
    }
    if let Some(builder) = self.contacts.get_mut(&contact_id) {
      merge_contact_columns(&mut builder.columns, contact);
    }
  }

  /// Merge a Contacts-table row. Contacts without RawContacts are kept
  /// here but dropped by [`Accumulator::finish`].
  pub fn add_contact(&mut self, id: ContactId, columns: ContactColumns) {
    let builder = self.contacts.entry(id).or_default();
    merge_contact_columns(&mut builder.columns, columns);
  }

  pub fn add_raw_contact(&mut self, columns: RawContactColumns) {
    self.raw_contact(columns);
  }

  /// Build the Contact list, in ascending id order. Contacts with zero
  /// RawContacts are dropped. `cancel` is polled between Contacts; on
  /// cancellation nothing is returned.
  pub fn finish(self, cancel: &dyn Fn() -> bool) -> Option<Vec<Contact>> {
    let mut contacts = Vec::with_capacity(self.contacts.len());
    for (id, builder) in self.contacts {
      if cancel() {
        return None;
      }
      if builder.raw_contacts.is_empty() {
        continue;
      }
      let raw_contacts = builder
        .raw_contacts
        .into_values()
        .map(|raw| {
          let mut entity = RawContact::blank(raw.columns.id, id);
          entity.account = raw.columns.account;
          for item in raw.items.into_values() {
            entity.push(item);
          }
          entity
        })
        .collect();
      let columns = builder.columns;
      contacts.push(Contact {
        id,
        lookup_key: columns.lookup_key,
        display_name_primary: columns.display_name_primary,
        display_name_alt: columns.display_name_alt,
        starred: columns.starred.unwrap_or(false),
        last_updated: columns.last_updated,
        raw_contacts,
      });
    }
    Some(contacts)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::entity::{DataMeta, Note, Phone};

  fn raw(id: i64, contact: i64) -> RawContactColumns {
    RawContactColumns {
      id:         RawContactId(id),
      contact_id: ContactId(contact),
      account:    None,
    }
  }

  fn meta(id: i64, raw: i64, contact: i64) -> DataMeta {
    DataMeta {
      id:               DataId(id),
      raw_contact_id:   RawContactId(raw),
      contact_id:       ContactId(contact),
      is_primary:       false,
      is_super_primary: false,
    }
  }

  fn phone_row(id: i64, raw_id: i64, contact: i64) -> DataRow {
    DataRow {
      contact:     ContactColumns {
        display_name_primary: Some("Ann".into()),
        ..Default::default()
      },
      raw_contact: raw(raw_id, contact),
      item:        Some(DataItem::Phone(Phone {
        meta:              meta(id, raw_id, contact),
        number:            Some(id.to_string()),
        r#type:            None,
        label:             None,
        normalized_number: None,
      })),
    }
  }

  fn note_row(id: i64, raw_id: i64, contact: i64, text: &str) -> DataRow {
    DataRow {
      contact:     ContactColumns::default(),
      raw_contact: raw(raw_id, contact),
      item:        Some(DataItem::Note(Note {
        meta: meta(id, raw_id, contact),
        note: Some(text.into()),
      })),
    }
  }

  fn all_kinds() -> BTreeSet<Kind> {
    use strum::IntoEnumIterator;
    Kind::iter().collect()
  }

  #[test]
  fn merges_are_order_independent_and_idempotent() {
    let rows = [phone_row(3, 1, 10), phone_row(1, 2, 10), phone_row(2, 1, 10)];

    let mut forward = Accumulator::new(all_kinds());
    rows.iter().cloned().for_each(|r| forward.add_data_row(r));

    let mut backward = Accumulator::new(all_kinds());
    rows.iter().rev().cloned().for_each(|r| backward.add_data_row(r));
    rows.iter().cloned().for_each(|r| backward.add_data_row(r));

    let never = || false;
    let forward = forward.finish(&never).unwrap();
    let backward = backward.finish(&never).unwrap();
    assert_eq!(forward, backward);

    let contact = &forward[0];
    assert_eq!(contact.raw_contact_ids(), vec![RawContactId(1), RawContactId(2)]);
    let numbers: Vec<_> = contact.raw_contacts[0]
      .phones
      .iter()
      .map(|p| p.number.clone().unwrap())
      .collect();
    assert_eq!(numbers, vec!["2", "3"]);
  }

  #[test]
  fn singular_kinds_take_the_lowest_row_id() {
    let mut acc = Accumulator::new(all_kinds());
    acc.add_data_row(note_row(9, 1, 10, "later"));
    acc.add_data_row(note_row(4, 1, 10, "earlier"));
    let contacts = acc.finish(&|| false).unwrap();
    let note = contacts[0].raw_contacts[0].note.as_ref().unwrap();
    assert_eq!(note.note.as_deref(), Some("earlier"));
  }

  #[test]
  fn contacts_without_raw_contacts_are_dropped() {
    let mut acc = Accumulator::new(all_kinds());
    acc.add_contact(ContactId(5), ContactColumns::default());
    acc.add_raw_contact(raw(1, 6));
    let contacts = acc.finish(&|| false).unwrap();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].id, ContactId(6));
    assert!(contacts[0].raw_contacts[0].is_blank());
  }

  #[test]
  fn rows_of_unrequested_kinds_only_register_the_raw_contact() {
    let mut acc = Accumulator::new(BTreeSet::from([Kind::Name]));
    acc.add_data_row(phone_row(1, 1, 10));
    let contacts = acc.finish(&|| false).unwrap();
    assert!(contacts[0].raw_contacts[0].phones.is_empty());
    assert_eq!(contacts[0].display_name_primary.as_deref(), Some("Ann"));
  }

  #[test]
  fn cancellation_discards_everything() {
    let mut acc = Accumulator::new(all_kinds());
    acc.add_data_row(phone_row(1, 1, 10));
    acc.add_data_row(phone_row(2, 2, 20));
    assert!(acc.finish(&|| true).is_none());
  }
}
