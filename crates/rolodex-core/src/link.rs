//! Linking and unlinking Contacts through aggregation exceptions.
//!
//! Exceptions are not transitive in the store, so a directive is written
//! for every unordered pair of RawContacts in the group, not just for
//! neighbours.

use std::{collections::BTreeSet, iter, ops::ControlFlow};

use thiserror::Error;
use tracing::{debug, warn};

use crate::{
  entity::{ContactId, DataId, DisplayNameSource, ExceptionType, RawContactId},
  error::Error,
  field::Table,
  fields,
  kind::Kind,
  store::{ContactsStore, Operation, Row, TableQuery},
  value::Value,
};

#[derive(Debug, Error)]
pub enum LinkError {
  #[error("write capability missing")]
  PermissionDenied,

  #[error("at least two distinct contacts are required")]
  NotEnoughContacts,

  #[error("the profile contact cannot be linked or unlinked")]
  ProfileContact,

  #[error("at least two raw contacts are required")]
  NotEnoughRawContacts,

  #[error("the store rejected the batch")]
  BatchRejected,

  #[error(transparent)]
  Core(#[from] Error),
}

/// Result of a successful [`link`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Linked {
  /// The merged Contact, as seen right after the directives were applied.
  pub contact_id: Option<ContactId>,
}

/// Result of a successful [`unlink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unlinked {
  /// Ascending.
  pub raw_contact_ids: Vec<RawContactId>,
}

/// The Name row whose flags get promoted after a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NameRow {
  id:             DataId,
  raw_contact_id: RawContactId,
}

// ─── Store helpers ───────────────────────────────────────────────────────────

fn each_row<S: ContactsStore>(
  store: &S,
  query: &TableQuery,
  f: &mut dyn FnMut(&Row) -> ControlFlow<()>,
) -> Result<(), Error> {
  debug!(
    table = ?query.table,
    selection = %query.selection.as_ref().map(|p| p.redacted()).unwrap_or_default(),
    "querying"
  );
  store.query(query, f).map_err(Error::store)
}

fn first_row<S: ContactsStore>(
  store: &S,
  query: &TableQuery,
) -> Result<Option<Row>, Error> {
  let mut first = None;
  each_row(store, query, &mut |row| {
    first = Some(row.clone());
    ControlFlow::Break(())
  })?;
  Ok(first)
}

/// Every RawContact id of `contacts`, ascending.
fn raw_contact_ids<S: ContactsStore>(
  store: &S,
  contacts: &[ContactId],
) -> Result<Vec<RawContactId>, Error> {
  use fields::raw_contacts::{CONTACT_ID, ID};
  let query = TableQuery::new(Table::RawContacts, [ID.name()])
    .selection(Some(CONTACT_ID.is_in(contacts.iter().copied()).into_predicate()));
  let mut ids = BTreeSet::new();
  each_row(store, &query, &mut |row| {
    ids.extend(row.get(ID.name()).as_i64().map(RawContactId));
    ControlFlow::Continue(())
  })?;
  Ok(ids.into_iter().collect())
}

fn contact_of<S: ContactsStore>(
  store: &S,
  raw_contact: RawContactId,
) -> Result<Option<ContactId>, Error> {
  use fields::raw_contacts::{CONTACT_ID, ID};
  let query = TableQuery::new(Table::RawContacts, [CONTACT_ID.name()])
    .selection(Some(ID.equal_to(raw_contact).into_predicate()));
  let row = first_row(store, &query)?;
  Ok(row.and_then(|row| row.get(CONTACT_ID.name()).as_i64()).map(ContactId))
}

/// Walk `ordered` and pick the Name row of the first Contact whose display
/// name comes from a structured name.
fn name_to_promote<S: ContactsStore>(
  store: &S,
  ordered: &[ContactId],
) -> Result<Option<NameRow>, Error> {
  use fields::contacts::{DISPLAY_NAME_SOURCE, ID, NAME_RAW_CONTACT_ID};
  for contact in ordered {
    let query = TableQuery::new(Table::Contacts, [
      DISPLAY_NAME_SOURCE.name(),
      NAME_RAW_CONTACT_ID.name(),
    ])
    .selection(Some(ID.equal_to(*contact).into_predicate()));
    let Some(row) = first_row(store, &query)? else {
      continue;
    };
    let source = row
      .get(DISPLAY_NAME_SOURCE.name())
      .as_i64()
      .and_then(DisplayNameSource::from_code);
    let name_raw = row.get(NAME_RAW_CONTACT_ID.name()).as_i64();
    let (Some(DisplayNameSource::StructuredName), Some(name_raw)) =
      (source, name_raw)
    else {
      continue;
    };

    let query = TableQuery::new(Table::Data, [fields::DATA_ID.name()])
      .selection(Some(
        (fields::RAW_CONTACT_ID.equal_to(name_raw)
          & fields::KIND.equal_to(Kind::Name))
        .into_predicate(),
      ))
      .sort_order(fields::DATA_ID.asc().case_sensitive().to_sql());
    if let Some(id) = first_row(store, &query)?
      .and_then(|row| row.get(fields::DATA_ID.name()).as_i64())
    {
      return Ok(Some(NameRow {
        id:             DataId(id),
        raw_contact_id: RawContactId(name_raw),
      }));
    }
  }
  Ok(None)
}

// ─── Batches ─────────────────────────────────────────────────────────────────

/// One directive per unordered pair of `ids`.
fn pairwise(ids: &[RawContactId], r#type: ExceptionType) -> Vec<Operation> {
  ids
    .iter()
    .enumerate()
    .flat_map(|(i, a)| {
      ids[i + 1..].iter().map(move |b| Operation::AggregationException {
        raw_contact_id1: *a,
        raw_contact_id2: *b,
        r#type,
      })
    })
    .collect()
}

/// Make `name` the primary Name of its RawContact and the super-primary
/// Name of `contact`.
fn promote(name: NameRow, contact: ContactId) -> Vec<Operation> {
  let is_name = || fields::KIND.equal_to(Kind::Name);
  vec![
    Operation::Update {
      table:     Table::Data,
      selection: (fields::RAW_CONTACT_ID.equal_to(name.raw_contact_id)
        & is_name())
      .into_predicate(),
      values:    vec![(fields::IS_PRIMARY.name(), Value::Integer(0))],
    },
    Operation::Update {
      table:     Table::Data,
      selection: (fields::CONTACT_ID.equal_to(contact) & is_name())
        .into_predicate(),
      values:    vec![(fields::IS_SUPER_PRIMARY.name(), Value::Integer(0))],
    },
    Operation::Update {
      table:     Table::Data,
      selection: fields::DATA_ID.equal_to(name.id).into_predicate(),
      values:    vec![
        (fields::IS_PRIMARY.name(), Value::Integer(1)),
        (fields::IS_SUPER_PRIMARY.name(), Value::Integer(1)),
      ],
    },
  ]
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// Merge `others` into `primary`.
///
/// `primary` comes first when choosing whose structured name becomes the
/// merged Contact's name; the rest follow in ascending id order.
pub fn link<S: ContactsStore>(
  store: &S,
  primary: ContactId,
  others: impl IntoIterator<Item = ContactId>,
) -> Result<Linked, LinkError> {
  if !store.can_write() || !store.can_read() {
    return Err(LinkError::PermissionDenied);
  }
  let mut rest: BTreeSet<ContactId> = others.into_iter().collect();
  rest.remove(&primary);
  let ordered: Vec<ContactId> = iter::once(primary).chain(rest).collect();
  if ordered.len() < 2 {
    return Err(LinkError::NotEnoughContacts);
  }
  if ordered.iter().any(|c| c.is_profile()) {
    return Err(LinkError::ProfileContact);
  }

  let raw_ids = raw_contact_ids(store, &ordered)?;
  if raw_ids.len() < 2 {
    return Err(LinkError::NotEnoughRawContacts);
  }
  let name = name_to_promote(store, &ordered)?;

  let directives = pairwise(&raw_ids, ExceptionType::KeepTogether);
  debug!(directives = directives.len(), "linking");
  if store.apply_batch(&directives).is_none() {
    return Err(LinkError::BatchRejected);
  }

  let anchor = name.map_or(raw_ids[0], |n| n.raw_contact_id);
  let contact_id = contact_of(store, anchor)?;
  if let (Some(name), Some(contact_id)) = (name, contact_id) {
    if store.apply_batch(&promote(name, contact_id)).is_none() {
      warn!(%contact_id, "name promotion rejected; contacts stay linked");
    }
  }
  Ok(Linked { contact_id })
}

/// Split `contact` into one Contact per RawContact.
pub fn unlink<S: ContactsStore>(
  store: &S,
  contact: ContactId,
) -> Result<Unlinked, LinkError> {
  if !store.can_write() || !store.can_read() {
    return Err(LinkError::PermissionDenied);
  }
  if contact.is_profile() {
    return Err(LinkError::ProfileContact);
  }
  let raw_contact_ids = raw_contact_ids(store, &[contact])?;
  if raw_contact_ids.len() < 2 {
    return Err(LinkError::NotEnoughRawContacts);
  }
  let directives = pairwise(&raw_contact_ids, ExceptionType::KeepSeparate);
  debug!(directives = directives.len(), "unlinking");
  if store.apply_batch(&directives).is_none() {
    return Err(LinkError::BatchRejected);
  }
  Ok(Unlinked { raw_contact_ids })
}
