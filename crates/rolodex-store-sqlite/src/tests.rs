//! Integration tests for `SqliteStore` driven through the core engines.

use std::cell::Cell;

use rolodex_core::{
  Capabilities, Client, Contact, ContactId, ContactsStore, Error as CoreError,
  Field, Kind, LinkError, RawContactId,
  entity::Account,
  field::{Table, domain},
  fields::{self, contact, email, group_membership, name, note, phone},
  store::Operation,
  value::Value,
};

use crate::{Error, SqliteStore, StoreConfig};

fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}

fn client() -> Client<SqliteStore> {
  init_tracing();
  Client::new(SqliteStore::open_in_memory().expect("in-memory store"))
}

fn person(store: &SqliteStore, display_name: &str) -> RawContactId {
  let raw = store.add_raw_contact(None).unwrap();
  store
    .add_data(raw, Kind::Name, [(name::DISPLAY_NAME, Value::from(display_name))])
    .unwrap();
  raw
}

fn add_phone(store: &SqliteStore, raw: RawContactId, number: &str) {
  store.add_data(raw, Kind::Phone, [(phone::NUMBER, Value::from(number))]).unwrap();
}

fn add_email(store: &SqliteStore, raw: RawContactId, address: &str) {
  store.add_data(raw, Kind::Email, [(email::ADDRESS, Value::from(address))]).unwrap();
}

fn contact_ids(contacts: &[Contact]) -> Vec<ContactId> {
  contacts.iter().map(|c| c.id).collect()
}

fn names(contacts: &[Contact]) -> Vec<String> {
  contacts
    .iter()
    .map(|c| c.display_name_primary.clone().unwrap_or_default())
    .collect()
}

/// The Contact currently holding `raw`.
fn contact_of(client: &Client<SqliteStore>, raw: RawContactId) -> ContactId {
  let found = client
    .query()
    .filter(fields::raw_contact::ID.equal_to(raw))
    .find()
    .unwrap();
  assert_eq!(found.len(), 1, "raw contact {raw} should belong to one contact");
  found[0].id
}

// ─── Filtering ───────────────────────────────────────────────────────────────

#[test]
fn cross_kind_filter_requires_both_kinds_on_one_contact() {
  let c = client();
  let ann = person(c.store(), "Ann");
  add_phone(c.store(), ann, "555");
  let bob = person(c.store(), "Bob");
  add_email(c.store(), bob, "b@x.com");

  let found = c
    .query()
    .filter(name::DISPLAY_NAME.equal_to("Ann") & phone::NUMBER.equal_to("555"))
    .find()
    .unwrap();
  assert_eq!(contact_ids(&found), vec![contact_of(&c, ann)]);

  let found = c
    .query()
    .filter(name::DISPLAY_NAME.equal_to("Ann") & email::ADDRESS.equal_to("b@x.com"))
    .find()
    .unwrap();
  assert!(found.is_empty());
}

#[test]
fn either_kind_matches_through_or() {
  let c = client();
  let ann = person(c.store(), "Ann");
  let bob = person(c.store(), "Bob");
  add_email(c.store(), bob, "b@x.com");
  person(c.store(), "Cid");

  let found = c
    .query()
    .filter(name::DISPLAY_NAME.equal_to("Ann") | email::ADDRESS.equal_to("b@x.com"))
    .find()
    .unwrap();
  assert_eq!(contact_ids(&found), vec![contact_of(&c, ann), contact_of(&c, bob)]);
}

#[test]
fn alternatives_over_the_same_kinds_match_across_rows() {
  let c = client();
  let ann = person(c.store(), "Ann");
  add_phone(c.store(), ann, "777");
  let bob = person(c.store(), "Bob");
  add_phone(c.store(), bob, "555");

  // Ann satisfies the left through her name and the right through her
  // phone, on two different Data rows.
  let found = c
    .query()
    .include_blanks(false)
    .filter(
      (name::DISPLAY_NAME.equal_to("Ann") | phone::NUMBER.equal_to("111"))
        & (name::DISPLAY_NAME.equal_to("Cid") | phone::NUMBER.equal_to("777")),
    )
    .find()
    .unwrap();
  assert_eq!(contact_ids(&found), vec![contact_of(&c, ann)]);
}

#[test]
fn per_kind_fields_never_match_rows_of_other_kinds() {
  let c = client();
  let raw = c.store().add_raw_contact(None).unwrap();
  c.store().add_data(raw, Kind::Note, [(note::NOTE, Value::from("555"))]).unwrap();

  let found = c.query().filter(phone::NUMBER.equal_to("555")).find().unwrap();
  assert!(found.is_empty());

  let found = c.query().filter(note::NOTE.equal_to("555")).find().unwrap();
  assert_eq!(found.len(), 1);
}

#[test]
fn matched_contacts_come_back_with_every_data_row() {
  let c = client();
  let ann = person(c.store(), "Ann");
  add_phone(c.store(), ann, "555");
  add_email(c.store(), ann, "ann@x.com");

  let found = c.query().filter(phone::NUMBER.equal_to("555")).find().unwrap();
  let raw = &found[0].raw_contacts[0];
  assert_eq!(raw.name.as_ref().and_then(|n| n.display_name.as_deref()), Some("Ann"));
  assert_eq!(raw.emails.len(), 1);
  assert_eq!(raw.phones.len(), 1);
}

#[test]
fn matched_contacts_come_back_with_every_raw_contact() {
  let c = client();
  let ann = person(c.store(), "Ann");
  add_phone(c.store(), ann, "555");
  let annie = person(c.store(), "Annie");
  c.link(contact_of(&c, ann), [contact_of(&c, annie)]).unwrap();

  let found = c.query().filter(phone::NUMBER.equal_to("555")).find().unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].raw_contact_ids(), vec![ann, annie]);
  assert!(found[0].raw_contacts[1].phones.is_empty());
}

#[test]
fn include_restricts_the_returned_kinds() {
  let c = client();
  let ann = person(c.store(), "Ann");
  add_phone(c.store(), ann, "555");

  let found = c.query().include([phone::NUMBER]).find().unwrap();
  let raw = &found[0].raw_contacts[0];
  assert!(raw.name.is_none());
  assert_eq!(raw.phones[0].number.as_deref(), Some("555"));
}

#[test]
fn search_matches_any_free_text_field_case_insensitively() {
  let c = client();
  let ann = person(c.store(), "Ann");
  add_email(c.store(), ann, "ann@example.com");
  let bob = person(c.store(), "Bob");
  add_phone(c.store(), bob, "555-0100");

  let found = c.query().search("EXAMPLE").find().unwrap();
  assert_eq!(contact_ids(&found), vec![contact_of(&c, ann)]);

  let found = c.query().search("0100").find().unwrap();
  assert_eq!(contact_ids(&found), vec![contact_of(&c, bob)]);

  let everyone = c.query().search("   ").find().unwrap();
  assert_eq!(everyone.len(), 2);
}

#[test]
fn search_treats_wildcards_literally() {
  let c = client();
  person(c.store(), "100% Ann");
  person(c.store(), "100 Bob");

  let found = c.query().search("100%").find().unwrap();
  assert_eq!(names(&found), vec!["100% Ann"]);
}

// ─── Scopes ──────────────────────────────────────────────────────────────────

#[test]
fn accounts_scope_the_query() {
  let c = client();
  let work = Account::new("ann@work.com", "com.example.work");
  let raw = c.store().add_raw_contact(Some(&work)).unwrap();
  c.store().add_data(raw, Kind::Name, [(name::DISPLAY_NAME, Value::from("Ann"))]).unwrap();
  person(c.store(), "Bob");

  let found = c.query().accounts([work.clone()]).find().unwrap();
  assert_eq!(names(&found), vec!["Ann"]);
  assert_eq!(found[0].raw_contacts[0].account.as_ref(), Some(&work));

  let other = Account::new("nobody", "com.example.work");
  assert!(c.query().accounts([other]).find().unwrap().is_empty());
}

#[test]
fn group_membership_scopes_the_query() {
  let c = client();
  let ann = person(c.store(), "Ann");
  c.store()
    .add_data(ann, Kind::GroupMembership, [(
      Field::<domain::Data>::from(group_membership::GROUP_ID),
      Value::from(7),
    )])
    .unwrap();
  person(c.store(), "Bob");

  let found = c
    .query()
    .group_membership_where(group_membership::GROUP_ID.equal_to(7))
    .find()
    .unwrap();
  assert_eq!(names(&found), vec!["Ann"]);

  let found = c
    .query()
    .group_membership_where(group_membership::GROUP_ID.equal_to(8))
    .find()
    .unwrap();
  assert!(found.is_empty());
}

// ─── Blanks ──────────────────────────────────────────────────────────────────

#[test]
fn blank_contacts_are_returned_only_when_asked_for() {
  let c = client();
  person(c.store(), "Ann");
  let blank = c.store().add_raw_contact(None).unwrap();

  let found = c.query().find().unwrap();
  assert_eq!(found.len(), 2);
  let blank_contact = found.iter().find(|c| c.raw_contacts[0].id == blank).unwrap();
  assert!(blank_contact.raw_contacts[0].is_blank());

  let found = c.query().include_blanks(false).find().unwrap();
  assert_eq!(names(&found), vec!["Ann"]);
}

#[test]
fn blank_probes_over_data_columns_fail_quietly() {
  let c = client();
  let ann = person(c.store(), "Ann");
  add_phone(c.store(), ann, "555");
  c.store().add_raw_contact(None).unwrap();

  // The probes against the Contacts and RawContacts tables name `data1`,
  // which neither table has.
  let found = c
    .query()
    .include_blanks(true)
    .filter(phone::NUMBER.equal_to("555"))
    .find()
    .unwrap();
  assert_eq!(names(&found), vec!["Ann"]);
}

#[test]
fn contact_id_filters_also_find_blank_contacts() {
  let c = client();
  let blank = c.store().add_raw_contact(None).unwrap();
  let id = contact_of(&c, blank);

  let found = c.query().filter(contact::ID.equal_to(id)).find().unwrap();
  assert_eq!(contact_ids(&found), vec![id]);

  let found = c
    .query()
    .include_blanks(false)
    .filter(contact::ID.equal_to(id))
    .find()
    .unwrap();
  assert!(found.is_empty());
}

// ─── Ordering and paging ─────────────────────────────────────────────────────

#[test]
fn order_by_display_name_ignores_case() {
  let c = client();
  for n in ["carol", "Bob", "alice"] {
    person(c.store(), n);
  }
  let found = c
    .query()
    .order_by([contact::DISPLAY_NAME_PRIMARY.asc()])
    .find()
    .unwrap();
  assert_eq!(names(&found), vec!["alice", "Bob", "carol"]);

  let found = c
    .query()
    .order_by([contact::DISPLAY_NAME_PRIMARY.desc()])
    .find()
    .unwrap();
  assert_eq!(names(&found), vec!["carol", "Bob", "alice"]);
}

#[test]
fn starred_contacts_sort_first_then_by_name() {
  let c = client();
  person(c.store(), "Ann");
  let bob = person(c.store(), "Bob");
  let bob_contact = contact_of(&c, bob);
  let starred = c.store().apply_batch(&[Operation::Update {
    table:     Table::Contacts,
    selection: fields::contacts::ID.equal_to(bob_contact).into_predicate(),
    values:    vec![(fields::contacts::STARRED.name(), Value::Integer(1))],
  }]);
  assert_eq!(starred.map(|r| r[0].count), Some(1));

  let found = c
    .query()
    .order_by([contact::STARRED.desc(), contact::DISPLAY_NAME_PRIMARY.asc()])
    .find()
    .unwrap();
  assert_eq!(names(&found), vec!["Bob", "Ann"]);
  assert!(found[0].starred);
}

#[test]
fn pages_partition_the_full_result() {
  let c = client();
  for n in ["e", "d", "c", "b", "a"] {
    person(c.store(), n);
  }
  let sorted = || c.query().order_by([contact::DISPLAY_NAME_PRIMARY.asc()]);

  let all = sorted().find().unwrap();
  let mut paged = Vec::new();
  for offset in [0, 2, 4] {
    paged.extend(sorted().offset(offset).limit(2).unwrap().find().unwrap());
  }
  assert_eq!(paged, all);
  assert!(sorted().offset(5).find().unwrap().is_empty());

  // Same page twice, same answer.
  let again = sorted().offset(2).limit(2).unwrap().find().unwrap();
  assert_eq!(names(&again), vec!["c", "d"]);
}

#[test]
fn zero_limit_is_rejected() {
  let c = client();
  assert!(matches!(c.query().limit(0), Err(CoreError::IllegalArgument(_))));
}

// ─── Capabilities and cancellation ───────────────────────────────────────────

#[test]
fn missing_read_capability_returns_nothing() {
  init_tracing();
  let store = SqliteStore::open_in_memory().unwrap().with_capabilities(false, true);
  person(&store, "Ann");
  let c = Client::new(store);
  assert!(c.query().find().unwrap().is_empty());
}

#[test]
fn read_only_store_refuses_batches_and_links() {
  init_tracing();
  let store = SqliteStore::open_in_memory().unwrap().with_capabilities(true, false);
  let a = person(&store, "Ann");
  let b = person(&store, "Bob");
  let c = Client::new(store);
  let (ca, cb) = (contact_of(&c, a), contact_of(&c, b));

  assert!(matches!(c.link(ca, [cb]), Err(LinkError::PermissionDenied)));
  assert!(c.store().apply_batch(&[]).is_none());
  assert_eq!(c.query().find().unwrap().len(), 2);
}

#[test]
fn cancelled_resolution_returns_nothing() {
  let c = client();
  for n in ["a", "b", "c"] {
    let raw = person(c.store(), n);
    add_phone(c.store(), raw, "555");
  }

  assert!(c.query().find_with_cancel(&|| true).unwrap().is_empty());

  let polls = Cell::new(0);
  let cancel = || {
    polls.set(polls.get() + 1);
    polls.get() > 3
  };
  assert!(c.query().find_with_cancel(&cancel).unwrap().is_empty());

  // Cancellation leaves nothing behind.
  assert_eq!(c.query().find().unwrap().len(), 3);
}

// ─── Linking ─────────────────────────────────────────────────────────────────

#[test]
fn link_then_unlink_round_trips() {
  let c = client();
  let a = person(c.store(), "Ann");
  let b = person(c.store(), "Annie");
  let (ca, cb) = (contact_of(&c, a), contact_of(&c, b));

  let linked = c.link(ca, [cb]).unwrap();
  let merged = linked.contact_id.unwrap();
  let found = c.query().find().unwrap();
  assert_eq!(contact_ids(&found), vec![merged]);
  assert_eq!(found[0].raw_contact_ids(), vec![a, b]);
  assert_eq!(found[0].display_name_primary.as_deref(), Some("Ann"));

  let unlinked = c.unlink(merged).unwrap();
  assert_eq!(unlinked.raw_contact_ids, vec![a, b]);
  let found = c.query().find().unwrap();
  assert_eq!(found.len(), 2);
  assert!(found.iter().all(|c| c.raw_contacts.len() == 1));
  assert_eq!(names(&found), vec!["Ann", "Annie"]);
}

#[test]
fn link_promotes_the_primary_contacts_name() {
  let c = client();
  let a = person(c.store(), "Ann");
  let b = person(c.store(), "Annie");
  let (ca, cb) = (contact_of(&c, a), contact_of(&c, b));

  let merged = c.link(cb, [ca]).unwrap().contact_id.unwrap();
  let found = c.query().filter(contact::ID.equal_to(merged)).find().unwrap();
  assert_eq!(found[0].display_name_primary.as_deref(), Some("Annie"));
  let annie = found[0]
    .raw_contacts
    .iter()
    .find(|r| r.id == b)
    .and_then(|r| r.name.as_ref())
    .unwrap();
  assert!(annie.meta.is_super_primary);
}

#[test]
fn linking_a_contact_with_itself_is_rejected() {
  let c = client();
  let a = person(c.store(), "Ann");
  let b = person(c.store(), "Annie");
  let (ca, cb) = (contact_of(&c, a), contact_of(&c, b));

  let first = c.link(ca, [cb]).unwrap().contact_id.unwrap();
  let second = c.link(first, [first]);
  assert!(matches!(second, Err(LinkError::NotEnoughContacts)));
  assert_eq!(c.query().find().unwrap().len(), 1);
}

#[test]
fn linking_three_contacts_merges_them_all() {
  let c = client();
  let raws: Vec<_> =
    ["Ann", "Bob", "Cid"].into_iter().map(|n| person(c.store(), n)).collect();
  let ids: Vec<_> = raws.iter().map(|r| contact_of(&c, *r)).collect();

  c.link(ids[2], [ids[0], ids[1]]).unwrap();
  let found = c.query().find().unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].raw_contact_ids(), raws);
  assert_eq!(found[0].display_name_primary.as_deref(), Some("Cid"));
}

#[test]
fn unlink_needs_two_raw_contacts() {
  let c = client();
  let a = person(c.store(), "Ann");
  let ca = contact_of(&c, a);
  assert!(matches!(c.unlink(ca), Err(LinkError::NotEnoughRawContacts)));
}

// ─── Store fixtures ──────────────────────────────────────────────────────────

#[test]
fn display_name_falls_back_to_other_kinds() {
  let c = client();
  let raw = c.store().add_raw_contact(None).unwrap();
  add_phone(c.store(), raw, "555");
  add_email(c.store(), raw, "a@x.com");

  let found = c.query().find().unwrap();
  assert_eq!(names(&found), vec!["555"]);
  assert!(found[0].lookup_key.is_some());
  assert!(found[0].last_updated.is_some());
}

#[test]
fn data_must_fit_its_kind_and_raw_contact() {
  init_tracing();
  let store = SqliteStore::open_in_memory().unwrap();
  let raw = store.add_raw_contact(None).unwrap();

  let err = store
    .add_data(raw, Kind::Email, [(phone::NUMBER, Value::from("555"))])
    .unwrap_err();
  assert!(matches!(err, Error::KindMismatch { kind: Kind::Email, .. }));

  let err = store
    .add_data(RawContactId(999), Kind::Phone, [(phone::NUMBER, Value::from("555"))])
    .unwrap_err();
  assert!(matches!(err, Error::RawContactNotFound(RawContactId(999))));
}

#[test]
fn store_opens_from_config() {
  init_tracing();
  let config = StoreConfig { path: None, can_read: true, can_write: false };
  let store = SqliteStore::from_config(&config).unwrap();
  assert!(store.can_read());
  assert!(!store.can_write());
}
