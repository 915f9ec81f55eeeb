//! The read model: Contacts, RawContacts and typed Data entities.
//!
//! Every entity here is reconstructed fresh on each query and is never
//! authoritative. Re-resolve after any mutation.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::FromRepr;

use crate::{field::Column, fields, kind::Kind, value::Value};

// ─── Identifiers ─────────────────────────────────────────────────────────────

macro_rules! id_type {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
      Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(pub i64);

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
      }
    }

    impl From<$name> for Value {
      fn from(id: $name) -> Self { Value::Integer(id.0) }
    }
  };
}

id_type!(
  /// Row id of an aggregate Contact.
  ContactId
);
id_type!(RawContactId);
id_type!(DataId);

/// First id of the device-owner profile id space.
pub const PROFILE_ID_START: i64 = 9_223_372_034_707_292_160;

impl ContactId {
  /// Whether this id belongs to the device owner's profile pseudo-contact.
  pub fn is_profile(self) -> bool { self.0 >= PROFILE_ID_START }
}

impl RawContactId {
  pub fn is_profile(self) -> bool { self.0 >= PROFILE_ID_START }
}

// ─── Coded enums ─────────────────────────────────────────────────────────────

macro_rules! coded_enum {
  ($(#[$meta:meta])* $name:ident { $($variant:ident = $code:literal),+ $(,)? }) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromRepr,
    )]
    #[repr(i64)]
    pub enum $name {
      $($variant = $code),+
    }

    impl $name {
      /// The integer code stored in the type column.
      pub fn code(self) -> i64 { self as i64 }

      pub fn from_code(code: i64) -> Option<Self> { Self::from_repr(code) }
    }
  };
}

coded_enum!(PhoneType {
  Custom = 0,
  Home = 1,
  Mobile = 2,
  Work = 3,
  FaxWork = 4,
  FaxHome = 5,
  Pager = 6,
  Other = 7,
  Callback = 8,
  Car = 9,
  CompanyMain = 10,
  Isdn = 11,
  Main = 12,
  OtherFax = 13,
  Radio = 14,
  Telex = 15,
  TtyTdd = 16,
  WorkMobile = 17,
  WorkPager = 18,
  Assistant = 19,
  Mms = 20,
});

coded_enum!(EmailType { Custom = 0, Home = 1, Work = 2, Other = 3, Mobile = 4 });

coded_enum!(AddressType { Custom = 0, Home = 1, Work = 2, Other = 3 });

coded_enum!(EventType { Custom = 0, Anniversary = 1, Other = 2, Birthday = 3 });

coded_enum!(RelationType {
  Custom = 0,
  Assistant = 1,
  Brother = 2,
  Child = 3,
  DomesticPartner = 4,
  Father = 5,
  Friend = 6,
  Manager = 7,
  Mother = 8,
  Parent = 9,
  Partner = 10,
  ReferredBy = 11,
  Relative = 12,
  Sister = 13,
  Spouse = 14,
});

coded_enum!(WebsiteType {
  Custom = 0,
  Homepage = 1,
  Blog = 2,
  Profile = 3,
  Home = 4,
  Work = 5,
  Ftp = 6,
  Other = 7,
});

coded_enum!(ImProtocol {
  Custom = -1,
  Aim = 0,
  Msn = 1,
  Yahoo = 2,
  Skype = 3,
  Qq = 4,
  GoogleTalk = 5,
  Icq = 6,
  Jabber = 7,
  NetMeeting = 8,
});

coded_enum!(
  /// Which kind of Data row a Contact's display name was derived from.
  DisplayNameSource {
    Undefined = 0,
    Email = 10,
    Phone = 20,
    Organization = 30,
    Nickname = 35,
    StructuredPhoneticName = 37,
    StructuredName = 40,
  }
);

coded_enum!(
  /// Directive stored in the aggregation exceptions table.
  ExceptionType { Automatic = 0, KeepTogether = 1, KeepSeparate = 2 }
);

// ─── Event dates ─────────────────────────────────────────────────────────────

/// A possibly year-less calendar date, stored as `YYYY-MM-DD` or `--MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDate {
  pub year:  Option<i32>,
  pub month: u32,
  pub day:   u32,
}

impl EventDate {
  pub fn parse(s: &str) -> Option<Self> {
    let s = s.trim();
    if let Some(rest) = s.strip_prefix("--") {
      let (month, day) = rest.split_once('-')?;
      let (month, day) = (month.parse().ok()?, day.parse().ok()?);
      // Validate against a leap year so 02-29 is accepted.
      NaiveDate::from_ymd_opt(2000, month, day)?;
      return Some(Self { year: None, month, day });
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(date.into())
  }

  pub fn to_naive_date(self) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(self.year?, self.month, self.day)
  }
}

impl From<NaiveDate> for EventDate {
  fn from(date: NaiveDate) -> Self {
    use chrono::Datelike;
    Self { year: Some(date.year()), month: date.month(), day: date.day() }
  }
}

impl fmt::Display for EventDate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.year {
      Some(year) => write!(f, "{year:04}-{:02}-{:02}", self.month, self.day),
      None => write!(f, "--{:02}-{:02}", self.month, self.day),
    }
  }
}

// ─── Data entities ───────────────────────────────────────────────────────────

/// Columns every Data row carries regardless of kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataMeta {
  pub id:               DataId,
  pub raw_contact_id:   RawContactId,
  pub contact_id:       ContactId,
  pub is_primary:       bool,
  pub is_super_primary: bool,
}

impl DataMeta {
  fn value(&self, name: &str) -> Option<Value> {
    let value: Value = if name == fields::DATA_ID.name() {
      self.id.into()
    } else if name == fields::RAW_CONTACT_ID.name() {
      self.raw_contact_id.into()
    } else if name == fields::CONTACT_ID.name() {
      self.contact_id.into()
    } else if name == fields::IS_PRIMARY.name() {
      self.is_primary.into()
    } else if name == fields::IS_SUPER_PRIMARY.name() {
      self.is_super_primary.into()
    } else {
      return None;
    };
    Some(value)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
  pub meta:              DataMeta,
  pub formatted_address: Option<String>,
  pub r#type:            Option<AddressType>,
  pub label:             Option<String>,
  pub street:            Option<String>,
  pub po_box:            Option<String>,
  pub neighborhood:      Option<String>,
  pub city:              Option<String>,
  pub region:            Option<String>,
  pub post_code:         Option<String>,
  pub country:           Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
  pub meta:    DataMeta,
  pub address: Option<String>,
  pub r#type:  Option<EmailType>,
  pub label:   Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
  pub meta:   DataMeta,
  pub date:   Option<EventDate>,
  pub r#type: Option<EventType>,
  pub label:  Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
  pub meta:     DataMeta,
  pub group_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Im {
  pub meta:            DataMeta,
  pub data:            Option<String>,
  pub protocol:        Option<ImProtocol>,
  pub custom_protocol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name {
  pub meta:                 DataMeta,
  pub display_name:         Option<String>,
  pub given_name:           Option<String>,
  pub family_name:          Option<String>,
  pub prefix:               Option<String>,
  pub middle_name:          Option<String>,
  pub suffix:               Option<String>,
  pub phonetic_given_name:  Option<String>,
  pub phonetic_middle_name: Option<String>,
  pub phonetic_family_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nickname {
  pub meta: DataMeta,
  pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
  pub meta: DataMeta,
  pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
  pub meta:            DataMeta,
  pub company:         Option<String>,
  pub title:           Option<String>,
  pub department:      Option<String>,
  pub job_description: Option<String>,
  pub symbol:          Option<String>,
  pub phonetic_name:   Option<String>,
  pub office_location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phone {
  pub meta:              DataMeta,
  pub number:            Option<String>,
  pub r#type:            Option<PhoneType>,
  pub label:             Option<String>,
  pub normalized_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
  pub meta:          DataMeta,
  pub photo_file_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
  pub meta:   DataMeta,
  pub name:   Option<String>,
  pub r#type: Option<RelationType>,
  pub label:  Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SipAddress {
  pub meta:        DataMeta,
  pub sip_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Website {
  pub meta: DataMeta,
  pub url:  Option<String>,
}

/// One decoded Data row of any known kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataItem {
  Address(Address),
  Email(Email),
  Event(Event),
  GroupMembership(GroupMembership),
  Im(Im),
  Name(Name),
  Nickname(Nickname),
  Note(Note),
  Organization(Organization),
  Phone(Phone),
  Photo(Photo),
  Relation(Relation),
  SipAddress(SipAddress),
  Website(Website),
}

fn text(v: &Option<String>) -> Value { v.clone().into() }

fn code<T>(v: Option<T>, f: impl Fn(T) -> i64) -> Value { v.map(f).into() }

impl DataItem {
  pub fn kind(&self) -> Kind {
    match self {
      Self::Address(_) => Kind::Address,
      Self::Email(_) => Kind::Email,
      Self::Event(_) => Kind::Event,
      Self::GroupMembership(_) => Kind::GroupMembership,
      Self::Im(_) => Kind::Im,
      Self::Name(_) => Kind::Name,
      Self::Nickname(_) => Kind::Nickname,
      Self::Note(_) => Kind::Note,
      Self::Organization(_) => Kind::Organization,
      Self::Phone(_) => Kind::Phone,
      Self::Photo(_) => Kind::Photo,
      Self::Relation(_) => Kind::Relation,
      Self::SipAddress(_) => Kind::SipAddress,
      Self::Website(_) => Kind::Website,
    }
  }

  pub fn meta(&self) -> &DataMeta {
    match self {
      Self::Address(d) => &d.meta,
      Self::Email(d) => &d.meta,
      Self::Event(d) => &d.meta,
      Self::GroupMembership(d) => &d.meta,
      Self::Im(d) => &d.meta,
      Self::Name(d) => &d.meta,
      Self::Nickname(d) => &d.meta,
      Self::Note(d) => &d.meta,
      Self::Organization(d) => &d.meta,
      Self::Phone(d) => &d.meta,
      Self::Photo(d) => &d.meta,
      Self::Relation(d) => &d.meta,
      Self::SipAddress(d) => &d.meta,
      Self::Website(d) => &d.meta,
    }
  }

  /// The value this entity holds for a physical column, read back the same
  /// way the mapper wrote it.
  pub fn value(&self, column: &str) -> Value {
    if column == fields::KIND.name() {
      return self.kind().into();
    }
    if let Some(v) = self.meta().value(column) {
      return v;
    }
    match (self, column) {
      (Self::Address(d), "data1") => text(&d.formatted_address),
      (Self::Address(d), "data2") => code(d.r#type, AddressType::code),
      (Self::Address(d), "data3") => text(&d.label),
      (Self::Address(d), "data4") => text(&d.street),
      (Self::Address(d), "data5") => text(&d.po_box),
      (Self::Address(d), "data6") => text(&d.neighborhood),
      (Self::Address(d), "data7") => text(&d.city),
      (Self::Address(d), "data8") => text(&d.region),
      (Self::Address(d), "data9") => text(&d.post_code),
      (Self::Address(d), "data10") => text(&d.country),
      (Self::Email(d), "data1") => text(&d.address),
      (Self::Email(d), "data2") => code(d.r#type, EmailType::code),
      (Self::Email(d), "data3") => text(&d.label),
      (Self::Event(d), "data1") => d.date.map(|d| d.to_string()).into(),
      (Self::Event(d), "data2") => code(d.r#type, EventType::code),
      (Self::Event(d), "data3") => text(&d.label),
      (Self::GroupMembership(d), "data1") => d.group_id.into(),
      (Self::Im(d), "data1") => text(&d.data),
      (Self::Im(d), "data5") => code(d.protocol, ImProtocol::code),
      (Self::Im(d), "data6") => text(&d.custom_protocol),
      (Self::Name(d), "data1") => text(&d.display_name),
      (Self::Name(d), "data2") => text(&d.given_name),
      (Self::Name(d), "data3") => text(&d.family_name),
      (Self::Name(d), "data4") => text(&d.prefix),
      (Self::Name(d), "data5") => text(&d.middle_name),
      (Self::Name(d), "data6") => text(&d.suffix),
      (Self::Name(d), "data7") => text(&d.phonetic_given_name),
      (Self::Name(d), "data8") => text(&d.phonetic_middle_name),
      (Self::Name(d), "data9") => text(&d.phonetic_family_name),
      (Self::Nickname(d), "data1") => text(&d.name),
      (Self::Note(d), "data1") => text(&d.note),
      (Self::Organization(d), "data1") => text(&d.company),
      (Self::Organization(d), "data4") => text(&d.title),
      (Self::Organization(d), "data5") => text(&d.department),
      (Self::Organization(d), "data6") => text(&d.job_description),
      (Self::Organization(d), "data7") => text(&d.symbol),
      (Self::Organization(d), "data8") => text(&d.phonetic_name),
      (Self::Organization(d), "data9") => text(&d.office_location),
      (Self::Phone(d), "data1") => text(&d.number),
      (Self::Phone(d), "data2") => code(d.r#type, PhoneType::code),
      (Self::Phone(d), "data3") => text(&d.label),
      (Self::Phone(d), "data4") => text(&d.normalized_number),
      (Self::Photo(d), "data14") => d.photo_file_id.into(),
      (Self::Relation(d), "data1") => text(&d.name),
      (Self::Relation(d), "data2") => code(d.r#type, RelationType::code),
      (Self::Relation(d), "data3") => text(&d.label),
      (Self::SipAddress(d), "data1") => text(&d.sip_address),
      (Self::Website(d), "data1") => text(&d.url),
      _ => Value::Null,
    }
  }
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

/// The sync account a RawContact belongs to.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Account {
  pub name:   String,
  pub r#type: String,
}

impl Account {
  pub fn new(name: impl Into<String>, r#type: impl Into<String>) -> Self {
    Self { name: name.into(), r#type: r#type.into() }
  }
}

/// One account's contribution to a [`Contact`].
///
/// Singular kinds hold the lowest-id row when a store carries several;
/// plural collections are ordered by ascending row id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawContact {
  pub id:                RawContactId,
  pub contact_id:        ContactId,
  pub account:           Option<Account>,
  pub name:              Option<Name>,
  pub nickname:          Option<Nickname>,
  pub note:              Option<Note>,
  pub organization:      Option<Organization>,
  pub photo:             Option<Photo>,
  pub sip_address:       Option<SipAddress>,
  pub addresses:         Vec<Address>,
  pub emails:            Vec<Email>,
  pub events:            Vec<Event>,
  pub group_memberships: Vec<GroupMembership>,
  pub ims:               Vec<Im>,
  pub phones:            Vec<Phone>,
  pub relations:         Vec<Relation>,
  pub websites:          Vec<Website>,
}

impl RawContact {
  pub(crate) fn blank(id: RawContactId, contact_id: ContactId) -> Self {
    Self {
      id,
      contact_id,
      account: None,
      name: None,
      nickname: None,
      note: None,
      organization: None,
      photo: None,
      sip_address: None,
      addresses: Vec::new(),
      emails: Vec::new(),
      events: Vec::new(),
      group_memberships: Vec::new(),
      ims: Vec::new(),
      phones: Vec::new(),
      relations: Vec::new(),
      websites: Vec::new(),
    }
  }

  /// File `item` into its slot. A singular slot that is already filled is
  /// left alone, so items must arrive in ascending id order.
  pub(crate) fn push(&mut self, item: DataItem) {
    fn first<T>(slot: &mut Option<T>, v: T) {
      if slot.is_none() {
        *slot = Some(v);
      }
    }
    match item {
      DataItem::Address(d) => self.addresses.push(d),
      DataItem::Email(d) => self.emails.push(d),
      DataItem::Event(d) => self.events.push(d),
      DataItem::GroupMembership(d) => self.group_memberships.push(d),
      DataItem::Im(d) => self.ims.push(d),
      DataItem::Name(d) => first(&mut self.name, d),
      DataItem::Nickname(d) => first(&mut self.nickname, d),
      DataItem::Note(d) => first(&mut self.note, d),
      DataItem::Organization(d) => first(&mut self.organization, d),
      DataItem::Phone(d) => self.phones.push(d),
      DataItem::Photo(d) => first(&mut self.photo, d),
      DataItem::Relation(d) => self.relations.push(d),
      DataItem::SipAddress(d) => first(&mut self.sip_address, d),
      DataItem::Website(d) => self.websites.push(d),
    }
  }

  /// Every Data item this RawContact holds, ordered by kind then id.
  pub fn data(&self) -> Vec<DataItem> {
    let mut items = Vec::new();
    items.extend(self.addresses.iter().cloned().map(DataItem::Address));
    items.extend(self.emails.iter().cloned().map(DataItem::Email));
    items.extend(self.events.iter().cloned().map(DataItem::Event));
    items.extend(
      self
        .group_memberships
        .iter()
        .cloned()
        .map(DataItem::GroupMembership),
    );
    items.extend(self.ims.iter().cloned().map(DataItem::Im));
    items.extend(self.name.clone().map(DataItem::Name));
    items.extend(self.nickname.clone().map(DataItem::Nickname));
    items.extend(self.note.clone().map(DataItem::Note));
    items.extend(self.organization.clone().map(DataItem::Organization));
    items.extend(self.phones.iter().cloned().map(DataItem::Phone));
    items.extend(self.photo.clone().map(DataItem::Photo));
    items.extend(self.relations.iter().cloned().map(DataItem::Relation));
    items.extend(self.sip_address.clone().map(DataItem::SipAddress));
    items.extend(self.websites.iter().cloned().map(DataItem::Website));
    items
  }

  /// Whether this RawContact has no Data rows at all.
  pub fn is_blank(&self) -> bool { self.data().is_empty() }
}

/// The aggregate identity presented to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
  pub id:                   ContactId,
  pub lookup_key:           Option<String>,
  pub display_name_primary: Option<String>,
  pub display_name_alt:     Option<String>,
  pub starred:              bool,
  pub last_updated:         Option<DateTime<Utc>>,
  /// Ordered by ascending id; never empty in a resolved result.
  pub raw_contacts:         Vec<RawContact>,
}

impl Contact {
  pub fn is_profile(&self) -> bool { self.id.is_profile() }

  pub fn raw_contact_ids(&self) -> Vec<RawContactId> {
    self.raw_contacts.iter().map(|r| r.id).collect()
  }

  /// Every non-null value this Contact holds for `column`, in RawContact
  /// then Data row order. Multi-valued for per-kind and row-level columns.
  pub fn column_values(&self, column: &Column) -> Vec<Value> {
    let values: Vec<Value> = if let Some(kind) = column.kind {
      self
        .raw_contacts
        .iter()
        .flat_map(RawContact::data)
        .filter(|item| item.kind() == kind)
        .map(|item| item.value(column.name))
        .collect()
    } else if *column == fields::contact::ID.column() {
      vec![self.id.into()]
    } else if *column == fields::contact::LOOKUP_KEY.column() {
      vec![self.lookup_key.clone().into()]
    } else if *column == fields::contact::DISPLAY_NAME_PRIMARY.column() {
      vec![self.display_name_primary.clone().into()]
    } else if *column == fields::contact::DISPLAY_NAME_ALT.column() {
      vec![self.display_name_alt.clone().into()]
    } else if *column == fields::contact::STARRED.column() {
      vec![self.starred.into()]
    } else if *column == fields::contact::LAST_UPDATED_TIMESTAMP.column() {
      vec![self.last_updated.map(|t| t.timestamp_millis()).into()]
    } else if *column == fields::raw_contact::ID.column() {
      self.raw_contacts.iter().map(|r| Value::from(r.id)).collect()
    } else if *column == fields::raw_contact::ACCOUNT_NAME.column() {
      let names = self.raw_contacts.iter().map(|r| r.account.as_ref());
      names.map(|a| Value::from(a.map(|a| a.name.clone()))).collect()
    } else if *column == fields::raw_contact::ACCOUNT_TYPE.column() {
      let types = self.raw_contacts.iter().map(|r| r.account.as_ref());
      types.map(|a| Value::from(a.map(|a| a.r#type.clone()))).collect()
    } else {
      self
        .raw_contacts
        .iter()
        .flat_map(RawContact::data)
        .map(|item| item.value(column.name))
        .collect()
    };
    values.into_iter().filter(|v| !v.is_null()).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn meta(id: i64) -> DataMeta {
    DataMeta {
      id:               DataId(id),
      raw_contact_id:   RawContactId(1),
      contact_id:       ContactId(10),
      is_primary:       false,
      is_super_primary: false,
    }
  }

  fn phone(id: i64, number: &str) -> Phone {
    Phone {
      meta:              meta(id),
      number:            Some(number.into()),
      r#type:            Some(PhoneType::Mobile),
      label:             None,
      normalized_number: None,
    }
  }

  #[test]
  fn profile_id_space() {
    assert!(!ContactId(1).is_profile());
    assert!(ContactId(PROFILE_ID_START).is_profile());
    assert!(ContactId(i64::MAX).is_profile());
  }

  #[test]
  fn coded_enums_round_trip_and_reject_unknown_codes() {
    assert_eq!(PhoneType::from_code(2), Some(PhoneType::Mobile));
    assert_eq!(PhoneType::Mobile.code(), 2);
    assert_eq!(ImProtocol::from_code(-1), Some(ImProtocol::Custom));
    assert_eq!(EmailType::from_code(99), None);
  }

  #[test]
  fn event_dates_with_and_without_year() {
    let full = EventDate::parse("1990-02-28").unwrap();
    assert_eq!(full.year, Some(1990));
    assert_eq!(full.to_string(), "1990-02-28");
    assert!(full.to_naive_date().is_some());

    let yearless = EventDate::parse("--02-29").unwrap();
    assert_eq!(yearless.year, None);
    assert_eq!(yearless.to_string(), "--02-29");
    assert!(yearless.to_naive_date().is_none());

    assert!(EventDate::parse("--13-01").is_none());
    assert!(EventDate::parse("yesterday").is_none());
  }

  #[test]
  fn singular_slots_keep_first_item() {
    let mut raw = RawContact::blank(RawContactId(1), ContactId(10));
    let note = |id, text: &str| {
      DataItem::Note(Note { meta: meta(id), note: Some(text.into()) })
    };
    raw.push(note(1, "first"));
    raw.push(note(2, "second"));
    assert_eq!(raw.note.unwrap().note.as_deref(), Some("first"));
  }

  #[test]
  fn item_values_read_back_generic_columns() {
    let item = DataItem::Phone(phone(5, "555"));
    assert_eq!(item.value("data1"), Value::from("555"));
    assert_eq!(item.value("data2"), Value::Integer(2));
    assert_eq!(item.value("_id"), Value::Integer(5));
    assert_eq!(item.value("mimetype"), Value::from(Kind::Phone));
    assert_eq!(item.value("data9"), Value::Null);
  }

  #[test]
  fn column_values_are_kind_guarded() {
    let mut raw = RawContact::blank(RawContactId(1), ContactId(10));
    raw.push(DataItem::Phone(phone(1, "555")));
    raw.push(DataItem::Email(Email {
      meta:    meta(2),
      address: Some("a@x.com".into()),
      r#type:  None,
      label:   None,
    }));
    let contact = Contact {
      id:                   ContactId(10),
      lookup_key:           None,
      display_name_primary: Some("Ann".into()),
      display_name_alt:     None,
      starred:              false,
      last_updated:         None,
      raw_contacts:         vec![raw],
    };

    assert_eq!(contact.column_values(&fields::phone::NUMBER.column()), vec![
      Value::from("555")
    ]);
    assert_eq!(contact.column_values(&fields::email::ADDRESS.column()), vec![
      Value::from("a@x.com")
    ]);
    assert!(
      contact
        .column_values(&fields::contact::LOOKUP_KEY.column())
        .is_empty()
    );
  }

  #[test]
  fn contacts_serialize_to_json() {
    let raw = RawContact::blank(RawContactId(1), ContactId(10));
    let json = serde_json::to_value(&raw).unwrap();
    assert_eq!(json["id"], 1);
    assert_eq!(json["contact_id"], 10);
  }
}
