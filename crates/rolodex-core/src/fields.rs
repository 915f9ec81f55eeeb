//! The field catalog: every logical attribute bound to its physical column.
//!
//! Per-kind fields share the generic `data1..data15` columns, so e.g.
//! [`name::DISPLAY_NAME`], [`phone::NUMBER`] and [`email::ADDRESS`] all live
//! in `data1`. Their kind tag is what tells them apart.

use crate::{
  field::{Column, Field, FieldSet, domain},
  kind::Kind,
};

type DataField = Field<domain::Data>;

const fn general(name: &'static str) -> DataField { Field::new(Column::new(name)) }

const fn required(name: &'static str) -> DataField {
  Field::new(Column::required(name))
}

const fn common(kind: Kind, name: &'static str) -> DataField {
  Field::new(Column::of_kind(kind, name))
}

// ─── Data: required ──────────────────────────────────────────────────────────

pub const DATA_ID: DataField = required("_id");
pub const RAW_CONTACT_ID: DataField = required("raw_contact_id");
pub const CONTACT_ID: DataField = required("contact_id");
/// The kind tag column.
pub const KIND: DataField = required("mimetype");
pub const IS_PRIMARY: DataField = required("is_primary");
pub const IS_SUPER_PRIMARY: DataField = required("is_super_primary");

/// Always fetched alongside whatever the caller asks for.
pub const REQUIRED: FieldSet<domain::Data> = FieldSet {
  all:          &[
    DATA_ID,
    RAW_CONTACT_ID,
    CONTACT_ID,
    KIND,
    IS_PRIMARY,
    IS_SUPER_PRIMARY,
  ],
  for_matching: &[],
};

// ─── Data: joined contact / raw contact columns ──────────────────────────────

pub mod contact {
  //! Contact-level columns as exposed by the Data view.
  use super::*;

  pub const ID: DataField = CONTACT_ID;
  pub const LOOKUP_KEY: DataField = general("lookup");
  pub const DISPLAY_NAME_PRIMARY: DataField = general("display_name");
  pub const DISPLAY_NAME_ALT: DataField = general("display_name_alt");
  pub const STARRED: DataField = general("starred");
  pub const LAST_UPDATED_TIMESTAMP: DataField =
    general("contact_last_updated_timestamp");

  pub const SET: FieldSet<domain::Data> = FieldSet {
    all:          &[
      ID,
      LOOKUP_KEY,
      DISPLAY_NAME_PRIMARY,
      DISPLAY_NAME_ALT,
      STARRED,
      LAST_UPDATED_TIMESTAMP,
    ],
    for_matching: &[DISPLAY_NAME_PRIMARY, DISPLAY_NAME_ALT],
  };
}

pub mod raw_contact {
  //! RawContact-level columns as exposed by the Data view.
  use super::*;

  pub const ID: DataField = RAW_CONTACT_ID;
  pub const ACCOUNT_NAME: DataField = general("account_name");
  pub const ACCOUNT_TYPE: DataField = general("account_type");

  pub const SET: FieldSet<domain::Data> = FieldSet {
    all:          &[ID, ACCOUNT_NAME, ACCOUNT_TYPE],
    for_matching: &[],
  };
}

// ─── Data: per kind ──────────────────────────────────────────────────────────

pub mod address {
  use super::*;

  pub const FORMATTED_ADDRESS: DataField = common(Kind::Address, "data1");
  pub const TYPE: DataField = common(Kind::Address, "data2");
  pub const LABEL: DataField = common(Kind::Address, "data3");
  pub const STREET: DataField = common(Kind::Address, "data4");
  pub const PO_BOX: DataField = common(Kind::Address, "data5");
  pub const NEIGHBORHOOD: DataField = common(Kind::Address, "data6");
  pub const CITY: DataField = common(Kind::Address, "data7");
  pub const REGION: DataField = common(Kind::Address, "data8");
  pub const POST_CODE: DataField = common(Kind::Address, "data9");
  pub const COUNTRY: DataField = common(Kind::Address, "data10");

  pub const SET: FieldSet<domain::Data> = FieldSet {
    all:          &[
      FORMATTED_ADDRESS,
      TYPE,
      LABEL,
      STREET,
      PO_BOX,
      NEIGHBORHOOD,
      CITY,
      REGION,
      POST_CODE,
      COUNTRY,
    ],
    for_matching: &[
      FORMATTED_ADDRESS,
      LABEL,
      STREET,
      PO_BOX,
      NEIGHBORHOOD,
      CITY,
      REGION,
      POST_CODE,
      COUNTRY,
    ],
  };
}

pub mod email {
  use super::*;

  pub const ADDRESS: DataField = common(Kind::Email, "data1");
  pub const TYPE: DataField = common(Kind::Email, "data2");
  pub const LABEL: DataField = common(Kind::Email, "data3");

  pub const SET: FieldSet<domain::Data> = FieldSet {
    all:          &[ADDRESS, TYPE, LABEL],
    for_matching: &[ADDRESS, LABEL],
  };
}

pub mod event {
  use super::*;

  /// `YYYY-MM-DD`, or `--MM-DD` when the year is unknown.
  pub const DATE: DataField = common(Kind::Event, "data1");
  pub const TYPE: DataField = common(Kind::Event, "data2");
  pub const LABEL: DataField = common(Kind::Event, "data3");

  pub const SET: FieldSet<domain::Data> = FieldSet {
    all:          &[DATE, TYPE, LABEL],
    for_matching: &[DATE, LABEL],
  };
}

pub mod group_membership {
  use super::*;

  pub const GROUP_ID: Field<domain::GroupMembership> =
    Field::new(Column::of_kind(Kind::GroupMembership, "data1"));

  pub const SET: FieldSet<domain::GroupMembership> =
    FieldSet { all: &[GROUP_ID], for_matching: &[] };
}

pub mod im {
  use super::*;

  pub const DATA: DataField = common(Kind::Im, "data1");
  pub const PROTOCOL: DataField = common(Kind::Im, "data5");
  pub const CUSTOM_PROTOCOL: DataField = common(Kind::Im, "data6");

  pub const SET: FieldSet<domain::Data> = FieldSet {
    all:          &[DATA, PROTOCOL, CUSTOM_PROTOCOL],
    for_matching: &[DATA, CUSTOM_PROTOCOL],
  };
}

pub mod name {
  use super::*;

  pub const DISPLAY_NAME: DataField = common(Kind::Name, "data1");
  pub const GIVEN_NAME: DataField = common(Kind::Name, "data2");
  pub const FAMILY_NAME: DataField = common(Kind::Name, "data3");
  pub const PREFIX: DataField = common(Kind::Name, "data4");
  pub const MIDDLE_NAME: DataField = common(Kind::Name, "data5");
  pub const SUFFIX: DataField = common(Kind::Name, "data6");
  pub const PHONETIC_GIVEN_NAME: DataField = common(Kind::Name, "data7");
  pub const PHONETIC_MIDDLE_NAME: DataField = common(Kind::Name, "data8");
  pub const PHONETIC_FAMILY_NAME: DataField = common(Kind::Name, "data9");

  pub const SET: FieldSet<domain::Data> = FieldSet {
    all:          &[
      DISPLAY_NAME,
      GIVEN_NAME,
      FAMILY_NAME,
      PREFIX,
      MIDDLE_NAME,
      SUFFIX,
      PHONETIC_GIVEN_NAME,
      PHONETIC_MIDDLE_NAME,
      PHONETIC_FAMILY_NAME,
    ],
    for_matching: &[
      DISPLAY_NAME,
      GIVEN_NAME,
      FAMILY_NAME,
      PREFIX,
      MIDDLE_NAME,
      SUFFIX,
      PHONETIC_GIVEN_NAME,
      PHONETIC_MIDDLE_NAME,
      PHONETIC_FAMILY_NAME,
    ],
  };
}

pub mod nickname {
  use super::*;

  pub const NAME: DataField = common(Kind::Nickname, "data1");

  pub const SET: FieldSet<domain::Data> =
    FieldSet { all: &[NAME], for_matching: &[NAME] };
}

pub mod note {
  use super::*;

  pub const NOTE: DataField = common(Kind::Note, "data1");

  pub const SET: FieldSet<domain::Data> =
    FieldSet { all: &[NOTE], for_matching: &[NOTE] };
}

pub mod organization {
  use super::*;

  pub const COMPANY: DataField = common(Kind::Organization, "data1");
  pub const TITLE: DataField = common(Kind::Organization, "data4");
  pub const DEPARTMENT: DataField = common(Kind::Organization, "data5");
  pub const JOB_DESCRIPTION: DataField = common(Kind::Organization, "data6");
  pub const SYMBOL: DataField = common(Kind::Organization, "data7");
  pub const PHONETIC_NAME: DataField = common(Kind::Organization, "data8");
  pub const OFFICE_LOCATION: DataField = common(Kind::Organization, "data9");

  pub const SET: FieldSet<domain::Data> = FieldSet {
    all:          &[
      COMPANY,
      TITLE,
      DEPARTMENT,
      JOB_DESCRIPTION,
      SYMBOL,
      PHONETIC_NAME,
      OFFICE_LOCATION,
    ],
    for_matching: &[
      COMPANY,
      TITLE,
      DEPARTMENT,
      JOB_DESCRIPTION,
      SYMBOL,
      PHONETIC_NAME,
      OFFICE_LOCATION,
    ],
  };
}

pub mod phone {
  use super::*;

  pub const NUMBER: DataField = common(Kind::Phone, "data1");
  pub const TYPE: DataField = common(Kind::Phone, "data2");
  pub const LABEL: DataField = common(Kind::Phone, "data3");
  pub const NORMALIZED_NUMBER: DataField = common(Kind::Phone, "data4");

  pub const SET: FieldSet<domain::Data> = FieldSet {
    all:          &[NUMBER, TYPE, LABEL, NORMALIZED_NUMBER],
    for_matching: &[NUMBER, LABEL, NORMALIZED_NUMBER],
  };
}

pub mod photo {
  use super::*;

  pub const PHOTO_FILE_ID: DataField = common(Kind::Photo, "data14");

  pub const SET: FieldSet<domain::Data> =
    FieldSet { all: &[PHOTO_FILE_ID], for_matching: &[] };
}

pub mod relation {
  use super::*;

  pub const NAME: DataField = common(Kind::Relation, "data1");
  pub const TYPE: DataField = common(Kind::Relation, "data2");
  pub const LABEL: DataField = common(Kind::Relation, "data3");

  pub const SET: FieldSet<domain::Data> = FieldSet {
    all:          &[NAME, TYPE, LABEL],
    for_matching: &[NAME, LABEL],
  };
}

pub mod sip_address {
  use super::*;

  pub const SIP_ADDRESS: DataField = common(Kind::SipAddress, "data1");

  pub const SET: FieldSet<domain::Data> =
    FieldSet { all: &[SIP_ADDRESS], for_matching: &[SIP_ADDRESS] };
}

pub mod website {
  use super::*;

  pub const URL: DataField = common(Kind::Website, "data1");

  pub const SET: FieldSet<domain::Data> =
    FieldSet { all: &[URL], for_matching: &[URL] };
}

// ─── Other tables ────────────────────────────────────────────────────────────

pub mod raw_contacts {
  //! Columns of the RawContacts table.
  use super::*;

  type RawContactsField = Field<domain::RawContacts>;

  pub const ID: RawContactsField = Field::new(Column::required("_id"));
  pub const CONTACT_ID: RawContactsField =
    Field::new(Column::required("contact_id"));
  pub const ACCOUNT_NAME: RawContactsField =
    Field::new(Column::new("account_name"));
  pub const ACCOUNT_TYPE: RawContactsField =
    Field::new(Column::new("account_type"));
  pub const SOURCE_ID: RawContactsField = Field::new(Column::new("sourceid"));

  pub const REQUIRED: FieldSet<domain::RawContacts> =
    FieldSet { all: &[ID, CONTACT_ID], for_matching: &[] };

  pub const SET: FieldSet<domain::RawContacts> = FieldSet {
    all:          &[ID, CONTACT_ID, ACCOUNT_NAME, ACCOUNT_TYPE, SOURCE_ID],
    for_matching: &[ACCOUNT_NAME],
  };
}

pub mod contacts {
  //! Columns of the Contacts table.
  use super::*;

  type ContactsField = Field<domain::Contacts>;

  pub const ID: ContactsField = Field::new(Column::required("_id"));
  pub const LOOKUP_KEY: ContactsField = Field::new(Column::new("lookup"));
  pub const DISPLAY_NAME_PRIMARY: ContactsField =
    Field::new(Column::new("display_name"));
  pub const DISPLAY_NAME_ALT: ContactsField =
    Field::new(Column::new("display_name_alt"));
  pub const DISPLAY_NAME_SOURCE: ContactsField =
    Field::new(Column::new("display_name_source"));
  pub const NAME_RAW_CONTACT_ID: ContactsField =
    Field::new(Column::new("name_raw_contact_id"));
  pub const STARRED: ContactsField = Field::new(Column::new("starred"));
  pub const LAST_UPDATED_TIMESTAMP: ContactsField =
    Field::new(Column::new("contact_last_updated_timestamp"));

  pub const REQUIRED: FieldSet<domain::Contacts> =
    FieldSet { all: &[ID], for_matching: &[] };

  pub const SET: FieldSet<domain::Contacts> = FieldSet {
    all:          &[
      ID,
      LOOKUP_KEY,
      DISPLAY_NAME_PRIMARY,
      DISPLAY_NAME_ALT,
      DISPLAY_NAME_SOURCE,
      NAME_RAW_CONTACT_ID,
      STARRED,
      LAST_UPDATED_TIMESTAMP,
    ],
    for_matching: &[DISPLAY_NAME_PRIMARY, DISPLAY_NAME_ALT],
  };
}

pub mod aggregation_exceptions {
  use super::*;

  type ExceptionsField = Field<domain::AggregationExceptions>;

  pub const TYPE: ExceptionsField = Field::new(Column::new("type"));
  pub const RAW_CONTACT_ID1: ExceptionsField =
    Field::new(Column::new("raw_contact_id1"));
  pub const RAW_CONTACT_ID2: ExceptionsField =
    Field::new(Column::new("raw_contact_id2"));
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// Every per-kind Data field set whose fields live in the `Data` domain.
pub const KIND_SETS: &[FieldSet<domain::Data>] = &[
  address::SET,
  email::SET,
  event::SET,
  im::SET,
  name::SET,
  nickname::SET,
  note::SET,
  organization::SET,
  phone::SET,
  photo::SET,
  relation::SET,
  sip_address::SET,
  website::SET,
];

/// Every column a full Data projection should carry.
pub fn all_data_columns() -> Vec<Column> {
  REQUIRED
    .columns()
    .chain(contact::SET.columns())
    .chain(raw_contact::SET.columns())
    .chain(KIND_SETS.iter().flat_map(FieldSet::columns))
    .chain(group_membership::SET.columns())
    .collect()
}

/// Every Data field that is safe to use for free-text matching.
pub fn for_matching() -> Vec<DataField> {
  contact::SET
    .for_matching
    .iter()
    .chain(KIND_SETS.iter().flat_map(|set| set.for_matching.iter()))
    .copied()
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn per_kind_fields_share_generic_columns() {
    assert_eq!(name::DISPLAY_NAME.name(), phone::NUMBER.name());
    assert_ne!(name::DISPLAY_NAME.kind(), phone::NUMBER.kind());
  }

  #[test]
  fn for_matching_excludes_type_codes_and_ids() {
    let matching = for_matching();
    assert!(!matching.contains(&phone::TYPE));
    assert!(!matching.contains(&CONTACT_ID));
    assert!(!matching.contains(&photo::PHOTO_FILE_ID));
    assert!(matching.contains(&email::ADDRESS));
  }

  #[test]
  fn every_kind_set_is_tagged_with_one_kind() {
    for set in KIND_SETS {
      let kinds: std::collections::BTreeSet<_> =
        set.all.iter().map(|f| f.kind()).collect();
      assert_eq!(kinds.len(), 1);
      assert!(kinds.iter().all(Option::is_some));
    }
  }
}
