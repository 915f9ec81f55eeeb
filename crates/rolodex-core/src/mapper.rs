//! Row mappers: flat store rows in, typed entities out.
//!
//! This is the only place that knows how a kind's generic `dataN` columns
//! are laid out.

use chrono::{DateTime, Utc};

use crate::{
  entity::{
    Account, Address, AddressType, ContactId, DataId, DataItem, DataMeta,
    Email, EmailType, Event, EventDate, EventType, GroupMembership, Im,
    ImProtocol, Name, Nickname, Note, Organization, Phone, PhoneType, Photo,
    RawContactId, Relation, RelationType, SipAddress, Website,
  },
  error::{Error, Result},
  field::Field,
  fields::{
    self, address, email, event, im, name, organization, phone, relation,
  },
  kind::Kind,
  store::Row,
};

/// Contact-level columns, from the Data view or the Contacts table.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ContactColumns {
  pub lookup_key:           Option<String>,
  pub display_name_primary: Option<String>,
  pub display_name_alt:     Option<String>,
  pub starred:              Option<bool>,
  pub last_updated:         Option<DateTime<Utc>>,
}

/// RawContact-level columns, from the Data view or the RawContacts table.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawContactColumns {
  pub id:         RawContactId,
  pub contact_id: ContactId,
  pub account:    Option<Account>,
}

/// One Data-view row, split into its three levels.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DataRow {
  pub contact:     ContactColumns,
  pub raw_contact: RawContactColumns,
  /// `None` for kinds this crate does not understand.
  pub item:        Option<DataItem>,
}

fn text<D>(row: &Row, field: Field<D>) -> Option<String> {
  row.get(field.name()).as_text()
}

fn int<D>(row: &Row, field: Field<D>) -> Option<i64> {
  row.get(field.name()).as_i64()
}

fn required_id<D>(row: &Row, field: Field<D>) -> Result<i64> {
  int(row, field).ok_or_else(|| {
    Error::RowDecode(format!("missing required column {}", field.name()))
  })
}

fn contact_columns(
  row: &Row,
  lookup: &'static str,
  display: &'static str,
  alt: &'static str,
  starred: &'static str,
  updated: &'static str,
) -> ContactColumns {
  ContactColumns {
    lookup_key:           row.get(lookup).as_text(),
    display_name_primary: row.get(display).as_text(),
    display_name_alt:     row.get(alt).as_text(),
    starred:              row.get(starred).as_bool(),
    last_updated:         row
      .get(updated)
      .as_i64()
      .and_then(DateTime::from_timestamp_millis),
  }
}

fn account(name: Option<String>, r#type: Option<String>) -> Option<Account> {
  Some(Account { name: name?, r#type: r#type? })
}

/// Decode a Data-view row. Rows not yet attached to a Contact yield
/// `Ok(None)`.
pub(crate) fn data_row(row: &Row) -> Result<Option<DataRow>> {
  let Some(contact_id) = int(row, fields::CONTACT_ID) else {
    return Ok(None);
  };
  let meta = DataMeta {
    id:               DataId(required_id(row, fields::DATA_ID)?),
    raw_contact_id:   RawContactId(required_id(row, fields::RAW_CONTACT_ID)?),
    contact_id:       ContactId(contact_id),
    is_primary:       row
      .get(fields::IS_PRIMARY.name())
      .as_bool()
      .unwrap_or(false),
    is_super_primary: row
      .get(fields::IS_SUPER_PRIMARY.name())
      .as_bool()
      .unwrap_or(false),
  };
  let contact = {
    use fields::contact::*;
    contact_columns(
      row,
      LOOKUP_KEY.name(),
      DISPLAY_NAME_PRIMARY.name(),
      DISPLAY_NAME_ALT.name(),
      STARRED.name(),
      LAST_UPDATED_TIMESTAMP.name(),
    )
  };
  let raw_contact = RawContactColumns {
    id:         meta.raw_contact_id,
    contact_id: meta.contact_id,
    account:    account(
      text(row, fields::raw_contact::ACCOUNT_NAME),
      text(row, fields::raw_contact::ACCOUNT_TYPE),
    ),
  };
  let kind = row.get(fields::KIND.name()).as_text();
  let item = kind
    .as_deref()
    .and_then(Kind::from_tag)
    .map(|kind| item(kind, meta, row));
  Ok(Some(DataRow { contact, raw_contact, item }))
}

/// Decode a Contacts-table row.
pub(crate) fn contact_row(row: &Row) -> Result<(ContactId, ContactColumns)> {
  use fields::contacts::*;
  let id = ContactId(required_id(row, ID)?);
  let columns = contact_columns(
    row,
    LOOKUP_KEY.name(),
    DISPLAY_NAME_PRIMARY.name(),
    DISPLAY_NAME_ALT.name(),
    STARRED.name(),
    LAST_UPDATED_TIMESTAMP.name(),
  );
  Ok((id, columns))
}

/// Decode a RawContacts-table row. Unaggregated RawContacts yield
/// `Ok(None)`.
pub(crate) fn raw_contact_row(row: &Row) -> Result<Option<RawContactColumns>> {
  use fields::raw_contacts::*;
  let id = RawContactId(required_id(row, ID)?);
  let Some(contact_id) = int(row, CONTACT_ID) else {
    return Ok(None);
  };
  Ok(Some(RawContactColumns {
    id,
    contact_id: ContactId(contact_id),
    account: account(text(row, ACCOUNT_NAME), text(row, ACCOUNT_TYPE)),
  }))
}

fn item(kind: Kind, meta: DataMeta, row: &Row) -> DataItem {
  match kind {
    Kind::Address => DataItem::Address(Address {
      meta,
      formatted_address: text(row, address::FORMATTED_ADDRESS),
      r#type: int(row, address::TYPE).and_then(AddressType::from_code),
      label: text(row, address::LABEL),
      street: text(row, address::STREET),
      po_box: text(row, address::PO_BOX),
      neighborhood: text(row, address::NEIGHBORHOOD),
      city: text(row, address::CITY),
      region: text(row, address::REGION),
      post_code: text(row, address::POST_CODE),
      country: text(row, address::COUNTRY),
    }),
    Kind::Email => DataItem::Email(Email {
      meta,
      address: text(row, email::ADDRESS),
      r#type: int(row, email::TYPE).and_then(EmailType::from_code),
      label: text(row, email::LABEL),
    }),
    Kind::Event => DataItem::Event(Event {
      meta,
      date: text(row, event::DATE).as_deref().and_then(EventDate::parse),
      r#type: int(row, event::TYPE).and_then(EventType::from_code),
      label: text(row, event::LABEL),
    }),
    Kind::GroupMembership => DataItem::GroupMembership(GroupMembership {
      meta,
      group_id: int(row, fields::group_membership::GROUP_ID),
    }),
    Kind::Im => DataItem::Im(Im {
      meta,
      data: text(row, im::DATA),
      protocol: int(row, im::PROTOCOL).and_then(ImProtocol::from_code),
      custom_protocol: text(row, im::CUSTOM_PROTOCOL),
    }),
    Kind::Name => DataItem::Name(Name {
      meta,
      display_name: text(row, name::DISPLAY_NAME),
      given_name: text(row, name::GIVEN_NAME),
      family_name: text(row, name::FAMILY_NAME),
      prefix: text(row, name::PREFIX),
      middle_name: text(row, name::MIDDLE_NAME),
      suffix: text(row, name::SUFFIX),
      phonetic_given_name: text(row, name::PHONETIC_GIVEN_NAME),
      phonetic_middle_name: text(row, name::PHONETIC_MIDDLE_NAME),
      phonetic_family_name: text(row, name::PHONETIC_FAMILY_NAME),
    }),
    Kind::Nickname => DataItem::Nickname(Nickname {
      meta,
      name: text(row, fields::nickname::NAME),
    }),
    Kind::Note => {
      DataItem::Note(Note { meta, note: text(row, fields::note::NOTE) })
    }
    Kind::Organization => DataItem::Organization(Organization {
      meta,
      company: text(row, organization::COMPANY),
      title: text(row, organization::TITLE),
      department: text(row, organization::DEPARTMENT),
      job_description: text(row, organization::JOB_DESCRIPTION),
      symbol: text(row, organization::SYMBOL),
      phonetic_name: text(row, organization::PHONETIC_NAME),
      office_location: text(row, organization::OFFICE_LOCATION),
    }),
    Kind::Phone => DataItem::Phone(Phone {
      meta,
      number: text(row, phone::NUMBER),
      r#type: int(row, phone::TYPE).and_then(PhoneType::from_code),
      label: text(row, phone::LABEL),
      normalized_number: text(row, phone::NORMALIZED_NUMBER),
    }),
    Kind::Photo => DataItem::Photo(Photo {
      meta,
      photo_file_id: int(row, fields::photo::PHOTO_FILE_ID),
    }),
    Kind::Relation => DataItem::Relation(Relation {
      meta,
      name: text(row, relation::NAME),
      r#type: int(row, relation::TYPE).and_then(RelationType::from_code),
      label: text(row, relation::LABEL),
    }),
    Kind::SipAddress => DataItem::SipAddress(SipAddress {
      meta,
      sip_address: text(row, fields::sip_address::SIP_ADDRESS),
    }),
    Kind::Website => DataItem::Website(Website {
      meta,
      url: text(row, fields::website::URL),
    }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::value::Value;

  fn phone_row() -> Row {
    [
      ("_id", Value::Integer(3)),
      ("raw_contact_id", Value::Integer(1)),
      ("contact_id", Value::Integer(10)),
      ("mimetype", Value::from(Kind::Phone)),
      ("is_primary", Value::Integer(1)),
      ("data1", Value::from("555")),
      ("data2", Value::Integer(2)),
      ("display_name", Value::from("Ann")),
      ("account_name", Value::from("ann@example.com")),
      ("account_type", Value::from("com.example")),
    ]
    .into_iter()
    .collect()
  }

  #[test]
  fn decodes_data_rows_at_every_level() {
    let row = data_row(&phone_row()).unwrap().unwrap();
    assert_eq!(row.contact.display_name_primary.as_deref(), Some("Ann"));
    assert_eq!(row.raw_contact.contact_id, ContactId(10));
    assert_eq!(
      row.raw_contact.account,
      Some(Account::new("ann@example.com", "com.example"))
    );
    let Some(DataItem::Phone(phone)) = row.item else {
      panic!("expected a phone");
    };
    assert_eq!(phone.number.as_deref(), Some("555"));
    assert_eq!(phone.r#type, Some(PhoneType::Mobile));
    assert!(phone.meta.is_primary);
    assert!(!phone.meta.is_super_primary);
  }

  #[test]
  fn unknown_kinds_keep_the_row_but_drop_the_item() {
    let mut row = phone_row();
    row.insert("mimetype", Value::from("vnd.example/custom"));
    let row = data_row(&row).unwrap().unwrap();
    assert!(row.item.is_none());
    assert_eq!(row.raw_contact.id, RawContactId(1));
  }

  #[test]
  fn unknown_type_codes_keep_the_label() {
    let mut row = phone_row();
    row.insert("data2", Value::Integer(999));
    row.insert("data3", Value::from("Satellite"));
    let Some(DataItem::Phone(phone)) = data_row(&row).unwrap().unwrap().item
    else {
      panic!("expected a phone");
    };
    assert_eq!(phone.r#type, None);
    assert_eq!(phone.label.as_deref(), Some("Satellite"));
  }

  #[test]
  fn unattached_rows_are_skipped() {
    let mut row = phone_row();
    row.insert("contact_id", Value::Null);
    assert!(data_row(&row).unwrap().is_none());
  }

  #[test]
  fn missing_row_id_is_a_decode_error() {
    let mut row = phone_row();
    row.insert("_id", Value::Null);
    assert!(matches!(data_row(&row), Err(Error::RowDecode(_))));
  }

  #[test]
  fn timestamps_are_epoch_millis() {
    let row: Row = [
      ("_id", Value::Integer(10)),
      ("contact_last_updated_timestamp", Value::Integer(1_700_000_000_000)),
    ]
    .into_iter()
    .collect();
    let (id, columns) = contact_row(&row).unwrap();
    assert_eq!(id, ContactId(10));
    assert_eq!(columns.last_updated.unwrap().timestamp(), 1_700_000_000);
  }
}
