//! Kind tags — the discriminator stored on every Data row.
//!
//! The Data table reuses the generic `data1..data15` columns for every
//! attribute kind. The `mimetype` column says which kind a given row holds,
//! and therefore how its generic columns must be read.

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoStaticStr};

/// The closed set of attribute kinds understood by this crate.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
pub enum Kind {
  #[strum(serialize = "vnd.android.cursor.item/postal-address_v2")]
  Address,
  #[strum(serialize = "vnd.android.cursor.item/email_v2")]
  Email,
  #[strum(serialize = "vnd.android.cursor.item/contact_event")]
  Event,
  #[strum(serialize = "vnd.android.cursor.item/group_membership")]
  GroupMembership,
  #[strum(serialize = "vnd.android.cursor.item/im")]
  Im,
  #[strum(serialize = "vnd.android.cursor.item/name")]
  Name,
  #[strum(serialize = "vnd.android.cursor.item/nickname")]
  Nickname,
  #[strum(serialize = "vnd.android.cursor.item/note")]
  Note,
  #[strum(serialize = "vnd.android.cursor.item/organization")]
  Organization,
  #[strum(serialize = "vnd.android.cursor.item/phone_v2")]
  Phone,
  #[strum(serialize = "vnd.android.cursor.item/photo")]
  Photo,
  #[strum(serialize = "vnd.android.cursor.item/relation")]
  Relation,
  #[strum(serialize = "vnd.android.cursor.item/sip_address")]
  SipAddress,
  #[strum(serialize = "vnd.android.cursor.item/website")]
  Website,
}

impl Kind {
  /// The tag value stored in the `mimetype` column.
  pub fn tag(self) -> &'static str { self.into() }

  /// Parse a stored tag. Unknown tags (custom data from other apps) yield
  /// `None` and are skipped by the row mapper.
  pub fn from_tag(tag: &str) -> Option<Self> { tag.parse().ok() }

  /// Whether a RawContact holds at most one row of this kind.
  pub fn is_singular(self) -> bool {
    matches!(
      self,
      Self::Name
        | Self::Nickname
        | Self::Note
        | Self::Organization
        | Self::Photo
        | Self::SipAddress
    )
  }
}
