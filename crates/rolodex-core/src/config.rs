//! Query defaults, deserialised from the application's configuration.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// Defaults applied to every [`Query`](crate::query::Query) a
/// [`Client`](crate::client::Client) hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryDefaults {
  pub include_blanks: bool,
  /// `None` means unlimited.
  pub limit:          Option<NonZeroUsize>,
}

impl Default for QueryDefaults {
  fn default() -> Self { Self { include_blanks: true, limit: None } }
}
