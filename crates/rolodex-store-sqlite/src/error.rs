//! Error type for `rolodex-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] rolodex_core::Error),

  #[error("database error: {0}")]
  Database(#[from] rusqlite::Error),

  #[error("config error: {0}")]
  Config(#[from] config::ConfigError),

  /// A Data row was added to a RawContact that does not exist.
  #[error("raw contact not found: {0}")]
  RawContactNotFound(rolodex_core::RawContactId),

  /// A Data row was given a field of another kind.
  #[error("field {field} does not belong to kind {kind:?}")]
  KindMismatch {
    field: &'static str,
    kind:  rolodex_core::Kind,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
