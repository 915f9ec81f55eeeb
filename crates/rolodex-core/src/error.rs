//! Error types for `rolodex-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A predicate leaf whose operator and value do not fit together, e.g.
  /// `IN` applied to a scalar. Always a construction bug on the caller side.
  #[error("invalid predicate shape: {0}")]
  InvalidPredicateShape(String),

  /// Rejected paging or builder argument; raised before any I/O happens.
  #[error("illegal argument: {0}")]
  IllegalArgument(String),

  /// A row handed over by the store could not be decoded into an entity.
  #[error("row decode error: {0}")]
  RowDecode(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
