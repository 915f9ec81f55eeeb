//! The entry point tying a store to the query and linking engines.

use crate::{
  config::QueryDefaults,
  entity::ContactId,
  link::{self, LinkError, Linked, Unlinked},
  query::Query,
  store::ContactsStore,
};

/// A handle over a [`ContactsStore`].
///
/// Every call blocks on store I/O; none of them should run on a
/// latency-sensitive thread.
#[derive(Debug, Clone)]
pub struct Client<S> {
  store:    S,
  defaults: QueryDefaults,
}

impl<S: ContactsStore> Client<S> {
  pub fn new(store: S) -> Self { Self::with_defaults(store, QueryDefaults::default()) }

  pub fn with_defaults(store: S, defaults: QueryDefaults) -> Self {
    Self { store, defaults }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn defaults(&self) -> QueryDefaults { self.defaults }

  /// Start a query seeded with this client's defaults.
  pub fn query(&self) -> Query<'_, S> { Query::new(&self.store, self.defaults) }

  /// See [`link::link`].
  pub fn link(
    &self,
    primary: ContactId,
    others: impl IntoIterator<Item = ContactId>,
  ) -> Result<Linked, LinkError> {
    link::link(&self.store, primary, others)
  }

  /// See [`link::unlink`].
  pub fn unlink(&self, contact: ContactId) -> Result<Unlinked, LinkError> {
    link::unlink(&self.store, contact)
  }
}
