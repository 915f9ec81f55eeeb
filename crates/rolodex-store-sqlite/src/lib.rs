//! SQLite backend for the Rolodex contacts store.
//!
//! Implements [`rolodex_core::ContactsStore`] over four tables (Contacts,
//! RawContacts, Data and aggregation exceptions) plus a joined Data view,
//! and re-aggregates RawContacts into Contacts whenever exceptions change.

mod aggregation;
mod encode;
mod schema;
mod store;

pub mod config;
pub mod error;

pub use config::{Settings, StoreConfig};
pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
