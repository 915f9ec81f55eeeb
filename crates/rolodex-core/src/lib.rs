//! Core types and engines for the Rolodex contacts layer.
//!
//! This crate is deliberately free of database dependencies. It models the
//! sparse Contacts / RawContacts / Data store, builds kind-guarded queries
//! against it through the [`ContactsStore`] trait, and merges the rows that
//! come back into one [`Contact`] graph per aggregate.

mod accumulator;
pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod field;
pub mod fields;
pub mod include;
pub mod kind;
pub mod link;
mod mapper;
pub mod order;
pub mod predicate;
pub mod query;
pub mod store;
pub mod value;

pub use client::Client;
pub use config::QueryDefaults;
pub use entity::{Contact, ContactId, DataId, RawContact, RawContactId};
pub use error::{Error, Result};
pub use field::{Field, FieldSet};
pub use kind::Kind;
pub use link::{LinkError, Linked, Unlinked};
pub use order::OrderBy;
pub use predicate::Where;
pub use store::{Capabilities, ContactsStore};
