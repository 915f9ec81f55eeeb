//! Configuration loading.
//!
//! Settings come from an optional file plus `ROLODEX__`-prefixed environment
//! variables, e.g. `ROLODEX__STORE__PATH=/var/lib/rolodex.db` or
//! `ROLODEX__QUERY__LIMIT=50`.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use rolodex_core::QueryDefaults;
use serde::Deserialize;

use crate::Result;

/// Where the store lives and what callers may do with it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
  /// `None` opens an in-memory database.
  pub path:      Option<PathBuf>,
  pub can_read:  bool,
  pub can_write: bool,
}

impl Default for StoreConfig {
  fn default() -> Self { Self { path: None, can_read: true, can_write: true } }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub store: StoreConfig,
  pub query: QueryDefaults,
}

impl Settings {
  /// Load from `file` (if given and present) overlaid with the environment.
  pub fn load(file: Option<&Path>) -> Result<Self> {
    let mut builder = Config::builder();
    if let Some(file) = file {
      builder = builder.add_source(File::from(file).required(false));
    }
    let settings = builder
      .add_source(
        Environment::with_prefix("ROLODEX")
          .prefix_separator("__")
          .separator("__"),
      )
      .build()?
      .try_deserialize()?;
    Ok(settings)
  }
}
