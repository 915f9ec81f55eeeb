//! [`SqliteStore`] — the SQLite implementation of [`ContactsStore`].

use std::{
  collections::BTreeSet,
  ops::ControlFlow,
  path::Path,
  sync::{Mutex, MutexGuard, PoisonError},
};

use rolodex_core::{
  Field, Kind,
  entity::{Account, DataId, RawContactId},
  field::{Table, domain},
  store::{Capabilities, ContactsStore, Operation, OperationResult, Row, TableQuery},
  value::Value,
};
use rusqlite::{Connection, OptionalExtension as _, params, params_from_iter};
use tracing::{debug, trace, warn};

use crate::{
  Error, Result,
  aggregation::{reaggregate, refresh_contact},
  config::StoreConfig,
  encode::{decode_value, encode_value, select_sql, update_sql},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A contacts store backed by a single SQLite database.
///
/// Every call holds the connection lock for its whole duration, so a batch
/// and its re-aggregation are never interleaved with a read.
pub struct SqliteStore {
  conn:      Mutex<Connection>,
  can_read:  bool,
  can_write: bool,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::init(Connection::open(path)?)
  }

  /// Open an in-memory store — useful for testing.
  pub fn open_in_memory() -> Result<Self> {
    Self::init(Connection::open_in_memory()?)
  }

  pub fn from_config(config: &StoreConfig) -> Result<Self> {
    let store = match &config.path {
      Some(path) => Self::open(path)?,
      None => Self::open_in_memory()?,
    };
    Ok(store.with_capabilities(config.can_read, config.can_write))
  }

  fn init(conn: Connection) -> Result<Self> {
    conn.execute_batch(SCHEMA)?;
    Ok(Self { conn: Mutex::new(conn), can_read: true, can_write: true })
  }

  /// Restrict what callers may do. Denied reads and writes are reported
  /// through [`Capabilities`]; the store itself still answers.
  pub fn with_capabilities(mut self, can_read: bool, can_write: bool) -> Self {
    self.can_read = can_read;
    self.can_write = can_write;
    self
  }

  fn conn(&self) -> MutexGuard<'_, Connection> {
    self.conn.lock().unwrap_or_else(PoisonError::into_inner)
  }

  // ─── Fixtures ──────────────────────────────────────────────────────────────

  /// Insert a RawContact and aggregate it into a Contact of its own.
  pub fn add_raw_contact(&self, account: Option<&Account>) -> Result<RawContactId> {
    let mut conn = self.conn();
    let tx = conn.transaction()?;
    tx.execute(
      "INSERT INTO raw_contacts (account_name, account_type) VALUES (?1, ?2)",
      params![account.map(|a| &a.name), account.map(|a| &a.r#type)],
    )?;
    let id = tx.last_insert_rowid();
    reaggregate(&tx, &BTreeSet::from([id]))?;
    tx.commit()?;
    debug!(raw_contact = id, "raw contact added");
    Ok(RawContactId(id))
  }

  /// Insert one Data row of `kind` under `raw_contact`. Every field must be
  /// a generic column of `kind` or one of the primary flags.
  pub fn add_data(
    &self,
    raw_contact: RawContactId,
    kind: Kind,
    values: impl IntoIterator<Item = (Field<domain::Data>, Value)>,
  ) -> Result<DataId> {
    let flags = [
      rolodex_core::fields::IS_PRIMARY.name(),
      rolodex_core::fields::IS_SUPER_PRIMARY.name(),
    ];
    let mut columns = vec!["raw_contact_id", "mimetype"];
    let mut bound =
      vec![rusqlite::types::Value::Integer(raw_contact.0), kind.tag().to_owned().into()];
    for (field, value) in values {
      let fits = match field.kind() {
        Some(k) => k == kind,
        None => flags.contains(&field.name()),
      };
      if !fits {
        return Err(Error::KindMismatch { field: field.name(), kind });
      }
      columns.push(field.name());
      bound.push(encode_value(&value)?);
    }

    let mut conn = self.conn();
    let tx = conn.transaction()?;
    let contact: Option<Option<i64>> = tx
      .query_row(
        "SELECT contact_id FROM raw_contacts WHERE _id = ?1",
        params![raw_contact.0],
        |r| r.get(0),
      )
      .optional()?;
    let Some(contact) = contact else {
      return Err(Error::RawContactNotFound(raw_contact));
    };
    let placeholders =
      (1..=columns.len()).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ");
    tx.execute(
      &format!("INSERT INTO data ({}) VALUES ({placeholders})", columns.join(", ")),
      params_from_iter(bound),
    )?;
    let id = tx.last_insert_rowid();
    if let Some(contact) = contact {
      refresh_contact(&tx, contact)?;
    }
    tx.commit()?;
    trace!(data = id, raw_contact = raw_contact.0, ?kind, "data added");
    Ok(DataId(id))
  }

  // ─── Batches ───────────────────────────────────────────────────────────────

  fn apply(
    conn: &mut Connection,
    operations: &[Operation],
  ) -> Result<Vec<OperationResult>> {
    let tx = conn.transaction()?;
    let mut seeds = BTreeSet::new();
    let mut touched = BTreeSet::new();
    let mut results = Vec::with_capacity(operations.len());

    for operation in operations {
      let count = match operation {
        Operation::AggregationException { raw_contact_id1, raw_contact_id2, r#type } => {
          let (a, b) = (
            raw_contact_id1.0.min(raw_contact_id2.0),
            raw_contact_id1.0.max(raw_contact_id2.0),
          );
          if a == b {
            return Err(
              rolodex_core::Error::IllegalArgument(format!(
                "aggregation exception pairs raw contact {a} with itself"
              ))
              .into(),
            );
          }
          seeds.extend([a, b]);
          tx.execute(
            "INSERT OR REPLACE INTO aggregation_exceptions \
             (type, raw_contact_id1, raw_contact_id2) VALUES (?1, ?2, ?3)",
            params![r#type.code(), a, b],
          )?
        }
        Operation::Update { table, selection, values } => {
          if *table == Table::Data {
            let sql = format!(
              "SELECT DISTINCT contact_id FROM data_view WHERE {}",
              selection.to_sql()?
            );
            let mut stmt = tx.prepare(&sql)?;
            let contacts = stmt
              .query_map([], |r| r.get::<_, Option<i64>>(0))?
              .collect::<rusqlite::Result<Vec<_>>>()?;
            touched.extend(contacts.into_iter().flatten());
          }
          let sql = update_sql(*table, selection, values.iter().map(|(c, _)| *c))?;
          let bound = values
            .iter()
            .map(|(_, v)| encode_value(v))
            .collect::<Result<Vec<_>>>()?;
          tx.execute(&sql, params_from_iter(bound))?
        }
      };
      results.push(OperationResult { count });
    }

    let aggregated = reaggregate(&tx, &seeds)?;
    for contact in touched.difference(&aggregated) {
      refresh_contact(&tx, *contact)?;
    }
    tx.commit()?;
    Ok(results)
  }
}

// ─── ContactsStore impl ──────────────────────────────────────────────────────

impl Capabilities for SqliteStore {
  fn can_read(&self) -> bool { self.can_read }

  fn can_write(&self) -> bool { self.can_write }
}

impl ContactsStore for SqliteStore {
  type Error = Error;

  fn query(
    &self,
    query: &TableQuery,
    on_row: &mut dyn FnMut(&Row) -> ControlFlow<()>,
  ) -> Result<()> {
    let sql = select_sql(query)?;
    trace!(
      table = ?query.table,
      selection = query.selection.as_ref().map(|p| p.redacted()),
      "query"
    );
    let conn = self.conn();
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(r) = rows.next()? {
      let mut row = Row::new();
      for (i, column) in query.columns.iter().enumerate() {
        row.insert(*column, decode_value(r.get_ref(i)?));
      }
      if on_row(&row).is_break() {
        break;
      }
    }
    Ok(())
  }

  fn apply_batch(&self, operations: &[Operation]) -> Option<Vec<OperationResult>> {
    if !self.can_write {
      warn!("batch refused: store is read-only");
      return None;
    }
    let mut conn = self.conn();
    match Self::apply(&mut conn, operations) {
      Ok(results) => {
        debug!(operations = operations.len(), "batch applied");
        Some(results)
      }
      Err(e) => {
        warn!(error = %e, "batch rolled back");
        None
      }
    }
  }
}
