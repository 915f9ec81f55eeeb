//! The resolution engine: turns a [`Query`] into a sorted, paged list of
//! fully materialised [`Contact`]s.
//!
//! Sub-queries are issued in a fixed sequence: RawContact scope, group
//! membership scope, Data predicate (with its blank-record probes), Data
//! fetch, Contacts backfill, RawContacts backfill. Each call owns its own
//! [`Accumulator`]; nothing is shared between calls.

use std::{collections::BTreeSet, num::NonZeroUsize, ops::ControlFlow};

use tracing::{debug, trace, warn};

use crate::{
  accumulator::Accumulator,
  config::QueryDefaults,
  entity::{Account, Contact, ContactId},
  error::{Error, Result},
  field::{Column, Field, Table, domain},
  fields,
  include::Include,
  mapper,
  order::{CompoundOrderBy, OrderBy},
  predicate::{Predicate, Where},
  store::{ContactsStore, Row, TableQuery},
};

// ─── Builder ─────────────────────────────────────────────────────────────────

/// A contacts query. Obtained from [`Client::query`](crate::client::Client::query).
///
/// Resolution blocks on store I/O.
pub struct Query<'a, S> {
  store:                  &'a S,
  include_blanks:         bool,
  raw_contacts_where:     Option<Where<domain::RawContacts>>,
  group_membership_where: Option<Where<domain::GroupMembership>>,
  filter:                 Option<Where<domain::Data>>,
  search:                 Option<String>,
  include:                Include<domain::Data>,
  order_by:               CompoundOrderBy<domain::Data>,
  offset:                 usize,
  limit:                  usize,
}

fn and_into<D>(slot: &mut Option<Where<D>>, w: Where<D>) {
  *slot = Some(match slot.take() {
    Some(existing) => existing.and(w),
    None => w,
  });
}

impl<'a, S: ContactsStore> Query<'a, S> {
  pub(crate) fn new(store: &'a S, defaults: QueryDefaults) -> Self {
    Self {
      store,
      include_blanks: defaults.include_blanks,
      raw_contacts_where: None,
      group_membership_where: None,
      filter: None,
      search: None,
      include: Include::all(),
      order_by: CompoundOrderBy::by_contact_id(),
      offset: 0,
      limit: defaults.limit.map_or(usize::MAX, NonZeroUsize::get),
    }
  }

  /// Whether Contacts and RawContacts with no Data rows are returned.
  pub fn include_blanks(mut self, include_blanks: bool) -> Self {
    self.include_blanks = include_blanks;
    self
  }

  /// Restrict to RawContacts from any of `accounts`. An empty list leaves
  /// the query unrestricted.
  pub fn accounts(mut self, accounts: impl IntoIterator<Item = Account>) -> Self {
    use fields::raw_contacts::{ACCOUNT_NAME, ACCOUNT_TYPE};
    let any = Where::any(accounts.into_iter().map(|account| {
      ACCOUNT_NAME.equal_to(account.name) & ACCOUNT_TYPE.equal_to(account.r#type)
    }));
    if let Some(w) = any {
      and_into(&mut self.raw_contacts_where, w);
    }
    self
  }

  pub fn raw_contacts_where(mut self, w: Where<domain::RawContacts>) -> Self {
    and_into(&mut self.raw_contacts_where, w);
    self
  }

  pub fn group_membership_where(
    mut self,
    w: Where<domain::GroupMembership>,
  ) -> Self {
    and_into(&mut self.group_membership_where, w);
    self
  }

  /// AND `w` into the Data predicate.
  pub fn filter(mut self, w: impl Into<Where<domain::Data>>) -> Self {
    and_into(&mut self.filter, w.into());
    self
  }

  /// Match `text` anywhere in any free-text field of any kind. Blank text
  /// clears the search.
  pub fn search(mut self, text: impl Into<String>) -> Self {
    let text = text.into();
    self.search = (!text.trim().is_empty()).then_some(text);
    self
  }

  /// Fetch only `fields` (plus the required columns). No fields means every
  /// field.
  pub fn include(
    mut self,
    fields: impl IntoIterator<Item = Field<domain::Data>>,
  ) -> Self {
    let mut fields = fields.into_iter().peekable();
    self.include = if fields.peek().is_none() {
      Include::all()
    } else {
      Include::new(fields)
    };
    self
  }

  /// Sort keys, first mismatch wins. No keys means ascending Contact id.
  pub fn order_by(
    mut self,
    keys: impl IntoIterator<Item = OrderBy<domain::Data>>,
  ) -> Self {
    let keys = CompoundOrderBy::new(keys);
    self.order_by = if keys.is_empty() {
      CompoundOrderBy::by_contact_id()
    } else {
      keys
    };
    self
  }

  pub fn offset(mut self, offset: usize) -> Self {
    self.offset = offset;
    self
  }

  pub fn limit(mut self, limit: usize) -> Result<Self> {
    if limit == 0 {
      return Err(Error::IllegalArgument("limit must be positive".into()));
    }
    self.limit = limit;
    Ok(self)
  }

  pub fn find(&self) -> Result<Vec<Contact>> { self.find_with_cancel(&|| false) }

  /// Resolve, polling `cancel` between rows and between steps. A cancelled
  /// resolution returns an empty list, never a partial one.
  pub fn find_with_cancel(
    &self,
    cancel: &dyn Fn() -> bool,
  ) -> Result<Vec<Contact>> {
    if !self.store.can_read() {
      debug!("read capability missing; returning no contacts");
      return Ok(Vec::new());
    }
    let resolver = Resolver { store: self.store, cancel };
    Ok(self.resolve(&resolver)?.unwrap_or_default())
  }

  /// The Data predicate: filter AND search.
  fn data_predicate(&self) -> Option<Predicate> {
    let search = self.search.as_deref().and_then(|text| {
      Where::any(fields::for_matching().into_iter().map(|f| f.contains(text)))
    });
    Where::all(self.filter.clone().into_iter().chain(search))
      .map(Where::into_predicate)
  }

  /// `None` means cancelled.
  fn resolve(&self, r: &Resolver<'_, S>) -> Result<Option<Vec<Contact>>> {
    use Outcome::Cancelled;
    if (r.cancel)() {
      return Ok(None);
    }

    // Scope: Contacts reachable through matching RawContacts.
    let mut scope: Option<BTreeSet<ContactId>> = None;
    if let Some(w) = &self.raw_contacts_where {
      let column = fields::raw_contacts::CONTACT_ID;
      let selection = w
        .predicate()
        .clone()
        .and(column.is_not_null().into_predicate());
      let query = TableQuery::new(Table::RawContacts, [column.name()])
        .selection(Some(selection));
      let Some(ids) = r.contact_ids(&query, column.name(), OnFailure::Propagate)?
      else {
        return Ok(None);
      };
      if ids.is_empty() {
        return Ok(Some(Vec::new()));
      }
      scope = Some(ids);
    }

    // Scope: Contacts with a matching group membership.
    if let Some(w) = &self.group_membership_where {
      let selection = with_scope(w.predicate().clone(), &scope);
      let Some(ids) = r.data_contact_ids(selection)? else {
        return Ok(None);
      };
      if ids.is_empty() {
        return Ok(Some(Vec::new()));
      }
      scope = Some(ids);
    }

    // The Data predicate, reduced to something a single row can satisfy.
    let contact_ids = match self.data_predicate() {
      None => scope,
      Some(predicate) => {
        let Some(reduced) = r.reduce(with_scope(predicate.clone(), &scope))?
        else {
          return Ok(None);
        };
        let Some(mut ids) = r.data_contact_ids(reduced)? else {
          return Ok(None);
        };
        if self.include_blanks {
          let Some(blank) = self.blank_contact_ids(r, &predicate, &scope)?
          else {
            return Ok(None);
          };
          ids.extend(blank);
        }
        Some(ids)
      }
    };
    if contact_ids.as_ref().is_some_and(BTreeSet::is_empty) {
      return Ok(Some(Vec::new()));
    }
    let in_contacts = |column: Column| -> Option<Predicate> {
      contact_ids
        .as_ref()
        .map(|ids| Predicate::is_in(column, ids.iter().copied()))
    };

    let mut acc = Accumulator::new(self.include.kinds().clone());

    let query = TableQuery::new(Table::Data, self.include.columns())
      .selection(in_contacts(fields::CONTACT_ID.column()))
      .sort_order(fields::contact::ID.asc().case_sensitive().to_sql());
    let outcome = r.run(&query, OnFailure::Propagate, &mut |row| {
      if let Some(row) = mapper::data_row(row)? {
        acc.add_data_row(row);
      }
      Ok(())
    })?;
    if outcome == Cancelled {
      return Ok(None);
    }

    if self.include_blanks {
      let columns = self.include.for_contacts_table();
      let query = TableQuery::new(Table::Contacts, columns.columns())
        .selection(in_contacts(fields::contacts::ID.column()));
      let outcome = r.run(&query, OnFailure::Propagate, &mut |row| {
        let (id, columns) = mapper::contact_row(row)?;
        acc.add_contact(id, columns);
        Ok(())
      })?;
      if outcome == Cancelled {
        return Ok(None);
      }

      let columns = self.include.for_raw_contacts_table();
      let parent = fields::raw_contacts::CONTACT_ID;
      let not_null = parent.is_not_null().into_predicate();
      let selection = match in_contacts(parent.column()) {
        Some(ids) => not_null.and(ids),
        None => not_null,
      };
      let query = TableQuery::new(Table::RawContacts, columns.columns())
        .selection(Some(selection));
      let outcome = r.run(&query, OnFailure::Propagate, &mut |row| {
        if let Some(raw) = mapper::raw_contact_row(row)? {
          acc.add_raw_contact(raw);
        }
        Ok(())
      })?;
      if outcome == Cancelled {
        return Ok(None);
      }
    }

    debug!(contacts = acc.len(), "accumulated");
    let Some(mut contacts) = acc.finish(r.cancel) else {
      return Ok(None);
    };
    self.order_by.sort(&mut contacts);
    let page: Vec<Contact> =
      contacts.into_iter().skip(self.offset).take(self.limit).collect();
    if (r.cancel)() {
      return Ok(None);
    }
    Ok(Some(page))
  }

  /// Contacts matched by `predicate` through their Contacts or RawContacts
  /// rows alone. These probes may name columns absent from those tables,
  /// so store failures count as no match.
  fn blank_contact_ids(
    &self,
    r: &Resolver<'_, S>,
    predicate: &Predicate,
    scope: &Option<BTreeSet<ContactId>>,
  ) -> Result<Option<BTreeSet<ContactId>>> {
    let mut ids = BTreeSet::new();

    if let Some(translated) = predicate.translate(Table::RawContacts) {
      let column = fields::raw_contacts::CONTACT_ID;
      let mut selection =
        translated.and(column.is_not_null().into_predicate());
      if let Some(scope) = scope {
        selection =
          selection.and(Predicate::is_in(column.column(), scope.iter().copied()));
      }
      let query = TableQuery::new(Table::RawContacts, [column.name()])
        .selection(Some(selection));
      match r.contact_ids(&query, column.name(), OnFailure::Suppress)? {
        Some(found) => ids.extend(found),
        None => return Ok(None),
      }
    }

    if let Some(translated) = predicate.translate(Table::Contacts) {
      let column = fields::contacts::ID;
      let selection = match scope {
        Some(scope) => translated
          .and(Predicate::is_in(column.column(), scope.iter().copied())),
        None => translated,
      };
      let query = TableQuery::new(Table::Contacts, [column.name()])
        .selection(Some(selection));
      match r.contact_ids(&query, column.name(), OnFailure::Suppress)? {
        Some(found) => ids.extend(found),
        None => return Ok(None),
      }
    }

    Ok(Some(ids))
  }
}

fn with_scope(
  predicate: Predicate,
  scope: &Option<BTreeSet<ContactId>>,
) -> Predicate {
  match scope {
    Some(ids) => predicate
      .and(Predicate::is_in(fields::CONTACT_ID.column(), ids.iter().copied())),
    None => predicate,
  }
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// What to do when the store rejects a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnFailure {
  Propagate,
  /// Log and treat as "no rows".
  Suppress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
  Completed,
  /// The store failed and the failure was suppressed.
  Suppressed,
  Cancelled,
}

struct Resolver<'r, S> {
  store:  &'r S,
  cancel: &'r dyn Fn() -> bool,
}

impl<S: ContactsStore> Resolver<'_, S> {
  /// Run one table query. Every store failure on the resolution path goes
  /// through here, and only here is one ever suppressed.
  fn run(
    &self,
    query: &TableQuery,
    on_failure: OnFailure,
    on_row: &mut dyn FnMut(&Row) -> Result<()>,
  ) -> Result<Outcome> {
    debug!(
      table = ?query.table,
      selection = %query.selection.as_ref().map(Predicate::redacted).unwrap_or_default(),
      "querying"
    );
    if (self.cancel)() {
      return Ok(Outcome::Cancelled);
    }

    let mut cancelled = false;
    let mut decode_error = None;
    let result = self.store.query(query, &mut |row| {
      if (self.cancel)() {
        cancelled = true;
        return ControlFlow::Break(());
      }
      trace!(table = ?query.table, "row");
      match on_row(row) {
        Ok(()) => ControlFlow::Continue(()),
        Err(e) => {
          decode_error = Some(e);
          ControlFlow::Break(())
        }
      }
    });

    if cancelled {
      debug!(table = ?query.table, "cancelled");
      return Ok(Outcome::Cancelled);
    }
    if let Some(e) = decode_error {
      return Err(e);
    }
    match (result, on_failure) {
      (Ok(()), _) => Ok(Outcome::Completed),
      (Err(e), OnFailure::Suppress) => {
        warn!(table = ?query.table, error = %e, "store query failed; treating as no match");
        Ok(Outcome::Suppressed)
      }
      (Err(e), OnFailure::Propagate) => Err(Error::store(e)),
    }
  }

  /// Distinct Contact ids in `column` of every row `query` returns. `None`
  /// means cancelled.
  fn contact_ids(
    &self,
    query: &TableQuery,
    column: &'static str,
    on_failure: OnFailure,
  ) -> Result<Option<BTreeSet<ContactId>>> {
    let mut ids = BTreeSet::new();
    let outcome = self.run(query, on_failure, &mut |row| {
      ids.extend(row.get(column).as_i64().map(ContactId));
      Ok(())
    })?;
    Ok(match outcome {
      Outcome::Completed => Some(ids),
      Outcome::Suppressed => Some(BTreeSet::new()),
      Outcome::Cancelled => None,
    })
  }

  fn data_contact_ids(
    &self,
    selection: Predicate,
  ) -> Result<Option<BTreeSet<ContactId>>> {
    let column = fields::CONTACT_ID.name();
    let query = TableQuery::new(Table::Data, [column]).selection(Some(selection));
    self.contact_ids(&query, column, OnFailure::Propagate)
  }

  /// Rewrite every `AND` that a single Data row cannot satisfy: both sides
  /// name kinds, and together more than one. Two sides over the same single
  /// kind stay as they are.
  ///
  /// Post-order: children first. The side with fewer kinds is resolved
  /// alone to Contact ids and replaced by `contact_id IN (ids)`. On a tie
  /// the side already carrying such a leaf is reduced, else the left.
  /// `None` means cancelled.
  fn reduce(&self, predicate: Predicate) -> Result<Option<Predicate>> {
    match predicate {
      leaf @ Predicate::Leaf { .. } => Ok(Some(leaf)),
      Predicate::Or(lhs, rhs) => {
        let Some(lhs) = self.reduce(*lhs)? else { return Ok(None) };
        let Some(rhs) = self.reduce(*rhs)? else { return Ok(None) };
        Ok(Some(lhs.or(rhs)))
      }
      Predicate::And(lhs, rhs) => {
        let Some(lhs) = self.reduce(*lhs)? else { return Ok(None) };
        let Some(rhs) = self.reduce(*rhs)? else { return Ok(None) };
        let (left_kinds, right_kinds) = (lhs.kinds(), rhs.kinds());
        if left_kinds.is_empty()
          || right_kinds.is_empty()
          || (left_kinds == right_kinds && left_kinds.len() == 1)
        {
          return Ok(Some(lhs.and(rhs)));
        }

        let reduce_left = match left_kinds.len().cmp(&right_kinds.len()) {
          std::cmp::Ordering::Less => true,
          std::cmp::Ordering::Greater => false,
          std::cmp::Ordering::Equal => {
            lhs.has_contact_id_membership() || !rhs.has_contact_id_membership()
          }
        };
        let (side, kept) = if reduce_left { (lhs, rhs) } else { (rhs, lhs) };
        debug!(
          reduced = %side.redacted(),
          kept = %kept.redacted(),
          "reducing cross-kind AND"
        );
        let Some(ids) = self.data_contact_ids(side)? else {
          return Ok(None);
        };
        let leaf = Predicate::is_in(fields::CONTACT_ID.column(), ids);
        Ok(Some(if reduce_left { leaf.and(kept) } else { kept.and(leaf) }))
      }
    }
  }
}
