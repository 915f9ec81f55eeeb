//! RawContact aggregation: deciding which RawContacts make up one Contact.
//!
//! The store has no fuzzy matching. A RawContact stays with the RawContacts
//! it already shares a Contact with, joins every RawContact it has a
//! keep-together exception with, and is never merged across a
//! keep-separate exception. Aggregation reruns inside the transaction of
//! every batch that touches exceptions, and whenever a fixture RawContact
//! is created.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use chrono::Utc;
use rolodex_core::{
  Kind,
  entity::{DisplayNameSource, ExceptionType},
};
use rusqlite::{Connection, OptionalExtension as _, params};
use tracing::debug;

// ─── Union-find ──────────────────────────────────────────────────────────────

/// Union-find over RawContact ids with union by rank and path halving.
#[derive(Debug, Default)]
struct Components {
  parent: HashMap<i64, i64>,
  rank:   HashMap<i64, u32>,
}

impl Components {
  fn add(&mut self, id: i64) {
    self.parent.entry(id).or_insert(id);
    self.rank.entry(id).or_insert(0);
  }

  fn find(&mut self, id: i64) -> i64 {
    let mut current = id;
    while let Some(&parent) = self.parent.get(&current) {
      if parent == current {
        break;
      }
      let grandparent = self.parent.get(&parent).copied().unwrap_or(parent);
      self.parent.insert(current, grandparent);
      current = grandparent;
    }
    current
  }

  fn union(&mut self, a: i64, b: i64) {
    let (ra, rb) = (self.find(a), self.find(b));
    if ra == rb {
      return;
    }
    let rank_a = self.rank.get(&ra).copied().unwrap_or(0);
    let rank_b = self.rank.get(&rb).copied().unwrap_or(0);
    match rank_a.cmp(&rank_b) {
      std::cmp::Ordering::Less => {
        self.parent.insert(ra, rb);
      }
      std::cmp::Ordering::Greater => {
        self.parent.insert(rb, ra);
      }
      std::cmp::Ordering::Equal => {
        self.parent.insert(rb, ra);
        self.rank.insert(ra, rank_a + 1);
      }
    }
  }

  /// Members grouped by root, each group sorted, groups ordered by their
  /// smallest member.
  fn groups(&mut self) -> Vec<Vec<i64>> {
    let ids: Vec<i64> = self.parent.keys().copied().collect();
    let mut by_root: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for id in ids {
      let root = self.find(id);
      by_root.entry(root).or_default().push(id);
    }
    let mut groups: Vec<Vec<i64>> = by_root
      .into_values()
      .map(|mut g| {
        g.sort_unstable();
        g
      })
      .collect();
    groups.sort_by_key(|g| g[0]);
    groups
  }
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

type Pair = (i64, i64);

fn pair(a: i64, b: i64) -> Pair { (a.min(b), a.max(b)) }

fn exceptions(conn: &Connection) -> rusqlite::Result<BTreeMap<Pair, i64>> {
  let mut stmt = conn.prepare(
    "SELECT raw_contact_id1, raw_contact_id2, type FROM aggregation_exceptions",
  )?;
  let rows = stmt.query_map([], |r| {
    Ok((pair(r.get(0)?, r.get(1)?), r.get::<_, i64>(2)?))
  })?;
  rows.collect()
}

/// Current `raw contact → contact` assignment for every RawContact.
fn assignments(conn: &Connection) -> rusqlite::Result<BTreeMap<i64, Option<i64>>> {
  let mut stmt = conn.prepare("SELECT _id, contact_id FROM raw_contacts")?;
  let rows = stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?;
  rows.collect()
}

/// Re-aggregate every RawContact reachable from `seeds`, then refresh the
/// derived columns of each Contact involved. Returns the Contacts that
/// survive.
pub fn reaggregate(
  conn: &Connection,
  seeds: &BTreeSet<i64>,
) -> rusqlite::Result<BTreeSet<i64>> {
  let exceptions = exceptions(conn)?;
  let assigned = assignments(conn)?;
  let contact_of = |id: &i64| assigned.get(id).copied().flatten();
  let together = ExceptionType::KeepTogether.code();
  let separate = ExceptionType::KeepSeparate.code();

  // Closure over shared Contacts and keep-together edges.
  let mut affected: BTreeSet<i64> = BTreeSet::new();
  let mut queue: VecDeque<i64> =
    seeds.iter().copied().filter(|id| assigned.contains_key(id)).collect();
  while let Some(id) = queue.pop_front() {
    if !affected.insert(id) {
      continue;
    }
    let contact = contact_of(&id);
    for (&other, &other_contact) in &assigned {
      if contact.is_some() && other_contact == contact {
        queue.push_back(other);
      }
    }
    for (&(a, b), &kind) in &exceptions {
      if kind != together {
        continue;
      }
      let other = if a == id { b } else if b == id { a } else { continue };
      if assigned.contains_key(&other) {
        queue.push_back(other);
      }
    }
  }
  if affected.is_empty() {
    return Ok(BTreeSet::new());
  }

  let mut components = Components::default();
  for &id in &affected {
    components.add(id);
  }
  for (&(a, b), &kind) in &exceptions {
    if kind == together && affected.contains(&a) && affected.contains(&b) {
      components.union(a, b);
    }
  }

  // Shared Contacts keep RawContacts together unless any member of one
  // side is kept separate from any member of the other.
  let ids: Vec<i64> = affected.iter().copied().collect();
  for (i, &a) in ids.iter().enumerate() {
    for &b in &ids[i + 1..] {
      let (ca, cb) = (contact_of(&a), contact_of(&b));
      if ca.is_none() || ca != cb || components.find(a) == components.find(b) {
        continue;
      }
      let roots: &Vec<(i64, i64)> =
        &ids.iter().map(|&x| (x, components.find(x))).collect();
      let (ra, rb) = (components.find(a), components.find(b));
      let side = move |root: i64| {
        roots.iter().filter(move |(_, r)| *r == root).map(|(x, _)| *x)
      };
      let blocked = side(ra).any(|x| {
        side(rb).any(|y| exceptions.get(&pair(x, y)) == Some(&separate))
      });
      if !blocked {
        components.union(a, b);
      }
    }
  }

  let previous: BTreeSet<i64> =
    affected.iter().filter_map(contact_of).collect();
  let mut claimed: BTreeSet<i64> = BTreeSet::new();
  for group in components.groups() {
    let reusable = group
      .iter()
      .filter_map(contact_of)
      .filter(|c| !claimed.contains(c))
      .min();
    let contact = match reusable {
      Some(c) => c,
      None => {
        conn.execute("INSERT INTO contacts DEFAULT VALUES", [])?;
        conn.last_insert_rowid()
      }
    };
    claimed.insert(contact);
    for id in &group {
      conn.execute(
        "UPDATE raw_contacts SET contact_id = ?1 WHERE _id = ?2",
        params![contact, id],
      )?;
    }
    debug!(contact, raw_contacts = ?group, "aggregated");
  }

  for orphan in previous.difference(&claimed) {
    conn.execute("DELETE FROM contacts WHERE _id = ?1", params![orphan])?;
  }
  for &contact in &claimed {
    refresh_contact(conn, contact)?;
  }
  Ok(claimed)
}

// ─── Derived columns ─────────────────────────────────────────────────────────

/// The data kinds a display name may come from, strongest first.
const NAME_SOURCES: [(Kind, DisplayNameSource); 4] = [
  (Kind::Name, DisplayNameSource::StructuredName),
  (Kind::Organization, DisplayNameSource::Organization),
  (Kind::Phone, DisplayNameSource::Phone),
  (Kind::Email, DisplayNameSource::Email),
];

struct NameCandidate {
  raw_contact_id: i64,
  primary:        String,
  alt:            String,
}

fn name_candidate(
  conn: &Connection,
  contact: i64,
  kind: Kind,
  super_primary_only: bool,
) -> rusqlite::Result<Option<NameCandidate>> {
  let sql = format!(
    "SELECT raw_contact_id, data1, data2, data3 FROM data_view \
     WHERE contact_id = ?1 AND mimetype = ?2 AND data1 IS NOT NULL {} \
     ORDER BY raw_contact_id, _id LIMIT 1",
    if super_primary_only { "AND is_super_primary = 1" } else { "" },
  );
  conn
    .query_row(&sql, params![contact, kind.tag()], |r| {
      let primary: String = r.get(1)?;
      // Names also carry given (data2) and family (data3) parts.
      let given: Option<String> = r.get(2).ok().flatten();
      let family: Option<String> = r.get(3).ok().flatten();
      let alt = match (kind, given, family) {
        (Kind::Name, Some(given), Some(family)) => format!("{family}, {given}"),
        _ => primary.clone(),
      };
      Ok(NameCandidate { raw_contact_id: r.get(0)?, primary, alt })
    })
    .optional()
}

/// Recompute display names, the lookup key and the update timestamp.
pub fn refresh_contact(conn: &Connection, contact: i64) -> rusqlite::Result<()> {
  let mut chosen = name_candidate(conn, contact, Kind::Name, true)?
    .map(|c| (c, DisplayNameSource::StructuredName));
  if chosen.is_none() {
    for (kind, source) in NAME_SOURCES {
      if let Some(candidate) = name_candidate(conn, contact, kind, false)? {
        chosen = Some((candidate, source));
        break;
      }
    }
  }

  let lookup = {
    let mut stmt = conn
      .prepare("SELECT _id FROM raw_contacts WHERE contact_id = ?1 ORDER BY _id")?;
    let ids = stmt
      .query_map(params![contact], |r| r.get::<_, i64>(0))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    ids.iter().map(|id| format!("r{id}")).collect::<Vec<_>>().join(".")
  };

  let (name_raw, primary, alt, source) = match chosen {
    Some((c, source)) => {
      (Some(c.raw_contact_id), Some(c.primary), Some(c.alt), source)
    }
    None => (None, None, None, DisplayNameSource::Undefined),
  };
  conn.execute(
    "UPDATE contacts SET lookup = ?1, display_name = ?2, display_name_alt = ?3, \
     display_name_source = ?4, name_raw_contact_id = ?5, \
     contact_last_updated_timestamp = ?6 WHERE _id = ?7",
    params![
      lookup,
      primary,
      alt,
      source.code(),
      name_raw,
      Utc::now().timestamp_millis(),
      contact
    ],
  )?;
  Ok(())
}
