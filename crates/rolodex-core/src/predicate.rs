//! The predicate algebra: `WHERE` trees over typed fields.
//!
//! A [`Where<D>`] is a thin typed wrapper around an untyped [`Predicate`]
//! tree. The domain parameter keeps predicates for different tables apart at
//! compile time; the untyped tree is what crosses the store boundary.

use std::{
  collections::BTreeSet,
  fmt,
  marker::PhantomData,
  ops::{BitAnd, BitOr},
};

use crate::{
  error::{Error, Result},
  field::{Column, Field, FieldSet, Table, domain},
  fields,
  kind::Kind,
  value::Value,
};

// ─── Operators ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
  Equal,
  NotEqual,
  GreaterThan,
  GreaterThanOrEqual,
  LessThan,
  LessThanOrEqual,
  In,
  NotIn,
  Like,
  NotLike,
  /// Only reachable through [`Field::is_not_null`].
  IsNot,
}

impl Operator {
  pub fn as_sql(self) -> &'static str {
    match self {
      Self::Equal => "=",
      Self::NotEqual => "!=",
      Self::GreaterThan => ">",
      Self::GreaterThanOrEqual => ">=",
      Self::LessThan => "<",
      Self::LessThanOrEqual => "<=",
      Self::In => "IN",
      Self::NotIn => "NOT IN",
      Self::Like => "LIKE",
      Self::NotLike => "NOT LIKE",
      Self::IsNot => "IS NOT",
    }
  }

  /// Check that `value` is a legal right hand side for this operator.
  fn check(self, value: &Value) -> Result<()> {
    let ok = match self {
      Self::In | Self::NotIn => matches!(value, Value::List(_)),
      Self::IsNot => value.is_null(),
      Self::Like | Self::NotLike => matches!(value, Value::Text(_)),
      Self::Equal
      | Self::NotEqual
      | Self::GreaterThan
      | Self::GreaterThanOrEqual
      | Self::LessThan
      | Self::LessThanOrEqual => {
        !value.is_null() && !matches!(value, Value::List(_))
      }
    };
    if ok {
      Ok(())
    } else {
      Err(Error::InvalidPredicateShape(format!(
        "operator {} cannot take {value:?}",
        self.as_sql()
      )))
    }
  }
}

// ─── Untyped tree ────────────────────────────────────────────────────────────

/// The untyped predicate tree handed to a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
  Leaf {
    column: Column,
    op:     Operator,
    value:  Value,
    /// Render `ESCAPE '\'` after a pattern literal.
    escape: bool,
  },
  And(Box<Predicate>, Box<Predicate>),
  Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
  pub fn and(self, other: Predicate) -> Self {
    Self::And(Box::new(self), Box::new(other))
  }

  pub fn or(self, other: Predicate) -> Self {
    Self::Or(Box::new(self), Box::new(other))
  }

  /// `column IN (values...)`.
  pub fn is_in(
    column: Column,
    values: impl IntoIterator<Item = impl Into<Value>>,
  ) -> Self {
    Self::Leaf {
      column,
      op: Operator::In,
      value: Value::List(values.into_iter().map(Into::into).collect()),
      escape: false,
    }
  }

  /// Render as an SQL boolean expression.
  pub fn to_sql(&self) -> Result<String> { self.render(false) }

  /// Render with every literal replaced by `'*'`. Shape errors are rendered
  /// inline since this is only meant for logs.
  pub fn redacted(&self) -> String {
    self.render(true).unwrap_or_else(|e| format!("<{e}>"))
  }

  fn render(&self, redact: bool) -> Result<String> {
    match self {
      Self::Leaf { column, op, value, escape } => {
        op.check(value)?;
        let mut sql =
          format!("{column} {} {}", op.as_sql(), value.to_sql_literal(redact));
        if *escape {
          sql.push_str(" ESCAPE '\\'");
        }
        // A per-kind leaf is never trusted on its own: the generic column
        // means something else on rows of every other kind.
        if let Some(kind) = column.kind {
          sql.push_str(&format!(
            " AND {} = {}",
            fields::KIND.name(),
            Value::from(kind).to_sql_literal(false)
          ));
        }
        Ok(sql)
      }
      Self::And(lhs, rhs) => Ok(format!(
        "({}) AND ({})",
        lhs.render(redact)?,
        rhs.render(redact)?
      )),
      Self::Or(lhs, rhs) => Ok(format!(
        "({}) OR ({})",
        lhs.render(redact)?,
        rhs.render(redact)?
      )),
    }
  }

  /// Distinct kind tags referenced anywhere in the tree.
  pub fn kinds(&self) -> BTreeSet<Kind> {
    let mut kinds = BTreeSet::new();
    self.visit_leaves(&mut |column, _| kinds.extend(column.kind));
    kinds
  }

  /// Whether the tree already carries a `contact_id IN (...)` leaf.
  pub fn has_contact_id_membership(&self) -> bool {
    let mut found = false;
    self.visit_leaves(&mut |column, op| {
      found |= *column == fields::CONTACT_ID.column() && op == Operator::In;
    });
    found
  }

  fn visit_leaves(&self, f: &mut dyn FnMut(&Column, Operator)) {
    match self {
      Self::Leaf { column, op, .. } => f(column, *op),
      Self::And(lhs, rhs) | Self::Or(lhs, rhs) => {
        lhs.visit_leaves(f);
        rhs.visit_leaves(f);
      }
    }
  }

  /// Rewrite every leaf's column, or give up when `f` returns `None`.
  fn map_columns(&self, f: &impl Fn(Column) -> Option<Column>) -> Option<Self> {
    Some(match self {
      Self::Leaf { column, op, value, escape } => Self::Leaf {
        column: f(*column)?,
        op:     *op,
        value:  value.clone(),
        escape: *escape,
      },
      Self::And(lhs, rhs) => Self::And(
        Box::new(lhs.map_columns(f)?),
        Box::new(rhs.map_columns(f)?),
      ),
      Self::Or(lhs, rhs) => Self::Or(
        Box::new(lhs.map_columns(f)?),
        Box::new(rhs.map_columns(f)?),
      ),
    })
  }

  /// Translate a Data-view predicate onto the RawContacts or Contacts table
  /// by substituting the id columns.
  ///
  /// Returns `None` when the tree references a column with no counterpart
  /// in `table`, such as the Data row id. Every other column is passed
  /// through unchanged; the store may reject it.
  pub(crate) fn translate(&self, table: Table) -> Option<Self> {
    let data_id = fields::DATA_ID.column();
    let raw_contact_id = fields::RAW_CONTACT_ID.column();
    let contact_id = fields::CONTACT_ID.column();
    match table {
      Table::Data => Some(self.clone()),
      Table::RawContacts => self.map_columns(&|column| {
        if column == data_id {
          None
        } else if column == raw_contact_id {
          Some(fields::raw_contacts::ID.column())
        } else if column == contact_id {
          Some(fields::raw_contacts::CONTACT_ID.column())
        } else {
          Some(column)
        }
      }),
      Table::Contacts => self.map_columns(&|column| {
        if column == data_id || column == raw_contact_id {
          None
        } else if column == contact_id {
          Some(fields::contacts::ID.column())
        } else {
          Some(column)
        }
      }),
      Table::AggregationExceptions => None,
    }
  }
}

// ─── Typed wrapper ───────────────────────────────────────────────────────────

/// A predicate over fields of domain `D`.
pub struct Where<D> {
  node:    Predicate,
  _domain: PhantomData<fn() -> D>,
}

impl<D> Where<D> {
  fn from_node(node: Predicate) -> Self { Self { node, _domain: PhantomData } }

  /// Raw leaf constructor. Operator/value mismatches are reported as
  /// [`Error::InvalidPredicateShape`] when the tree is rendered.
  pub fn compare(field: Field<D>, op: Operator, value: impl Into<Value>) -> Self {
    Self::leaf(field, op, value.into(), false)
  }

  fn leaf(field: Field<D>, op: Operator, value: Value, escape: bool) -> Self {
    Self::from_node(Predicate::Leaf { column: field.column(), op, value, escape })
  }

  pub fn and(self, other: impl Into<Where<D>>) -> Self {
    Self::from_node(self.node.and(other.into().node))
  }

  pub fn or(self, other: impl Into<Where<D>>) -> Self {
    Self::from_node(self.node.or(other.into().node))
  }

  /// AND-fold; `None` when `wheres` is empty.
  pub fn all(wheres: impl IntoIterator<Item = Where<D>>) -> Option<Self> {
    wheres.into_iter().reduce(Self::and)
  }

  /// OR-fold; `None` when `wheres` is empty.
  pub fn any(wheres: impl IntoIterator<Item = Where<D>>) -> Option<Self> {
    wheres.into_iter().reduce(Self::or)
  }

  pub fn predicate(&self) -> &Predicate { &self.node }

  pub fn into_predicate(self) -> Predicate { self.node }

  pub fn kinds(&self) -> BTreeSet<Kind> { self.node.kinds() }

  pub fn to_sql(&self) -> Result<String> { self.node.to_sql() }

  pub fn redacted(&self) -> String { self.node.redacted() }
}

impl From<Where<domain::GroupMembership>> for Where<domain::Data> {
  fn from(w: Where<domain::GroupMembership>) -> Self { Self::from_node(w.node) }
}

impl<D> Clone for Where<D> {
  fn clone(&self) -> Self { Self::from_node(self.node.clone()) }
}

impl<D> PartialEq for Where<D> {
  fn eq(&self, other: &Self) -> bool { self.node == other.node }
}

impl<D> fmt::Debug for Where<D> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("Where").field(&self.node).finish()
  }
}

impl<D> fmt::Display for Where<D> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.redacted())
  }
}

impl<D, R: Into<Where<D>>> BitAnd<R> for Where<D> {
  type Output = Where<D>;

  fn bitand(self, rhs: R) -> Where<D> { self.and(rhs) }
}

impl<D, R: Into<Where<D>>> BitOr<R> for Where<D> {
  type Output = Where<D>;

  fn bitor(self, rhs: R) -> Where<D> { self.or(rhs) }
}

// ─── Builders ────────────────────────────────────────────────────────────────

/// Escape the `LIKE` wildcards in user input.
fn escape_like(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    if matches!(c, '\\' | '%' | '_') {
      out.push('\\');
    }
    out.push(c);
  }
  out
}

impl<D> Field<D> {
  pub fn equal_to(self, value: impl Into<Value>) -> Where<D> {
    Where::compare(self, Operator::Equal, value)
  }

  pub fn not_equal_to(self, value: impl Into<Value>) -> Where<D> {
    Where::compare(self, Operator::NotEqual, value)
  }

  pub fn greater_than(self, value: impl Into<Value>) -> Where<D> {
    Where::compare(self, Operator::GreaterThan, value)
  }

  pub fn greater_than_or_equal(self, value: impl Into<Value>) -> Where<D> {
    Where::compare(self, Operator::GreaterThanOrEqual, value)
  }

  pub fn less_than(self, value: impl Into<Value>) -> Where<D> {
    Where::compare(self, Operator::LessThan, value)
  }

  pub fn less_than_or_equal(self, value: impl Into<Value>) -> Where<D> {
    Where::compare(self, Operator::LessThanOrEqual, value)
  }

  pub fn is_in<V: Into<Value>>(
    self,
    values: impl IntoIterator<Item = V>,
  ) -> Where<D> {
    let list = Value::List(values.into_iter().map(Into::into).collect());
    Where::compare(self, Operator::In, list)
  }

  pub fn not_in<V: Into<Value>>(
    self,
    values: impl IntoIterator<Item = V>,
  ) -> Where<D> {
    let list = Value::List(values.into_iter().map(Into::into).collect());
    Where::compare(self, Operator::NotIn, list)
  }

  /// Case-insensitive equality, rendered as a `LIKE` against the escaped
  /// string. The store's `NOCASE` collation only folds ASCII.
  pub fn equal_to_ignore_case(self, value: &str) -> Where<D> {
    self.pattern(Operator::Like, escape_like(value))
  }

  pub fn not_equal_to_ignore_case(self, value: &str) -> Where<D> {
    self.pattern(Operator::NotLike, escape_like(value))
  }

  pub fn starts_with(self, value: &str) -> Where<D> {
    self.pattern(Operator::Like, format!("{}%", escape_like(value)))
  }

  pub fn ends_with(self, value: &str) -> Where<D> {
    self.pattern(Operator::Like, format!("%{}", escape_like(value)))
  }

  pub fn contains(self, value: &str) -> Where<D> {
    self.pattern(Operator::Like, format!("%{}%", escape_like(value)))
  }

  pub fn does_not_start_with(self, value: &str) -> Where<D> {
    self.pattern(Operator::NotLike, format!("{}%", escape_like(value)))
  }

  pub fn does_not_end_with(self, value: &str) -> Where<D> {
    self.pattern(Operator::NotLike, format!("%{}", escape_like(value)))
  }

  pub fn does_not_contain(self, value: &str) -> Where<D> {
    self.pattern(Operator::NotLike, format!("%{}%", escape_like(value)))
  }

  /// `LIKE` with a caller-authored pattern; wildcards are not escaped.
  pub fn like(self, pattern: &str) -> Where<D> {
    Where::compare(self, Operator::Like, pattern)
  }

  pub fn not_like(self, pattern: &str) -> Where<D> {
    Where::compare(self, Operator::NotLike, pattern)
  }

  pub fn is_not_null(self) -> Where<D> {
    Where::compare(self, Operator::IsNot, Value::Null)
  }

  fn pattern(self, op: Operator, pattern: String) -> Where<D> {
    Where::leaf(self, op, Value::Text(pattern), true)
  }
}

impl<D: 'static> FieldSet<D> {
  /// OR together `f(field)` over every field of the set.
  pub fn where_any(&self, f: impl Fn(Field<D>) -> Where<D>) -> Option<Where<D>> {
    Where::any(self.all.iter().copied().map(f))
  }

  /// AND together `f(field)` over every field of the set.
  pub fn where_all(&self, f: impl Fn(Field<D>) -> Where<D>) -> Option<Where<D>> {
    Where::all(self.all.iter().copied().map(f))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fields::{contact, email, group_membership, name, phone};

  #[test]
  fn per_kind_leaf_carries_kind_check() {
    let sql = name::GIVEN_NAME.equal_to("Ann").to_sql().unwrap();
    assert_eq!(
      sql,
      "data2 = 'Ann' AND mimetype = 'vnd.android.cursor.item/name'"
    );
  }

  #[test]
  fn contact_level_leaf_has_no_kind_check() {
    let sql = contact::DISPLAY_NAME_PRIMARY.equal_to("Ann").to_sql().unwrap();
    assert_eq!(sql, "display_name = 'Ann'");
  }

  #[test]
  fn combinators_parenthesise_both_sides() {
    let w = name::GIVEN_NAME.equal_to("Ann") & phone::NUMBER.equal_to("555");
    let sql = w.to_sql().unwrap();
    assert!(sql.starts_with("(data2 = 'Ann' AND mimetype"));
    assert!(sql.contains(") AND (data1 = '555' AND mimetype"));
  }

  #[test]
  fn patterns_escape_wildcards() {
    let sql = email::ADDRESS.contains("50%_off").to_sql().unwrap();
    assert!(sql.starts_with(r"data1 LIKE '%50\%\_off%' ESCAPE '\'"));
  }

  #[test]
  fn raw_like_is_not_escaped() {
    let sql = email::ADDRESS.like("a%").to_sql().unwrap();
    assert!(sql.starts_with("data1 LIKE 'a%' AND"));
  }

  #[test]
  fn quotes_are_doubled() {
    let sql = name::FAMILY_NAME.equal_to("O'Hara").to_sql().unwrap();
    assert!(sql.starts_with("data3 = 'O''Hara'"));
  }

  #[test]
  fn in_with_scalar_is_invalid_shape() {
    let w = Where::compare(fields::CONTACT_ID, Operator::In, 3);
    assert!(matches!(w.to_sql(), Err(Error::InvalidPredicateShape(_))));
  }

  #[test]
  fn redaction_hides_every_literal() {
    let w = name::GIVEN_NAME.equal_to("Ann")
      | fields::CONTACT_ID.is_in([1_i64, 2]);
    let redacted = w.redacted();
    assert!(!redacted.contains("Ann"));
    assert!(redacted.contains("IN ('*', '*')"));
    assert!(redacted.contains("mimetype = 'vnd.android.cursor.item/name'"));
  }

  #[test]
  fn kinds_are_collected_from_every_leaf() {
    let w = name::GIVEN_NAME.equal_to("Ann")
      & (phone::NUMBER.equal_to("1") | email::ADDRESS.is_not_null())
      & contact::STARRED.equal_to(true);
    let kinds: Vec<_> = w.kinds().into_iter().collect();
    assert_eq!(kinds, vec![Kind::Email, Kind::Name, Kind::Phone]);
  }

  #[test]
  fn group_membership_widens_into_data() {
    let gm = group_membership::GROUP_ID.equal_to(7);
    let data: Where<domain::Data> = gm.into();
    assert_eq!(data.kinds().into_iter().collect::<Vec<_>>(), vec![
      Kind::GroupMembership
    ]);
  }

  #[test]
  fn all_and_any_fold_or_return_none() {
    assert!(Where::<domain::Data>::all(Vec::new()).is_none());
    let w = Where::any([
      name::GIVEN_NAME.equal_to("a"),
      name::GIVEN_NAME.equal_to("b"),
    ])
    .unwrap();
    assert!(matches!(w.predicate(), Predicate::Or(..)));
  }

  #[test]
  fn field_set_where_any_covers_every_field() {
    let w = phone::SET.where_any(|f| f.is_not_null()).unwrap();
    let mut count = 0;
    w.predicate().visit_leaves(&mut |_, _| count += 1);
    assert_eq!(count, phone::SET.all.len());
  }

  #[test]
  fn translation_substitutes_id_columns() {
    let p = (fields::CONTACT_ID.equal_to(10)
      & contact::DISPLAY_NAME_PRIMARY.equal_to("Ann"))
    .into_predicate();

    let contacts = p.translate(Table::Contacts).unwrap().to_sql().unwrap();
    assert_eq!(contacts, "(_id = 10) AND (display_name = 'Ann')");

    let raw = p.translate(Table::RawContacts).unwrap().to_sql().unwrap();
    assert_eq!(raw, "(contact_id = 10) AND (display_name = 'Ann')");
  }

  #[test]
  fn translation_gives_up_on_data_row_ids() {
    let p = fields::DATA_ID.equal_to(1).into_predicate();
    assert!(p.translate(Table::RawContacts).is_none());
    assert!(p.translate(Table::Contacts).is_none());
  }

  #[test]
  fn contact_id_membership_is_detected() {
    let p = (name::GIVEN_NAME.equal_to("Ann")
      & fields::CONTACT_ID.is_in([1_i64]))
    .into_predicate();
    assert!(p.has_contact_id_membership());
    assert!(!name::GIVEN_NAME.equal_to("x").predicate().has_contact_id_membership());
  }
}
