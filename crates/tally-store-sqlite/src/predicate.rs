//! The filter-query builder.
//!
//! A [`VisitFilter`] is translated once into a [`Predicate`]: static clause
//! text plus an ordered list of bound values. The same predicate is applied
//! to the page query and to the count query, so the two always select the
//! same rows. User input only ever travels as a bound value.

use rusqlite::types::Value;
use tally_core::query::VisitFilter;

use crate::encode::encode_ts;

/// A parameterised `WHERE` clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
  clauses: Vec<&'static str>,
  binds:   Vec<Value>,
}

impl Predicate {
  /// Build the predicate for `filter`. Pure; absent filters add no clause.
  pub fn build(filter: &VisitFilter) -> Self {
    let mut p = Self::default();

    if let Some(ip) = &filter.ip {
      p.push(r"ip LIKE ? ESCAPE '\'", contains(ip));
    }
    if let Some(since) = filter.since {
      p.push("timestamp >= ?", encode_ts(since));
    }
    if let Some(until) = filter.until {
      p.push("timestamp <= ?", encode_ts(until));
    }
    if let Some(country) = &filter.country {
      p.push("country = ?", country.clone());
    }
    if let Some(continent) = &filter.continent {
      p.push("continent = ?", continent.clone());
    }
    if let Some(region) = &filter.region {
      p.push(r"region LIKE ? ESCAPE '\'", contains(region));
    }
    if let Some(is_eu) = filter.is_eu {
      p.push("is_eu_country = ?", is_eu.to_string());
    }
    if let Some(path) = &filter.path {
      p.push(r"path LIKE ? ESCAPE '\'", contains(path));
    }

    p
  }

  fn push(&mut self, clause: &'static str, value: String) {
    self.clauses.push(clause);
    self.binds.push(Value::Text(value));
  }

  /// ` WHERE a AND b ...`, or the empty string when nothing is filtered.
  pub fn where_sql(&self) -> String {
    if self.clauses.is_empty() {
      String::new()
    } else {
      format!(" WHERE {}", self.clauses.join(" AND "))
    }
  }

  /// Bound values, in placeholder order.
  pub fn binds(&self) -> &[Value] { &self.binds }

  pub fn is_empty(&self) -> bool { self.clauses.is_empty() }
}

/// A `LIKE` pattern matching `needle` anywhere, with the pattern
/// metacharacters in `needle` escaped so they match literally.
fn contains(needle: &str) -> String {
  let mut pattern = String::with_capacity(needle.len() + 2);
  pattern.push('%');
  for c in needle.chars() {
    if matches!(c, '%' | '_' | '\\') {
      pattern.push('\\');
    }
    pattern.push(c);
  }
  pattern.push('%');
  pattern
}
