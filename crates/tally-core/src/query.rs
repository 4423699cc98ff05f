//! Filter parameters for reading the visit log.
//!
//! Raw query-string values arrive as [`VisitParams`] and are normalised once
//! into a typed [`VisitQuery`]. Storage backends translate the
//! [`VisitFilter`] into their own predicate language.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::{Error, Result, timestamp, visit::VisitRecord};

pub const DEFAULT_LIMIT: u32 = 100;
pub const DEFAULT_OFFSET: u32 = 0;

// ─── Raw parameters ──────────────────────────────────────────────────────────

/// Query-string parameters exactly as received. Every value is optional
/// free text; nothing here has been validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitParams {
  pub ip:         Option<String>,
  pub start_date: Option<String>,
  pub end_date:   Option<String>,
  pub country:    Option<String>,
  pub continent:  Option<String>,
  pub region:     Option<String>,
  pub is_eu:      Option<String>,
  pub path:       Option<String>,
  pub limit:      Option<String>,
  pub offset:     Option<String>,
}

impl VisitParams {
  /// Collect decoded `key=value` pairs. When a key repeats, the first value
  /// wins; unknown keys are ignored.
  pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
  where
    K: AsRef<str>,
    V: Into<String>,
  {
    let mut params = Self::default();
    for (key, value) in pairs {
      let slot = match key.as_ref() {
        "ip" => &mut params.ip,
        "startDate" => &mut params.start_date,
        "endDate" => &mut params.end_date,
        "country" => &mut params.country,
        "continent" => &mut params.continent,
        "region" => &mut params.region,
        "isEU" => &mut params.is_eu,
        "path" => &mut params.path,
        "limit" => &mut params.limit,
        "offset" => &mut params.offset,
        _ => continue,
      };
      if slot.is_none() {
        *slot = Some(value.into());
      }
    }
    params
  }
}

// ─── Typed query ─────────────────────────────────────────────────────────────

/// The row-selecting part of a query. Every `None` means "no clause".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitFilter {
  /// Substring of `ip`.
  pub ip:        Option<String>,
  /// Inclusive lower bound on `timestamp`.
  pub since:     Option<DateTime<Utc>>,
  /// Inclusive upper bound on `timestamp`.
  pub until:     Option<DateTime<Utc>>,
  /// Exact `country`.
  pub country:   Option<String>,
  /// Exact `continent`.
  pub continent: Option<String>,
  /// Substring of `region`.
  pub region:    Option<String>,
  /// Exact `is_eu_country`.
  pub is_eu:     Option<bool>,
  /// Substring of `path`.
  pub path:      Option<String>,
}

/// A filter plus a page window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitQuery {
  pub filter: VisitFilter,
  pub limit:  u32,
  pub offset: u32,
}

impl Default for VisitQuery {
  fn default() -> Self {
    Self {
      filter: VisitFilter::default(),
      limit:  DEFAULT_LIMIT,
      offset: DEFAULT_OFFSET,
    }
  }
}

impl VisitQuery {
  /// Normalise raw parameters.
  ///
  /// Empty strings count as absent. `isEU` only applies for the literal
  /// values `true` and `false`. Pagination values keep their leading
  /// digits (`25abc` is 25, `1.5` is 1); anything without any, or a
  /// negative number, falls back to the default. A date that is neither `YYYY-MM-DD` nor an RFC 3339
  /// instant is an error.
  pub fn from_params(params: VisitParams) -> Result<Self> {
    let filter = VisitFilter {
      ip:        non_empty(params.ip),
      since:     non_empty(params.start_date)
        .map(|d| parse_bound(&d, Bound::Start))
        .transpose()?,
      until:     non_empty(params.end_date)
        .map(|d| parse_bound(&d, Bound::End))
        .transpose()?,
      country:   non_empty(params.country),
      continent: non_empty(params.continent),
      region:    non_empty(params.region),
      is_eu:     match params.is_eu.as_deref() {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
      },
      path:      non_empty(params.path),
    };

    Ok(Self {
      filter,
      limit: parse_window(params.limit.as_deref(), DEFAULT_LIMIT, true),
      offset: parse_window(params.offset.as_deref(), DEFAULT_OFFSET, false),
    })
  }
}

// ─── Result envelope ─────────────────────────────────────────────────────────

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, Serialize)]
pub struct VisitPage {
  pub visits: Vec<VisitRecord>,
  pub total:  u64,
  pub limit:  u32,
  pub offset: u32,
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Bound {
  Start,
  End,
}

/// A bare date widens to the whole day: start-of-day for a lower bound,
/// `23:59:59.999` for an upper bound. A full instant is used as given.
fn parse_bound(raw: &str, bound: Bound) -> Result<DateTime<Utc>> {
  let raw = raw.trim();
  if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
    let time = match bound {
      Bound::Start => NaiveTime::from_hms_milli_opt(0, 0, 0, 0),
      Bound::End => NaiveTime::from_hms_milli_opt(23, 59, 59, 999),
    }
    .ok_or_else(|| Error::InvalidDate(raw.to_owned()))?;
    return Ok(date.and_time(time).and_utc());
  }
  timestamp::parse(raw).ok_or_else(|| Error::InvalidDate(raw.to_owned()))
}

fn parse_window(raw: Option<&str>, default: u32, positive: bool) -> u32 {
  match raw.and_then(leading_int) {
    Some(0) if positive => default,
    Some(n) if n >= 0 => u32::try_from(n).unwrap_or(default),
    _ => default,
  }
}

/// Integer prefix of `raw` after leading whitespace and an optional sign.
/// `None` when no digit follows.
fn leading_int(raw: &str) -> Option<i64> {
  let raw = raw.trim_start();
  let (negative, rest) = match raw.as_bytes().first() {
    Some(b'-') => (true, &raw[1..]),
    Some(b'+') => (false, &raw[1..]),
    _ => (false, raw),
  };
  let end = rest
    .bytes()
    .position(|b| !b.is_ascii_digit())
    .unwrap_or(rest.len());
  let digits = &rest[..end];
  if digits.is_empty() {
    return None;
  }
  let n = digits.parse::<i64>().unwrap_or(i64::MAX);
  Some(if negative { -n } else { n })
}

fn non_empty(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.is_empty())
}
