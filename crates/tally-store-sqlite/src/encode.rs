//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored in the fixed-width form from
//! [`tally_core::timestamp`] so that string comparison orders them.

use std::str::FromStr as _;

use chrono::{DateTime, Utc};
use tally_core::{
  timestamp,
  visit::{VisitFields, VisitRecord, VisitSource},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_ts(dt: DateTime<Utc>) -> String { timestamp::format(dt) }

pub fn decode_ts(s: &str) -> Result<DateTime<Utc>> {
  timestamp::parse(s).ok_or_else(|| Error::DateParse(s.to_owned()))
}

// ─── VisitSource ─────────────────────────────────────────────────────────────

pub fn encode_source(source: VisitSource) -> &'static str { source.into() }

pub fn decode_source(s: &str) -> Result<VisitSource> {
  VisitSource::from_str(s).map_err(|_| Error::UnknownSource(s.to_owned()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// A `visits` row with its typed columns still in text form.
pub struct RawVisit {
  pub id:        i64,
  pub timestamp: String,
  pub source:    String,
  pub fields:    VisitFields,
}

impl RawVisit {
  /// Read a row selected with `SELECT *`.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:        row.get("id")?,
      timestamp: row.get("timestamp")?,
      source:    row.get("source")?,
      fields:    VisitFields::from_columns(|column| row.get(column))?,
    })
  }

  pub fn into_record(self) -> Result<VisitRecord> {
    Ok(VisitRecord {
      id:        self.id,
      timestamp: decode_ts(&self.timestamp)?,
      source:    decode_source(&self.source)?,
      fields:    self.fields,
    })
  }
}
