//! The canonical text form of visit timestamps.
//!
//! Timestamps are stored and compared as strings, so every writer and every
//! range bound must use exactly one fixed-width format:
//! `YYYY-MM-DDTHH:MM:SS.sssZ`. With a fixed width, lexical order equals
//! chronological order.

use chrono::{DateTime, SecondsFormat, Utc};

/// Render `dt` as `YYYY-MM-DDTHH:MM:SS.sssZ`.
pub fn format(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse any RFC 3339 instant and convert it to UTC.
pub fn parse(s: &str) -> Option<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .ok()
    .map(|dt| dt.with_timezone(&Utc))
}

/// `#[serde(with = "...")]` adapter emitting the canonical form.
pub mod serde_millis {
  use chrono::{DateTime, Utc};
  use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

  pub fn serialize<S: Serializer>(
    dt: &DateTime<Utc>,
    serializer: S,
  ) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&super::format(*dt))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
  ) -> Result<DateTime<Utc>, D::Error> {
    let s = String::deserialize(deserializer)?;
    super::parse(&s)
      .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {s:?}")))
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn format_is_fixed_width_millis() {
    let dt = Utc.with_ymd_and_hms(2024, 1, 5, 9, 3, 0).unwrap();
    assert_eq!(format(dt), "2024-01-05T09:03:00.000Z");
  }

  #[test]
  fn parse_normalises_offsets_to_utc() {
    let dt = parse("2024-01-05T23:30:00+02:00").unwrap();
    assert_eq!(format(dt), "2024-01-05T21:30:00.000Z");
  }

  #[test]
  fn parse_rejects_bare_dates() {
    assert!(parse("2024-01-05").is_none());
  }
}
