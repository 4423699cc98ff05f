//! Visit records — the fundamental unit of the Tally log.
//!
//! A visit is an immutable row describing one tracked page request or one
//! beacon submission. Rows are never updated or deleted, and duplicates are
//! expected (retried beacons, a beacon alongside a tracked request).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

// ─── Fields ──────────────────────────────────────────────────────────────────

/// Declares [`VisitFields`] together with its column list, so the struct, the
/// insert statement and the row decoder can never disagree on column order.
macro_rules! visit_fields {
  ($( $(#[$meta:meta])* $field:ident ),+ $(,)?) => {
    /// The descriptive columns of a visit.
    ///
    /// Every value is a plain string; a missing source value is stored as the
    /// empty string, never null. Server-side tracking and beacons populate
    /// disjoint subsets of these fields.
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct VisitFields {
      $( $(#[$meta])* pub $field: String, )+
    }

    impl VisitFields {
      /// Column names, in declaration order.
      pub const COLUMNS: &'static [&'static str] = &[$( stringify!($field) ),+];

      /// Column values, in the same order as [`Self::COLUMNS`].
      pub fn values(&self) -> Vec<&str> {
        vec![$( self.$field.as_str() ),+]
      }

      /// Rebuild from a per-column accessor such as a database row.
      pub fn from_columns<E>(
        mut get: impl FnMut(&'static str) -> Result<String, E>,
      ) -> Result<Self, E> {
        Ok(Self { $( $field: get(stringify!($field))?, )+ })
      }
    }
  };
}

visit_fields! {
  // ── Identity ────────────────────────────────────────────────────────────
  /// Best-effort client address.
  ip,
  user_agent,
  referrer,

  // ── Location ────────────────────────────────────────────────────────────
  /// Origin of the visited URL, e.g. `https://example.org`.
  url,
  /// The full visited URL.
  uri,
  path,
  /// Search string including the leading `?`, or empty.
  query,
  /// Scheme with a trailing colon, e.g. `https:`.
  protocol,

  // ── Routing ─────────────────────────────────────────────────────────────
  /// Host as received, before canonicalisation.
  original_host,
  /// HTTP status of the served response, as a string.
  response_code,

  // ── Geo / network (edge metadata) ───────────────────────────────────────
  country,
  city,
  region,
  region_code,
  continent,
  postal_code,
  metro_code,
  timezone,
  latitude,
  longitude,
  /// `"true"` or `"false"`.
  is_eu_country,
  asn,
  /// Edge data-centre code.
  colo,
  http_version,
  tls_version,
  tls_cipher,

  // ── Client-declared ─────────────────────────────────────────────────────
  /// Primary language tag from `Accept-Language`.
  language,
  accept_encoding,
  client_hints_ua,
  client_hints_platform,
  client_hints_mobile,

  // ── Beacon-only ─────────────────────────────────────────────────────────
  /// Client-persisted visitor correlation id. Unauthenticated.
  cookie,
  /// The client's clock at submission, in milliseconds. Untrusted.
  epoch_timestamp,
  hardware_concurrency,
  cookies_enabled,
  do_not_track,
  memory,
  connection_type,
  hash,
  port,
}

// ─── Source ──────────────────────────────────────────────────────────────────

/// Which ingestion path produced a row.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VisitSource {
  /// Passive server-side tracking of a page request.
  Edge,
  /// A client-submitted beacon.
  Beacon,
}

// ─── VisitRecord ─────────────────────────────────────────────────────────────

/// A persisted visit. Once written, no field is ever updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
  /// Store-assigned, monotonically increasing row id.
  pub id:        i64,
  /// Server-assigned at write time; never taken from the client.
  #[serde(with = "crate::timestamp::serde_millis")]
  pub timestamp: DateTime<Utc>,
  pub source:    VisitSource,
  #[serde(flatten)]
  pub fields:    VisitFields,
}

// ─── NewVisit ────────────────────────────────────────────────────────────────

/// Input to [`crate::store::VisitStore::append`].
/// `id` and `timestamp` are always set by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVisit {
  pub source: VisitSource,
  pub fields: VisitFields,
}

impl NewVisit {
  /// A row produced by passive server-side tracking.
  pub fn edge(fields: VisitFields) -> Self {
    Self { source: VisitSource::Edge, fields }
  }

  /// A row produced by a beacon submission.
  pub fn beacon(fields: VisitFields) -> Self {
    Self { source: VisitSource::Beacon, fields }
  }
}
