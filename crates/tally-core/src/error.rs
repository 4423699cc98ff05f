//! Error types for `tally-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid date {0:?}: expected YYYY-MM-DD or an RFC 3339 instant")]
  InvalidDate(String),

  #[error("malformed beacon payload: {0}")]
  MalformedBeacon(#[from] serde_json::Error),

  #[error("beacon payload must be a JSON object")]
  BeaconNotAnObject,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
