//! The beacon payload — a partial visit record submitted by the client.
//!
//! The payload is attacker-controlled. Values are copied verbatim into the
//! record as inert text; nothing is derived, validated or interpreted.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::{
  Error, Result,
  visit::{NewVisit, VisitFields},
};

/// The keys a beacon script may send. Unknown keys (including the client's
/// own `timestamp`) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BeaconPayload {
  #[serde(alias = "ip", deserialize_with = "verbatim")]
  pub visitor_ip:           String,
  #[serde(deserialize_with = "verbatim")]
  pub user_agent:           String,
  #[serde(deserialize_with = "verbatim")]
  pub referrer:             String,
  #[serde(deserialize_with = "verbatim")]
  pub url:                  String,
  #[serde(deserialize_with = "verbatim")]
  pub uri:                  String,
  #[serde(deserialize_with = "verbatim")]
  pub path:                 String,
  #[serde(deserialize_with = "verbatim")]
  pub query:                String,
  #[serde(deserialize_with = "verbatim")]
  pub port:                 String,
  #[serde(deserialize_with = "verbatim")]
  pub protocol:             String,
  #[serde(deserialize_with = "verbatim")]
  pub hash:                 String,
  #[serde(deserialize_with = "verbatim")]
  pub language:             String,
  #[serde(deserialize_with = "verbatim")]
  pub http_version:         String,
  #[serde(deserialize_with = "verbatim")]
  pub cookie:               String,
  #[serde(deserialize_with = "verbatim")]
  pub epoch_timestamp:      String,
  #[serde(deserialize_with = "verbatim")]
  pub hardware_concurrency: String,
  #[serde(deserialize_with = "verbatim")]
  pub cookies_enabled:      String,
  #[serde(deserialize_with = "verbatim")]
  pub do_not_track:         String,
  #[serde(deserialize_with = "verbatim")]
  pub memory:               String,
  #[serde(deserialize_with = "verbatim")]
  pub connection_type:      String,
}

impl BeaconPayload {
  /// Parse a raw request body. Anything other than a JSON object is rejected.
  pub fn from_slice(body: &[u8]) -> Result<Self> {
    let value: Value = serde_json::from_slice(body)?;
    if !value.is_object() {
      return Err(Error::BeaconNotAnObject);
    }
    Ok(serde_json::from_value(value)?)
  }
}

impl From<BeaconPayload> for NewVisit {
  fn from(p: BeaconPayload) -> Self {
    NewVisit::beacon(VisitFields {
      ip: p.visitor_ip,
      user_agent: p.user_agent,
      referrer: p.referrer,
      url: p.url,
      uri: p.uri,
      path: p.path,
      query: p.query,
      port: p.port,
      protocol: p.protocol,
      hash: p.hash,
      language: p.language,
      http_version: p.http_version,
      cookie: p.cookie,
      epoch_timestamp: p.epoch_timestamp,
      hardware_concurrency: p.hardware_concurrency,
      cookies_enabled: p.cookies_enabled,
      do_not_track: p.do_not_track,
      memory: p.memory,
      connection_type: p.connection_type,
      ..Default::default()
    })
  }
}

/// Strings pass through; `null` becomes empty; any other JSON value keeps its
/// compact JSON text (`8`, `true`, `{"a":1}`).
fn verbatim<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
  Ok(match Value::deserialize(deserializer)? {
    Value::Null => String::new(),
    Value::String(s) => s,
    other => other.to_string(),
  })
}
