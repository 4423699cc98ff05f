//! Handler for `POST /beacon`.
//!
//! The body is read as raw bytes whatever its `Content-Type`: beacon scripts
//! post with `mode: "no-cors"`, which forces `text/plain`. The reply is always
//! a JSON status body; the cause of a failure is only logged.

use std::sync::Arc;

use axum::{
  Json,
  body::Bytes,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;
use tally_core::{beacon::BeaconPayload, store::VisitStore, visit::NewVisit};

use crate::{ApiState, error::ApiError};

/// Outcome reported to the beacon script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BeaconStatus {
  Success,
  Error,
}

#[derive(Debug, Serialize)]
pub struct BeaconReply {
  pub status: BeaconStatus,
}

impl IntoResponse for BeaconReply {
  fn into_response(self) -> Response {
    let code = match self.status {
      BeaconStatus::Success => StatusCode::OK,
      BeaconStatus::Error => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (code, Json(self)).into_response()
  }
}

/// `POST /beacon` — body: a JSON object with the beacon fields.
pub async fn ingest<S>(
  State(state): State<ApiState<S>>,
  body: Bytes,
) -> BeaconReply
where
  S: VisitStore + 'static,
{
  let status = match ingest_payload(state.store.as_ref(), &body).await {
    Ok(()) => BeaconStatus::Success,
    Err(e) => {
      tracing::warn!(error = %e, "beacon rejected");
      BeaconStatus::Error
    }
  };
  BeaconReply { status }
}

/// Parse and persist one beacon. Without a store the payload is still
/// parsed, then dropped.
async fn ingest_payload<S: VisitStore>(
  store: Option<&Arc<S>>,
  body: &[u8],
) -> Result<(), ApiError> {
  let payload = BeaconPayload::from_slice(body)?;

  let Some(store) = store else {
    tracing::debug!("no store configured; beacon dropped");
    return Ok(());
  };

  store
    .append(NewVisit::from(payload))
    .await
    .map_err(ApiError::store)?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use tally_store_sqlite::SqliteStore;

  use super::*;

  #[tokio::test]
  async fn malformed_payloads_are_invalid_not_store_errors() {
    for body in [&b"{oops"[..], b"[1,2]", b"\"text\""] {
      let err = ingest_payload::<SqliteStore>(None, body).await.unwrap_err();
      assert!(matches!(err, ApiError::Invalid(_)), "{err:?}");
    }
  }

  #[tokio::test]
  async fn rejected_beacon_reports_an_error_status() {
    let state = ApiState::<SqliteStore> { store: None };
    let reply = ingest(State(state), Bytes::from_static(b"null")).await;
    assert_eq!(reply.status, BeaconStatus::Error);
  }
}
