//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::QueryRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
///
/// Every variant is a server-side failure from the caller's point of view,
/// so all map to `500` with a JSON `{"error": ...}` body.
#[derive(Debug, Error)]
pub enum ApiError {
  /// No store was configured for this deployment.
  #[error("Database not configured")]
  StoreUnavailable,

  /// A filter parameter or beacon payload could not be interpreted.
  #[error("{0}")]
  Invalid(#[from] tally_core::Error),

  /// The query string itself could not be decoded.
  #[error("{0}")]
  QueryString(#[from] QueryRejection),

  #[error("{0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    ApiError::Store(Box::new(e))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    (
      StatusCode::INTERNAL_SERVER_ERROR,
      Json(json!({ "error": self.to_string() })),
    )
      .into_response()
  }
}
