//! JSON API for Tally.
//!
//! Exposes an axum [`Router`] backed by any [`tally_core::store::VisitStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", tally_api::api_router(Some(store.clone())))
//! ```

pub mod beacon;
pub mod error;
pub mod visits;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use tally_core::store::VisitStore;

pub use error::ApiError;

/// State shared by the API handlers.
///
/// `store` is `None` when the deployment has no database configured: reads
/// then fail explicitly and beacon writes become no-ops.
pub struct ApiState<S> {
  pub store: Option<Arc<S>>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone() }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Option<Arc<S>>) -> Router<()>
where
  S: VisitStore + 'static,
{
  Router::new()
    .route("/beacon", post(beacon::ingest::<S>))
    .route("/visits", get(visits::list::<S>))
    .with_state(ApiState { store })
}

// ─── Integration tests ────────────────────────────────────────────────────────
