//! Edge server for Tally.
//!
//! Serves a static site, redirects secondary hostnames to the canonical one,
//! and records every tracked page view in the background. The JSON API from
//! `tally-api` is mounted under `/api`.

pub mod canonical;
pub mod context;
pub mod recorder;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  extract::{Request, State},
  middleware::{self, Next},
  response::Response,
};
use serde::Deserialize;
use tally_core::{store::VisitStore, tracking::TrackingRules};
use tower_http::{services::ServeDir, trace::TraceLayer};

pub use recorder::Recorder;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `TALLY_*` environment variables. Every field has a default.
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ServerConfig {
  pub host:             String,
  pub port:             u16,
  /// SQLite database file. Without it nothing is recorded and
  /// `/api/visits` reports an error.
  pub store_path:       Option<PathBuf>,
  /// Directory the static site is served from.
  pub asset_dir:        PathBuf,
  pub canonical_host:   Option<String>,
  pub canonical_scheme: String,
  pub excluded_pages:   Vec<String>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:             "127.0.0.1".into(),
      port:             8787,
      store_path:       None,
      asset_dir:        PathBuf::from("public"),
      canonical_host:   None,
      canonical_scheme: "https".into(),
      excluded_pages:   TrackingRules::default().excluded_pages,
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state for the edge middleware.
pub struct AppState<S> {
  pub store:    Option<Arc<S>>,
  pub config:   Arc<ServerConfig>,
  pub rules:    Arc<TrackingRules>,
  pub recorder: Recorder<S>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:    self.store.clone(),
      config:   self.config.clone(),
      rules:    self.rules.clone(),
      recorder: self.recorder.clone(),
    }
  }
}

impl<S> AppState<S>
where
  S: VisitStore + 'static,
{
  pub fn new(store: Option<Arc<S>>, config: ServerConfig) -> Self {
    let rules = TrackingRules::with_excluded_pages(config.excluded_pages.clone());
    Self {
      recorder: Recorder::new(store.clone()),
      store,
      config: Arc::new(config),
      rules: Arc::new(rules),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full edge router: API under `/api`, static assets for
/// everything else, all behind the edge middleware.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: VisitStore + 'static,
{
  Router::new()
    .nest("/api", tally_api::api_router(state.store.clone()))
    .fallback_service(ServeDir::new(&state.config.asset_dir))
    .layer(middleware::from_fn_with_state(state, edge::<S>))
    .layer(TraceLayer::new_for_http())
}

/// Canonical-host redirect, then the request itself, then (for tracked
/// requests) a background write of the visit with the final status code.
async fn edge<S>(State(state): State<AppState<S>>, req: Request, next: Next) -> Response
where
  S: VisitStore + 'static,
{
  if let Some(res) = canonical::redirect(&state.config, &req) {
    return res;
  }

  let fields = state
    .rules
    .should_track(req.method().as_str(), req.uri().path())
    .then(|| context::capture(&req));

  let res = next.run(req).await;

  if let Some(mut fields) = fields {
    fields.response_code = res.status().as_u16().to_string();
    state.recorder.record(fields);
  }
  res
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::io;

  use axum::{
    body::Body,
    http::{StatusCode, header},
  };
  use tally_core::{
    query::{VisitFilter, VisitQuery},
    visit::{NewVisit, VisitRecord, VisitSource},
  };
  use tally_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  const SITE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/site");

  fn config() -> ServerConfig {
    ServerConfig {
      asset_dir: PathBuf::from(SITE),
      canonical_host: Some("example.org".into()),
      ..Default::default()
    }
  }

  async fn state() -> (AppState<SqliteStore>, Arc<SqliteStore>) {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    (AppState::new(Some(store.clone()), config()), store)
  }

  fn get(uri: &str, headers: &[(&str, &str)]) -> Request {
    let mut builder = Request::builder().uri(uri).header(header::HOST, "example.org");
    for (k, v) in headers {
      builder = builder.header(*k, *v);
    }
    builder.body(Body::empty()).unwrap()
  }

  async fn send<S: VisitStore + 'static>(state: &AppState<S>, req: Request) -> Response {
    let res = router(state.clone()).oneshot(req).await.unwrap();
    state.recorder.flush().await;
    res
  }

  async fn rows(store: &SqliteStore) -> Vec<VisitRecord> {
    store
      .fetch(&VisitQuery { limit: u32::MAX, ..Default::default() })
      .await
      .unwrap()
  }

  async fn body_text(res: Response) -> String {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
  }

  /// A store whose every write fails.
  struct BrokenStore;

  impl VisitStore for BrokenStore {
    type Error = io::Error;

    async fn append(&self, _: NewVisit) -> Result<VisitRecord, io::Error> {
      Err(io::Error::other("disk on fire"))
    }

    async fn fetch(&self, _: &VisitQuery) -> Result<Vec<VisitRecord>, io::Error> {
      Err(io::Error::other("disk on fire"))
    }

    async fn count(&self, _: &VisitFilter) -> Result<u64, io::Error> {
      Err(io::Error::other("disk on fire"))
    }
  }

  // ── Tracking ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn page_view_is_served_and_recorded() {
    let (state, store) = state().await;
    let res = send(&state, get("/?ref=mail", &[
      ("cf-connecting-ip", "203.0.113.9"),
      ("cf-ipcountry", "de"),
      ("cf-ray", "8c3f2a1b9d0e1234-FRA"),
      ("accept-language", "de-DE,de;q=0.9"),
      ("user-agent", "Mozilla/5.0"),
    ]))
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_text(res).await.contains("Tally test site"));

    let rows = rows(&store).await;
    assert_eq!(rows.len(), 1);
    let visit = &rows[0];
    assert_eq!(visit.source, VisitSource::Edge);
    assert_eq!(visit.fields.ip, "203.0.113.9");
    assert_eq!(visit.fields.country, "DE");
    assert_eq!(visit.fields.is_eu_country, "true");
    assert_eq!(visit.fields.colo, "FRA");
    assert_eq!(visit.fields.language, "de-DE");
    assert_eq!(visit.fields.path, "/");
    assert_eq!(visit.fields.query, "?ref=mail");
    assert_eq!(visit.fields.original_host, "example.org");
    assert_eq!(visit.fields.response_code, "200");
  }

  #[tokio::test]
  async fn missing_page_is_recorded_with_its_status() {
    let (state, store) = state().await;
    let res = send(&state, get("/nowhere", &[])).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let rows = rows(&store).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].fields.response_code, "404");
  }

  #[tokio::test]
  async fn assets_are_served_but_not_recorded() {
    let (state, store) = state().await;
    let res = send(&state, get("/style.css", &[])).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(rows(&store).await.is_empty());
  }

  #[tokio::test]
  async fn excluded_pages_are_not_recorded() {
    let (state, store) = state().await;
    send(&state, get("/settings", &[])).await;
    send(&state, get("/Settings.html", &[])).await;
    assert!(rows(&store).await.is_empty());
  }

  #[tokio::test]
  async fn non_get_requests_are_not_recorded() {
    let (state, store) = state().await;
    let req = Request::builder()
      .method("DELETE")
      .uri("/")
      .header(header::HOST, "example.org")
      .body(Body::empty())
      .unwrap();
    send(&state, req).await;
    assert!(rows(&store).await.is_empty());
  }

  #[tokio::test]
  async fn api_calls_are_not_recorded_as_page_views() {
    let (state, store) = state().await;
    let res = send(&state, get("/api/visits", &[])).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(rows(&store).await.is_empty());
  }

  #[tokio::test]
  async fn beacon_through_the_edge_stores_only_the_beacon_row() {
    let (state, store) = state().await;
    let req = Request::builder()
      .method("POST")
      .uri("/api/beacon")
      .header(header::HOST, "example.org")
      .header(header::CONTENT_TYPE, "text/plain;charset=UTF-8")
      .body(Body::from(r##"{"cookie":"v-1","hash":"#top"}"##))
      .unwrap();
    let res = send(&state, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let rows = rows(&store).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].source, VisitSource::Beacon);
    assert_eq!(rows[0].fields.hash, "#top");
  }

  // ── Failure isolation ───────────────────────────────────────────────────────

  #[tokio::test]
  async fn failing_store_does_not_change_the_response() {
    let state = AppState::new(Some(Arc::new(BrokenStore)), config());
    let res = send(&state, get("/", &[])).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_text(res).await.contains("Tally test site"));
  }

  #[tokio::test]
  async fn site_is_served_without_a_store() {
    let state = AppState::<SqliteStore>::new(None, config());
    let res = send(&state, get("/", &[])).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = send(&state, get("/api/visits", &[])).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
  }

  // ── Canonical host ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn secondary_host_is_redirected_and_not_recorded() {
    let (state, store) = state().await;
    let req = Request::builder()
      .uri("/prizes?sort=desc")
      .header(header::HOST, "tally.pages.dev")
      .body(Body::empty())
      .unwrap();
    let res = send(&state, req).await;

    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
      res.headers().get(header::LOCATION).unwrap(),
      "https://example.org/prizes?sort=desc"
    );
    assert!(rows(&store).await.is_empty());
  }

  #[tokio::test]
  async fn api_on_secondary_host_is_redirected_too() {
    let (state, _) = state().await;
    let req = Request::builder()
      .uri("/api/visits?limit=5")
      .header(header::HOST, "tally.pages.dev")
      .body(Body::empty())
      .unwrap();
    let res = send(&state, req).await;
    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
      res.headers().get(header::LOCATION).unwrap(),
      "https://example.org/api/visits?limit=5"
    );
  }

  #[tokio::test]
  async fn localhost_is_served_directly() {
    let (state, store) = state().await;
    let req = Request::builder()
      .uri("/")
      .header(header::HOST, "localhost:8787")
      .body(Body::empty())
      .unwrap();
    let res = send(&state, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(rows(&store).await[0].fields.original_host, "localhost");
  }

  // ── Configuration ───────────────────────────────────────────────────────────

  #[test]
  fn config_defaults_fill_missing_keys() {
    let cfg: ServerConfig = serde_json::from_str(r#"{ "port": 9000 }"#).unwrap();
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.store_path, None);
    assert_eq!(cfg.canonical_scheme, "https");
    assert_eq!(cfg.excluded_pages, ["/settings"]);
  }
}
