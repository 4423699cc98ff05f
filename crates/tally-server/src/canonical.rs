//! Permanent redirect from secondary hostnames to the canonical one.

use axum::{
  http::{HeaderValue, Request, StatusCode, header},
  response::{IntoResponse, Response},
};

use crate::{
  ServerConfig,
  context::{host_with_port, strip_port},
};

/// Return a `301` to the canonical host when `req` arrived on another name.
///
/// Local development hosts are never redirected, and neither is a request
/// without any host at all. Path and query string are carried over unchanged.
pub fn redirect<B>(config: &ServerConfig, req: &Request<B>) -> Option<Response> {
  let canonical = config.canonical_host.as_deref()?;
  let host = host_with_port(req)?;
  let name = strip_port(&host);

  if name.eq_ignore_ascii_case(canonical) || is_local(name) {
    return None;
  }

  let target = req
    .uri()
    .path_and_query()
    .map(|pq| pq.as_str())
    .unwrap_or("/");
  let location = format!("{}://{canonical}{target}", config.canonical_scheme);
  let value = HeaderValue::try_from(location).ok()?;

  let mut res = StatusCode::MOVED_PERMANENTLY.into_response();
  res.headers_mut().insert(header::LOCATION, value);
  Some(res)
}

fn is_local(host: &str) -> bool {
  host.eq_ignore_ascii_case("localhost")
    || host.contains("127.0.0.1")
    || host == "[::1]"
}
