//! Capture of a request's visit fields.
//!
//! Everything a tracked visit records is read here, before the request is
//! handed on, so the background task owns a plain snapshot and never touches
//! the request itself. Missing values become empty strings.

use std::net::SocketAddr;

use axum::{
  extract::ConnectInfo,
  http::{HeaderMap, Request, Version, header},
};
use tally_core::{edge::EdgeMetadata, visit::VisitFields};

/// Build the server-observed fields for `req`. `response_code` is left empty
/// for the caller to fill once the response is known.
pub fn capture<B>(req: &Request<B>) -> VisitFields {
  let headers = req.headers();
  let uri = req.uri();

  let host = host_with_port(req).unwrap_or_default();
  let scheme = first_entry(&header_str(headers, "x-forwarded-proto"))
    .or_else(|| uri.scheme_str().map(str::to_owned))
    .unwrap_or_else(|| "http".to_owned())
    .to_ascii_lowercase();

  let path = uri.path().to_owned();
  let query = match uri.query() {
    Some(q) if !q.is_empty() => format!("?{q}"),
    _ => String::new(),
  };
  let url = format!("{scheme}://{host}");

  let mut fields = VisitFields {
    ip: client_ip(req),
    user_agent: header_str(headers, header::USER_AGENT.as_str()),
    referrer: header_str(headers, header::REFERER.as_str()),
    uri: format!("{url}{path}{query}"),
    url,
    path,
    query,
    protocol: format!("{scheme}:"),
    original_host: strip_port(&host).to_owned(),
    language: primary_language(&header_str(headers, header::ACCEPT_LANGUAGE.as_str())),
    accept_encoding: header_str(headers, header::ACCEPT_ENCODING.as_str()),
    client_hints_ua: header_str(headers, "sec-ch-ua"),
    client_hints_platform: header_str(headers, "sec-ch-ua-platform"),
    client_hints_mobile: header_str(headers, "sec-ch-ua-mobile"),
    ..Default::default()
  };

  edge_metadata(headers, req.version()).write_into(&mut fields);
  fields
}

/// Geolocation and network attributes forwarded by the CDN and the
/// TLS-terminating proxy.
fn edge_metadata(headers: &HeaderMap, version: Version) -> EdgeMetadata {
  EdgeMetadata {
    country:      header_str(headers, "cf-ipcountry"),
    city:         header_str(headers, "cf-ipcity"),
    region:       header_str(headers, "cf-region"),
    region_code:  header_str(headers, "cf-region-code"),
    continent:    header_str(headers, "cf-ipcontinent"),
    postal_code:  header_str(headers, "cf-postal-code"),
    metro_code:   header_str(headers, "cf-metro-code"),
    timezone:     header_str(headers, "cf-timezone"),
    latitude:     header_str(headers, "cf-iplatitude"),
    longitude:    header_str(headers, "cf-iplongitude"),
    asn:          header_str(headers, "x-asn"),
    colo:         colo_from_ray(&header_str(headers, "cf-ray")),
    http_version: http_version(version).to_owned(),
    tls_version:  header_str(headers, "x-tls-version"),
    tls_cipher:   header_str(headers, "x-tls-cipher"),
  }
}

/// The `Host` header, falling back to the URI authority (HTTP/2).
pub fn host_with_port<B>(req: &Request<B>) -> Option<String> {
  req
    .headers()
    .get(header::HOST)
    .map(|v| String::from_utf8_lossy(v.as_bytes()).trim().to_owned())
    .filter(|h| !h.is_empty())
    .or_else(|| req.uri().authority().map(|a| a.as_str().to_owned()))
}

/// `example.org:8080` → `example.org`; `[::1]:80` → `[::1]`.
pub fn strip_port(host: &str) -> &str {
  if host.starts_with('[') {
    return match host.find(']') {
      Some(end) => &host[..=end],
      None => host,
    };
  }
  match host.rsplit_once(':') {
    Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name,
    _ => host,
  }
}

/// `CF-Connecting-IP`, then the first `X-Forwarded-For` hop, then the peer.
fn client_ip<B>(req: &Request<B>) -> String {
  let headers = req.headers();
  let connecting = header_str(headers, "cf-connecting-ip");
  if !connecting.is_empty() {
    return connecting;
  }
  if let Some(forwarded) = first_entry(&header_str(headers, "x-forwarded-for")) {
    return forwarded;
  }
  req
    .extensions()
    .get::<ConnectInfo<SocketAddr>>()
    .map(|ConnectInfo(addr)| addr.ip().to_string())
    .unwrap_or_default()
}

/// First tag of an `Accept-Language` list, without its weight.
fn primary_language(accept_language: &str) -> String {
  first_entry(accept_language)
    .and_then(|tag| tag.split(';').next().map(|t| t.trim().to_owned()))
    .unwrap_or_default()
}

/// `8c3f2a1b9d0e1234-SJC` → `SJC`.
fn colo_from_ray(ray: &str) -> String {
  match ray.rsplit_once('-') {
    Some((_, colo)) => colo.trim().to_owned(),
    None => String::new(),
  }
}

fn http_version(version: Version) -> &'static str {
  match version {
    Version::HTTP_09 => "HTTP/0.9",
    Version::HTTP_10 => "HTTP/1.0",
    Version::HTTP_11 => "HTTP/1.1",
    Version::HTTP_2 => "HTTP/2",
    Version::HTTP_3 => "HTTP/3",
    _ => "",
  }
}

fn first_entry(list: &str) -> Option<String> {
  list
    .split(',')
    .next()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_owned)
}

fn header_str(headers: &HeaderMap, name: &str) -> String {
  headers
    .get(name)
    .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use std::net::{IpAddr, Ipv4Addr};

  use axum::body::Body;

  use super::*;

  fn request(uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    for (k, v) in headers {
      builder = builder.header(*k, *v);
    }
    builder.body(Body::empty()).unwrap()
  }

  #[test]
  fn location_fields_follow_the_request_url() {
    let req = request("/prizes/list?sort=desc", &[
      ("host", "example.org"),
      ("x-forwarded-proto", "https"),
    ]);
    let f = capture(&req);
    assert_eq!(f.url, "https://example.org");
    assert_eq!(f.uri, "https://example.org/prizes/list?sort=desc");
    assert_eq!(f.path, "/prizes/list");
    assert_eq!(f.query, "?sort=desc");
    assert_eq!(f.protocol, "https:");
    assert_eq!(f.original_host, "example.org");
  }

  #[test]
  fn missing_query_and_scheme_normalise() {
    let f = capture(&request("/?", &[("host", "localhost:8787")]));
    assert_eq!(f.query, "");
    assert_eq!(f.protocol, "http:");
    assert_eq!(f.url, "http://localhost:8787");
    assert_eq!(f.original_host, "localhost");
  }

  #[test]
  fn client_ip_prefers_the_cdn_header() {
    let f = capture(&request("/", &[
      ("cf-connecting-ip", "203.0.113.5"),
      ("x-forwarded-for", "198.51.100.1, 10.0.0.1"),
    ]));
    assert_eq!(f.ip, "203.0.113.5");

    let f = capture(&request("/", &[("x-forwarded-for", "198.51.100.1, 10.0.0.1")]));
    assert_eq!(f.ip, "198.51.100.1");
  }

  #[test]
  fn client_ip_falls_back_to_the_peer_address() {
    let mut req = request("/", &[]);
    req.extensions_mut().insert(ConnectInfo(SocketAddr::new(
      IpAddr::V4(Ipv4Addr::new(192, 0, 2, 33)),
      50123,
    )));
    assert_eq!(capture(&req).ip, "192.0.2.33");
    assert_eq!(capture(&request("/", &[])).ip, "");
  }

  #[test]
  fn client_headers_are_copied() {
    let f = capture(&request("/", &[
      ("user-agent", "Mozilla/5.0"),
      ("referer", "https://news.example/"),
      ("accept-language", "de-DE;q=0.9,en;q=0.8"),
      ("accept-encoding", "gzip, br"),
      ("sec-ch-ua-platform", "\"Linux\""),
      ("sec-ch-ua-mobile", "?0"),
    ]));
    assert_eq!(f.user_agent, "Mozilla/5.0");
    assert_eq!(f.referrer, "https://news.example/");
    assert_eq!(f.language, "de-DE");
    assert_eq!(f.accept_encoding, "gzip, br");
    assert_eq!(f.client_hints_platform, "\"Linux\"");
    assert_eq!(f.client_hints_mobile, "?0");
    assert_eq!(f.client_hints_ua, "");
  }

  #[test]
  fn edge_headers_fill_geo_and_network_fields() {
    let f = capture(&request("/", &[
      ("cf-ipcountry", "FR"),
      ("cf-ipcity", "Paris"),
      ("cf-ipcontinent", "EU"),
      ("cf-region", "Ile-de-France"),
      ("cf-timezone", "Europe/Paris"),
      ("cf-ray", "8c3f2a1b9d0e1234-CDG"),
      ("x-asn", "3215"),
      ("x-tls-version", "TLSv1.3"),
    ]));
    assert_eq!(f.country, "FR");
    assert_eq!(f.is_eu_country, "true");
    assert_eq!(f.city, "Paris");
    assert_eq!(f.continent, "EU");
    assert_eq!(f.region, "Ile-de-France");
    assert_eq!(f.timezone, "Europe/Paris");
    assert_eq!(f.colo, "CDG");
    assert_eq!(f.asn, "3215");
    assert_eq!(f.tls_version, "TLSv1.3");
    assert_eq!(f.http_version, "HTTP/1.1");
    // Beacon-only fields stay empty on the tracking path.
    assert_eq!(f.cookie, "");
  }

  #[test]
  fn strip_port_handles_names_and_ipv6() {
    assert_eq!(strip_port("example.org:8080"), "example.org");
    assert_eq!(strip_port("example.org"), "example.org");
    assert_eq!(strip_port("[::1]:3000"), "[::1]");
    assert_eq!(strip_port("127.0.0.1:8787"), "127.0.0.1");
  }
}
