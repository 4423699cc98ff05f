//! The tracking filter: which inbound requests count as page visits.
//!
//! Pure and synchronous. It gates the asynchronous, fallible recording side
//! effect, so it must never fail itself.

/// File extensions treated as static assets, not pages.
pub const ASSET_EXTENSIONS: &[&str] = &[
  ".css", ".js", ".png", ".jpg", ".jpeg", ".gif", ".ico", ".svg", ".woff",
  ".woff2", ".ttf", ".eot",
];

/// Paths under this prefix are API calls, not page views.
pub const API_PREFIX: &str = "/api/";

/// Rules for [`TrackingRules::should_track`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingRules {
  /// Lowercase suffixes, each including the leading dot.
  pub asset_extensions: Vec<String>,
  pub api_prefix:       String,
  /// Operational pages that are never tracked. Each entry `p` matches both
  /// `p` and `p.html`.
  pub excluded_pages:   Vec<String>,
}

impl Default for TrackingRules {
  fn default() -> Self {
    Self {
      asset_extensions: ASSET_EXTENSIONS.iter().map(|e| (*e).to_owned()).collect(),
      api_prefix:       API_PREFIX.to_owned(),
      excluded_pages:   vec!["/settings".to_owned()],
    }
  }
}

impl TrackingRules {
  /// Default rules with a custom excluded-pages list.
  pub fn with_excluded_pages(pages: impl IntoIterator<Item = String>) -> Self {
    Self {
      excluded_pages: pages.into_iter().map(|p| p.to_lowercase()).collect(),
      ..Self::default()
    }
  }

  /// Decide whether a request is a trackable page view.
  ///
  /// Rejects, in order: any method but `GET`; asset paths; API paths;
  /// excluded pages. Path matching is case-insensitive.
  pub fn should_track(&self, method: &str, path: &str) -> bool {
    if method != "GET" {
      return false;
    }

    let path = path.to_lowercase();
    if self.asset_extensions.iter().any(|ext| path.ends_with(ext.as_str())) {
      return false;
    }
    if path.starts_with(&self.api_prefix) {
      return false;
    }

    !self.excluded_pages.iter().any(|page| {
      path == *page
        || path
          .strip_suffix(".html")
          .is_some_and(|stem| stem == page)
    })
  }
}
