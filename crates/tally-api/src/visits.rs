//! Handler for `GET /visits`.
//!
//! | Param | Match |
//! |-------|-------|
//! | `ip` | substring |
//! | `startDate` / `endDate` | inclusive; bare dates cover the whole day |
//! | `country`, `continent` | exact |
//! | `region`, `path` | substring |
//! | `isEU` | `true` / `false` only |
//! | `limit` / `offset` | default 100 / 0 |

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
  http::header,
  response::IntoResponse,
};
use tally_core::{
  query::{VisitPage, VisitParams, VisitQuery},
  store::VisitStore,
};

use crate::{ApiState, error::ApiError};

/// `GET /visits[?ip=...][&startDate=...][&endDate=...][&country=...][&limit=...][&offset=...]`
///
/// A repeated parameter keeps its first value.
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  pairs: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: VisitStore + 'static,
{
  let store = state.store.as_ref().ok_or(ApiError::StoreUnavailable)?;

  let result = match pairs {
    Ok(Query(pairs)) => match VisitQuery::from_params(VisitParams::from_pairs(pairs)) {
      Ok(query) => query_page(store.as_ref(), query).await,
      Err(e) => Err(ApiError::from(e)),
    },
    Err(rejection) => Err(ApiError::from(rejection)),
  };
  let page =
    result.inspect_err(|e| tracing::error!(error = %e, "visit query failed"))?;

  Ok(([(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")], Json(page)))
}

/// Fetch one page, then count all matches for the same filter.
///
/// The two reads are not transactional; under concurrent writes `total` may
/// briefly disagree with the rows returned.
pub async fn query_page<S: VisitStore>(
  store: &S,
  query: VisitQuery,
) -> Result<VisitPage, ApiError> {
  let visits = store.fetch(&query).await.map_err(ApiError::store)?;
  let total = store.count(&query.filter).await.map_err(ApiError::store)?;

  Ok(VisitPage {
    visits,
    total,
    limit: query.limit,
    offset: query.offset,
  })
}
