//! The `VisitStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `tally-store-sqlite`).
//! Higher layers (`tally-api`, `tally-server`) depend on this abstraction,
//! not on any concrete backend, and receive the store handle explicitly.

use std::future::Future;

use crate::{
  query::{VisitFilter, VisitQuery},
  visit::{NewVisit, VisitRecord},
};

/// Abstraction over a visit log backend.
///
/// The log is append-only: there is no update or delete. Concurrent appends
/// are independent and need no coordination.
///
/// All methods return `Send` futures so the trait can be used from spawned
/// tasks and axum handlers.
pub trait VisitStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Append one row. The store assigns `id` and `timestamp`.
  fn append(
    &self,
    visit: NewVisit,
  ) -> impl Future<Output = Result<VisitRecord, Self::Error>> + Send + '_;

  /// Return one page of rows matching `query.filter`, most recent first.
  fn fetch<'a>(
    &'a self,
    query: &'a VisitQuery,
  ) -> impl Future<Output = Result<Vec<VisitRecord>, Self::Error>> + Send + 'a;

  /// Count every row matching `filter`. Must select exactly the rows
  /// [`VisitStore::fetch`] pages over for the same filter.
  fn count<'a>(
    &'a self,
    filter: &'a VisitFilter,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;
}
