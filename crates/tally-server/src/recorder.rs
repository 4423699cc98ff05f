//! Background persistence of tracked visits.
//!
//! Recording happens after the response has been produced and never feeds
//! back into it: failures are logged and otherwise swallowed.

use std::sync::Arc;

use tally_core::{
  store::VisitStore,
  visit::{NewVisit, VisitFields},
};
use tokio_util::task::TaskTracker;

/// Spawns one store write per tracked visit and keeps track of the writes
/// still in flight so shutdown can wait for them.
pub struct Recorder<S> {
  store: Option<Arc<S>>,
  tasks: TaskTracker,
}

impl<S> Clone for Recorder<S> {
  fn clone(&self) -> Self {
    Self {
      store: self.store.clone(),
      tasks: self.tasks.clone(),
    }
  }
}

impl<S> Recorder<S>
where
  S: VisitStore + 'static,
{
  pub fn new(store: Option<Arc<S>>) -> Self {
    Self { store, tasks: TaskTracker::new() }
  }

  /// Persist `fields` as an edge visit in the background.
  ///
  /// Without a store this does nothing.
  pub fn record(&self, fields: VisitFields) {
    let Some(store) = self.store.clone() else {
      return;
    };

    self.tasks.spawn(async move {
      match store.append(NewVisit::edge(fields)).await {
        Ok(record) => tracing::debug!(
          id = record.id,
          path = %record.fields.path,
          status = %record.fields.response_code,
          "visit recorded"
        ),
        Err(e) => tracing::warn!(error = %e, "visit recording failed"),
      }
    });
  }

  /// Number of writes not yet finished.
  pub fn in_flight(&self) -> usize { self.tasks.len() }

  /// Wait for every write spawned so far, then keep accepting new ones.
  pub async fn flush(&self) {
    self.tasks.close();
    self.tasks.wait().await;
    self.tasks.reopen();
  }

  /// Wait for every outstanding write. Call once the listener has stopped.
  pub async fn shutdown(&self) {
    self.tasks.close();
    self.tasks.wait().await;
  }
}
