//! SQLite backend for the Tally visit log.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod encode;
mod predicate;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use predicate::Predicate;
pub use store::SqliteStore;
