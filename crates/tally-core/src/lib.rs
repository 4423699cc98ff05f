//! Core types and trait definitions for the Tally visit log.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod beacon;
pub mod edge;
pub mod error;
pub mod query;
pub mod store;
pub mod timestamp;
pub mod tracking;
pub mod visit;

pub use error::{Error, Result};
