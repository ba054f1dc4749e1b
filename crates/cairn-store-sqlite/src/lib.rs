//! SQLite backend for the Cairn knowledge store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on dedicated
//! connection threads without blocking the async runtime. The single writer
//! connection is what serializes ingest transactions.

mod cache;
mod encode;
mod ingest;
mod queries;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
