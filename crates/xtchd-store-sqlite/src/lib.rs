//! SQLite backend for the xtchd archive.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The database is the durable journal;
//! reads are served from the in-memory [`xtchd_core::archive::Archive`] that
//! is rebuilt, and re-verified, every time the store is opened.

mod encode;
mod schema;
mod store;
mod table;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
