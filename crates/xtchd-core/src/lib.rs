//! Core types for xtchd, a tamper-evident, append-only archive of
//! journalistic material.
//!
//! Every record (author, article, paragraph, image, YouTube channel and
//! video, and the reference edges between them) sits in its own hash chain:
//! each row carries the SHA-256 of its predecessor and of its own canonical
//! form, so any reader can recompute the chain and prove nothing was edited.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! [`archive::Archive`] holds the chains and their indexes in memory;
//! durable backends implement [`store::XtchdStore`] on top of it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod archive;
pub mod canonical;
pub mod chain;
pub mod compose;
pub mod entity;
pub mod error;
pub mod fulltext;
pub mod ledger;
pub mod record;
pub mod sidecar;
pub mod store;
pub mod topic;
pub mod views;
pub mod xref;

pub use error::{Error, Result};
