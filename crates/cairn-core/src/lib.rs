//! Core types and algorithms for the Cairn knowledge-accumulation engine.
//!
//! This crate is deliberately free of database dependencies. It decides what
//! happens to a finding (duplicate, cluster member, claim evidence,
//! contradiction); `cairn-store-sqlite` makes those decisions durable.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod claim;
pub mod cluster;
pub mod config;
pub mod contradiction;
pub mod dedup;
pub mod error;
pub mod finding;
pub mod normalize;
pub mod outcome;
pub mod progress;
pub mod scoring;
pub mod store;

pub use error::{Error, Result};
