//! A Redis-protocol-compatible in-memory data server.
//!
//! This crate provides the pieces of a small Redis-style server:
//!
//! - The RESP wire codec (typed frames over TCP)
//! - A key/value store with per-key TTLs
//! - Append-only streams with bounded retention and blocking reads
//!   (XADD, XRANGE, XREAD)
//! - Optimistic MULTI/EXEC transactions with WATCH-based compare-and-swap
//! - An RDB snapshot loader that rehydrates the store at startup
//!
//! Connections are served concurrently on the Tokio runtime, one task per
//! client, against engine state shared behind readers-writer locks.

pub mod commands;
pub mod config;
pub mod connection;
pub mod rdb;
pub mod resp;
pub mod server;
pub mod store;
pub mod transactions;
