//! Domain layer for the agency back-office.
//!
//! Holds the record payloads, the grouping/deduplication rules applied when a
//! table is loaded, the per-session undo stack and audit helpers. This crate
//! performs no I/O so that the sync layer, the HTTP server and tests can all
//! share it.

pub mod audit;
pub mod error;
pub mod grouping;
pub mod hashing;
pub mod records;
pub mod roles;
pub mod tables;
pub mod types;
pub mod undo;
