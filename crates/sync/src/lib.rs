//! Synchronisation between in-memory collections and the remote datastore.
//!
//! A [`Collection`] owns the local copy of one domain table. Mutations apply
//! to the local copy immediately and are queued for a best-effort remote
//! write; failures are logged and published on the [`EventBus`] but never
//! rolled back locally. Each collection has exactly one writer task, so
//! writes to a table reach the datastore in the order they were made.
//!
//! The datastore itself sits behind [`RemoteTable`], with implementations for
//! direct Postgres ([`postgres`]), the hosted PostgREST gateway ([`rest`]) and
//! an in-process table ([`memory`]).
//!
//! [`EventBus`]: agency_events::EventBus

pub mod audit;
pub mod collection;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod remote;
pub mod rest;
pub mod workspace;
pub mod writer;

pub use audit::{AuditEvent, AuditPage, AuditQuery, AuditTrail, IntegrityCheckResult};
pub use collection::{Collection, LoadReport, Placed, Placement};
pub use error::SyncError;
pub use remote::{RemoteTable, TableSource, WriteOp};
pub use workspace::{LoadSummary, Workspace};
pub use writer::RetryPolicy;
