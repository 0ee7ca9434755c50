//! Core types and trait definitions for the riskledger snapshot subsystem.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! holds the master / snapshot data model, the pure helpers the jobs are
//! built from (period bucketing, identifier formatting, change detection,
//! legacy-record mapping), and the [`store::SnapshotStore`] abstraction that
//! storage backends implement.

pub mod diff;
pub mod entity_id;
pub mod error;
pub mod kind;
pub mod legacy;
pub mod master;
pub mod period;
pub mod report;
pub mod snapshot;
pub mod store;
pub mod trend;

pub use error::{Error, Result};
