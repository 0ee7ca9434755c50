//! Batch jobs and read models over a [`SnapshotStore`].
//!
//! Every job holds its store as an explicit `Arc<S>` handed in at
//! construction, plus a [`Clock`] so that period bucketing can be pinned in
//! tests.
//!
//! [`SnapshotStore`]: riskledger_core::store::SnapshotStore

pub mod clock;
pub mod error;
pub mod migration;
pub mod snapshots;
pub mod trends;

pub use clock::Clock;
pub use error::{Error, Result};
pub use migration::MigrationJob;
pub use snapshots::SnapshotService;
pub use trends::TrendAggregator;

#[cfg(test)]
mod tests;
