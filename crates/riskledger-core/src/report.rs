//! Results returned by the batch jobs.
//!
//! Per-record failures are data, not errors: a job that could load its input
//! always returns one of these, whatever happened to individual records.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

/// Outcome of a migration run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
  pub masters_created:   usize,
  pub snapshots_created: usize,
  /// One message per failed record, keyed by the record's title.
  pub errors:            Vec<String>,
}

/// Outcome of a capture run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CaptureReport {
  pub created: usize,
  /// Masters that already had a snapshot for the current period.
  pub skipped: usize,
  pub failed:  usize,
}

impl AddAssign for CaptureReport {
  fn add_assign(&mut self, rhs: Self) {
    self.created += rhs.created;
    self.skipped += rhs.skipped;
    self.failed += rhs.failed;
  }
}
