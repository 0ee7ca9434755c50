//! Source of "now" for the jobs.

use chrono::{DateTime, Utc};

/// Wall clock used to stamp snapshots and derive periods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
  #[default]
  System,
  /// Always reads the same instant.
  Fixed(DateTime<Utc>),
}

impl Clock {
  pub fn now(&self) -> DateTime<Utc> {
    match self {
      Self::System => Utc::now(),
      Self::Fixed(at) => *at,
    }
  }
}
