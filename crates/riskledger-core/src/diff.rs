//! Field-level change detection between consecutive snapshots.
//!
//! Only a fixed set of tracked fields participates:
//!
//! | kind  | tracked fields |
//! |-------|----------------|
//! | risk  | `status`, `probability`, `emv`, `riskScore` |
//! | issue | `status`, `priority`, `impact`, `impactValue`, `response` |
//!
//! Strings compare exactly. Numbers compare under a [`ChangeTolerance`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::snapshot::SnapshotValues;

pub const RISK_TRACKED_FIELDS: [&str; 4] = ["status", "probability", "emv", "riskScore"];

pub const ISSUE_TRACKED_FIELDS: [&str; 5] =
  ["status", "priority", "impact", "impactValue", "response"];

// ─── Tolerance ───────────────────────────────────────────────────────────────

/// Relative tolerance applied to numeric fields.
///
/// `0.0` (the default) means exact equality.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChangeTolerance {
  pub relative: f64,
}

impl ChangeTolerance {
  pub const EXACT: Self = Self { relative: 0.0 };

  pub fn new(relative: f64) -> Self { Self { relative: relative.max(0.0) } }

  /// Whether `a` and `b` count as different values.
  pub fn differs(&self, a: f64, b: f64) -> bool {
    if a == b {
      return false;
    }
    if self.relative <= 0.0 {
      return true;
    }
    let scale = a.abs().max(b.abs());
    (a - b).abs() > self.relative * scale
  }

  fn differs_opt(&self, a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
      (Some(a), Some(b)) => self.differs(a, b),
      (None, None) => false,
      _ => true,
    }
  }
}

// ─── Delta ───────────────────────────────────────────────────────────────────

/// The tracked fields of `current` whose value differs from `previous`.
///
/// Snapshots of different kinds share no history; every tracked field of
/// `current` is reported in that case.
pub fn changed_fields(
  previous: &SnapshotValues,
  current: &SnapshotValues,
  tolerance: ChangeTolerance,
) -> BTreeSet<String> {
  let mut changed = BTreeSet::new();
  let mut mark = |field: &str, differs: bool| {
    if differs {
      changed.insert(field.to_owned());
    }
  };

  match (previous, current) {
    (SnapshotValues::Risk(p), SnapshotValues::Risk(c)) => {
      mark("status", p.status != c.status);
      mark("probability", tolerance.differs(p.probability, c.probability));
      mark("emv", tolerance.differs(p.emv, c.emv));
      mark("riskScore", tolerance.differs(p.risk_score, c.risk_score));
    }
    (SnapshotValues::Issue(p), SnapshotValues::Issue(c)) => {
      let (p, c) = (&p.state, &c.state);
      mark("status", p.status != c.status);
      mark("priority", p.priority != c.priority);
      mark("impact", p.impact != c.impact);
      mark("impactValue", tolerance.differs_opt(p.impact_value, c.impact_value));
      mark("response", p.response != c.response);
    }
    (_, SnapshotValues::Risk(_)) => {
      for field in RISK_TRACKED_FIELDS {
        mark(field, true);
      }
    }
    (_, SnapshotValues::Issue(_)) => {
      for field in ISSUE_TRACKED_FIELDS {
        mark(field, true);
      }
    }
  }

  changed
}
