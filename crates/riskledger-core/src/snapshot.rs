//! Snapshots: immutable point-in-time copies of a master's mutable values.
//!
//! Snapshots are append-only. Corrections are made by capturing a newer
//! snapshot; nothing ever edits history.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  kind::{CapturedBy, EntityKind},
  master::{CurrentState, IssueState, MasterRecord, RiskState},
  period::{bi_week_period, month_string, whole_days_between},
  trend::TrendField,
};

// ─── Values ──────────────────────────────────────────────────────────────────

/// Snapshot values of an issue: its state plus classification and age.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueValues {
  pub state:        IssueState,
  pub category:     Option<String>,
  pub sub_category: Option<String>,
  /// Whole days between master creation and the snapshot.
  pub days_open:    i64,
}

/// The kind-specific values recorded in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SnapshotValues {
  Risk(RiskState),
  Issue(IssueValues),
}

impl SnapshotValues {
  /// Values for a snapshot of `master` taken at `at`, read from its current
  /// state.
  pub fn from_master(master: &MasterRecord, at: DateTime<Utc>) -> Self {
    match &master.current {
      CurrentState::Risk(r) => Self::Risk(r.clone()),
      CurrentState::Issue(i) => Self::Issue(IssueValues {
        state:        i.clone(),
        category:     master.category.clone(),
        sub_category: master.sub_category.clone(),
        days_open:    whole_days_between(master.created_at, at),
      }),
    }
  }

  pub fn kind(&self) -> EntityKind {
    match self {
      Self::Risk(_) => EntityKind::Risk,
      Self::Issue(_) => EntityKind::Issue,
    }
  }

  pub fn status(&self) -> &str {
    match self {
      Self::Risk(r) => &r.status,
      Self::Issue(i) => &i.state.status,
    }
  }

  /// The numeric value of `field`, or `None` when it is absent on this
  /// snapshot or does not apply to its kind.
  pub fn numeric(&self, field: TrendField) -> Option<f64> {
    match (self, field) {
      (Self::Risk(r), TrendField::Probability) => Some(r.probability),
      (Self::Risk(r), TrendField::ImpactRating) => Some(r.impact_rating),
      (Self::Risk(r), TrendField::ImpactValue) => Some(r.impact_value),
      (Self::Risk(r), TrendField::Emv) => Some(r.emv),
      (Self::Risk(r), TrendField::RiskScore) => Some(r.risk_score),
      (Self::Risk(r), TrendField::BudgetContingency) => Some(r.budget_contingency),
      (Self::Issue(i), TrendField::ImpactValue) => i.state.impact_value,
      (Self::Issue(i), TrendField::DaysOpen) => Some(i.days_open as f64),
      _ => None,
    }
  }
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// An immutable, timestamped copy of a master's values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
  pub snapshot_id:          Uuid,
  /// Application-level reference to [`MasterRecord::entity_id`].
  pub entity_id:            String,
  pub snapshot_date:        DateTime<Utc>,
  /// `"YYYY-MM"`, derived from `snapshot_date`.
  pub month:                String,
  /// `"YYYY-MM-W1"` / `"YYYY-MM-W2"`, derived from `snapshot_date`.
  pub bi_week_period:       String,
  pub values:               SnapshotValues,
  /// Tracked fields that differ from the previous snapshot. `None` for the
  /// first snapshot of an entity and when nothing changed.
  pub changed_fields:       Option<BTreeSet<String>>,
  /// The snapshot this one was diffed against. Lookup only.
  pub previous_snapshot_id: Option<Uuid>,
  pub captured_by:          CapturedBy,
  pub notes:                Option<String>,
}

impl Snapshot {
  /// A fresh snapshot of `values` taken at `at`, with period keys derived
  /// and no predecessor.
  pub fn new(
    entity_id: impl Into<String>,
    at: DateTime<Utc>,
    values: SnapshotValues,
    captured_by: CapturedBy,
  ) -> Self {
    Self {
      snapshot_id: Uuid::new_v4(),
      entity_id: entity_id.into(),
      snapshot_date: at,
      month: month_string(at),
      bi_week_period: bi_week_period(at),
      values,
      changed_fields: None,
      previous_snapshot_id: None,
      captured_by,
      notes: None,
    }
  }

  #[must_use]
  pub fn with_notes(mut self, notes: Option<String>) -> Self {
    self.notes = notes;
    self
  }

  /// Link this snapshot to its predecessor and record the delta. An empty
  /// delta is stored as `None`.
  #[must_use]
  pub fn following(
    mut self,
    previous_id: Uuid,
    changed: BTreeSet<String>,
  ) -> Self {
    self.previous_snapshot_id = Some(previous_id);
    self.changed_fields = (!changed.is_empty()).then_some(changed);
    self
  }

  pub fn kind(&self) -> EntityKind { self.values.kind() }
}
