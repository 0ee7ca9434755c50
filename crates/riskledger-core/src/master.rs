//! Master records, one durable "current state" record per tracked item.
//!
//! A master's descriptive text is fixed at creation. Its [`CurrentState`] is
//! a denormalised cache of the latest known values; it is only refreshed
//! together with a snapshot capture, never on its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kind::EntityKind;

/// Status assigned to items whose source record carries none.
pub const DEFAULT_STATUS: &str = "Open";

// ─── Current state ───────────────────────────────────────────────────────────

/// Mutable values of a risk.
///
/// `emv` and `risk_score` are derived; [`RiskState::with_derived`] recomputes
/// them from the inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskState {
  pub status:             String,
  #[serde(default)]
  pub probability:        f64,
  /// Dimensionless severity in `0.05..=0.8`.
  #[serde(default)]
  pub impact_rating:      f64,
  /// Financial impact in currency units.
  #[serde(default)]
  pub impact_value:       f64,
  /// Expected monetary value: `probability × impact_value`.
  #[serde(default)]
  pub emv:                f64,
  /// `probability × impact_rating`.
  #[serde(default)]
  pub risk_score:         f64,
  #[serde(default)]
  pub budget_contingency: f64,
  pub owner:              Option<String>,
  pub due_date:           Option<DateTime<Utc>>,
  pub mitigation_plan:    Option<String>,
  pub contingency_plan:   Option<String>,
}

impl RiskState {
  /// A risk state with the given inputs and no optional text.
  pub fn new(
    status: impl Into<String>,
    probability: f64,
    impact_rating: f64,
    impact_value: f64,
  ) -> Self {
    Self {
      status: status.into(),
      probability,
      impact_rating,
      impact_value,
      emv: 0.0,
      risk_score: 0.0,
      budget_contingency: 0.0,
      owner: None,
      due_date: None,
      mitigation_plan: None,
      contingency_plan: None,
    }
    .with_derived()
  }

  /// Recompute `emv` and `risk_score` from probability and impact.
  #[must_use]
  pub fn with_derived(mut self) -> Self {
    self.emv = self.probability * self.impact_value;
    self.risk_score = self.probability * self.impact_rating;
    self
  }
}

/// Mutable values of an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueState {
  pub status:       String,
  pub priority:     Option<String>,
  /// Qualitative impact: `Low`, `Medium`, `High`.
  pub impact:       Option<String>,
  pub impact_value: Option<f64>,
  pub response:     Option<String>,
  pub owner:        Option<String>,
  pub due_date:     Option<DateTime<Utc>>,
  pub resolution:   Option<String>,
}

impl IssueState {
  pub fn new(status: impl Into<String>) -> Self {
    Self {
      status:       status.into(),
      priority:     None,
      impact:       None,
      impact_value: None,
      response:     None,
      owner:        None,
      due_date:     None,
      resolution:   None,
    }
  }
}

/// The denormalised current values of a master, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CurrentState {
  Risk(RiskState),
  Issue(IssueState),
}

impl CurrentState {
  pub fn kind(&self) -> EntityKind {
    match self {
      Self::Risk(_) => EntityKind::Risk,
      Self::Issue(_) => EntityKind::Issue,
    }
  }

  pub fn status(&self) -> &str {
    match self {
      Self::Risk(r) => &r.status,
      Self::Issue(i) => &i.status,
    }
  }

  /// Recompute any derived values. A no-op for issues.
  #[must_use]
  pub fn normalized(self) -> Self {
    match self {
      Self::Risk(r) => Self::Risk(r.with_derived()),
      other => other,
    }
  }
}

// ─── Master record ───────────────────────────────────────────────────────────

/// The canonical record for one tracked risk or issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterRecord {
  /// Allocated once; never changed and never reused.
  pub entity_id:    String,
  pub project_code: String,
  pub title:        String,
  /// Risk description or issue discussion, as of creation.
  pub description:  Option<String>,
  pub category:     Option<String>,
  pub sub_category: Option<String>,
  pub created_at:   DateTime<Utc>,
  pub created_by:   Option<String>,
  /// Only active masters are visited by the capture job.
  pub is_active:    bool,
  pub current:      CurrentState,
}

impl MasterRecord {
  pub fn kind(&self) -> EntityKind { self.current.kind() }
}

// ─── NewMaster ───────────────────────────────────────────────────────────────

/// Input for creating a master. The identifier is always allocated by the
/// store; it is not accepted from callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMaster {
  pub project_code: String,
  pub title:        String,
  pub description:  Option<String>,
  pub category:     Option<String>,
  pub sub_category: Option<String>,
  /// Creation time of the source record; defaults to now.
  pub created_at:   Option<DateTime<Utc>>,
  pub created_by:   Option<String>,
  pub current:      CurrentState,
}

impl NewMaster {
  pub fn kind(&self) -> EntityKind { self.current.kind() }

  /// Materialise an active master under `entity_id`.
  pub fn into_master(self, entity_id: String, now: DateTime<Utc>) -> MasterRecord {
    MasterRecord {
      entity_id,
      project_code: self.project_code,
      title:        self.title,
      description:  self.description,
      category:     self.category,
      sub_category: self.sub_category,
      created_at:   self.created_at.unwrap_or(now),
      created_by:   self.created_by,
      is_active:    true,
      current:      self.current.normalized(),
    }
  }
}
