//! Trend metrics, monthly rollups, and the shapes returned to dashboards.

use std::{collections::HashMap, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result, kind::EntityKind};

/// Default trend window, in months.
pub const DEFAULT_MONTHS_BACK: u32 = 7;

// ─── Status classification ───────────────────────────────────────────────────

pub const OPEN_RISK_STATUSES: &[&str] = &["Open", "In Progress"];
pub const CLOSED_RISK_STATUSES: &[&str] = &["Closed"];
pub const MITIGATED_RISK_STATUSES: &[&str] = &["Mitigated"];

pub const OPEN_ISSUE_STATUSES: &[&str] = &["Open", "Escalated"];
pub const CLOSED_ISSUE_STATUSES: &[&str] = &["Closed"];
pub const RESOLVED_ISSUE_STATUSES: &[&str] = &["Resolved"];
pub const ESCALATED_ISSUE_STATUSES: &[&str] = &["Escalated"];
pub const CRITICAL_ISSUE_PRIORITIES: &[&str] = &["Critical", "(1) High"];

// ─── Metrics ─────────────────────────────────────────────────────────────────

/// A projection of [`RiskRollup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
pub enum RiskMetric {
  #[strum(serialize = "totalEMV")]
  TotalEmv,
  #[strum(serialize = "avgRiskScore")]
  AvgRiskScore,
  #[strum(serialize = "totalImpactValue")]
  TotalImpactValue,
  #[strum(serialize = "totalBudgetContingency")]
  TotalBudgetContingency,
  #[strum(serialize = "openRisks")]
  OpenRisks,
  #[strum(serialize = "closedRisks")]
  ClosedRisks,
  #[strum(serialize = "mitigatedRisks")]
  MitigatedRisks,
  #[strum(serialize = "totalRisks")]
  TotalRisks,
}

/// A projection of [`IssueRollup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
pub enum IssueMetric {
  #[strum(serialize = "totalIssues")]
  TotalIssues,
  #[strum(serialize = "totalImpactValue")]
  TotalImpactValue,
  #[strum(serialize = "avgDaysOpen")]
  AvgDaysOpen,
  #[strum(serialize = "openIssues")]
  OpenIssues,
  #[strum(serialize = "closedIssues")]
  ClosedIssues,
  #[strum(serialize = "resolvedIssues")]
  ResolvedIssues,
  #[strum(serialize = "criticalIssues")]
  CriticalIssues,
  #[strum(serialize = "withResponse")]
  WithResponse,
  #[strum(serialize = "escalated")]
  Escalated,
}

impl RiskMetric {
  pub fn parse(s: &str) -> Result<Self> {
    Self::from_str(s).map_err(|_| Error::UnknownMetric(s.to_owned()))
  }
}

impl IssueMetric {
  pub fn parse(s: &str) -> Result<Self> {
    Self::from_str(s).map_err(|_| Error::UnknownMetric(s.to_owned()))
  }
}

/// A numeric snapshot field that can be charted for a single entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "camelCase")]
pub enum TrendField {
  Probability,
  ImpactRating,
  ImpactValue,
  Emv,
  RiskScore,
  BudgetContingency,
  DaysOpen,
}

impl TrendField {
  pub fn parse(s: &str) -> Result<Self> {
    Self::from_str(s).map_err(|_| Error::UnknownField(s.to_owned()))
  }

  /// The field charted when none is named: days open for issues, emv
  /// otherwise.
  pub fn default_for(kind: Option<EntityKind>) -> Self {
    match kind {
      Some(EntityKind::Issue) => Self::DaysOpen,
      Some(EntityKind::Risk) | None => Self::Emv,
    }
  }
}

// ─── Rollups ─────────────────────────────────────────────────────────────────

/// One month of risk snapshots, aggregated in a single pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskRollup {
  pub month:                    String,
  pub total_risks:              u64,
  pub total_emv:                f64,
  /// `None` when no snapshot in the month carries a score.
  pub avg_risk_score:           Option<f64>,
  pub total_impact_value:       f64,
  pub total_budget_contingency: f64,
  pub open_risks:               u64,
  pub closed_risks:             u64,
  pub mitigated_risks:          u64,
}

impl RiskRollup {
  /// The value of `metric`; absent aggregates read as zero.
  pub fn metric(&self, metric: RiskMetric) -> f64 {
    match metric {
      RiskMetric::TotalEmv => self.total_emv,
      RiskMetric::AvgRiskScore => self.avg_risk_score.unwrap_or(0.0),
      RiskMetric::TotalImpactValue => self.total_impact_value,
      RiskMetric::TotalBudgetContingency => self.total_budget_contingency,
      RiskMetric::OpenRisks => self.open_risks as f64,
      RiskMetric::ClosedRisks => self.closed_risks as f64,
      RiskMetric::MitigatedRisks => self.mitigated_risks as f64,
      RiskMetric::TotalRisks => self.total_risks as f64,
    }
  }
}

/// One month of issue snapshots, aggregated in a single pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRollup {
  pub month:              String,
  pub total_issues:       u64,
  pub total_impact_value: f64,
  pub avg_days_open:      Option<f64>,
  pub open_issues:        u64,
  pub closed_issues:      u64,
  pub resolved_issues:    u64,
  pub critical_issues:    u64,
  pub with_response:      u64,
  pub escalated:          u64,
}

impl IssueRollup {
  pub fn metric(&self, metric: IssueMetric) -> f64 {
    match metric {
      IssueMetric::TotalIssues => self.total_issues as f64,
      IssueMetric::TotalImpactValue => self.total_impact_value,
      IssueMetric::AvgDaysOpen => self.avg_days_open.unwrap_or(0.0),
      IssueMetric::OpenIssues => self.open_issues as f64,
      IssueMetric::ClosedIssues => self.closed_issues as f64,
      IssueMetric::ResolvedIssues => self.resolved_issues as f64,
      IssueMetric::CriticalIssues => self.critical_issues as f64,
      IssueMetric::WithResponse => self.with_response as f64,
      IssueMetric::Escalated => self.escalated as f64,
    }
  }
}

// ─── Points and series ───────────────────────────────────────────────────────

/// A single monthly data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
  pub month: String,
  pub value: f64,
}

/// A single data point in one entity's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTrendPoint {
  pub date:  DateTime<Utc>,
  pub month: String,
  pub value: f64,
}

/// Project a series onto a month axis. Months missing from `series` read as
/// zero; months not on the axis are dropped.
pub fn align(series: &[TrendPoint], months: &[String]) -> Vec<f64> {
  let by_month: HashMap<&str, f64> =
    series.iter().map(|p| (p.month.as_str(), p.value)).collect();
  months
    .iter()
    .map(|m| by_month.get(m.as_str()).copied().unwrap_or(0.0))
    .collect()
}

/// Parallel risk series sharing one `months` axis.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTrends {
  pub emv:          Vec<f64>,
  pub risk_count:   Vec<f64>,
  pub contingency:  Vec<f64>,
  pub impact_value: Vec<f64>,
  pub months:       Vec<String>,
}

/// Parallel issue series sharing one `months` axis.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectIssueTrends {
  pub total_issues:    Vec<f64>,
  pub open_issues:     Vec<f64>,
  pub critical_issues: Vec<f64>,
  pub impact_value:    Vec<f64>,
  pub avg_days_open:   Vec<f64>,
  pub months:          Vec<String>,
}
