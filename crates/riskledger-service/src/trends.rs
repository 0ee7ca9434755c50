//! Read-side aggregation of snapshots into dashboard series.

use std::sync::Arc;

use riskledger_core::{
  kind::EntityKind,
  period::start_month,
  snapshot::Snapshot,
  store::{RollupFilter, SnapshotStore},
  trend::{
    EntityTrendPoint, IssueMetric, ProjectIssueTrends, ProjectTrends, RiskMetric,
    TrendField, TrendPoint, align,
  },
};

use crate::{Clock, Error, Result};

pub struct TrendAggregator<S> {
  store: Arc<S>,
  clock: Clock,
}

impl<S: SnapshotStore> TrendAggregator<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store, clock: Clock::System } }

  #[must_use]
  pub fn with_clock(mut self, clock: Clock) -> Self {
    self.clock = clock;
    self
  }

  fn filter(&self, project_code: Option<String>, months_back: u32) -> RollupFilter {
    RollupFilter {
      start_month: start_month(self.clock.now(), months_back),
      project_code,
    }
  }

  // ─── Single metric ────────────────────────────────────────────────────────

  /// One metric per month, by metric name, for either kind.
  pub async fn monthly_trend(
    &self,
    kind: EntityKind,
    metric: &str,
    project_code: Option<String>,
    months_back: u32,
  ) -> Result<Vec<TrendPoint>> {
    match kind {
      EntityKind::Risk => {
        let metric = RiskMetric::parse(metric)?;
        self.risk_monthly_trend(metric, project_code, months_back).await
      }
      EntityKind::Issue => {
        let metric = IssueMetric::parse(metric)?;
        self.issue_monthly_trend(metric, project_code, months_back).await
      }
    }
  }

  pub async fn risk_monthly_trend(
    &self,
    metric: RiskMetric,
    project_code: Option<String>,
    months_back: u32,
  ) -> Result<Vec<TrendPoint>> {
    let rollups = self
      .store
      .risk_rollups(self.filter(project_code, months_back))
      .await
      .map_err(Error::store)?;

    Ok(
      rollups
        .into_iter()
        .map(|r| TrendPoint { value: r.metric(metric), month: r.month })
        .collect(),
    )
  }

  pub async fn issue_monthly_trend(
    &self,
    metric: IssueMetric,
    project_code: Option<String>,
    months_back: u32,
  ) -> Result<Vec<TrendPoint>> {
    let rollups = self
      .store
      .issue_rollups(self.filter(project_code, months_back))
      .await
      .map_err(Error::store)?;

    Ok(
      rollups
        .into_iter()
        .map(|r| TrendPoint { value: r.metric(metric), month: r.month })
        .collect(),
    )
  }

  // ─── Dashboards ───────────────────────────────────────────────────────────

  /// Portfolio-wide risk series. The `months` axis is taken from the EMV
  /// series; the others are aligned onto it.
  pub async fn project_trends(&self, months_back: u32) -> Result<ProjectTrends> {
    let (emv, risk_count, contingency, impact_value) = tokio::try_join!(
      self.risk_monthly_trend(RiskMetric::TotalEmv, None, months_back),
      self.risk_monthly_trend(RiskMetric::TotalRisks, None, months_back),
      self.risk_monthly_trend(RiskMetric::TotalBudgetContingency, None, months_back),
      self.risk_monthly_trend(RiskMetric::TotalImpactValue, None, months_back),
    )?;

    let months = axis(&emv);
    Ok(ProjectTrends {
      emv: align(&emv, &months),
      risk_count: align(&risk_count, &months),
      contingency: align(&contingency, &months),
      impact_value: align(&impact_value, &months),
      months,
    })
  }

  /// Portfolio-wide issue series, aligned on the total-issues months.
  pub async fn project_issue_trends(&self, months_back: u32) -> Result<ProjectIssueTrends> {
    let (total, open, critical, impact_value, days_open) = tokio::try_join!(
      self.issue_monthly_trend(IssueMetric::TotalIssues, None, months_back),
      self.issue_monthly_trend(IssueMetric::OpenIssues, None, months_back),
      self.issue_monthly_trend(IssueMetric::CriticalIssues, None, months_back),
      self.issue_monthly_trend(IssueMetric::TotalImpactValue, None, months_back),
      self.issue_monthly_trend(IssueMetric::AvgDaysOpen, None, months_back),
    )?;

    let months = axis(&total);
    Ok(ProjectIssueTrends {
      total_issues: align(&total, &months),
      open_issues: align(&open, &months),
      critical_issues: align(&critical, &months),
      impact_value: align(&impact_value, &months),
      avg_days_open: align(&days_open, &months),
      months,
    })
  }

  // ─── Single entity ────────────────────────────────────────────────────────

  /// The history of one numeric field of one entity, oldest first. Absent
  /// values read as zero.
  pub async fn entity_trend(
    &self,
    entity_id: &str,
    field: TrendField,
  ) -> Result<Vec<EntityTrendPoint>> {
    let mut snapshots = self
      .store
      .entity_snapshots(entity_id.to_owned())
      .await
      .map_err(Error::store)?;
    snapshots.sort_by_key(|s| s.snapshot_date);

    Ok(
      snapshots
        .into_iter()
        .map(|s: Snapshot| EntityTrendPoint {
          date:  s.snapshot_date,
          value: s.values.numeric(field).unwrap_or(0.0),
          month: s.month,
        })
        .collect(),
    )
  }
}

fn axis(series: &[TrendPoint]) -> Vec<String> {
  series.iter().map(|p| p.month.clone()).collect()
}
