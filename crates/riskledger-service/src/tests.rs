//! Job tests against an in-memory `SqliteStore`.

use std::{collections::BTreeSet, sync::Arc};

use chrono::{DateTime, TimeZone, Utc};
use riskledger_core::{
  diff::ChangeTolerance,
  kind::{CapturedBy, EntityKind},
  legacy::LegacyDocument,
  master::{CurrentState, IssueState, MasterRecord, NewMaster, RiskState},
  report::CaptureReport,
  snapshot::{Snapshot, SnapshotValues},
  store::{InsertOutcome, RollupFilter, SnapshotStore},
  trend::{IssueRollup, RiskMetric, RiskRollup, TrendField},
};
use riskledger_store_sqlite::{Error as StoreError, SqliteStore};
use serde_json::json;

use crate::{
  Clock, Error, MigrationJob, SnapshotService, TrendAggregator,
  migration::MIGRATION_NOTE, snapshots::CAPTURE_NOTE,
};

async fn store() -> Arc<SqliteStore> {
  Arc::new(SqliteStore::open_in_memory().await.expect("in-memory store"))
}

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap()
}

fn migration(store: &Arc<SqliteStore>, now: DateTime<Utc>) -> MigrationJob<SqliteStore> {
  MigrationJob::new(store.clone()).with_clock(Clock::Fixed(now))
}

fn service(store: &Arc<SqliteStore>, now: DateTime<Utc>) -> SnapshotService<SqliteStore> {
  SnapshotService::new(store.clone()).with_clock(Clock::Fixed(now))
}

fn trends(store: &Arc<SqliteStore>, now: DateTime<Utc>) -> TrendAggregator<SqliteStore> {
  TrendAggregator::new(store.clone()).with_clock(Clock::Fixed(now))
}

async fn seed_risk(store: &SqliteStore, title: &str, project: &str, probability: f64) {
  store
    .insert_legacy(
      EntityKind::Risk,
      json!({
        "Title": title,
        "Project Code": project,
        "Risk Status": "Open",
        "Probability": probability,
        "Impact Rating (0.05-0.8)": 0.4,
        "Impact Value ($)": 10000.0,
      }),
    )
    .await
    .unwrap();
}

fn risk_input(project: &str, title: &str) -> NewMaster {
  NewMaster {
    project_code: project.into(),
    title:        title.into(),
    description:  None,
    category:     None,
    sub_category: None,
    created_at:   None,
    created_by:   None,
    current:      CurrentState::Risk(RiskState::new("Open", 0.5, 0.2, 2_000.0)),
  }
}

fn risk_snapshot(entity_id: &str, when: DateTime<Utc>, impact_value: f64) -> Snapshot {
  let state = RiskState::new("Open", 1.0, 0.2, impact_value);
  Snapshot::new(entity_id, when, SnapshotValues::Risk(state), CapturedBy::Auto)
}

// ─── Migration ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn migration_numbers_each_project_from_one() {
  let s = store().await;
  seed_risk(&s, "Crane", "EPC7", 0.5).await;
  seed_risk(&s, "Permits", "OPS", 0.2).await;
  seed_risk(&s, "Weather", "EPC7", 0.1).await;

  let report = migration(&s, at(2025, 1, 3)).run(EntityKind::Risk).await.unwrap();
  assert_eq!(report.masters_created, 3);
  assert_eq!(report.snapshots_created, 3);
  assert!(report.errors.is_empty());

  let weather = s.get_master("EPC7-R002".into()).await.unwrap().unwrap();
  assert_eq!(weather.title, "Weather");
  let permits = s.get_master("OPS-R001".into()).await.unwrap().unwrap();
  assert_eq!(permits.title, "Permits");

  let CurrentState::Risk(crane) = s.get_master("EPC7-R001".into()).await.unwrap().unwrap().current
  else {
    panic!("expected risk state");
  };
  assert_eq!(crane.emv, 5_000.0);
  assert_eq!(crane.risk_score, 0.2);
}

#[tokio::test]
async fn migration_writes_an_initial_snapshot_per_master() {
  let s = store().await;
  seed_risk(&s, "Crane", "EPC7", 0.5).await;
  migration(&s, at(2025, 1, 3)).run(EntityKind::Risk).await.unwrap();

  let snaps = s.entity_snapshots("EPC7-R001".into()).await.unwrap();
  assert_eq!(snaps.len(), 1);
  let snap = &snaps[0];
  assert_eq!(snap.captured_by, CapturedBy::Migration);
  assert_eq!(snap.notes.as_deref(), Some(MIGRATION_NOTE));
  assert_eq!(snap.bi_week_period, "2025-01-W1");
  assert!(snap.changed_fields.is_none());
  assert!(snap.previous_snapshot_id.is_none());
}

#[tokio::test]
async fn migration_isolates_bad_records_without_id_gaps() {
  let s = store().await;
  seed_risk(&s, "Good one", "EPC7", 0.5).await;
  s.insert_legacy(EntityKind::Risk, json!({ "Project Code": "EPC7" })).await.unwrap();
  s.insert_legacy(
    EntityKind::Risk,
    json!({ "Title": "Bad probability", "Project Code": "EPC7", "Probability": "high" }),
  )
  .await
  .unwrap();
  seed_risk(&s, "Good two", "EPC7", 0.5).await;

  let report = migration(&s, at(2025, 1, 3)).run(EntityKind::Risk).await.unwrap();
  assert_eq!(report.masters_created, 2);
  assert_eq!(report.errors.len(), 2);
  assert!(report.errors[0].contains("<untitled>"));
  assert!(report.errors[1].contains("\"Bad probability\""));

  let second = s.get_master("EPC7-R002".into()).await.unwrap().unwrap();
  assert_eq!(second.title, "Good two");
  assert!(s.get_master("EPC7-R003".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn issue_migration_partitions_by_project_name() {
  let s = store().await;
  s.insert_legacy(
    EntityKind::Issue,
    json!({
      "Title": "Vendor late",
      "ProjectName": "OPS",
      "Status": "Escalated",
      "Priority": "Critical",
      "Category": "Supply",
      "createdAt": "2025-01-01T09:30:00Z",
    }),
  )
  .await
  .unwrap();
  s.insert_legacy(EntityKind::Issue, json!({ "Title": "No project" })).await.unwrap();

  let report = migration(&s, at(2025, 1, 11)).run(EntityKind::Issue).await.unwrap();
  assert_eq!(report.masters_created, 2);

  let snaps = s.entity_snapshots("OPS-I001".into()).await.unwrap();
  let SnapshotValues::Issue(values) = &snaps[0].values else {
    panic!("expected issue values");
  };
  assert_eq!(values.days_open, 10);
  assert_eq!(values.category.as_deref(), Some("Supply"));

  let orphan = s.get_master("UNKNOWN-I001".into()).await.unwrap().unwrap();
  assert_eq!(orphan.current.status(), "Open");
}

#[tokio::test]
async fn rerunning_migration_allocates_fresh_ids() {
  let s = store().await;
  seed_risk(&s, "Crane", "EPC7", 0.5).await;

  migration(&s, at(2025, 1, 3)).run(EntityKind::Risk).await.unwrap();
  let again = migration(&s, at(2025, 1, 3)).run(EntityKind::Risk).await.unwrap();

  assert_eq!(again.masters_created, 1);
  assert!(again.errors.is_empty());
  let duplicate = s.get_master("EPC7-R002".into()).await.unwrap().unwrap();
  assert_eq!(duplicate.title, "Crane");
}

#[tokio::test]
async fn migration_accepts_date_only_values() {
  let s = store().await;
  s.insert_legacy(
    EntityKind::Risk,
    json!({
      "Title": "Imported",
      "Project Code": "EPC7",
      "Probability": 0.5,
      "DueDate": "2025-03-01",
    }),
  )
  .await
  .unwrap();
  s.insert_legacy(
    EntityKind::Issue,
    json!({
      "Title": "Imported",
      "ProjectName": "EPC7",
      "Due Date": "2025-03-01",
      "createdAt": "2025-01-01",
    }),
  )
  .await
  .unwrap();

  let job = migration(&s, at(2025, 1, 11));
  let risks = job.run(EntityKind::Risk).await.unwrap();
  let issues = job.run(EntityKind::Issue).await.unwrap();
  assert_eq!((risks.masters_created, risks.snapshots_created), (1, 1));
  assert_eq!((issues.masters_created, issues.snapshots_created), (1, 1));
  assert!(risks.errors.is_empty() && issues.errors.is_empty());

  let due = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
  let CurrentState::Risk(risk) = s.get_master("EPC7-R001".into()).await.unwrap().unwrap().current
  else {
    panic!("expected risk state");
  };
  assert_eq!(risk.due_date, Some(due));

  let issue = s.get_master("EPC7-I001".into()).await.unwrap().unwrap();
  assert_eq!(issue.created_at, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
  let snaps = s.entity_snapshots("EPC7-I001".into()).await.unwrap();
  let SnapshotValues::Issue(values) = &snaps[0].values else {
    panic!("expected issue values");
  };
  assert_eq!(values.state.due_date, Some(due));
  assert_eq!(values.days_open, 10);
}

// ─── Single-entity snapshots ─────────────────────────────────────────────────

#[tokio::test]
async fn changed_fields_track_status_only() {
  let s = store().await;
  seed_risk(&s, "Crane", "EPC7", 0.5).await;
  migration(&s, at(2025, 1, 3)).run(EntityKind::Risk).await.unwrap();
  let initial = s.entity_snapshots("EPC7-R001".into()).await.unwrap().remove(0);

  let master = s.get_master("EPC7-R001".into()).await.unwrap().unwrap();
  let CurrentState::Risk(mut state) = master.current else {
    panic!("expected risk state");
  };
  state.status = "Closed".into();

  let snap = service(&s, at(2025, 1, 10))
    .record_change("EPC7-R001", CurrentState::Risk(state), Some("closed out".into()))
    .await
    .unwrap();

  let expected: BTreeSet<String> = ["status".to_owned()].into();
  assert_eq!(snap.changed_fields, Some(expected));
  assert_eq!(snap.previous_snapshot_id, Some(initial.snapshot_id));
  assert_eq!(snap.captured_by, CapturedBy::Manual);

  let master = s.get_master("EPC7-R001".into()).await.unwrap().unwrap();
  assert_eq!(master.current.status(), "Closed");
}

#[tokio::test]
async fn unchanged_snapshot_has_no_changed_fields() {
  let s = store().await;
  seed_risk(&s, "Crane", "EPC7", 0.5).await;
  migration(&s, at(2025, 1, 3)).run(EntityKind::Risk).await.unwrap();

  let snap = service(&s, at(2025, 1, 20))
    .create_snapshot("EPC7-R001", CapturedBy::Manual, None)
    .await
    .unwrap();
  assert!(snap.changed_fields.is_none());
  assert!(snap.previous_snapshot_id.is_some());
}

#[tokio::test]
async fn tolerance_suppresses_float_noise() {
  let s = store().await;
  let svc = service(&s, at(2025, 1, 3));
  let master = svc.register_master(risk_input("P", "Noise")).await.unwrap();

  let state = RiskState::new("Open", 0.5 + 1e-12, 0.2, 2_000.0);
  let snap = service(&s, at(2025, 1, 4))
    .with_tolerance(ChangeTolerance::new(1e-9))
    .record_change(&master.entity_id, CurrentState::Risk(state), None)
    .await
    .unwrap();
  assert!(snap.changed_fields.is_none());
}

#[tokio::test]
async fn snapshot_of_missing_master_is_not_found() {
  let s = store().await;
  let err = service(&s, at(2025, 1, 3))
    .create_snapshot("NOPE-R001", CapturedBy::Manual, None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::MasterNotFound(id) if id == "NOPE-R001"));
}

#[tokio::test]
async fn racing_periodic_snapshot_is_rejected() {
  let s = store().await;
  let master = service(&s, at(2025, 2, 1))
    .register_master(risk_input("P", "Race"))
    .await
    .unwrap();

  // Another run already wrote this period's automatic snapshot.
  let outcome = s
    .insert_snapshot(risk_snapshot(&master.entity_id, at(2025, 2, 2), 5.0))
    .await
    .unwrap();
  assert_eq!(outcome, InsertOutcome::Inserted);

  let err = service(&s, at(2025, 2, 3))
    .create_snapshot(&master.entity_id, CapturedBy::Auto, None)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::DuplicatePeriodSnapshot { ref period, .. } if period == "2025-02-W1"
  ));
}

// ─── Masters ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_master_allocates_id_and_first_snapshot() {
  let s = store().await;
  let svc = service(&s, at(2025, 3, 1));
  let first = svc.register_master(risk_input(" P ", "One")).await.unwrap();
  let second = svc.register_master(risk_input("P", "Two")).await.unwrap();

  assert_eq!(first.entity_id, "P-R001");
  assert_eq!(second.entity_id, "P-R002");
  assert_eq!(first.project_code, "P");

  let snaps = s.entity_snapshots("P-R001".into()).await.unwrap();
  assert_eq!(snaps.len(), 1);
  assert_eq!(snaps[0].captured_by, CapturedBy::Manual);
}

#[tokio::test]
async fn register_master_requires_a_title() {
  let s = store().await;
  let err = service(&s, at(2025, 3, 1))
    .register_master(risk_input("P", "  "))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(riskledger_core::Error::MissingField("title"))));
}

#[tokio::test]
async fn record_change_rejects_kind_mismatch() {
  let s = store().await;
  let svc = service(&s, at(2025, 3, 1));
  let master = svc.register_master(risk_input("P", "One")).await.unwrap();

  let err = svc
    .record_change(&master.entity_id, CurrentState::Issue(IssueState::new("Open")), None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::KindMismatch { .. }));
}

#[tokio::test]
async fn set_active_on_missing_master_is_not_found() {
  let s = store().await;
  let err = service(&s, at(2025, 3, 1)).set_active("P-R404", false).await.unwrap_err();
  assert!(matches!(err, Error::MasterNotFound(_)));
}

// ─── Bi-weekly capture ───────────────────────────────────────────────────────

#[tokio::test]
async fn capture_is_at_most_once_per_period() {
  let s = store().await;
  seed_risk(&s, "Crane", "EPC7", 0.5).await;
  seed_risk(&s, "Weather", "EPC7", 0.1).await;
  migration(&s, at(2025, 1, 3)).run(EntityKind::Risk).await.unwrap();

  let same_period = service(&s, at(2025, 1, 8)).capture_kind(EntityKind::Risk).await.unwrap();
  assert_eq!((same_period.created, same_period.skipped), (0, 2));

  let second_half = service(&s, at(2025, 1, 16)).capture_kind(EntityKind::Risk).await.unwrap();
  assert_eq!((second_half.created, second_half.skipped), (2, 0));

  let rerun = service(&s, at(2025, 1, 31)).capture_kind(EntityKind::Risk).await.unwrap();
  assert_eq!((rerun.created, rerun.skipped), (0, 2));

  let snaps = s.entity_snapshots("EPC7-R001".into()).await.unwrap();
  assert_eq!(snaps.len(), 2);
  assert_eq!(snaps[1].captured_by, CapturedBy::Auto);
  assert_eq!(snaps[1].notes.as_deref(), Some(CAPTURE_NOTE));
  assert_eq!(snaps[1].previous_snapshot_id, Some(snaps[0].snapshot_id));
}

#[tokio::test]
async fn capture_covers_both_kinds_and_skips_inactive() {
  let s = store().await;
  seed_risk(&s, "Crane", "EPC7", 0.5).await;
  seed_risk(&s, "Weather", "EPC7", 0.1).await;
  s.insert_legacy(EntityKind::Issue, json!({ "Title": "Vendor", "ProjectName": "EPC7" }))
    .await
    .unwrap();
  migration(&s, at(2025, 1, 3)).run(EntityKind::Risk).await.unwrap();
  migration(&s, at(2025, 1, 3)).run(EntityKind::Issue).await.unwrap();

  let svc = service(&s, at(2025, 2, 3));
  svc.set_active("EPC7-R002", false).await.unwrap();

  let report = svc.capture_bi_weekly_snapshots().await.unwrap();
  assert_eq!(report.created, 2);
  assert_eq!(report.skipped, 0);
  assert_eq!(report.failed, 0);
  assert_eq!(s.entity_snapshots("EPC7-R002".into()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_captures_write_one_snapshot_per_master() {
  let s = store().await;
  for i in 0..10 {
    seed_risk(&s, &format!("Risk {i}"), "EPC7", 0.5).await;
  }
  migration(&s, at(2025, 1, 3)).run(EntityKind::Risk).await.unwrap();

  let (first, second) = (service(&s, at(2025, 1, 20)), service(&s, at(2025, 1, 20)));
  let (a, b) = tokio::join!(
    first.capture_kind(EntityKind::Risk),
    second.capture_kind(EntityKind::Risk),
  );
  let (a, b) = (a.unwrap(), b.unwrap());

  assert_eq!(a.created + b.created, 10);
  assert_eq!(a.created + a.skipped + b.created + b.skipped, 20);
  assert_eq!(a.failed + b.failed, 0);

  for master in s.list_active_masters(EntityKind::Risk).await.unwrap() {
    let in_w2 = s
      .entity_snapshots(master.entity_id.clone())
      .await
      .unwrap()
      .into_iter()
      .filter(|snap| snap.bi_week_period == "2025-01-W2")
      .count();
    assert_eq!(in_w2, 1, "{}", master.entity_id);
  }
}

/// Delegates to SQLite but never reports a period as taken, so the capture
/// job always reaches the insert.
struct PeriodBlindStore(SqliteStore);

impl SnapshotStore for PeriodBlindStore {
  type Error = StoreError;

  async fn load_legacy(&self, kind: EntityKind) -> Result<Vec<LegacyDocument>, StoreError> {
    self.0.load_legacy(kind).await
  }

  async fn allocate_entity_id(
    &self,
    project_code: String,
    kind: EntityKind,
  ) -> Result<String, StoreError> {
    self.0.allocate_entity_id(project_code, kind).await
  }

  async fn insert_master(&self, master: MasterRecord) -> Result<(), StoreError> {
    self.0.insert_master(master).await
  }

  async fn get_master(&self, entity_id: String) -> Result<Option<MasterRecord>, StoreError> {
    self.0.get_master(entity_id).await
  }

  async fn list_active_masters(&self, kind: EntityKind) -> Result<Vec<MasterRecord>, StoreError> {
    self.0.list_active_masters(kind).await
  }

  async fn set_active(&self, entity_id: String, active: bool) -> Result<bool, StoreError> {
    self.0.set_active(entity_id, active).await
  }

  async fn insert_snapshot(&self, snapshot: Snapshot) -> Result<InsertOutcome, StoreError> {
    self.0.insert_snapshot(snapshot).await
  }

  async fn commit_state_change(
    &self,
    state: CurrentState,
    snapshot: Snapshot,
  ) -> Result<InsertOutcome, StoreError> {
    self.0.commit_state_change(state, snapshot).await
  }

  async fn latest_snapshot_before(
    &self,
    entity_id: String,
    before: DateTime<Utc>,
  ) -> Result<Option<Snapshot>, StoreError> {
    self.0.latest_snapshot_before(entity_id, before).await
  }

  async fn has_snapshot_in_period(
    &self,
    _entity_id: String,
    _bi_week_period: String,
  ) -> Result<bool, StoreError> {
    Ok(false)
  }

  async fn entity_snapshots(&self, entity_id: String) -> Result<Vec<Snapshot>, StoreError> {
    self.0.entity_snapshots(entity_id).await
  }

  async fn risk_rollups(&self, filter: RollupFilter) -> Result<Vec<RiskRollup>, StoreError> {
    self.0.risk_rollups(filter).await
  }

  async fn issue_rollups(&self, filter: RollupFilter) -> Result<Vec<IssueRollup>, StoreError> {
    self.0.issue_rollups(filter).await
  }
}

#[tokio::test]
async fn capture_rejected_at_insert_counts_as_skipped() {
  let s = store().await;
  seed_risk(&s, "Crane", "EPC7", 0.5).await;
  migration(&s, at(2025, 1, 20)).run(EntityKind::Risk).await.unwrap();

  let blind = Arc::new(PeriodBlindStore(SqliteStore::clone(&s)));
  let report = SnapshotService::new(blind)
    .with_clock(Clock::Fixed(at(2025, 1, 21)))
    .capture_kind(EntityKind::Risk)
    .await
    .unwrap();

  assert_eq!(report, CaptureReport { created: 0, skipped: 1, failed: 0 });
  assert_eq!(s.entity_snapshots("EPC7-R001".into()).await.unwrap().len(), 1);
}

// ─── Trends ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn project_trends_sum_by_month() {
  let s = store().await;
  for (id, value) in [("P-R001", 100.0), ("P-R002", 200.0), ("P-R003", 300.0)] {
    s.insert_snapshot(risk_snapshot(id, at(2025, 1, 10), value)).await.unwrap();
  }
  s.insert_snapshot(risk_snapshot("P-R001", at(2025, 2, 10), 50.0)).await.unwrap();
  s.insert_snapshot(risk_snapshot("P-R001", at(2024, 12, 10), 7.0)).await.unwrap();

  let result = trends(&s, at(2025, 3, 15)).project_trends(2).await.unwrap();
  assert_eq!(result.months, ["2025-01", "2025-02"]);
  assert_eq!(result.emv, [600.0, 50.0]);
  assert_eq!(result.risk_count, [3.0, 1.0]);
  assert_eq!(result.impact_value, [600.0, 50.0]);
  assert_eq!(result.contingency, [0.0, 0.0]);
}

#[tokio::test]
async fn project_issue_trends_align_on_total_issues() {
  let s = store().await;
  s.insert_legacy(
    EntityKind::Issue,
    json!({ "Title": "A", "ProjectName": "OPS", "Priority": "Critical", "Impact ($)": 40.0 }),
  )
  .await
  .unwrap();
  s.insert_legacy(EntityKind::Issue, json!({ "Title": "B", "ProjectName": "OPS", "Status": "Closed" }))
    .await
    .unwrap();
  migration(&s, at(2025, 3, 2)).run(EntityKind::Issue).await.unwrap();

  let result = trends(&s, at(2025, 3, 20)).project_issue_trends(1).await.unwrap();
  assert_eq!(result.months, ["2025-03"]);
  assert_eq!(result.total_issues, [2.0]);
  assert_eq!(result.open_issues, [1.0]);
  assert_eq!(result.critical_issues, [1.0]);
  assert_eq!(result.impact_value, [40.0]);
  assert_eq!(result.avg_days_open, [0.0]);
}

#[tokio::test]
async fn monthly_trend_filters_by_project() {
  let s = store().await;
  s.insert_snapshot(risk_snapshot("EPC-R001", at(2025, 1, 10), 10.0)).await.unwrap();
  s.insert_snapshot(risk_snapshot("OPS-R001", at(2025, 1, 10), 90.0)).await.unwrap();

  let agg = trends(&s, at(2025, 1, 20));
  let points = agg
    .risk_monthly_trend(RiskMetric::TotalEmv, Some("EPC".into()), 1)
    .await
    .unwrap();
  assert_eq!(points.len(), 1);
  assert_eq!(points[0].value, 10.0);

  let by_name = agg
    .monthly_trend(EntityKind::Risk, "openRisks", None, 1)
    .await
    .unwrap();
  assert_eq!(by_name[0].value, 2.0);
}

#[tokio::test]
async fn monthly_trend_rejects_metric_of_other_kind() {
  let s = store().await;
  let err = trends(&s, at(2025, 1, 20))
    .monthly_trend(EntityKind::Risk, "totalIssues", None, 1)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(riskledger_core::Error::UnknownMetric(_))));
}

#[tokio::test]
async fn entity_trend_is_oldest_first() {
  let s = store().await;
  s.insert_snapshot(risk_snapshot("P-R001", at(2025, 3, 2), 30.0)).await.unwrap();
  s.insert_snapshot(risk_snapshot("P-R001", at(2025, 1, 2), 10.0)).await.unwrap();
  s.insert_snapshot(risk_snapshot("P-R001", at(2025, 2, 2), 20.0)).await.unwrap();

  let points = trends(&s, at(2025, 4, 1))
    .entity_trend("P-R001", TrendField::Emv)
    .await
    .unwrap();
  let values: Vec<_> = points.iter().map(|p| p.value).collect();
  assert_eq!(values, [10.0, 20.0, 30.0]);
  assert_eq!(points[0].month, "2025-01");

  let days = trends(&s, at(2025, 4, 1))
    .entity_trend("P-R001", TrendField::DaysOpen)
    .await
    .unwrap();
  assert!(days.iter().all(|p| p.value == 0.0));
}

#[tokio::test]
async fn malformed_entity_id_is_rejected() {
  let s = store().await;
  let err = service(&s, at(2025, 3, 1))
    .create_snapshot("not-an-id", CapturedBy::Manual, None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(riskledger_core::Error::InvalidEntityId(_))));
}
