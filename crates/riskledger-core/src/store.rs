//! The `SnapshotStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `riskledger-store-sqlite`). The jobs in `riskledger-service` depend on this
//! abstraction, not on any concrete backend; the handle is injected into each
//! job at construction.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  kind::EntityKind,
  legacy::LegacyDocument,
  master::{CurrentState, MasterRecord},
  snapshot::Snapshot,
  trend::{IssueRollup, RiskRollup},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for the monthly rollup queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollupFilter {
  /// Include months `>=` this `"YYYY-MM"` string.
  pub start_month:  String,
  /// Restrict to entities whose id starts with `"{project_code}-"`.
  pub project_code: Option<String>,
}

/// Result of an insert-if-absent snapshot write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
  Inserted,
  /// A periodic snapshot for the same entity and bi-weekly period already
  /// exists. Nothing was written.
  PeriodTaken,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the master and snapshot collections.
///
/// Snapshots are append-only: there is no update or delete operation for
/// them. Masters are mutated only through [`SnapshotStore::commit_state_change`]
/// and [`SnapshotStore::set_active`].
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait SnapshotStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Legacy records ────────────────────────────────────────────────────

  /// Every legacy document of `kind`, in load order.
  fn load_legacy(
    &self,
    kind: EntityKind,
  ) -> impl Future<Output = Result<Vec<LegacyDocument>, Self::Error>> + Send + '_;

  // ── Identifiers ───────────────────────────────────────────────────────

  /// Atomically allocate the next identifier for `(project_code, kind)`.
  ///
  /// Two calls never return the same id, and ids are never reused.
  fn allocate_entity_id(
    &self,
    project_code: String,
    kind: EntityKind,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;

  // ── Masters ───────────────────────────────────────────────────────────

  /// Persist a new master. Fails if the id is already taken.
  fn insert_master(
    &self,
    master: MasterRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Retrieve a master by id. Returns `None` if not found.
  fn get_master(
    &self,
    entity_id: String,
  ) -> impl Future<Output = Result<Option<MasterRecord>, Self::Error>> + Send + '_;

  /// All masters of `kind` with `is_active = true`, in id order.
  fn list_active_masters(
    &self,
    kind: EntityKind,
  ) -> impl Future<Output = Result<Vec<MasterRecord>, Self::Error>> + Send + '_;

  /// Flip a master's active flag. Returns `false` if the master does not
  /// exist.
  fn set_active(
    &self,
    entity_id: String,
    active: bool,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Snapshots ─────────────────────────────────────────────────────────

  /// Append a snapshot.
  ///
  /// Periodic snapshots (`Migration`, `Auto`) are insert-if-absent on
  /// `(entity_id, bi_week_period)`: a conflicting write is rejected with
  /// [`InsertOutcome::PeriodTaken`], never overwritten.
  fn insert_snapshot(
    &self,
    snapshot: Snapshot,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + '_;

  /// Replace a master's current state and append `snapshot` as one
  /// transaction. If the snapshot is rejected, the state is left untouched.
  fn commit_state_change(
    &self,
    state: CurrentState,
    snapshot: Snapshot,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + '_;

  /// The latest snapshot of `entity_id` taken strictly before `before`.
  fn latest_snapshot_before(
    &self,
    entity_id: String,
    before: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Snapshot>, Self::Error>> + Send + '_;

  /// Whether any snapshot of `entity_id` exists for `bi_week_period`.
  fn has_snapshot_in_period(
    &self,
    entity_id: String,
    bi_week_period: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Every snapshot of `entity_id`. Order is unspecified.
  fn entity_snapshots(
    &self,
    entity_id: String,
  ) -> impl Future<Output = Result<Vec<Snapshot>, Self::Error>> + Send + '_;

  // ── Aggregation ───────────────────────────────────────────────────────

  /// Risk snapshots grouped by month, ascending.
  fn risk_rollups(
    &self,
    filter: RollupFilter,
  ) -> impl Future<Output = Result<Vec<RiskRollup>, Self::Error>> + Send + '_;

  /// Issue snapshots grouped by month, ascending.
  fn issue_rollups(
    &self,
    filter: RollupFilter,
  ) -> impl Future<Output = Result<Vec<IssueRollup>, Self::Error>> + Send + '_;
}
