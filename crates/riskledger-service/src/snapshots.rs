//! Snapshot capture, both scheduled (bi-weekly) and single-entity, plus the
//! master lifecycle operations that always travel with a snapshot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use riskledger_core::{
  diff::{ChangeTolerance, changed_fields},
  entity_id::kind_of,
  kind::{CapturedBy, EntityKind},
  master::{CurrentState, MasterRecord, NewMaster},
  period::bi_week_period,
  report::CaptureReport,
  snapshot::{Snapshot, SnapshotValues},
  store::{InsertOutcome, SnapshotStore},
};
use strum::IntoEnumIterator as _;
use tracing::{debug, info, warn};

use crate::{Clock, Error, Result};

pub const CAPTURE_NOTE: &str = "Bi-weekly automatic snapshot";
pub const REGISTER_NOTE: &str = "Initial snapshot";

pub struct SnapshotService<S> {
  store:     Arc<S>,
  clock:     Clock,
  tolerance: ChangeTolerance,
}

impl<S: SnapshotStore> SnapshotService<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store, clock: Clock::System, tolerance: ChangeTolerance::EXACT }
  }

  #[must_use]
  pub fn with_clock(mut self, clock: Clock) -> Self {
    self.clock = clock;
    self
  }

  #[must_use]
  pub fn with_tolerance(mut self, tolerance: ChangeTolerance) -> Self {
    self.tolerance = tolerance;
    self
  }

  // ─── Masters ──────────────────────────────────────────────────────────────

  /// Fetch a master, failing with [`Error::MasterNotFound`] when absent.
  pub async fn get_master(&self, entity_id: &str) -> Result<MasterRecord> {
    if kind_of(entity_id).is_none() {
      return Err(riskledger_core::Error::InvalidEntityId(entity_id.to_owned()).into());
    }
    self
      .store
      .get_master(entity_id.to_owned())
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::MasterNotFound(entity_id.to_owned()))
  }

  /// Create a master for a newly recorded item and capture its first
  /// snapshot.
  pub async fn register_master(&self, mut input: NewMaster) -> Result<MasterRecord> {
    if input.title.trim().is_empty() {
      return Err(riskledger_core::Error::MissingField("title").into());
    }
    input.project_code = input.project_code.trim().to_owned();
    if input.project_code.is_empty() {
      return Err(riskledger_core::Error::MissingField("projectCode").into());
    }

    let now = self.clock.now();
    let entity_id = self
      .store
      .allocate_entity_id(input.project_code.clone(), input.kind())
      .await
      .map_err(Error::store)?;

    let master = input.into_master(entity_id.clone(), now);
    self.store.insert_master(master.clone()).await.map_err(Error::store)?;

    let snapshot = Snapshot::new(
      entity_id.clone(),
      now,
      SnapshotValues::from_master(&master, now),
      CapturedBy::Manual,
    )
    .with_notes(Some(REGISTER_NOTE.to_owned()));
    self.insert(snapshot).await?;

    info!(%entity_id, "registered master");
    Ok(master)
  }

  /// Replace a master's current state and capture a manual snapshot of it,
  /// atomically.
  pub async fn record_change(
    &self,
    entity_id: &str,
    state: CurrentState,
    notes: Option<String>,
  ) -> Result<Snapshot> {
    let mut master = self.get_master(entity_id).await?;
    if master.kind() != state.kind() {
      return Err(Error::KindMismatch {
        entity_id: entity_id.to_owned(),
        expected:  master.kind(),
        found:     state.kind(),
      });
    }

    master.current = state.normalized();
    let snapshot = self
      .build_snapshot(&master, self.clock.now(), CapturedBy::Manual, notes)
      .await?;

    let outcome = self
      .store
      .commit_state_change(master.current, snapshot.clone())
      .await
      .map_err(Error::store)?;
    duplicate_unless_inserted(outcome, &snapshot)?;

    info!(%entity_id, changed = ?snapshot.changed_fields, "recorded change");
    Ok(snapshot)
  }

  pub async fn set_active(&self, entity_id: &str, active: bool) -> Result<()> {
    let found = self
      .store
      .set_active(entity_id.to_owned(), active)
      .await
      .map_err(Error::store)?;
    if !found {
      return Err(Error::MasterNotFound(entity_id.to_owned()));
    }
    info!(%entity_id, active, "updated active flag");
    Ok(())
  }

  // ─── Single-entity capture ────────────────────────────────────────────────

  /// Capture a snapshot of one master's current state, diffed against its
  /// latest earlier snapshot.
  pub async fn create_snapshot(
    &self,
    entity_id: &str,
    captured_by: CapturedBy,
    notes: Option<String>,
  ) -> Result<Snapshot> {
    let master = self.get_master(entity_id).await?;
    let snapshot = self
      .build_snapshot(&master, self.clock.now(), captured_by, notes)
      .await?;
    self.insert(snapshot.clone()).await?;
    Ok(snapshot)
  }

  async fn build_snapshot(
    &self,
    master: &MasterRecord,
    at: DateTime<Utc>,
    captured_by: CapturedBy,
    notes: Option<String>,
  ) -> Result<Snapshot> {
    let previous = self
      .store
      .latest_snapshot_before(master.entity_id.clone(), at)
      .await
      .map_err(Error::store)?;

    let snapshot = Snapshot::new(
      master.entity_id.clone(),
      at,
      SnapshotValues::from_master(master, at),
      captured_by,
    )
    .with_notes(notes);

    Ok(match previous {
      Some(prev) => {
        let changed = changed_fields(&prev.values, &snapshot.values, self.tolerance);
        snapshot.following(prev.snapshot_id, changed)
      }
      None => snapshot,
    })
  }

  async fn insert(&self, snapshot: Snapshot) -> Result<()> {
    let outcome = self
      .store
      .insert_snapshot(snapshot.clone())
      .await
      .map_err(Error::store)?;
    duplicate_unless_inserted(outcome, &snapshot)
  }

  // ─── Bi-weekly capture ────────────────────────────────────────────────────

  /// Capture the current period's snapshot for every active master of both
  /// kinds.
  pub async fn capture_bi_weekly_snapshots(&self) -> Result<CaptureReport> {
    let mut report = CaptureReport::default();
    for kind in EntityKind::iter() {
      report += self.capture_kind(kind).await?;
    }
    Ok(report)
  }

  /// Capture the current period's snapshot for every active master of
  /// `kind` that does not have one yet.
  ///
  /// Only a failure to list the masters is returned as an error.
  pub async fn capture_kind(&self, kind: EntityKind) -> Result<CaptureReport> {
    let masters = self.store.list_active_masters(kind).await.map_err(Error::store)?;
    let now = self.clock.now();
    let period = bi_week_period(now);
    info!(%kind, %period, masters = masters.len(), "starting bi-weekly capture");

    let mut report = CaptureReport::default();
    for master in &masters {
      match self.capture_one(master, &period, now).await {
        Ok(true) => report.created += 1,
        Ok(false) => {
          debug!(entity_id = %master.entity_id, "already captured this period");
          report.skipped += 1;
        }
        Err(e) => {
          warn!(entity_id = %master.entity_id, error = %e, "snapshot capture failed");
          report.failed += 1;
        }
      }
    }

    info!(
      %kind,
      created = report.created,
      skipped = report.skipped,
      failed = report.failed,
      "bi-weekly capture complete"
    );
    Ok(report)
  }

  /// Returns `false` when the period already holds a snapshot, including one
  /// written concurrently by another run.
  async fn capture_one(
    &self,
    master: &MasterRecord,
    period: &str,
    now: DateTime<Utc>,
  ) -> Result<bool> {
    let taken = self
      .store
      .has_snapshot_in_period(master.entity_id.clone(), period.to_owned())
      .await
      .map_err(Error::store)?;
    if taken {
      return Ok(false);
    }

    let snapshot = self
      .build_snapshot(master, now, CapturedBy::Auto, Some(CAPTURE_NOTE.to_owned()))
      .await?;
    let outcome = self.store.insert_snapshot(snapshot).await.map_err(Error::store)?;
    Ok(outcome == InsertOutcome::Inserted)
  }
}

fn duplicate_unless_inserted(outcome: InsertOutcome, snapshot: &Snapshot) -> Result<()> {
  match outcome {
    InsertOutcome::Inserted => Ok(()),
    InsertOutcome::PeriodTaken => Err(Error::DuplicatePeriodSnapshot {
      entity_id: snapshot.entity_id.clone(),
      period:    snapshot.bi_week_period.clone(),
    }),
  }
}
