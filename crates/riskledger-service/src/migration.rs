//! One-shot migration of legacy flat records into masters plus an initial
//! snapshot each.
//!
//! The job is not idempotent: running it twice allocates a second set of
//! identifiers for the same legacy records. Ids come from the store's atomic
//! allocator, so a rerun never collides with the first run.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use riskledger_core::{
  kind::{CapturedBy, EntityKind},
  legacy::{LegacyDocument, LegacyIssue, LegacyRecord, LegacyRisk},
  master::NewMaster,
  report::MigrationReport,
  snapshot::{Snapshot, SnapshotValues},
  store::{InsertOutcome, SnapshotStore},
};
use tracing::{info, warn};

use crate::{Clock, Error, Result};

pub const MIGRATION_NOTE: &str = "Initial snapshot created during migration";

const UNTITLED: &str = "<untitled>";

/// A decoded record waiting for its identifier.
struct Pending {
  title:  String,
  master: NewMaster,
  values: SnapshotValues,
}

pub struct MigrationJob<S> {
  store: Arc<S>,
  clock: Clock,
}

impl<S: SnapshotStore> MigrationJob<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store, clock: Clock::System } }

  #[must_use]
  pub fn with_clock(mut self, clock: Clock) -> Self {
    self.clock = clock;
    self
  }

  /// Migrate every legacy record of `kind`.
  pub async fn run(&self, kind: EntityKind) -> Result<MigrationReport> {
    match kind {
      EntityKind::Risk => self.migrate::<LegacyRisk>().await,
      EntityKind::Issue => self.migrate::<LegacyIssue>().await,
    }
  }

  /// Migrate every legacy record of `R::KIND`.
  ///
  /// Only a failure to load the legacy documents is returned as an error.
  /// Per-record failures are collected in [`MigrationReport::errors`].
  pub async fn migrate<R: LegacyRecord>(&self) -> Result<MigrationReport> {
    let kind = R::KIND;
    let docs = self.store.load_legacy(kind).await.map_err(Error::store)?;
    let now = self.clock.now();
    info!(%kind, records = docs.len(), "starting migration");

    let mut report = MigrationReport::default();
    let partitions = partition::<R>(docs, now, &mut report);

    for (project_code, records) in partitions {
      info!(%kind, project = %project_code, records = records.len(), "migrating partition");
      for pending in records {
        let title = pending.title.clone();
        if let Err(e) = self.migrate_one(pending, now, &mut report).await {
          let msg = format!("Error processing {kind} \"{title}\": {e}");
          warn!("{msg}");
          report.errors.push(msg);
        }
      }
    }

    info!(
      %kind,
      masters = report.masters_created,
      snapshots = report.snapshots_created,
      errors = report.errors.len(),
      "migration complete"
    );
    Ok(report)
  }

  async fn migrate_one(
    &self,
    pending: Pending,
    now: DateTime<Utc>,
    report: &mut MigrationReport,
  ) -> Result<()> {
    let kind = pending.master.kind();
    let entity_id = self
      .store
      .allocate_entity_id(pending.master.project_code.clone(), kind)
      .await
      .map_err(Error::store)?;

    let master = pending.master.into_master(entity_id.clone(), now);
    self.store.insert_master(master).await.map_err(Error::store)?;
    report.masters_created += 1;

    let snapshot = Snapshot::new(entity_id.clone(), now, pending.values, CapturedBy::Migration)
      .with_notes(Some(MIGRATION_NOTE.to_owned()));
    let period = snapshot.bi_week_period.clone();
    match self.store.insert_snapshot(snapshot).await.map_err(Error::store)? {
      InsertOutcome::Inserted => {
        report.snapshots_created += 1;
        info!(%entity_id, "created");
        Ok(())
      }
      InsertOutcome::PeriodTaken => Err(Error::DuplicatePeriodSnapshot { entity_id, period }),
    }
  }
}

/// Decode `docs` and group them by partition key, keeping partitions in
/// first-seen order and records in load order. Records that cannot be decoded
/// are reported and dropped before any id is allocated.
fn partition<R: LegacyRecord>(
  docs: Vec<LegacyDocument>,
  now: DateTime<Utc>,
  report: &mut MigrationReport,
) -> Vec<(String, Vec<Pending>)> {
  let mut partitions: Vec<(String, Vec<Pending>)> = Vec::new();

  for doc in docs {
    let title = doc.title().unwrap_or(UNTITLED).to_owned();
    let decoded = serde_json::from_value::<R>(doc.doc)
      .map_err(riskledger_core::Error::from)
      .and_then(|record| record.into_parts(now));

    let (master, values) = match decoded {
      Ok(parts) => parts,
      Err(e) => {
        let msg = format!("Error processing {} \"{title}\": {e}", R::KIND);
        warn!(legacy_id = doc.legacy_id, "{msg}");
        report.errors.push(msg);
        continue;
      }
    };

    let pending = Pending { title, master, values };
    let key = pending.master.project_code.as_str();
    match partitions.iter_mut().find(|(k, _)| k == key) {
      Some((_, records)) => records.push(pending),
      None => partitions.push((key.to_owned(), vec![pending])),
    }
  }

  partitions
}
