//! [`SqliteStore`], the SQLite implementation of [`SnapshotStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior, ffi};
use tracing::debug;

use riskledger_core::{
  entity_id::{format_entity_id, next_entity_id, parse_sequence, project_prefix},
  kind::EntityKind,
  legacy::LegacyDocument,
  master::{CurrentState, MasterRecord},
  snapshot::Snapshot,
  store::{InsertOutcome, RollupFilter, SnapshotStore},
  trend::{
    CLOSED_ISSUE_STATUSES, CLOSED_RISK_STATUSES, CRITICAL_ISSUE_PRIORITIES,
    ESCALATED_ISSUE_STATUSES, IssueRollup, MITIGATED_RISK_STATUSES,
    OPEN_ISSUE_STATUSES, OPEN_RISK_STATUSES, RESOLVED_ISSUE_STATUSES, RiskRollup,
  },
};

use crate::{
  Error, Result,
  encode::{
    MASTER_COLUMNS, RawIssueRollup, RawMaster, RawRiskRollup, RawSnapshot,
    SNAPSHOT_COLUMNS, encode_dt, encode_kind, encode_state, sql_in_list,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A riskledger store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Append a raw legacy document of `kind`, as the CRUD layer would.
  /// Returns its storage id.
  pub async fn insert_legacy(
    &self,
    kind: EntityKind,
    doc: serde_json::Value,
  ) -> Result<i64> {
    let kind_str = encode_kind(kind).to_owned();
    let doc_str = doc.to_string();
    let at_str = encode_dt(Utc::now());

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO legacy_records (kind, doc, recorded_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![kind_str, doc_str, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    Ok(id)
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn placeholders(n: usize) -> String {
  (1..=n).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ")
}

/// Insert one snapshot row. For a periodic snapshot, a unique-index
/// violation means another periodic snapshot already holds the entity's
/// period. Every other failure is returned as is.
fn insert_snapshot_row(
  conn: &rusqlite::Connection,
  raw: &RawSnapshot,
  periodic: bool,
) -> rusqlite::Result<InsertOutcome> {
  let sql = format!(
    "INSERT INTO snapshots ({SNAPSHOT_COLUMNS}) VALUES ({})",
    placeholders(raw.params().len())
  );
  match conn.execute(&sql, &raw.params()[..]) {
    Ok(_) => Ok(InsertOutcome::Inserted),
    Err(rusqlite::Error::SqliteFailure(err, _))
      if periodic && err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
    {
      Ok(InsertOutcome::PeriodTaken)
    }
    Err(err) => Err(err),
  }
}

/// The existing id of `(project_code, kind)` with the highest parsed
/// sequence number.
fn greatest_existing_id(
  conn: &rusqlite::Connection,
  project_code: &str,
  kind: EntityKind,
) -> rusqlite::Result<Option<String>> {
  let mut stmt =
    conn.prepare("SELECT entity_id FROM masters WHERE project_code = ?1 AND kind = ?2")?;
  let ids = stmt
    .query_map(rusqlite::params![project_code, encode_kind(kind)], |r| {
      r.get::<_, String>(0)
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(
    ids
      .into_iter()
      .filter_map(|id| parse_sequence(&id, kind).map(|seq| (seq, id)))
      .max_by_key(|(seq, _)| *seq)
      .map(|(_, id)| id),
  )
}

fn rollup_params(filter: RollupFilter) -> (String, Option<String>) {
  (
    filter.start_month,
    filter.project_code.as_deref().map(project_prefix),
  )
}

const ROLLUP_WHERE: &str = "kind = ?1 AND month >= ?2 \
   AND (?3 IS NULL OR substr(entity_id, 1, length(?3)) = ?3)";

// ─── SnapshotStore impl ──────────────────────────────────────────────────────

impl SnapshotStore for SqliteStore {
  type Error = Error;

  // ── Legacy records ──────────────────────────────────────────────────────

  async fn load_legacy(&self, kind: EntityKind) -> Result<Vec<LegacyDocument>> {
    let kind_str = encode_kind(kind).to_owned();

    let rows: Vec<(i64, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT legacy_id, doc FROM legacy_records WHERE kind = ?1 ORDER BY legacy_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![kind_str], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(legacy_id, doc)| {
        Ok(LegacyDocument { legacy_id, doc: serde_json::from_str(&doc)? })
      })
      .collect()
  }

  // ── Identifiers ─────────────────────────────────────────────────────────

  async fn allocate_entity_id(
    &self,
    project_code: String,
    kind: EntityKind,
  ) -> Result<String> {
    let kind_str = encode_kind(kind).to_owned();

    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let last: Option<u32> = tx
          .query_row(
            "SELECT last_seq FROM id_counters WHERE project_code = ?1 AND kind = ?2",
            rusqlite::params![project_code, kind_str],
            |r| r.get(0),
          )
          .optional()?;

        // The first allocation for a partition continues after any ids
        // already present in `masters`.
        let id = match last {
          Some(last) => format_entity_id(&project_code, kind, last.saturating_add(1)),
          None => {
            let greatest = greatest_existing_id(&tx, &project_code, kind)?;
            next_entity_id(&project_code, kind, greatest.as_deref())
          }
        };
        let seq = parse_sequence(&id, kind).unwrap_or(1);

        tx.execute(
          "INSERT INTO id_counters (project_code, kind, last_seq) VALUES (?1, ?2, ?3)
           ON CONFLICT (project_code, kind) DO UPDATE SET last_seq = excluded.last_seq",
          rusqlite::params![project_code, kind_str, seq],
        )?;
        tx.commit()?;
        Ok(id)
      })
      .await?;

    debug!(entity_id = %id, "allocated entity id");
    Ok(id)
  }

  // ── Masters ─────────────────────────────────────────────────────────────

  async fn insert_master(&self, master: MasterRecord) -> Result<()> {
    let kind_str = encode_kind(master.kind()).to_owned();
    let state_str = encode_state(&master.current)?;
    let created_str = encode_dt(master.created_at);
    let updated_str = created_str.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO masters (
             entity_id, kind, project_code, title, description, category,
             sub_category, created_at, created_by, is_active, current_state,
             updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          rusqlite::params![
            master.entity_id,
            kind_str,
            master.project_code,
            master.title,
            master.description,
            master.category,
            master.sub_category,
            created_str,
            master.created_by,
            master.is_active,
            state_str,
            updated_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_master(&self, entity_id: String) -> Result<Option<MasterRecord>> {
    let raw: Option<RawMaster> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {MASTER_COLUMNS} FROM masters WHERE entity_id = ?1"),
              rusqlite::params![entity_id],
              RawMaster::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMaster::into_master).transpose()
  }

  async fn list_active_masters(&self, kind: EntityKind) -> Result<Vec<MasterRecord>> {
    let kind_str = encode_kind(kind).to_owned();

    let raws: Vec<RawMaster> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MASTER_COLUMNS} FROM masters
           WHERE kind = ?1 AND is_active = 1
           ORDER BY entity_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![kind_str], RawMaster::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMaster::into_master).collect()
  }

  async fn set_active(&self, entity_id: String, active: bool) -> Result<bool> {
    let at_str = encode_dt(Utc::now());

    let updated = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE masters SET is_active = ?1, updated_at = ?2 WHERE entity_id = ?3",
          rusqlite::params![active, at_str, entity_id],
        )?;
        Ok(n > 0)
      })
      .await?;
    Ok(updated)
  }

  // ── Snapshots: append-only ──────────────────────────────────────────────

  async fn insert_snapshot(&self, snapshot: Snapshot) -> Result<InsertOutcome> {
    let raw = RawSnapshot::encode(&snapshot)?;
    let periodic = snapshot.captured_by.is_periodic();

    let outcome = self
      .conn
      .call(move |conn| Ok(insert_snapshot_row(conn, &raw, periodic)?))
      .await?;
    Ok(outcome)
  }

  async fn commit_state_change(
    &self,
    state: CurrentState,
    snapshot: Snapshot,
  ) -> Result<InsertOutcome> {
    let entity_id = snapshot.entity_id.clone();
    let target_id = entity_id.clone();
    let state_str = encode_state(&state)?;
    let at_str = encode_dt(snapshot.snapshot_date);
    let raw = RawSnapshot::encode(&snapshot)?;
    let periodic = snapshot.captured_by.is_periodic();

    // `None` means the master is missing; the transaction is rolled back on
    // every early return.
    let outcome: Option<InsertOutcome> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let updated = tx.execute(
          "UPDATE masters SET current_state = ?1, updated_at = ?2 WHERE entity_id = ?3",
          rusqlite::params![state_str, at_str, target_id],
        )?;
        if updated == 0 {
          return Ok(None);
        }

        let outcome = insert_snapshot_row(&tx, &raw, periodic)?;
        if outcome == InsertOutcome::Inserted {
          tx.commit()?;
        }
        Ok(Some(outcome))
      })
      .await?;

    outcome.ok_or(Error::MasterNotFound(entity_id))
  }

  async fn latest_snapshot_before(
    &self,
    entity_id: String,
    before: DateTime<Utc>,
  ) -> Result<Option<Snapshot>> {
    let before_str = encode_dt(before);

    let raw: Option<RawSnapshot> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {SNAPSHOT_COLUMNS} FROM snapshots
                 WHERE entity_id = ?1 AND snapshot_date < ?2
                 ORDER BY snapshot_date DESC, rowid DESC
                 LIMIT 1"
              ),
              rusqlite::params![entity_id, before_str],
              RawSnapshot::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSnapshot::into_snapshot).transpose()
  }

  async fn has_snapshot_in_period(
    &self,
    entity_id: String,
    bi_week_period: String,
  ) -> Result<bool> {
    let exists = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT EXISTS (
             SELECT 1 FROM snapshots WHERE entity_id = ?1 AND bi_week_period = ?2
           )",
          rusqlite::params![entity_id, bi_week_period],
          |r| r.get::<_, bool>(0),
        )?)
      })
      .await?;
    Ok(exists)
  }

  async fn entity_snapshots(&self, entity_id: String) -> Result<Vec<Snapshot>> {
    let raws: Vec<RawSnapshot> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SNAPSHOT_COLUMNS} FROM snapshots
           WHERE entity_id = ?1
           ORDER BY snapshot_date, rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![entity_id], RawSnapshot::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSnapshot::into_snapshot).collect()
  }

  // ── Aggregation ─────────────────────────────────────────────────────────

  async fn risk_rollups(&self, filter: RollupFilter) -> Result<Vec<RiskRollup>> {
    let (start_month, prefix) = rollup_params(filter);
    let sql = format!(
      "SELECT month,
              COUNT(*),
              COALESCE(SUM(emv), 0),
              AVG(risk_score),
              COALESCE(SUM(impact_value), 0),
              COALESCE(SUM(budget_contingency), 0),
              SUM(CASE WHEN status IN {open} THEN 1 ELSE 0 END),
              SUM(CASE WHEN status IN {closed} THEN 1 ELSE 0 END),
              SUM(CASE WHEN status IN {mitigated} THEN 1 ELSE 0 END)
       FROM snapshots
       WHERE {ROLLUP_WHERE}
       GROUP BY month
       ORDER BY month",
      open = sql_in_list(OPEN_RISK_STATUSES),
      closed = sql_in_list(CLOSED_RISK_STATUSES),
      mitigated = sql_in_list(MITIGATED_RISK_STATUSES),
    );

    let raws: Vec<RawRiskRollup> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![encode_kind(EntityKind::Risk), start_month, prefix],
            RawRiskRollup::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(RawRiskRollup::into_rollup).collect())
  }

  async fn issue_rollups(&self, filter: RollupFilter) -> Result<Vec<IssueRollup>> {
    let (start_month, prefix) = rollup_params(filter);
    let sql = format!(
      "SELECT month,
              COUNT(*),
              COALESCE(SUM(impact_value), 0),
              AVG(days_open),
              SUM(CASE WHEN status IN {open} THEN 1 ELSE 0 END),
              SUM(CASE WHEN status IN {closed} THEN 1 ELSE 0 END),
              SUM(CASE WHEN status IN {resolved} THEN 1 ELSE 0 END),
              SUM(CASE WHEN priority IN {critical} THEN 1 ELSE 0 END),
              SUM(CASE WHEN response IS NOT NULL AND response <> '' THEN 1 ELSE 0 END),
              SUM(CASE WHEN status IN {escalated} THEN 1 ELSE 0 END)
       FROM snapshots
       WHERE {ROLLUP_WHERE}
       GROUP BY month
       ORDER BY month",
      open = sql_in_list(OPEN_ISSUE_STATUSES),
      closed = sql_in_list(CLOSED_ISSUE_STATUSES),
      resolved = sql_in_list(RESOLVED_ISSUE_STATUSES),
      critical = sql_in_list(CRITICAL_ISSUE_PRIORITIES),
      escalated = sql_in_list(ESCALATED_ISSUE_STATUSES),
    );

    let raws: Vec<RawIssueRollup> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![encode_kind(EntityKind::Issue), start_month, prefix],
            RawIssueRollup::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(RawIssueRollup::into_rollup).collect())
  }
}
