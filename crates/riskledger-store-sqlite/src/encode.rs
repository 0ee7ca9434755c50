//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that string order equals time order. Structured
//! fields (current state, changed fields) are stored as compact JSON. UUIDs
//! are stored as hyphenated lowercase strings.

use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use riskledger_core::{
  kind::{CapturedBy, EntityKind},
  master::{CurrentState, IssueState, MasterRecord, RiskState},
  snapshot::{IssueValues, Snapshot, SnapshotValues},
  trend::{IssueRollup, RiskRollup},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn encode_kind(k: EntityKind) -> &'static str {
  match k {
    EntityKind::Risk => "risk",
    EntityKind::Issue => "issue",
  }
}

pub fn decode_kind(s: &str) -> Result<EntityKind> { Ok(EntityKind::parse(s)?) }

pub fn encode_captured_by(c: CapturedBy) -> &'static str {
  match c {
    CapturedBy::Migration => "migration",
    CapturedBy::Auto => "auto",
    CapturedBy::Manual => "manual",
  }
}

pub fn decode_captured_by(s: &str) -> Result<CapturedBy> { Ok(CapturedBy::parse(s)?) }

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_state(state: &CurrentState) -> Result<String> {
  Ok(serde_json::to_string(state)?)
}

pub fn decode_state(s: &str) -> Result<CurrentState> { Ok(serde_json::from_str(s)?) }

pub fn encode_changed(fields: Option<&BTreeSet<String>>) -> Result<Option<String>> {
  fields.map(serde_json::to_string).transpose().map_err(Error::from)
}

pub fn decode_changed(s: Option<String>) -> Result<Option<BTreeSet<String>>> {
  s.as_deref()
    .map(serde_json::from_str)
    .transpose()
    .map_err(Error::from)
}

/// Quote a list of string constants as an SQL `IN (...)` list.
pub fn sql_in_list(values: &[&str]) -> String {
  let quoted: Vec<String> = values
    .iter()
    .map(|v| format!("'{}'", v.replace('\'', "''")))
    .collect();
  format!("({})", quoted.join(", "))
}

// ─── Masters ─────────────────────────────────────────────────────────────────

/// Raw strings read directly from a `masters` row.
pub struct RawMaster {
  pub entity_id:     String,
  pub project_code:  String,
  pub title:         String,
  pub description:   Option<String>,
  pub category:      Option<String>,
  pub sub_category:  Option<String>,
  pub created_at:    String,
  pub created_by:    Option<String>,
  pub is_active:     bool,
  pub current_state: String,
}

pub const MASTER_COLUMNS: &str = "entity_id, project_code, title, description, category, \
   sub_category, created_at, created_by, is_active, current_state";

impl RawMaster {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      entity_id:     row.get(0)?,
      project_code:  row.get(1)?,
      title:         row.get(2)?,
      description:   row.get(3)?,
      category:      row.get(4)?,
      sub_category:  row.get(5)?,
      created_at:    row.get(6)?,
      created_by:    row.get(7)?,
      is_active:     row.get(8)?,
      current_state: row.get(9)?,
    })
  }

  pub fn into_master(self) -> Result<MasterRecord> {
    Ok(MasterRecord {
      entity_id:    self.entity_id,
      project_code: self.project_code,
      title:        self.title,
      description:  self.description,
      category:     self.category,
      sub_category: self.sub_category,
      created_at:   decode_dt(&self.created_at)?,
      created_by:   self.created_by,
      is_active:    self.is_active,
      current:      decode_state(&self.current_state)?,
    })
  }
}

// ─── Snapshots ───────────────────────────────────────────────────────────────

pub const SNAPSHOT_COLUMNS: &str = "snapshot_id, entity_id, kind, snapshot_date, month, \
   bi_week_period, status, probability, impact_rating, emv, risk_score, \
   budget_contingency, mitigation_plan, contingency_plan, priority, impact, \
   response, category, sub_category, resolution, days_open, impact_value, owner, \
   due_date, changed_fields, previous_snapshot_id, captured_by, notes";

/// Column values for one `snapshots` row, in [`SNAPSHOT_COLUMNS`] order.
/// Columns that do not apply to the snapshot's kind are `NULL`.
#[derive(Default)]
pub struct RawSnapshot {
  pub snapshot_id:          String,
  pub entity_id:            String,
  pub kind:                 String,
  pub snapshot_date:        String,
  pub month:                String,
  pub bi_week_period:       String,
  pub status:               String,
  pub probability:          Option<f64>,
  pub impact_rating:        Option<f64>,
  pub emv:                  Option<f64>,
  pub risk_score:           Option<f64>,
  pub budget_contingency:   Option<f64>,
  pub mitigation_plan:      Option<String>,
  pub contingency_plan:     Option<String>,
  pub priority:             Option<String>,
  pub impact:               Option<String>,
  pub response:             Option<String>,
  pub category:             Option<String>,
  pub sub_category:         Option<String>,
  pub resolution:           Option<String>,
  pub days_open:            Option<i64>,
  pub impact_value:         Option<f64>,
  pub owner:                Option<String>,
  pub due_date:             Option<String>,
  pub changed_fields:       Option<String>,
  pub previous_snapshot_id: Option<String>,
  pub captured_by:          String,
  pub notes:                Option<String>,
}

impl RawSnapshot {
  pub fn encode(snapshot: &Snapshot) -> Result<Self> {
    let mut raw = Self {
      snapshot_id:          encode_uuid(snapshot.snapshot_id),
      entity_id:            snapshot.entity_id.clone(),
      kind:                 encode_kind(snapshot.kind()).to_owned(),
      snapshot_date:        encode_dt(snapshot.snapshot_date),
      month:                snapshot.month.clone(),
      bi_week_period:       snapshot.bi_week_period.clone(),
      status:               snapshot.values.status().to_owned(),
      changed_fields:       encode_changed(snapshot.changed_fields.as_ref())?,
      previous_snapshot_id: snapshot.previous_snapshot_id.map(encode_uuid),
      captured_by:          encode_captured_by(snapshot.captured_by).to_owned(),
      notes:                snapshot.notes.clone(),
      ..Self::default()
    };

    match &snapshot.values {
      SnapshotValues::Risk(r) => {
        raw.probability = Some(r.probability);
        raw.impact_rating = Some(r.impact_rating);
        raw.impact_value = Some(r.impact_value);
        raw.emv = Some(r.emv);
        raw.risk_score = Some(r.risk_score);
        raw.budget_contingency = Some(r.budget_contingency);
        raw.owner = r.owner.clone();
        raw.due_date = r.due_date.map(encode_dt);
        raw.mitigation_plan = r.mitigation_plan.clone();
        raw.contingency_plan = r.contingency_plan.clone();
      }
      SnapshotValues::Issue(i) => {
        raw.priority = i.state.priority.clone();
        raw.impact = i.state.impact.clone();
        raw.impact_value = i.state.impact_value;
        raw.response = i.state.response.clone();
        raw.owner = i.state.owner.clone();
        raw.due_date = i.state.due_date.map(encode_dt);
        raw.resolution = i.state.resolution.clone();
        raw.category = i.category.clone();
        raw.sub_category = i.sub_category.clone();
        raw.days_open = Some(i.days_open);
      }
    }

    Ok(raw)
  }

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      snapshot_id:          row.get(0)?,
      entity_id:            row.get(1)?,
      kind:                 row.get(2)?,
      snapshot_date:        row.get(3)?,
      month:                row.get(4)?,
      bi_week_period:       row.get(5)?,
      status:               row.get(6)?,
      probability:          row.get(7)?,
      impact_rating:        row.get(8)?,
      emv:                  row.get(9)?,
      risk_score:           row.get(10)?,
      budget_contingency:   row.get(11)?,
      mitigation_plan:      row.get(12)?,
      contingency_plan:     row.get(13)?,
      priority:             row.get(14)?,
      impact:               row.get(15)?,
      response:             row.get(16)?,
      category:             row.get(17)?,
      sub_category:         row.get(18)?,
      resolution:           row.get(19)?,
      days_open:            row.get(20)?,
      impact_value:         row.get(21)?,
      owner:                row.get(22)?,
      due_date:             row.get(23)?,
      changed_fields:       row.get(24)?,
      previous_snapshot_id: row.get(25)?,
      captured_by:          row.get(26)?,
      notes:                row.get(27)?,
    })
  }

  /// Bind parameters for an `INSERT` in [`SNAPSHOT_COLUMNS`] order.
  pub fn params(&self) -> [&dyn rusqlite::ToSql; 28] {
    [
      &self.snapshot_id,
      &self.entity_id,
      &self.kind,
      &self.snapshot_date,
      &self.month,
      &self.bi_week_period,
      &self.status,
      &self.probability,
      &self.impact_rating,
      &self.emv,
      &self.risk_score,
      &self.budget_contingency,
      &self.mitigation_plan,
      &self.contingency_plan,
      &self.priority,
      &self.impact,
      &self.response,
      &self.category,
      &self.sub_category,
      &self.resolution,
      &self.days_open,
      &self.impact_value,
      &self.owner,
      &self.due_date,
      &self.changed_fields,
      &self.previous_snapshot_id,
      &self.captured_by,
      &self.notes,
    ]
  }

  pub fn into_snapshot(self) -> Result<Snapshot> {
    let corrupt = |reason: &str| Error::CorruptSnapshot {
      id:     self.snapshot_id.clone(),
      reason: reason.to_owned(),
    };

    let values = match decode_kind(&self.kind)? {
      EntityKind::Risk => SnapshotValues::Risk(RiskState {
        status:             self.status.clone(),
        probability:        self.probability.unwrap_or(0.0),
        impact_rating:      self.impact_rating.unwrap_or(0.0),
        impact_value:       self.impact_value.unwrap_or(0.0),
        emv:                self.emv.unwrap_or(0.0),
        risk_score:         self.risk_score.unwrap_or(0.0),
        budget_contingency: self.budget_contingency.unwrap_or(0.0),
        owner:              self.owner.clone(),
        due_date:           decode_opt_dt(self.due_date.clone())?,
        mitigation_plan:    self.mitigation_plan.clone(),
        contingency_plan:   self.contingency_plan.clone(),
      }),
      EntityKind::Issue => SnapshotValues::Issue(IssueValues {
        state:        IssueState {
          status:       self.status.clone(),
          priority:     self.priority.clone(),
          impact:       self.impact.clone(),
          impact_value: self.impact_value,
          response:     self.response.clone(),
          owner:        self.owner.clone(),
          due_date:     decode_opt_dt(self.due_date.clone())?,
          resolution:   self.resolution.clone(),
        },
        category:     self.category.clone(),
        sub_category: self.sub_category.clone(),
        days_open:    self.days_open.ok_or_else(|| corrupt("issue row without days_open"))?,
      }),
    };

    Ok(Snapshot {
      snapshot_id:          decode_uuid(&self.snapshot_id)?,
      entity_id:            self.entity_id,
      snapshot_date:        decode_dt(&self.snapshot_date)?,
      month:                self.month,
      bi_week_period:       self.bi_week_period,
      values,
      changed_fields:       decode_changed(self.changed_fields)?,
      previous_snapshot_id: self.previous_snapshot_id.as_deref().map(decode_uuid).transpose()?,
      captured_by:          decode_captured_by(&self.captured_by)?,
      notes:                self.notes,
    })
  }
}

// ─── Rollups ─────────────────────────────────────────────────────────────────

fn count(n: i64) -> u64 { u64::try_from(n).unwrap_or(0) }

/// Raw aggregate columns of one risk month.
pub struct RawRiskRollup {
  pub month:                    String,
  pub total_risks:              i64,
  pub total_emv:                f64,
  pub avg_risk_score:           Option<f64>,
  pub total_impact_value:       f64,
  pub total_budget_contingency: f64,
  pub open_risks:               i64,
  pub closed_risks:             i64,
  pub mitigated_risks:          i64,
}

impl RawRiskRollup {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      month:                    row.get(0)?,
      total_risks:              row.get(1)?,
      total_emv:                row.get(2)?,
      avg_risk_score:           row.get(3)?,
      total_impact_value:       row.get(4)?,
      total_budget_contingency: row.get(5)?,
      open_risks:               row.get(6)?,
      closed_risks:             row.get(7)?,
      mitigated_risks:          row.get(8)?,
    })
  }

  pub fn into_rollup(self) -> RiskRollup {
    RiskRollup {
      month:                    self.month,
      total_risks:              count(self.total_risks),
      total_emv:                self.total_emv,
      avg_risk_score:           self.avg_risk_score,
      total_impact_value:       self.total_impact_value,
      total_budget_contingency: self.total_budget_contingency,
      open_risks:               count(self.open_risks),
      closed_risks:             count(self.closed_risks),
      mitigated_risks:          count(self.mitigated_risks),
    }
  }
}

/// Raw aggregate columns of one issue month.
pub struct RawIssueRollup {
  pub month:              String,
  pub total_issues:       i64,
  pub total_impact_value: f64,
  pub avg_days_open:      Option<f64>,
  pub open_issues:        i64,
  pub closed_issues:      i64,
  pub resolved_issues:    i64,
  pub critical_issues:    i64,
  pub with_response:      i64,
  pub escalated:          i64,
}

impl RawIssueRollup {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      month:              row.get(0)?,
      total_issues:       row.get(1)?,
      total_impact_value: row.get(2)?,
      avg_days_open:      row.get(3)?,
      open_issues:        row.get(4)?,
      closed_issues:      row.get(5)?,
      resolved_issues:    row.get(6)?,
      critical_issues:    row.get(7)?,
      with_response:      row.get(8)?,
      escalated:          row.get(9)?,
    })
  }

  pub fn into_rollup(self) -> IssueRollup {
    IssueRollup {
      month:              self.month,
      total_issues:       count(self.total_issues),
      total_impact_value: self.total_impact_value,
      avg_days_open:      self.avg_days_open,
      open_issues:        count(self.open_issues),
      closed_issues:      count(self.closed_issues),
      resolved_issues:    count(self.resolved_issues),
      critical_issues:    count(self.critical_issues),
      with_response:      count(self.with_response),
      escalated:          count(self.escalated),
    }
  }
}
