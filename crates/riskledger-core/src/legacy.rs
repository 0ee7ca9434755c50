//! Legacy flat records and their mapping into the master / snapshot model.
//!
//! Legacy records are stored as raw JSON documents with the spreadsheet-style
//! field names the CRUD layer writes (`"Project Code"`, `"Impact Value ($)"`,
//! …). Each kind implements [`LegacyRecord`]; the migration job is a single
//! routine generic over that trait.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::{
  Error, Result,
  kind::EntityKind,
  master::{CurrentState, DEFAULT_STATUS, IssueState, NewMaster, RiskState},
  period::whole_days_between,
  snapshot::{IssueValues, SnapshotValues},
};

/// Partition used for records that carry no project code.
pub const UNKNOWN_PROJECT: &str = "UNKNOWN";

/// A legacy document exactly as loaded from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyDocument {
  /// Storage-assigned row id; load order follows it.
  pub legacy_id: i64,
  pub doc:       serde_json::Value,
}

impl LegacyDocument {
  /// The document's title, if it has a string one. Used to key error
  /// messages even when the document fails to decode.
  pub fn title(&self) -> Option<&str> { self.doc.get("Title").and_then(|v| v.as_str()) }
}

// ─── Dates ───────────────────────────────────────────────────────────────────

/// Parse a date as the CRUD layer and its CSV import write them: RFC 3339,
/// a naive `YYYY-MM-DDTHH:MM:SS[.fff]` taken as UTC, or a bare `YYYY-MM-DD`
/// taken as midnight UTC.
pub fn parse_legacy_date(s: &str) -> Option<DateTime<Utc>> {
  let s = s.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
    return Some(naive.and_utc());
  }
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|naive| naive.and_utc())
}

/// Optional legacy date. A value that is not a recognisable date is logged
/// and read as absent; it never rejects the record.
fn lenient_date<'de, D>(de: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
  D: Deserializer<'de>,
{
  let Some(value) = Option::<serde_json::Value>::deserialize(de)? else {
    return Ok(None);
  };
  let parsed = value.as_str().and_then(parse_legacy_date);
  let blank = value.as_str().is_some_and(|s| s.trim().is_empty());
  if parsed.is_none() && !blank {
    warn!(%value, "ignoring unparseable legacy date");
  }
  Ok(parsed)
}

// ─── Mapper trait ────────────────────────────────────────────────────────────

/// A legacy record kind that can be migrated into a master plus its initial
/// snapshot.
pub trait LegacyRecord: DeserializeOwned + Send + 'static {
  const KIND: EntityKind;

  fn title(&self) -> Option<&str>;

  /// Raw project code (risks) or project name (issues).
  fn project_code(&self) -> Option<&str>;

  /// The partition this record is numbered within.
  fn partition_key(&self) -> &str {
    self
      .project_code()
      .map(str::trim)
      .filter(|c| !c.is_empty())
      .unwrap_or(UNKNOWN_PROJECT)
  }

  /// Map into the master input and the values of the initial snapshot, both
  /// as of `now`. Missing numeric fields default to zero.
  fn into_parts(self, now: DateTime<Utc>) -> Result<(NewMaster, SnapshotValues)>;
}

fn required_title(title: Option<String>) -> Result<String> {
  title
    .filter(|t| !t.trim().is_empty())
    .ok_or(Error::MissingField("Title"))
}

// ─── Risks ───────────────────────────────────────────────────────────────────

/// A risk as written by the CRUD layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyRisk {
  #[serde(rename = "Title")]
  pub title:              Option<String>,
  #[serde(rename = "Description")]
  pub description:        Option<String>,
  #[serde(rename = "Project Code")]
  pub project_code:       Option<String>,
  #[serde(rename = "Risk Status")]
  pub status:             Option<String>,
  #[serde(rename = "Probability")]
  pub probability:        Option<f64>,
  #[serde(rename = "Impact Rating (0.05-0.8)")]
  pub impact_rating:      Option<f64>,
  #[serde(rename = "Impact Value ($)")]
  pub impact_value:       Option<f64>,
  #[serde(rename = "Budget Contingency")]
  pub budget_contingency: Option<f64>,
  #[serde(rename = "MitigationPlan")]
  pub mitigation_plan:    Option<String>,
  #[serde(rename = "ContingencyPlan")]
  pub contingency_plan:   Option<String>,
  #[serde(rename = "Owner")]
  pub owner:              Option<String>,
  #[serde(rename = "DueDate", default, deserialize_with = "lenient_date")]
  pub due_date:           Option<DateTime<Utc>>,
  #[serde(rename = "createdAt", default, deserialize_with = "lenient_date")]
  pub created_at:         Option<DateTime<Utc>>,
}

impl LegacyRecord for LegacyRisk {
  const KIND: EntityKind = EntityKind::Risk;

  fn title(&self) -> Option<&str> { self.title.as_deref() }

  fn project_code(&self) -> Option<&str> { self.project_code.as_deref() }

  fn into_parts(self, _now: DateTime<Utc>) -> Result<(NewMaster, SnapshotValues)> {
    let project_code = self.partition_key().to_owned();
    let title = required_title(self.title)?;

    let state = RiskState {
      status:             self.status.unwrap_or_else(|| DEFAULT_STATUS.to_owned()),
      probability:        self.probability.unwrap_or(0.0),
      impact_rating:      self.impact_rating.unwrap_or(0.0),
      impact_value:       self.impact_value.unwrap_or(0.0),
      emv:                0.0,
      risk_score:         0.0,
      budget_contingency: self.budget_contingency.unwrap_or(0.0),
      owner:              self.owner.clone(),
      due_date:           self.due_date,
      mitigation_plan:    self.mitigation_plan,
      contingency_plan:   self.contingency_plan,
    }
    .with_derived();

    let master = NewMaster {
      project_code,
      title,
      description: self.description,
      category: None,
      sub_category: None,
      created_at: self.created_at,
      created_by: self.owner,
      current: CurrentState::Risk(state.clone()),
    };

    Ok((master, SnapshotValues::Risk(state)))
  }
}

// ─── Issues ──────────────────────────────────────────────────────────────────

/// An issue as written by the CRUD layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyIssue {
  #[serde(rename = "Title")]
  pub title:        Option<String>,
  #[serde(rename = "Discussion")]
  pub discussion:   Option<String>,
  #[serde(rename = "ProjectName")]
  pub project_name: Option<String>,
  #[serde(rename = "Category")]
  pub category:     Option<String>,
  #[serde(rename = "SubCategory")]
  pub sub_category: Option<String>,
  #[serde(rename = "Status")]
  pub status:       Option<String>,
  #[serde(rename = "Priority")]
  pub priority:     Option<String>,
  #[serde(rename = "Impact")]
  pub impact:       Option<String>,
  #[serde(rename = "Impact ($)")]
  pub impact_value: Option<f64>,
  #[serde(rename = "Response")]
  pub response:     Option<String>,
  #[serde(rename = "Resolution")]
  pub resolution:   Option<String>,
  #[serde(rename = "Owner")]
  pub owner:        Option<String>,
  #[serde(rename = "Due Date", default, deserialize_with = "lenient_date")]
  pub due_date:     Option<DateTime<Utc>>,
  #[serde(rename = "createdAt", default, deserialize_with = "lenient_date")]
  pub created_at:   Option<DateTime<Utc>>,
}

impl LegacyRecord for LegacyIssue {
  const KIND: EntityKind = EntityKind::Issue;

  fn title(&self) -> Option<&str> { self.title.as_deref() }

  fn project_code(&self) -> Option<&str> { self.project_name.as_deref() }

  fn into_parts(self, now: DateTime<Utc>) -> Result<(NewMaster, SnapshotValues)> {
    let project_code = self.partition_key().to_owned();
    let title = required_title(self.title)?;
    let created_at = self.created_at.unwrap_or(now);

    let state = IssueState {
      status:       self.status.unwrap_or_else(|| DEFAULT_STATUS.to_owned()),
      priority:     self.priority,
      impact:       self.impact,
      impact_value: self.impact_value,
      response:     self.response,
      owner:        self.owner.clone(),
      due_date:     self.due_date,
      resolution:   self.resolution,
    };

    let values = SnapshotValues::Issue(IssueValues {
      state:        state.clone(),
      category:     self.category.clone(),
      sub_category: self.sub_category.clone(),
      days_open:    whole_days_between(created_at, now),
    });

    let master = NewMaster {
      project_code,
      title,
      description: self.discussion,
      category: self.category,
      sub_category: self.sub_category,
      created_at: Some(created_at),
      created_by: self.owner,
      current: CurrentState::Issue(state),
    };

    Ok((master, values))
  }
}
