//! Async HTTP client wrapping the riskledger JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, RequestBuilder, Response};
use riskledger_core::{
  kind::EntityKind,
  master::MasterRecord,
  report::{CaptureReport, MigrationReport},
  trend::{EntityTrendPoint, ProjectIssueTrends, ProjectTrends, TrendPoint},
};
use serde::de::DeserializeOwned;

/// Async HTTP client for the riskledger JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client:   Client,
  base_url: String,
}

impl ApiClient {
  pub fn new(base_url: String) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(300))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, base_url })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url.trim_end_matches('/'), path)
  }

  /// Send `req` and decode a JSON body, surfacing the server's `error`
  /// message on failure.
  async fn fetch<T: DeserializeOwned>(&self, what: &str, req: RequestBuilder) -> Result<T> {
    tracing::debug!("{what}");
    let resp = req.send().await.with_context(|| format!("{what} failed"))?;
    let resp = check(what, resp).await?;
    resp.json().await.with_context(|| format!("deserialising {what} response"))
  }

  // ── Jobs ────────────────────────────────────────────────────────────────

  /// `POST /migrate/{kind}`
  pub async fn migrate(&self, kind: EntityKind) -> Result<MigrationReport> {
    let path = format!("/migrate/{kind}s");
    self.fetch(&format!("POST {path}"), self.client.post(self.url(&path))).await
  }

  /// `POST /snapshots/capture`
  pub async fn capture(&self) -> Result<CaptureReport> {
    let req = self.client.post(self.url("/snapshots/capture"));
    self.fetch("POST /snapshots/capture", req).await
  }

  // ── Trends ──────────────────────────────────────────────────────────────

  /// `GET /trends/project[?months=N]`
  pub async fn project_trends(&self, months: Option<u32>) -> Result<ProjectTrends> {
    let req = self.client.get(self.url("/trends/project")).query(&months_query(months));
    self.fetch("GET /trends/project", req).await
  }

  /// `GET /trends/issues[?months=N]`
  pub async fn issue_trends(&self, months: Option<u32>) -> Result<ProjectIssueTrends> {
    let req = self.client.get(self.url("/trends/issues")).query(&months_query(months));
    self.fetch("GET /trends/issues", req).await
  }

  /// `GET /trends/monthly/{kind}?metric=...`
  pub async fn monthly_trend(
    &self,
    kind: EntityKind,
    metric: &str,
    project: Option<&str>,
    months: Option<u32>,
  ) -> Result<Vec<TrendPoint>> {
    let path = format!("/trends/monthly/{kind}");
    let mut query = months_query(months);
    query.push(("metric", metric.to_owned()));
    if let Some(project) = project {
      query.push(("project", project.to_owned()));
    }
    let req = self.client.get(self.url(&path)).query(&query);
    self.fetch(&format!("GET {path}"), req).await
  }

  /// `GET /trends/entity/{entity_id}[?field=...]`
  pub async fn entity_trend(
    &self,
    entity_id: &str,
    field: Option<&str>,
  ) -> Result<Vec<EntityTrendPoint>> {
    let path = format!("/trends/entity/{entity_id}");
    let mut req = self.client.get(self.url(&path));
    if let Some(field) = field {
      req = req.query(&[("field", field)]);
    }
    self.fetch(&format!("GET {path}"), req).await
  }

  // ── Masters ─────────────────────────────────────────────────────────────

  /// `GET /masters/{entity_id}`
  pub async fn master(&self, entity_id: &str) -> Result<MasterRecord> {
    let path = format!("/masters/{entity_id}");
    self.fetch(&format!("GET {path}"), self.client.get(self.url(&path))).await
  }
}

fn months_query(months: Option<u32>) -> Vec<(&'static str, String)> {
  months.map(|m| ("months", m.to_string())).into_iter().collect()
}

async fn check(what: &str, resp: Response) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let message = resp
    .json::<serde_json::Value>()
    .await
    .ok()
    .and_then(|body| body.get("error").and_then(|e| e.as_str()).map(str::to_owned))
    .unwrap_or_default();
  Err(anyhow!("{what} → {status} {message}"))
}
