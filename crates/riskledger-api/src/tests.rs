//! Router tests against an in-memory `SqliteStore`.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use riskledger_core::kind::EntityKind;
use riskledger_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{ApiSettings, api_router};

async fn setup() -> (Arc<SqliteStore>, Router) {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let router = api_router(store.clone(), ApiSettings::default());
  (store, router)
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let builder = Request::builder().method(method).uri(uri);
  let req = match body {
    Some(json) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(json.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };

  let resp = router.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

fn new_risk(project: &str, title: &str) -> Value {
  json!({
    "projectCode": project,
    "title": title,
    "current": {
      "kind": "risk",
      "status": "Open",
      "probability": 0.5,
      "impactRating": 0.4,
      "impactValue": 1000.0
    }
  })
}

// ─── Migration ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn migrate_risks_reports_counts() {
  let (store, router) = setup().await;
  for title in ["Crane", "Permits"] {
    store
      .insert_legacy(EntityKind::Risk, json!({ "Title": title, "Project Code": "EPC7" }))
      .await
      .unwrap();
  }

  let (status, body) = send(&router, "POST", "/migrate/risks", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["mastersCreated"], 2);
  assert_eq!(body["snapshotsCreated"], 2);
  assert_eq!(body["errors"], json!([]));

  let (status, master) = send(&router, "GET", "/masters/EPC7-R002", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(master["title"], "Permits");
}

#[tokio::test]
async fn migrate_unknown_kind_is_bad_request() {
  let (_, router) = setup().await;
  let (status, body) = send(&router, "POST", "/migrate/epics", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("epics"));
}

// ─── Masters ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_master_is_not_found() {
  let (_, router) = setup().await;
  let (status, body) = send(&router, "GET", "/masters/P-R404", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn master_lifecycle() {
  let (_, router) = setup().await;

  let (status, master) = send(&router, "POST", "/masters", Some(new_risk("P", "Crane"))).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(master["entityId"], "P-R001");
  assert_eq!(master["current"]["emv"], 500.0);

  let change = json!({
    "state": {
      "kind": "risk",
      "status": "Mitigated",
      "probability": 0.5,
      "impactRating": 0.4,
      "impactValue": 1000.0
    },
    "notes": "mitigation landed"
  });
  let (status, snapshot) = send(&router, "PUT", "/masters/P-R001/state", Some(change)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(snapshot["changedFields"], json!(["status"]));
  assert_eq!(snapshot["capturedBy"], "manual");

  let (_, master) = send(&router, "GET", "/masters/P-R001", None).await;
  assert_eq!(master["current"]["status"], "Mitigated");

  let (status, _) =
    send(&router, "PUT", "/masters/P-R001/active", Some(json!({ "active": false }))).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (_, master) = send(&router, "GET", "/masters/P-R001", None).await;
  assert_eq!(master["isActive"], false);
}

#[tokio::test]
async fn blank_title_is_bad_request() {
  let (_, router) = setup().await;
  let (status, _) = send(&router, "POST", "/masters", Some(new_risk("P", ""))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Snapshots ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn second_automatic_snapshot_in_period_conflicts() {
  let (_, router) = setup().await;
  send(&router, "POST", "/masters", Some(new_risk("P", "Crane"))).await;

  let auto = json!({ "capturedBy": "auto" });
  let (status, snapshot) =
    send(&router, "POST", "/masters/P-R001/snapshots", Some(auto.clone())).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(snapshot["capturedBy"], "auto");

  let (status, body) = send(&router, "POST", "/masters/P-R001/snapshots", Some(auto)).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(body["error"].as_str().unwrap().contains("P-R001"));
}

#[tokio::test]
async fn manual_snapshot_defaults_provenance() {
  let (_, router) = setup().await;
  send(&router, "POST", "/masters", Some(new_risk("P", "Crane"))).await;

  let (status, snapshot) =
    send(&router, "POST", "/masters/P-R001/snapshots", Some(json!({}))).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(snapshot["capturedBy"], "manual");
}

#[tokio::test]
async fn capture_skips_masters_already_snapshotted() {
  let (_, router) = setup().await;
  send(&router, "POST", "/masters", Some(new_risk("P", "Crane"))).await;

  let (status, report) = send(&router, "POST", "/snapshots/capture", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(report, json!({ "created": 0, "skipped": 1, "failed": 0 }));
}

// ─── Trends ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn project_trends_cover_current_month() {
  let (_, router) = setup().await;
  send(&router, "POST", "/masters", Some(new_risk("P", "Crane"))).await;

  let (status, trends) = send(&router, "GET", "/trends/project?months=1", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(trends["emv"].as_array().unwrap().last().unwrap(), 500.0);
  assert_eq!(
    trends["months"].as_array().unwrap().len(),
    trends["riskCount"].as_array().unwrap().len()
  );
}

#[tokio::test]
async fn monthly_trend_by_metric_name() {
  let (_, router) = setup().await;
  send(&router, "POST", "/masters", Some(new_risk("P", "Crane"))).await;
  send(&router, "POST", "/masters", Some(new_risk("Q", "Permits"))).await;

  let (status, points) =
    send(&router, "GET", "/trends/monthly/risks?metric=totalRisks&project=P&months=1", None)
      .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(points.as_array().unwrap().len(), 1);
  assert_eq!(points[0]["value"], 1.0);

  let (status, _) =
    send(&router, "GET", "/trends/monthly/risks?metric=totalIssues", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn entity_trend_rejects_unknown_field() {
  let (_, router) = setup().await;
  send(&router, "POST", "/masters", Some(new_risk("P", "Crane"))).await;

  let (status, points) = send(&router, "GET", "/trends/entity/P-R001", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(points[0]["value"], 500.0);

  let (status, _) = send(&router, "GET", "/trends/entity/P-R001?field=title", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn issue_entity_trend_defaults_to_days_open() {
  let (_, router) = setup().await;
  let issue = json!({
    "projectCode": "P",
    "title": "Late steel",
    "createdAt": "2025-01-01T00:00:00Z",
    "current": { "kind": "issue", "status": "Open" }
  });
  let (status, master) = send(&router, "POST", "/masters", Some(issue)).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(master["entityId"], "P-I001");

  let (status, points) = send(&router, "GET", "/trends/entity/P-I001", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(points.as_array().map(Vec::len), Some(1));
  assert!(points[0]["value"].as_f64().unwrap() > 0.0);

  let (_, by_name) = send(&router, "GET", "/trends/entity/P-I001?field=daysOpen", None).await;
  assert_eq!(by_name, points);
}
