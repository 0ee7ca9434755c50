//! Handlers for `/trends` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/trends/project` | Optional `?months=` |
//! | `GET`  | `/trends/issues` | Optional `?months=` |
//! | `GET`  | `/trends/monthly/{kind}` | `?metric=`, optional `project`, `months` |
//! | `GET`  | `/trends/entity/{entity_id}` | Optional `?field=` (default `emv`, `daysOpen` for issues) |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use riskledger_core::{
  entity_id::kind_of,
  kind::EntityKind,
  store::SnapshotStore,
  trend::{EntityTrendPoint, ProjectIssueTrends, ProjectTrends, TrendField, TrendPoint},
};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct WindowParams {
  pub months: Option<u32>,
}

/// `GET /trends/project[?months=N]`
pub async fn project<S>(
  State(state): State<Arc<AppState<S>>>,
  Query(params): Query<WindowParams>,
) -> Result<Json<ProjectTrends>, ApiError>
where
  S: SnapshotStore,
{
  let months = params.months.unwrap_or(state.default_months_back);
  Ok(Json(state.trends.project_trends(months).await?))
}

/// `GET /trends/issues[?months=N]`
pub async fn issues<S>(
  State(state): State<Arc<AppState<S>>>,
  Query(params): Query<WindowParams>,
) -> Result<Json<ProjectIssueTrends>, ApiError>
where
  S: SnapshotStore,
{
  let months = params.months.unwrap_or(state.default_months_back);
  Ok(Json(state.trends.project_issue_trends(months).await?))
}

// ─── Monthly ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MonthlyParams {
  pub metric:  String,
  pub project: Option<String>,
  pub months:  Option<u32>,
}

/// `GET /trends/monthly/{kind}?metric=<name>[&project=<code>][&months=N]`
pub async fn monthly<S>(
  State(state): State<Arc<AppState<S>>>,
  Path(kind): Path<String>,
  Query(params): Query<MonthlyParams>,
) -> Result<Json<Vec<TrendPoint>>, ApiError>
where
  S: SnapshotStore,
{
  let kind = EntityKind::parse(&kind)?;
  let months = params.months.unwrap_or(state.default_months_back);
  let points = state
    .trends
    .monthly_trend(kind, &params.metric, params.project, months)
    .await?;
  Ok(Json(points))
}

// ─── Entity ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EntityParams {
  pub field: Option<String>,
}

/// `GET /trends/entity/{entity_id}[?field=<name>]`
pub async fn entity<S>(
  State(state): State<Arc<AppState<S>>>,
  Path(entity_id): Path<String>,
  Query(params): Query<EntityParams>,
) -> Result<Json<Vec<EntityTrendPoint>>, ApiError>
where
  S: SnapshotStore,
{
  let field = match params.field.as_deref() {
    Some(name) => TrendField::parse(name)?,
    None => TrendField::default_for(kind_of(&entity_id)),
  };
  Ok(Json(state.trends.entity_trend(&entity_id, field).await?))
}
