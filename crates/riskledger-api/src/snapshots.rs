//! Handlers that capture snapshots.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/snapshots/capture` | Bi-weekly capture over both kinds |
//! | `POST` | `/masters/{entity_id}/snapshots` | Body: [`CreateBody`]; 201 + snapshot |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use riskledger_core::{kind::CapturedBy, report::CaptureReport, store::SnapshotStore};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

// ─── Capture ─────────────────────────────────────────────────────────────────

/// `POST /snapshots/capture`
pub async fn capture<S>(
  State(state): State<Arc<AppState<S>>>,
) -> Result<Json<CaptureReport>, ApiError>
where
  S: SnapshotStore,
{
  let report = state.snapshots.capture_bi_weekly_snapshots().await?;
  Ok(Json(report))
}

// ─── Create ──────────────────────────────────────────────────────────────────

fn manual() -> CapturedBy { CapturedBy::Manual }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
  /// Defaults to `manual`.
  #[serde(default = "manual")]
  pub captured_by: CapturedBy,
  pub notes:       Option<String>,
}

/// `POST /masters/{entity_id}/snapshots`
pub async fn create<S>(
  State(state): State<Arc<AppState<S>>>,
  Path(entity_id): Path<String>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SnapshotStore,
{
  let snapshot = state
    .snapshots
    .create_snapshot(&entity_id, body.captured_by, body.notes)
    .await?;
  Ok((StatusCode::CREATED, Json(snapshot)))
}
