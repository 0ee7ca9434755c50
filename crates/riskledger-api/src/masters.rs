//! Handlers for `/masters` endpoints, used by the CRUD layer to keep masters
//! in step with their source records.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/masters` | Body: [`NewMaster`]; 201 + master |
//! | `GET`  | `/masters/{entity_id}` | 404 if not found |
//! | `PUT`  | `/masters/{entity_id}/state` | Body: [`StateBody`]; returns the snapshot |
//! | `PUT`  | `/masters/{entity_id}/active` | Body: `{"active":false}`; 204 |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use riskledger_core::{
  master::{CurrentState, MasterRecord, NewMaster},
  snapshot::Snapshot,
  store::SnapshotStore,
};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

/// `POST /masters`
pub async fn register<S>(
  State(state): State<Arc<AppState<S>>>,
  Json(body): Json<NewMaster>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SnapshotStore,
{
  let master = state.snapshots.register_master(body).await?;
  Ok((StatusCode::CREATED, Json(master)))
}

/// `GET /masters/{entity_id}`
pub async fn get_one<S>(
  State(state): State<Arc<AppState<S>>>,
  Path(entity_id): Path<String>,
) -> Result<Json<MasterRecord>, ApiError>
where
  S: SnapshotStore,
{
  Ok(Json(state.snapshots.get_master(&entity_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct StateBody {
  pub state: CurrentState,
  pub notes: Option<String>,
}

/// `PUT /masters/{entity_id}/state`
pub async fn record_change<S>(
  State(state): State<Arc<AppState<S>>>,
  Path(entity_id): Path<String>,
  Json(body): Json<StateBody>,
) -> Result<Json<Snapshot>, ApiError>
where
  S: SnapshotStore,
{
  let snapshot = state
    .snapshots
    .record_change(&entity_id, body.state, body.notes)
    .await?;
  Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
pub struct ActiveBody {
  pub active: bool,
}

/// `PUT /masters/{entity_id}/active`
pub async fn set_active<S>(
  State(state): State<Arc<AppState<S>>>,
  Path(entity_id): Path<String>,
  Json(body): Json<ActiveBody>,
) -> Result<StatusCode, ApiError>
where
  S: SnapshotStore,
{
  state.snapshots.set_active(&entity_id, body.active).await?;
  Ok(StatusCode::NO_CONTENT)
}
