//! Handler for `POST /migrate/{kind}`.
//!
//! `kind` is `risks` or `issues` (singular forms are accepted too). The body
//! is empty; the response is the [`MigrationReport`].

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use riskledger_core::{kind::EntityKind, report::MigrationReport, store::SnapshotStore};

use crate::{AppState, error::ApiError};

/// `POST /migrate/{kind}`
pub async fn run<S>(
  State(state): State<Arc<AppState<S>>>,
  Path(kind): Path<String>,
) -> Result<Json<MigrationReport>, ApiError>
where
  S: SnapshotStore,
{
  let kind = EntityKind::parse(&kind)?;
  let report = state.migration.run(kind).await?;
  Ok(Json(report))
}
