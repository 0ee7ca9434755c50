//! JSON REST API for riskledger.
//!
//! Exposes an axum [`Router`] backed by any
//! [`riskledger_core::store::SnapshotStore`]. Auth, TLS, and scheduling of
//! the capture job are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", riskledger_api::api_router(store.clone(), ApiSettings::default()))
//! ```

pub mod error;
pub mod masters;
pub mod migrate;
pub mod snapshots;
pub mod trends;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use riskledger_core::{diff::ChangeTolerance, store::SnapshotStore, trend::DEFAULT_MONTHS_BACK};
use riskledger_service::{MigrationJob, SnapshotService, TrendAggregator};

pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Tunables applied to every request.
#[derive(Debug, Clone, Copy)]
pub struct ApiSettings {
  pub tolerance:           ChangeTolerance,
  /// Trend window used when a request omits `?months=`.
  pub default_months_back: u32,
}

impl Default for ApiSettings {
  fn default() -> Self {
    Self {
      tolerance:           ChangeTolerance::EXACT,
      default_months_back: DEFAULT_MONTHS_BACK,
    }
  }
}

/// Shared state threaded through all handlers: one instance of each job,
/// all over the same store.
pub struct AppState<S> {
  pub migration:           MigrationJob<S>,
  pub snapshots:           SnapshotService<S>,
  pub trends:              TrendAggregator<S>,
  pub default_months_back: u32,
}

impl<S: SnapshotStore> AppState<S> {
  pub fn new(store: Arc<S>, settings: ApiSettings) -> Self {
    Self {
      migration:           MigrationJob::new(store.clone()),
      snapshots:           SnapshotService::new(store.clone())
        .with_tolerance(settings.tolerance),
      trends:              TrendAggregator::new(store),
      default_months_back: settings.default_months_back,
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, settings: ApiSettings) -> Router<()>
where
  S: SnapshotStore + 'static,
{
  let state = Arc::new(AppState::new(store, settings));

  Router::new()
    // Jobs
    .route("/migrate/{kind}", post(migrate::run::<S>))
    .route("/snapshots/capture", post(snapshots::capture::<S>))
    // Trends
    .route("/trends/project", get(trends::project::<S>))
    .route("/trends/issues", get(trends::issues::<S>))
    .route("/trends/monthly/{kind}", get(trends::monthly::<S>))
    .route("/trends/entity/{entity_id}", get(trends::entity::<S>))
    // Masters
    .route("/masters", post(masters::register::<S>))
    .route("/masters/{entity_id}", get(masters::get_one::<S>))
    .route("/masters/{entity_id}/snapshots", post(snapshots::create::<S>))
    .route("/masters/{entity_id}/state", put(masters::record_change::<S>))
    .route("/masters/{entity_id}/active", put(masters::set_active::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
