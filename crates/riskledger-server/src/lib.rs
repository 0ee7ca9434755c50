//! HTTP server wiring for riskledger: configuration and the top-level router.

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use riskledger_api::{ApiSettings, api_router};
use riskledger_core::{diff::ChangeTolerance, store::SnapshotStore, trend::DEFAULT_MONTHS_BACK};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8640 }
fn default_store_path() -> PathBuf { PathBuf::from("riskledger.db") }
fn default_months_back() -> u32 { DEFAULT_MONTHS_BACK }

/// Runtime server configuration, deserialised from `config.toml` and
/// `RISKLEDGER_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  #[serde(default)]
  pub change_tolerance:    f64,
  #[serde(default = "default_months_back")]
  pub default_months_back: u32,
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn api_settings(&self) -> ApiSettings {
    ApiSettings {
      tolerance:           ChangeTolerance::new(self.change_tolerance),
      default_months_back: self.default_months_back,
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The full application: the JSON API with request tracing.
pub fn app<S>(store: Arc<S>, config: &ServerConfig) -> Router
where
  S: SnapshotStore + 'static,
{
  api_router(store, config.api_settings()).layer(TraceLayer::new_for_http())
}
