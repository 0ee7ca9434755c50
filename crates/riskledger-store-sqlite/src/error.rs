//! Error type for `riskledger-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] riskledger_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored row does not describe a valid snapshot.
  #[error("corrupt snapshot row {id}: {reason}")]
  CorruptSnapshot { id: String, reason: String },

  #[error("master record not found: {0}")]
  MasterNotFound(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
