//! Error types for `riskledger-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown entity kind: {0:?}")]
  UnknownKind(String),

  #[error("unknown capture provenance: {0:?}")]
  UnknownProvenance(String),

  #[error("unknown trend metric: {0:?}")]
  UnknownMetric(String),

  #[error("unknown trend field: {0:?}")]
  UnknownField(String),

  #[error("malformed entity id: {0:?}")]
  InvalidEntityId(String),

  #[error("required field {0:?} is missing")]
  MissingField(&'static str),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
