//! Error type for `riskledger-service`.

use riskledger_core::kind::EntityKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("master record not found: {0}")]
  MasterNotFound(String),

  /// A periodic snapshot already holds this entity's period.
  #[error("{entity_id} already has a snapshot for {period}")]
  DuplicatePeriodSnapshot { entity_id: String, period: String },

  #[error("{entity_id} is a {expected}, not a {found}")]
  KindMismatch {
    entity_id: String,
    expected:  EntityKind,
    found:     EntityKind,
  },

  #[error(transparent)]
  Core(#[from] riskledger_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
