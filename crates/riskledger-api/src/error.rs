//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use riskledger_service::Error as ServiceError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<ServiceError> for ApiError {
  fn from(err: ServiceError) -> Self {
    match err {
      ServiceError::MasterNotFound(_) => ApiError::NotFound(err.to_string()),
      ServiceError::DuplicatePeriodSnapshot { .. } => ApiError::Conflict(err.to_string()),
      ServiceError::KindMismatch { .. } | ServiceError::Core(_) => {
        ApiError::BadRequest(err.to_string())
      }
      ServiceError::Store(e) => ApiError::Store(e),
    }
  }
}

impl From<riskledger_core::Error> for ApiError {
  fn from(err: riskledger_core::Error) -> Self { ApiError::BadRequest(err.to_string()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
