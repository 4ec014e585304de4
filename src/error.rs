//! Error taxonomy shared by the orchestrator, the transports and the routes.
//!
//! Callers branch on `DrillError::kind()`; the message always keeps the
//! upstream diagnostic text.

use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

use crate::protocol::ErrorOut;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DrillError {
  /// Bad caller input (blank topic, out-of-range counts).
  #[error("{0}")]
  Validation(String),
  /// Missing credential or unselected model.
  #[error("{0}")]
  Configuration(String),
  /// Transport, HTTP status, envelope or JSON failure from a provider.
  #[error("{0}")]
  Upstream(String),
  /// The call was superseded before it finished.
  #[error("request cancelled")]
  Cancelled,
}

impl DrillError {
  pub fn upstream(msg: impl Into<String>) -> Self { DrillError::Upstream(msg.into()) }

  /// A failure while reading a provider envelope. Timeouts keep their own message.
  pub fn malformed(what: &str, e: reqwest::Error) -> Self {
    if e.is_timeout() {
      DrillError::from(e)
    } else {
      DrillError::Upstream(format!("Malformed {what}: {e}"))
    }
  }

  /// Stable wire name for the error kind.
  pub fn kind(&self) -> &'static str {
    match self {
      DrillError::Validation(_) => "validation",
      DrillError::Configuration(_) => "configuration",
      DrillError::Upstream(_) => "upstream",
      DrillError::Cancelled => "cancelled",
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      DrillError::Validation(_) | DrillError::Configuration(_) => StatusCode::BAD_REQUEST,
      DrillError::Upstream(_) => StatusCode::BAD_GATEWAY,
      // nginx-style "client closed request"
      DrillError::Cancelled => StatusCode::from_u16(499).unwrap_or(StatusCode::REQUEST_TIMEOUT),
    }
  }

  pub fn to_out(&self) -> ErrorOut {
    ErrorOut { kind: self.kind(), message: self.to_string() }
  }
}

impl From<reqwest::Error> for DrillError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_timeout() {
      DrillError::Upstream(format!("request timed out: {e}"))
    } else {
      DrillError::Upstream(e.to_string())
    }
  }
}

impl IntoResponse for DrillError {
  fn into_response(self) -> axum::response::Response {
    (self.status(), Json(self.to_out())).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kinds_map_to_statuses() {
    assert_eq!(DrillError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
    assert_eq!(DrillError::Configuration("x".into()).status(), StatusCode::BAD_REQUEST);
    assert_eq!(DrillError::upstream("x").status(), StatusCode::BAD_GATEWAY);
    assert_eq!(DrillError::Cancelled.status().as_u16(), 499);
  }

  #[test]
  fn upstream_message_keeps_original_text() {
    let e = DrillError::upstream("SiliconFlow HTTP 401: Invalid token");
    assert_eq!(e.kind(), "upstream");
    assert!(e.to_string().contains("Invalid token"));
  }
}
