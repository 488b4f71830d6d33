//! Request-level errors and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ee_client::EeError;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that short-circuit a whole request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed request input. Raised before any backend call.
    #[error("{0}")]
    InvalidRequest(String),

    /// Backend initialization or query failure.
    #[error("{0}")]
    Backend(#[from] EeError),
}

impl ApiError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error body `{"error": message}` followed by `metadata`.
    pub fn into_response_with(self, metadata: Map<String, Value>) -> Response {
        let status = self.status_code();
        let mut body = Map::new();
        body.insert("error".to_string(), Value::String(self.to_string()));
        body.extend(metadata);
        (status, Json(Value::Object(body))).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_response_with(Map::new())
    }
}
