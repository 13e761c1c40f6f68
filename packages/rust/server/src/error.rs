//! Error-to-response mapping.
//!
//! Every failure is reported as `{"detail": "<message>"}`. Request
//! validation problems are 422; everything else is a generic 500.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use conceptlens_shared::ConceptLensError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("completion service not configured")]
    NotConfigured,

    #[error("request timed out after {0}s")]
    Timeout(f64),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Pipeline(#[from] ConceptLensError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Pipeline(ConceptLensError::Validation { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_422() {
        let err = ApiError::from(ConceptLensError::validation("text must not be empty"));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.to_string(), "validation error: text must not be empty");
    }

    #[test]
    fn everything_else_is_500() {
        assert_eq!(ApiError::NotConfigured.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::Timeout(1.5).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            ApiError::from(ConceptLensError::Internal("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
