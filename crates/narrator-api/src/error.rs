//! Narrator — API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use narrator_core::error::EngineError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A configuration file or environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The engine could not be assembled.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `EngineError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            EngineError::LineParse { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "line_parse_error"),
            EngineError::LabelNotFound { .. } => (StatusCode::NOT_FOUND, "label_not_found"),
            EngineError::ScriptNotFound(_) => (StatusCode::NOT_FOUND, "script_not_found"),
            EngineError::SlotNotFound(_) => (StatusCode::NOT_FOUND, "slot_not_found"),
            EngineError::RollbackTargetNotFound => {
                (StatusCode::NOT_FOUND, "rollback_target_not_found")
            }
            EngineError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            EngineError::CommandExecution { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "command_execution_error")
            }
            EngineError::Serialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "serialization_error")
            }
            EngineError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
            }
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn status_of(err: EngineError) -> StatusCode {
        let response = ApiError(err).into_response();
        response.status()
    }

    #[test]
    fn test_not_found_variants_map_to_404() {
        assert_eq!(
            status_of(EngineError::LabelNotFound {
                script_name: "Demo".into(),
                label: "End".into(),
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(EngineError::ScriptNotFound("Demo".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(EngineError::SlotNotFound("GameSave1".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(EngineError::RollbackTargetNotFound),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_line_parse_maps_to_422() {
        assert_eq!(
            status_of(EngineError::LineParse {
                script_name: "Demo".into(),
                line_number: 3,
                message: "unterminated quote".into(),
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_validation_maps_to_400() {
        assert_eq!(
            status_of(EngineError::Validation("bad input".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_infrastructure_maps_to_500() {
        assert_eq!(
            status_of(EngineError::Infrastructure("disk full".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
