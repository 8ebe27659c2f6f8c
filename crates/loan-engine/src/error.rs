use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::decisioning::DecisionError;
use crate::workflows::lifecycle::TransitionError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

/// Failures surfaced by the service binary and its command-line entry points.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Payload(serde_json::Error),
    Decision(DecisionError),
    Transition(TransitionError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Payload(_) => StatusCode::BAD_REQUEST,
            AppError::Decision(err) => match err {
                DecisionError::Validation(_) | DecisionError::RuleConfiguration(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                DecisionError::NotFound(_) => StatusCode::NOT_FOUND,
                DecisionError::Duplicate(_) | DecisionError::InvalidReview(_) => {
                    StatusCode::CONFLICT
                }
                DecisionError::Collaborator(_) | DecisionError::Cancelled => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            },
            AppError::Transition(err) => match err {
                TransitionError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
                TransitionError::InvalidTransition { .. } => StatusCode::CONFLICT,
                TransitionError::NotFound(_) => StatusCode::NOT_FOUND,
                TransitionError::Collaborator(_) | TransitionError::Cancelled => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            },
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Decision(err) => err.code(),
            AppError::Transition(err) => err.code(),
            AppError::Payload(_) => "invalid_payload",
            _ => "internal",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Payload(err) => write!(f, "invalid payload: {}", err),
            AppError::Decision(err) => write!(f, "decision error: {}", err),
            AppError::Transition(err) => write!(f, "transition error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Payload(err) => Some(err),
            AppError::Decision(err) => Some(err),
            AppError::Transition(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string(), "code": self.code() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Payload(value)
    }
}

impl From<DecisionError> for AppError {
    fn from(value: DecisionError) -> Self {
        Self::Decision(value)
    }
}

impl From<TransitionError> for AppError {
    fn from(value: TransitionError) -> Self {
        Self::Transition(value)
    }
}
