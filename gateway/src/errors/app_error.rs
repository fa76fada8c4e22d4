//! Errors surfaced by the HTTP layer.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use super::config_error::ConfigError;
use crate::core::dialogue::DialogueError;
use crate::core::stt::STTError;
use crate::core::telephony::TelephonyError;
use crate::core::tts::TTSError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Recognition(#[from] STTError),

    #[error(transparent)]
    Synthesis(#[from] TTSError),

    #[error(transparent)]
    Dialogue(#[from] DialogueError),

    #[error(transparent)]
    Telephony(#[from] TelephonyError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Recognition(_)
            | AppError::Synthesis(_)
            | AppError::Dialogue(_)
            | AppError::Telephony(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_) | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
