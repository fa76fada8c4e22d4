//! Serves synthesized reply files to the telephony provider.

use axum::{
    extract::{Path, State},
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use std::path::Path as FsPath;
use std::sync::Arc;
use tracing::debug;

use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;

async fn mp3_response(path: &FsPath) -> AppResult<Response> {
    let audio = match tokio::fs::read(path).await {
        Ok(audio) => audio,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound("Audio file not found".to_string()));
        }
        Err(e) => return Err(AppError::Io(e)),
    };

    debug!(path = %path.display(), bytes = audio.len(), "Serving reply audio");
    Ok((
        [(CONTENT_TYPE, "audio/mpeg"), (CACHE_CONTROL, "no-store")],
        audio,
    )
        .into_response())
}

/// `GET /audio/{file_name}`
pub async fn serve_audio(
    State(state): State<Arc<AppState>>,
    Path(file_name): Path<String>,
) -> AppResult<Response> {
    let path = state
        .services
        .audio_store
        .resolve(&file_name)
        .ok_or_else(|| AppError::NotFound("Audio file not found".to_string()))?;
    mp3_response(&path).await
}

/// `GET /<audio_file_name>`: the most recently written reply.
pub async fn serve_latest_audio(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    let path = state
        .services
        .audio_store
        .latest()
        .ok_or_else(|| AppError::NotFound("No audio has been synthesized yet".to_string()))?;
    mp3_response(&path).await
}
