use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, audio};
use crate::state::AppState;
use std::sync::Arc;

/// Health check and reply audio.
///
/// `latest_audio_path` is the file name the most recent reply is also
/// served under, e.g. `reply.mp3`.
pub fn create_api_router(latest_audio_path: &str) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .route("/audio/{file_name}", get(audio::serve_audio))
        .route(
            &format!("/{latest_audio_path}"),
            get(audio::serve_latest_audio),
        )
        .layer(TraceLayer::new_for_http())
}
