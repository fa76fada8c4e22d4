pub mod api;
pub mod socket;
pub mod webhooks;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// Every route the server exposes, with state attached.
pub fn create_app_router(state: Arc<AppState>) -> Router {
    let latest_audio_path = state.config.audio_file_name.clone();

    Router::new()
        .merge(api::create_api_router(&latest_audio_path))
        .merge(webhooks::create_webhook_router())
        .merge(socket::create_socket_router())
        .with_state(state)
}
