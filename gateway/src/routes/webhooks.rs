use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::webhooks;
use crate::state::AppState;
use std::sync::Arc;

/// Telephony provider webhooks.
///
/// - `GET /webhooks/answer` returns the NCCO that connects the call audio
/// - `POST /webhooks/events` acknowledges call status events
pub fn create_webhook_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/webhooks/answer", get(webhooks::answer_call))
        .route("/webhooks/events", post(webhooks::call_event))
        .layer(TraceLayer::new_for_http())
}
