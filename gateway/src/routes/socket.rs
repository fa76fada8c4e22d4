//! Call audio WebSocket route
//!
//! `GET /socket` upgrades to the bidirectional audio socket the telephony
//! provider opens for each answered call.
//!
//! # Protocol
//!
//! 1. One JSON text frame with the call identity:
//!    `{"uuid":"..","content-type":"audio/l16;rate=16000","language":"en-US"}`
//! 2. Binary frames of caller audio (16-bit linear PCM)
//!
//! The server writes binary frames of reply audio and an empty text frame as
//! a keep-alive.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::call_socket_handler;
use crate::state::AppState;
use std::sync::Arc;

pub fn create_socket_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/socket", get(call_socket_handler))
        .layer(TraceLayer::new_for_http())
}
