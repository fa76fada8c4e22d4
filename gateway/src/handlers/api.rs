use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub active_calls: usize,
    pub delivery_mode: &'static str,
}

/// `GET /`
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        active_calls: state.registry.len(),
        delivery_mode: state.session_settings.delivery_mode.as_str(),
    })
}
