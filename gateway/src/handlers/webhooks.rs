//! Voice API webhooks.
//!
//! The answer webhook tells the provider to bridge the call audio to our
//! socket; the event webhook only needs to be acknowledged.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::HOST},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::telephony::vonage::ncco::{NccoAction, connect_websocket};
use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnswerQuery {
    pub uuid: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// `GET /webhooks/answer?uuid=<call id>`
pub async fn answer_call(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnswerQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<NccoAction>>> {
    let call_id = query
        .uuid
        .as_deref()
        .map(str::trim)
        .filter(|uuid| !uuid.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing uuid query parameter".to_string()))?;

    let request_host = headers.get(HOST).and_then(|value| value.to_str().ok());
    let socket_uri = state.config.socket_url(request_host);
    let settings = &state.session_settings;

    info!(
        call_id,
        from = query.from.as_deref().unwrap_or("-"),
        to = query.to.as_deref().unwrap_or("-"),
        socket_uri = %socket_uri,
        "Answering inbound call"
    );

    Ok(Json(connect_websocket(
        &socket_uri,
        settings.sample_rate,
        &settings.language_code,
        call_id,
    )))
}

#[derive(Debug, Deserialize)]
struct CallEvent {
    uuid: Option<String>,
    status: Option<String>,
}

/// `POST /webhooks/events`
pub async fn call_event(body: Bytes) -> StatusCode {
    match serde_json::from_slice::<CallEvent>(&body) {
        Ok(event) => info!(
            call_id = event.uuid.as_deref().unwrap_or("-"),
            status = event.status.as_deref().unwrap_or("-"),
            "Call event"
        ),
        Err(_) => debug!("Call event with unrecognised body ({} bytes)", body.len()),
    }
    StatusCode::OK
}
