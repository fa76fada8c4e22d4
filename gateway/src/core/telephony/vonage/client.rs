//! Voice API call control over REST.
//!
//! - Play audio: `PUT /v1/calls/{uuid}/stream` with `{"stream_url":[url],"loop":1}`
//! - Hang up: `PUT /v1/calls/{uuid}` with `{"action":"hangup"}`

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::jwt::VonageCredentials;
use crate::core::telephony::base::{TelephonyControl, TelephonyError, TelephonyResult};

pub const VONAGE_API_URL: &str = "https://api.nexmo.com";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct VonageClient {
    http: reqwest::Client,
    api_url: Url,
    credentials: VonageCredentials,
}

impl VonageClient {
    pub fn new(credentials: VonageCredentials, api_url: &str) -> TelephonyResult<Self> {
        let api_url = Url::parse(api_url).map_err(|e| {
            TelephonyError::InvalidConfiguration(format!("Invalid Vonage API URL {api_url}: {e}"))
        })?;
        if api_url.cannot_be_a_base() {
            return Err(TelephonyError::InvalidConfiguration(format!(
                "Vonage API URL {api_url} cannot be used as a base"
            )));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TelephonyError::InvalidConfiguration(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_url,
            credentials,
        })
    }

    /// `<api>/v1/calls/<call_id>[/<action>]`, with `call_id` percent-encoded.
    fn call_url(&self, call_id: &str, action: Option<&str>) -> TelephonyResult<Url> {
        let mut url = self.api_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                TelephonyError::InvalidConfiguration("Vonage API URL has no path".to_string())
            })?;
            segments.pop_if_empty().extend(["v1", "calls", call_id]);
            if let Some(action) = action {
                segments.push(action);
            }
        }
        Ok(url)
    }

    async fn put(&self, url: Url, body: serde_json::Value) -> TelephonyResult<()> {
        let token = self.credentials.token()?;

        let response = self
            .http
            .put(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| TelephonyError::ControlUnavailable(format!("Request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                TelephonyError::AuthenticationFailed(format!("{status}: {message}"))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                TelephonyError::ControlUnavailable(format!("{status}: {message}"))
            }
            s if s.is_server_error() => {
                TelephonyError::ControlUnavailable(format!("{status}: {message}"))
            }
            _ => TelephonyError::Rejected {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl TelephonyControl for VonageClient {
    async fn play_stream(&self, call_id: &str, stream_url: &str) -> TelephonyResult<()> {
        let url = self.call_url(call_id, Some("stream"))?;
        debug!(call_id, stream_url, "Requesting audio playback");
        self.put(url, json!({ "stream_url": [stream_url], "loop": 1 }))
            .await?;
        info!(call_id, "Playback started");
        Ok(())
    }

    async fn hangup(&self, call_id: &str) -> TelephonyResult<()> {
        let url = self.call_url(call_id, None)?;
        self.put(url, json!({ "action": "hangup" })).await?;
        info!(call_id, "Call hung up");
        Ok(())
    }
}
