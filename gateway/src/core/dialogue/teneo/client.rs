//! HTTP client for a Teneo engine endpoint.
//!
//! Requests are form-encoded posts with `viewtype=tieapi`. The session is
//! continued by appending `;jsessionid=<token>` to the engine URL and by
//! sending the matching `JSESSIONID` cookie.

use async_trait::async_trait;
use reqwest::header::COOKIE;
use std::time::Duration;
use tracing::debug;

use super::messages::TeneoResponse;
use crate::core::dialogue::base::{DialogueEngine, DialogueError, DialogueReply, DialogueResult};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TeneoClient {
    client: reqwest::Client,
    engine_url: String,
}

impl TeneoClient {
    pub fn new(engine_url: impl Into<String>) -> DialogueResult<Self> {
        let engine_url = engine_url.into();
        url::Url::parse(&engine_url).map_err(|e| {
            DialogueError::InvalidConfiguration(format!("Invalid engine URL {engine_url}: {e}"))
        })?;

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| DialogueError::InvalidConfiguration(format!("HTTP client: {e}")))?;

        Ok(Self { client, engine_url })
    }

    pub fn engine_url(&self) -> &str {
        &self.engine_url
    }

    fn request_url(&self, session_token: Option<&str>) -> String {
        match session_token {
            Some(token) => format!("{};jsessionid={}", self.engine_url, token),
            None => self.engine_url.clone(),
        }
    }
}

#[async_trait]
impl DialogueEngine for TeneoClient {
    async fn send(
        &self,
        session_token: Option<&str>,
        text: &str,
    ) -> DialogueResult<DialogueReply> {
        let mut request = self
            .client
            .post(self.request_url(session_token))
            .form(&[("viewtype", "tieapi"), ("userinput", text)]);
        if let Some(token) = session_token {
            request = request.header(COOKIE, format!("JSESSIONID={token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| DialogueError::DialogueUnreachable(format!("Request failed: {e}")))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(DialogueError::DialogueUnreachable(format!(
                "Engine returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(DialogueError::EngineError {
                status: i64::from(status.as_u16()),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: TeneoResponse = response
            .json()
            .await
            .map_err(|e| DialogueError::InvalidResponse(e.to_string()))?;

        if !body.is_success() {
            return Err(DialogueError::EngineError {
                status: body.status,
                message: body.message.clone().unwrap_or_default(),
            });
        }

        let reply = body.into_reply();
        debug!(
            end_call = reply.end_call,
            has_session = reply.session_token.is_some(),
            "Teneo reply received"
        );
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url() {
        let client = TeneoClient::new("https://engine.example.com/bot/").unwrap();
        assert_eq!(client.request_url(None), "https://engine.example.com/bot/");
        assert_eq!(
            client.request_url(Some("abc123")),
            "https://engine.example.com/bot/;jsessionid=abc123"
        );
    }

    #[test]
    fn test_invalid_engine_url() {
        assert!(matches!(
            TeneoClient::new("not a url"),
            Err(DialogueError::InvalidConfiguration(_))
        ));
    }
}
