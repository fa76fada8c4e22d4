//! The JSON control message that opens every call socket.
//!
//! Vonage sends the endpoint headers from the NCCO, merged with the
//! negotiated `content-type`, as the first text frame:
//! `{"event":"websocket:connected","content-type":"audio/l16;rate=16000","uuid":"..","language":"en-US"}`

use serde::Deserialize;

use super::error::{SessionError, SessionResult};
use crate::core::audio::SUPPORTED_SAMPLE_RATES;

#[derive(Debug, Clone, Deserialize)]
pub struct ControlMessage {
    #[serde(default)]
    uuid: Option<String>,
    #[serde(default, rename = "content-type")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
}

impl ControlMessage {
    /// Parse a control frame. A frame without a non-empty `uuid` cannot bind
    /// a session and is rejected.
    pub fn parse(text: &str) -> SessionResult<Self> {
        let message: ControlMessage = serde_json::from_str(text)
            .map_err(|e| SessionError::MalformedControlMessage(e.to_string()))?;

        match message.uuid.as_deref().map(str::trim) {
            Some(uuid) if !uuid.is_empty() => Ok(message),
            _ => Err(SessionError::MalformedControlMessage(
                "missing call identifier".to_string(),
            )),
        }
    }

    pub fn call_id(&self) -> &str {
        self.uuid.as_deref().map(str::trim).unwrap_or_default()
    }

    /// Sample rate from `audio/l16;rate=<hz>`, if present and supported.
    pub fn sample_rate(&self) -> Option<u32> {
        self.content_type
            .as_deref()?
            .split(';')
            .filter_map(|param| param.trim().strip_prefix("rate="))
            .find_map(|rate| rate.trim().parse().ok())
            .filter(|rate| SUPPORTED_SAMPLE_RATES.contains(rate))
    }

    pub fn language(&self) -> Option<&str> {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|language| !language.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_message() {
        let message = ControlMessage::parse(
            r#"{"event":"websocket:connected","content-type":"audio/l16;rate=16000","uuid":"call-1","language":"en-GB"}"#,
        )
        .unwrap();
        assert_eq!(message.call_id(), "call-1");
        assert_eq!(message.sample_rate(), Some(16000));
        assert_eq!(message.language(), Some("en-GB"));
    }

    #[test]
    fn test_parse_minimal_message() {
        let message = ControlMessage::parse(r#"{"uuid":"call-1"}"#).unwrap();
        assert_eq!(message.call_id(), "call-1");
        assert_eq!(message.sample_rate(), None);
        assert_eq!(message.language(), None);
    }

    #[test]
    fn test_sample_rate_variants() {
        let message =
            ControlMessage::parse(r#"{"uuid":"c","content-type":"audio/l16; rate=8000"}"#).unwrap();
        assert_eq!(message.sample_rate(), Some(8000));
        let message = ControlMessage::parse(r#"{"uuid":"c","content-type":"audio/l16"}"#).unwrap();
        assert_eq!(message.sample_rate(), None);
    }

    #[test]
    fn test_unsupported_sample_rates_ignored() {
        for content_type in ["audio/l16;rate=0", "audio/l16;rate=4000", "audio/l16;rate=96000"] {
            let text = format!(r#"{{"uuid":"c","content-type":"{content_type}"}}"#);
            let message = ControlMessage::parse(&text).unwrap();
            assert_eq!(message.sample_rate(), None, "{content_type}");
        }
        let message =
            ControlMessage::parse(r#"{"uuid":"c","content-type":"audio/l16;rate=48000"}"#).unwrap();
        assert_eq!(message.sample_rate(), Some(48000));
    }

    #[test]
    fn test_rejects_invalid_messages() {
        let invalid = [
            "",
            "not json",
            "[]",
            r#"{"uuid":""}"#,
            r#"{"uuid":"  "}"#,
            r#"{"language":"en"}"#,
        ];
        for raw in invalid {
            assert!(
                matches!(
                    ControlMessage::parse(raw),
                    Err(SessionError::MalformedControlMessage(_))
                ),
                "accepted {raw:?}"
            );
        }
    }
}
