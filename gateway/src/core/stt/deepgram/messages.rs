//! Deepgram listen API message types.
//!
//! Only `Results` messages carry transcripts; everything else is logged and
//! ignored by the client.

use serde::Deserialize;

use crate::core::stt::base::Transcript;

/// Sent to ask the server to flush and close the stream.
pub const CLOSE_STREAM_MESSAGE: &str = r#"{"type":"CloseStream"}"#;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Alternative {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub confidence: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
}

/// Recognition result for a span of audio.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultsMessage {
    #[serde(default)]
    pub channel: Channel,
    /// The span will not be revised
    #[serde(default)]
    pub is_final: bool,
    /// The speaker paused; the utterance is complete
    #[serde(default)]
    pub speech_final: bool,
}

impl ResultsMessage {
    /// The top alternative, if this result is final and non-empty.
    pub fn final_transcript(&self) -> Option<Transcript> {
        if !self.is_final {
            return None;
        }
        let best = self.channel.alternatives.first()?;
        let text = best.transcript.trim();
        if text.is_empty() {
            return None;
        }
        Some(Transcript::new(text, best.confidence))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorMessage {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorMessage {
    pub fn reason(&self) -> &str {
        self.description
            .as_deref()
            .or(self.message.as_deref())
            .unwrap_or("unknown error")
    }
}

/// A message received from the listen endpoint.
#[derive(Debug, Clone)]
pub enum DeepgramMessage {
    Results(ResultsMessage),
    Metadata,
    SpeechStarted,
    UtteranceEnd,
    Error(ErrorMessage),
    Unknown(String),
}

impl DeepgramMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        struct TypePeek {
            #[serde(rename = "type", default)]
            message_type: String,
        }

        let peek: TypePeek = serde_json::from_str(text)?;

        match peek.message_type.as_str() {
            "Results" => Ok(DeepgramMessage::Results(serde_json::from_str(text)?)),
            "Metadata" => Ok(DeepgramMessage::Metadata),
            "SpeechStarted" => Ok(DeepgramMessage::SpeechStarted),
            "UtteranceEnd" => Ok(DeepgramMessage::UtteranceEnd),
            "Error" => Ok(DeepgramMessage::Error(serde_json::from_str(text)?)),
            _ => Ok(DeepgramMessage::Unknown(text.to_string())),
        }
    }
}
