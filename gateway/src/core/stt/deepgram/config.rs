//! Deepgram listen endpoint configuration.

use url::Url;

use crate::core::stt::base::{RecognitionConfig, STTError, STTResult};

/// Default Deepgram streaming endpoint.
pub const DEEPGRAM_STT_URL: &str = "wss://api.deepgram.com/v1/listen";

/// Model tuned for narrowband phone audio.
pub const DEEPGRAM_DEFAULT_MODEL: &str = "nova-2-phonecall";

/// Deepgram connection settings.
#[derive(Debug, Clone)]
pub struct DeepgramSTTConfig {
    pub api_key: String,
    /// Default: "nova-2-phonecall"
    pub model: String,
    /// Default: [`DEEPGRAM_STT_URL`]
    pub base_url: String,
    /// Default: true
    pub punctuate: bool,
    /// Silence in milliseconds that closes an utterance. `None` leaves the
    /// provider default in place.
    pub endpointing_ms: Option<u32>,
}

impl DeepgramSTTConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEEPGRAM_DEFAULT_MODEL.to_string(),
            base_url: DEEPGRAM_STT_URL.to_string(),
            punctuate: true,
            endpointing_ms: None,
        }
    }

    /// Listen URL for a continuous linear16 stream with interim results off.
    pub fn build_url(&self, recognition: &RecognitionConfig) -> STTResult<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            STTError::ConfigurationError(format!("Invalid Deepgram URL {}: {e}", self.base_url))
        })?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("model", &self.model)
                .append_pair("encoding", "linear16")
                .append_pair("sample_rate", &recognition.sample_rate.to_string())
                .append_pair("channels", &recognition.channels.to_string())
                .append_pair("language", &recognition.language)
                .append_pair("interim_results", "false")
                .append_pair("punctuate", if self.punctuate { "true" } else { "false" });
            if let Some(endpointing) = self.endpointing_ms {
                query.append_pair("endpointing", &endpointing.to_string());
            }
        }

        Ok(url)
    }
}
