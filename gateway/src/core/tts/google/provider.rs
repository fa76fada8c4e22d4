//! Google Cloud TTS provider.
//!
//! - Endpoint: `POST https://texttospeech.googleapis.com/v1/text:synthesize`
//! - Auth: `x-goog-api-key` header
//! - Stream profile: `LINEAR16` at the call's sample rate, WAV header stripped
//! - File profile: `MP3`

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

use super::messages::{
    AudioConfig, ErrorEnvelope, SynthesisInput, SynthesizeRequest, SynthesizeResponse,
    VoiceSelectionParams,
};
use crate::core::audio::pcm_payload;
use crate::core::tts::base::{
    EncodingProfile, SpeechSynthesizer, SynthesisRequest, TTSError, TTSResult,
};

pub const GOOGLE_TTS_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct GoogleTTS {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl GoogleTTS {
    pub fn new(api_key: impl Into<String>) -> TTSResult<Self> {
        Self::with_endpoint(api_key, GOOGLE_TTS_URL)
    }

    /// Use a non-default endpoint, e.g. a regional one or a local stub.
    pub fn with_endpoint(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> TTSResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(TTSError::InvalidConfiguration(
                "Google TTS API key is required".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TTSError::InvalidConfiguration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            endpoint: endpoint.into(),
        })
    }

    fn build_body<'a>(request: &'a SynthesisRequest) -> SynthesizeRequest<'a> {
        let audio_config = match request.encoding {
            EncodingProfile::Stream { sample_rate } => AudioConfig {
                audio_encoding: "LINEAR16",
                sample_rate_hertz: Some(sample_rate),
            },
            EncodingProfile::File => AudioConfig {
                audio_encoding: "MP3",
                sample_rate_hertz: None,
            },
        };

        SynthesizeRequest {
            input: SynthesisInput {
                text: &request.text,
            },
            voice: VoiceSelectionParams {
                language_code: &request.language_code,
                ssml_gender: request.voice.gender.as_ssml_gender(),
                name: request.voice.name.as_deref(),
            },
            audio_config,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTTS {
    async fn synthesize(&self, request: &SynthesisRequest) -> TTSResult<Bytes> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::build_body(request))
            .send()
            .await
            .map_err(|e| TTSError::SynthesisUnavailable(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&raw)
                .map(|envelope| envelope.error.message)
                .unwrap_or(raw);

            return Err(
                if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                    TTSError::SynthesisUnavailable(format!("{status}: {message}"))
                } else {
                    TTSError::ProviderError {
                        status: status.as_u16(),
                        message,
                    }
                },
            );
        }

        let body: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| TTSError::InvalidResponse(format!("Malformed response body: {e}")))?;

        let audio = BASE64
            .decode(body.audio_content.as_bytes())
            .map_err(|e| TTSError::InvalidResponse(format!("Invalid audioContent: {e}")))?;

        let audio = match request.encoding {
            EncodingProfile::Stream { .. } => pcm_payload(Bytes::from(audio)),
            EncodingProfile::File => Bytes::from(audio),
        };

        debug!(
            bytes = audio.len(),
            encoding = request.encoding.mime_type(),
            "Google TTS synthesis complete"
        );
        Ok(audio)
    }

    fn provider_name(&self) -> &'static str {
        "google"
    }
}
