//! Text-to-speech abstractions.
//!
//! A [`SpeechSynthesizer`] turns one reply into one audio buffer. The
//! [`EncodingProfile`] decides what that buffer looks like: headerless
//! 16-bit PCM for streaming back over the call socket, or a compressed file
//! for the telephony provider to fetch and play.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::utils::retry::PolicyError;

#[derive(Debug, Clone, Error)]
pub enum TTSError {
    /// The synthesis service could not be reached or is overloaded.
    #[error("Speech synthesizer unavailable: {0}")]
    SynthesisUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The provider rejected the request.
    #[error("Provider error ({status}): {message}")]
    ProviderError { status: u16, message: String },

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Synthesis timed out: {0}")]
    Timeout(String),
}

pub type TTSResult<T> = Result<T, TTSError>;

impl PolicyError for TTSError {
    fn timed_out(operation: &str, after: Duration) -> Self {
        TTSError::Timeout(format!("{operation} exceeded {}ms", after.as_millis()))
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            TTSError::SynthesisUnavailable(_) | TTSError::Timeout(_)
        )
    }
}

/// Requested voice gender, mapped onto the provider's SSML gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    #[default]
    Female,
    Male,
    Neutral,
}

impl VoiceGender {
    pub fn as_ssml_gender(&self) -> &'static str {
        match self {
            VoiceGender::Female => "FEMALE",
            VoiceGender::Male => "MALE",
            VoiceGender::Neutral => "NEUTRAL",
        }
    }
}

impl FromStr for VoiceGender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "female" => Ok(VoiceGender::Female),
            "male" => Ok(VoiceGender::Male),
            "neutral" => Ok(VoiceGender::Neutral),
            other => Err(format!(
                "unknown voice gender '{other}' (expected female, male or neutral)"
            )),
        }
    }
}

impl fmt::Display for VoiceGender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_ssml_gender().to_ascii_lowercase())
    }
}

/// Voice selection for a synthesis request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VoiceProfile {
    pub gender: VoiceGender,
    /// Provider-specific voice name; the provider picks one when unset
    pub name: Option<String>,
}

/// Output encoding for a synthesis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingProfile {
    /// Headerless 16-bit little-endian mono PCM at the given rate.
    Stream { sample_rate: u32 },
    /// MP3, suitable for serving as a static file.
    File,
}

impl EncodingProfile {
    pub fn mime_type(&self) -> &'static str {
        match self {
            EncodingProfile::Stream { .. } => "audio/l16",
            EncodingProfile::File => "audio/mpeg",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    pub language_code: String,
    pub voice: VoiceProfile,
    pub encoding: EncodingProfile,
}

/// Text-to-speech capability.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `request.text` into a single audio buffer.
    async fn synthesize(&self, request: &SynthesisRequest) -> TTSResult<Bytes>;

    fn provider_name(&self) -> &'static str;
}
