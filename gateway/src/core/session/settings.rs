//! Per-deployment session settings and the provider set a session talks to.

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::core::audio::{AudioFileStore, DEFAULT_FRAME_SIZE};
use crate::core::dialogue::DialogueEngine;
use crate::core::stt::SpeechRecognizer;
use crate::core::telephony::TelephonyControl;
use crate::core::tts::{EncodingProfile, SpeechSynthesizer, VoiceProfile};
use crate::utils::retry::CallPolicy;

/// How synthesized replies reach the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// PCM frames written back over the call socket
    #[default]
    Stream,
    /// MP3 file fetched and played by the telephony provider
    File,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::Stream => "stream",
            DeliveryMode::File => "file",
        }
    }
}

impl FromStr for DeliveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stream" | "websocket" | "google-websocket" => Ok(DeliveryMode::Stream),
            "file" | "audio-file" | "google-audio-file" => Ok(DeliveryMode::File),
            other => Err(format!(
                "unknown delivery mode '{other}' (expected stream or file)"
            )),
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Used when the control message carries no language. Default: "en-US"
    pub language_code: String,
    pub voice: VoiceProfile,
    pub delivery_mode: DeliveryMode,
    /// Used when the control message carries no rate. Default: 16000
    pub sample_rate: u32,
    /// Outbound PCM frame size in bytes. Default: 640 (20ms at 16kHz)
    pub frame_size: NonZeroUsize,
    /// Default: 25s
    pub keep_alive_interval: Duration,
    /// Scheme and host the provider fetches audio files from
    pub public_base_url: String,
    pub call_policy: CallPolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            language_code: "en-US".to_string(),
            voice: VoiceProfile::default(),
            delivery_mode: DeliveryMode::Stream,
            sample_rate: 16000,
            frame_size: NonZeroUsize::new(DEFAULT_FRAME_SIZE).unwrap_or(NonZeroUsize::MIN),
            keep_alive_interval: Duration::from_secs(25),
            public_base_url: "http://localhost:3000".to_string(),
            call_policy: CallPolicy::default(),
        }
    }
}

impl SessionSettings {
    pub fn encoding_profile(&self, sample_rate: u32) -> EncodingProfile {
        match self.delivery_mode {
            DeliveryMode::Stream => EncodingProfile::Stream { sample_rate },
            DeliveryMode::File => EncodingProfile::File,
        }
    }

    /// Outbound frame size for a call at `sample_rate`, covering the same
    /// duration as the configured frame does at the default rate.
    pub fn frame_size_for(&self, sample_rate: u32) -> NonZeroUsize {
        if sample_rate == self.sample_rate || self.sample_rate == 0 {
            return self.frame_size;
        }
        let scaled =
            self.frame_size.get() as u64 * u64::from(sample_rate) / u64::from(self.sample_rate);
        // Whole 16-bit samples only.
        let even = (scaled as usize) & !1;
        NonZeroUsize::new(even).unwrap_or(self.frame_size)
    }

    /// Public URL of a stored audio file.
    pub fn audio_url(&self, file_name: &str) -> String {
        format!(
            "{}/audio/{}",
            self.public_base_url.trim_end_matches('/'),
            file_name
        )
    }
}

/// External capabilities shared by every session.
#[derive(Clone)]
pub struct CallServices {
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub dialogue: Arc<dyn DialogueEngine>,
    pub telephony: Arc<dyn TelephonyControl>,
    pub audio_store: Arc<AudioFileStore>,
}
