//! Streaming speech recognition abstractions.
//!
//! A [`SpeechRecognizer`] opens one continuous recognition stream per call.
//! Audio is pushed into the stream as it arrives from the telephony leg and
//! finalized utterances come back asynchronously; endpointing is done by the
//! recognizer, never by the caller.

use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::utils::retry::PolicyError;

/// Error types for speech recognition.
#[derive(Debug, Clone, Error)]
pub enum STTError {
    /// The recognition service could not be reached or dropped the stream.
    #[error("Speech recognizer unavailable: {0}")]
    RecognitionUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A message on an established stream could not be processed.
    #[error("Recognition stream error: {0}")]
    StreamError(String),

    #[error("Recognition timed out: {0}")]
    Timeout(String),
}

pub type STTResult<T> = Result<T, STTError>;

impl PolicyError for STTError {
    fn timed_out(operation: &str, after: Duration) -> Self {
        STTError::Timeout(format!("{operation} exceeded {}ms", after.as_millis()))
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            STTError::RecognitionUnavailable(_) | STTError::Timeout(_)
        )
    }
}

/// Parameters for opening a recognition stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionConfig {
    /// BCP-47 language code, e.g. "en-US"
    pub language: String,
    /// Sample rate of the inbound PCM in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
}

impl RecognitionConfig {
    /// Mono 16-bit linear PCM, as delivered by the telephony WebSocket.
    pub fn linear16(language: impl Into<String>, sample_rate: u32) -> Self {
        Self {
            language: language.into(),
            sample_rate,
            channels: 1,
        }
    }
}

/// One finalized recognition result.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    /// Recognizer confidence in the range 0.0..=1.0
    pub confidence: f32,
}

impl Transcript {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// An open recognition stream returned by a [`SpeechRecognizer`].
///
/// Dropping `audio` signals end of input to the provider.
pub struct RecognitionStream {
    /// Inbound audio queue feeding the recognizer
    pub audio: mpsc::Sender<Bytes>,
    /// Finalized transcripts (or stream errors) in arrival order
    pub results: mpsc::Receiver<STTResult<Transcript>>,
    /// Provider I/O task driving the connection, if any
    pub task: Option<JoinHandle<()>>,
}

/// Callback invoked for every finalized transcript.
pub type TranscriptCallback =
    Arc<dyn Fn(Transcript) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Streaming speech-to-text capability.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Open a continuous (multi-utterance) stream with interim results disabled.
    async fn open_stream(&self, config: &RecognitionConfig) -> STTResult<RecognitionStream>;

    /// Short provider name for logging.
    fn provider_name(&self) -> &'static str;
}
