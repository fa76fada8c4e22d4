//! Speech-to-text: the recognizer abstraction, the per-call bridge, and the
//! Deepgram streaming provider.

pub mod base;
pub mod bridge;
pub mod deepgram;

pub use base::{
    RecognitionConfig, RecognitionStream, STTError, STTResult, SpeechRecognizer, Transcript,
    TranscriptCallback,
};
pub use bridge::RecognitionBridge;
pub use deepgram::{DeepgramSTT, DeepgramSTTConfig};
