//! Text-to-speech: the synthesizer abstraction and the Google Cloud provider.

pub mod base;
pub mod google;

pub use base::{
    EncodingProfile, SpeechSynthesizer, SynthesisRequest, TTSError, TTSResult, VoiceGender,
    VoiceProfile,
};
pub use google::{GOOGLE_TTS_URL, GoogleTTS};
