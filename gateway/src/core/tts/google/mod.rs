//! Google Cloud Text-to-Speech (REST `text:synthesize`).

mod messages;
mod provider;

pub use provider::{GOOGLE_TTS_URL, GoogleTTS};
