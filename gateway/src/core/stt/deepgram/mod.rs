//! Deepgram streaming speech recognition.
//!
//! - [`config`]: connection settings and listen URL construction
//! - [`messages`]: server message types
//! - [`client`]: the [`DeepgramSTT`] recognizer

mod client;
mod config;
mod messages;

pub use client::DeepgramSTT;
pub use config::{DEEPGRAM_DEFAULT_MODEL, DEEPGRAM_STT_URL, DeepgramSTTConfig};
pub use messages::{DeepgramMessage, ResultsMessage};
