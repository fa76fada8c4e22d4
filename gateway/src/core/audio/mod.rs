//! Audio buffer utilities: framing, PCM extraction and file storage.

mod framer;
mod pcm;
mod store;

pub use framer::{DEFAULT_FRAME_SIZE, SUPPORTED_SAMPLE_RATES, frame_audio};
pub use pcm::pcm_payload;
pub use store::{AUDIO_FILE_EXTENSION, AudioFileStore};
