pub mod audio;
pub mod dialogue;
pub mod session;
pub mod stt;
pub mod telephony;
pub mod tts;

// Re-export commonly used types for convenience
pub use dialogue::{DialogueEngine, DialogueError, DialogueReply, TeneoClient};
pub use session::{CallServices, CallSession, DeliveryMode, SessionRegistry, SessionSettings};
pub use stt::{DeepgramSTT, RecognitionBridge, STTError, SpeechRecognizer, Transcript};
pub use telephony::{TelephonyControl, TelephonyError, VonageClient};
pub use tts::{GoogleTTS, SpeechSynthesizer, TTSError};
