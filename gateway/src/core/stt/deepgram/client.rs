//! Deepgram WebSocket recognizer.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode, header::AUTHORIZATION};
use tokio_tungstenite::tungstenite::{Error as WsError, protocol::Message};
use tracing::{debug, error, info, warn};

use super::config::DeepgramSTTConfig;
use super::messages::{CLOSE_STREAM_MESSAGE, DeepgramMessage};
use crate::core::stt::base::{
    RecognitionConfig, RecognitionStream, STTError, STTResult, SpeechRecognizer, Transcript,
};

// =============================================================================
// Constants
// =============================================================================

/// Inbound audio queue depth. At 20ms frames this is a little over a second
/// of audio before frames start being dropped.
const AUDIO_CHANNEL_CAPACITY: usize = 64;

const RESULT_CHANNEL_CAPACITY: usize = 32;

// =============================================================================
// DeepgramSTT
// =============================================================================

/// Streaming recognizer backed by the Deepgram listen API.
///
/// Each [`open_stream`](SpeechRecognizer::open_stream) call opens its own
/// WebSocket; one I/O task pumps audio out and results back in.
pub struct DeepgramSTT {
    config: DeepgramSTTConfig,
}

impl DeepgramSTT {
    pub fn new(config: DeepgramSTTConfig) -> STTResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(STTError::ConfigurationError(
                "Deepgram API key is required".to_string(),
            ));
        }
        Ok(Self { config })
    }
}

#[async_trait]
impl SpeechRecognizer for DeepgramSTT {
    async fn open_stream(&self, recognition: &RecognitionConfig) -> STTResult<RecognitionStream> {
        let url = self.config.build_url(recognition)?;

        let mut request = url.as_str().into_client_request().map_err(|e| {
            STTError::ConfigurationError(format!("Failed to create WebSocket request: {e}"))
        })?;
        let token = HeaderValue::from_str(&format!("Token {}", self.config.api_key))
            .map_err(|e| STTError::ConfigurationError(format!("Invalid API key header: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, token);

        let (ws_stream, _response) = match connect_async(request).await {
            Ok(connected) => connected,
            Err(WsError::Http(response))
                if response.status() == StatusCode::UNAUTHORIZED
                    || response.status() == StatusCode::FORBIDDEN =>
            {
                return Err(STTError::AuthenticationFailed(format!(
                    "Deepgram rejected credentials ({})",
                    response.status()
                )));
            }
            Err(e) => {
                return Err(STTError::RecognitionUnavailable(format!(
                    "Failed to connect to Deepgram: {e}"
                )));
            }
        };

        info!(model = %self.config.model, "Connected to Deepgram STT WebSocket");

        let (mut ws_sink, mut ws_source) = ws_stream.split();
        let (audio_tx, mut audio_rx) = mpsc::channel::<Bytes>(AUDIO_CHANNEL_CAPACITY);
        let (result_tx, result_rx) =
            mpsc::channel::<STTResult<Transcript>>(RESULT_CHANNEL_CAPACITY);

        let task = tokio::spawn(async move {
            let mut audio_open = true;

            loop {
                tokio::select! {
                    frame = audio_rx.recv(), if audio_open => match frame {
                        Some(data) => {
                            if let Err(e) = ws_sink.send(Message::Binary(data)).await {
                                error!("Failed to send audio to Deepgram: {}", e);
                                let _ = result_tx
                                    .send(Err(STTError::RecognitionUnavailable(e.to_string())))
                                    .await;
                                break;
                            }
                        }
                        None => {
                            // Input finished: ask Deepgram to flush the final
                            // results, then keep reading until it closes.
                            audio_open = false;
                            debug!("Audio input ended, closing Deepgram stream");
                            let close = Message::text(CLOSE_STREAM_MESSAGE.to_string());
                            if let Err(e) = ws_sink.send(close).await {
                                debug!("Failed to send CloseStream: {}", e);
                                break;
                            }
                        }
                    },
                    message = ws_source.next() => match message {
                        Some(Ok(Message::Text(text))) => {
                            if !handle_text_message(text.as_str(), &result_tx).await {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            debug!("Deepgram closed the stream: {:?}", frame);
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("Deepgram WebSocket error: {}", e);
                            let _ = result_tx
                                .send(Err(STTError::RecognitionUnavailable(e.to_string())))
                                .await;
                            break;
                        }
                        None => {
                            debug!("Deepgram WebSocket stream ended");
                            break;
                        }
                    },
                }
            }

            let _ = ws_sink.close().await;
        });

        Ok(RecognitionStream {
            audio: audio_tx,
            results: result_rx,
            task: Some(task),
        })
    }

    fn provider_name(&self) -> &'static str {
        "deepgram"
    }
}

/// Returns `false` once the result receiver is gone.
async fn handle_text_message(text: &str, result_tx: &mpsc::Sender<STTResult<Transcript>>) -> bool {
    let outcome = match DeepgramMessage::parse(text) {
        Ok(DeepgramMessage::Results(results)) => match results.final_transcript() {
            Some(transcript) => {
                debug!(
                    confidence = transcript.confidence,
                    "Deepgram final transcript: {}", transcript.text
                );
                Ok(transcript)
            }
            None => return true,
        },
        Ok(DeepgramMessage::Error(err)) => Err(STTError::StreamError(err.reason().to_string())),
        Ok(DeepgramMessage::Unknown(raw)) => {
            debug!("Unhandled Deepgram message: {}", raw);
            return true;
        }
        Ok(_) => return true,
        Err(e) => Err(STTError::StreamError(format!(
            "Failed to parse Deepgram message: {e}"
        ))),
    };

    result_tx.send(outcome).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_api_key() {
        assert!(matches!(
            DeepgramSTT::new(DeepgramSTTConfig::new("  ")),
            Err(STTError::ConfigurationError(_))
        ));
        assert!(DeepgramSTT::new(DeepgramSTTConfig::new("key")).is_ok());
    }

    #[tokio::test]
    async fn test_handle_text_message_forwards_finals_only() {
        let (tx, mut rx) = mpsc::channel(4);

        let interim = r#"{"type":"Results","is_final":false,"channel":{"alternatives":[{"transcript":"hi","confidence":0.4}]}}"#;
        let final_result = r#"{"type":"Results","is_final":true,"channel":{"alternatives":[{"transcript":"hi there","confidence":0.9}]}}"#;

        assert!(handle_text_message(interim, &tx).await);
        assert!(handle_text_message(r#"{"type":"Metadata"}"#, &tx).await);
        assert!(handle_text_message(final_result, &tx).await);

        let transcript = rx.recv().await.unwrap().unwrap();
        assert_eq!(transcript.text, "hi there");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_handle_text_message_reports_errors() {
        let (tx, mut rx) = mpsc::channel(4);
        assert!(handle_text_message("garbage", &tx).await);
        assert!(matches!(
            rx.recv().await.unwrap(),
            Err(STTError::StreamError(_))
        ));
    }

    #[tokio::test]
    async fn test_handle_text_message_stops_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let final_result = r#"{"type":"Results","is_final":true,"channel":{"alternatives":[{"transcript":"bye","confidence":0.9}]}}"#;
        assert!(!handle_text_message(final_result, &tx).await);
    }

    #[tokio::test]
    async fn test_open_stream_unreachable() {
        let mut config = DeepgramSTTConfig::new("key");
        config.base_url = "ws://127.0.0.1:9/v1/listen".to_string();
        let stt = DeepgramSTT::new(config).unwrap();
        let result = stt
            .open_stream(&RecognitionConfig::linear16("en-US", 16000))
            .await;
        assert!(matches!(result, Err(STTError::RecognitionUnavailable(_))));
    }
}
