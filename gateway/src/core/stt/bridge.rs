//! Per-call recognition bridge.
//!
//! Wraps one [`RecognitionStream`] for the lifetime of a call: inbound audio is
//! queued without blocking the session loop, and finalized transcripts are
//! delivered to a callback one at a time, in arrival order. When the provider
//! ends the stream on its own the bridge's end signal fires so the owner can
//! open a new one.

use bytes::Bytes;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::base::{
    RecognitionConfig, RecognitionStream, STTError, STTResult, SpeechRecognizer,
    TranscriptCallback,
};
use crate::utils::retry::CallPolicy;

/// How long a closed stream may keep draining before its I/O task is aborted.
const STREAM_DRAIN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(2);

/// Live recognition for one call.
pub struct RecognitionBridge {
    provider: &'static str,
    audio_tx: Option<tokio::sync::mpsc::Sender<Bytes>>,
    reader_task: Option<JoinHandle<()>>,
    stream_task: Option<JoinHandle<()>>,
    ended: CancellationToken,
    frames_forwarded: u64,
    frames_dropped: u64,
}

impl RecognitionBridge {
    /// Open a recognition stream and start delivering transcripts to `on_transcript`.
    ///
    /// The open is retried under `policy`; a service that stays unreachable
    /// yields [`STTError::RecognitionUnavailable`].
    pub async fn start(
        recognizer: &dyn SpeechRecognizer,
        config: &RecognitionConfig,
        policy: &CallPolicy,
        on_transcript: TranscriptCallback,
    ) -> STTResult<Self> {
        let provider = recognizer.provider_name();

        let stream = policy
            .run("recognition.open_stream", || recognizer.open_stream(config))
            .await
            .map_err(|e| match e {
                STTError::Timeout(reason) => STTError::RecognitionUnavailable(reason),
                other => other,
            })?;

        let RecognitionStream {
            audio,
            mut results,
            task,
        } = stream;

        let ended = CancellationToken::new();
        let reader_ended = ended.clone();

        // Single reader: the callback is awaited before the next result is
        // taken, so transcripts are never delivered concurrently.
        let reader_task = tokio::spawn(async move {
            while let Some(result) = results.recv().await {
                match result {
                    Ok(transcript) if transcript.text.trim().is_empty() => {
                        debug!("Skipping empty transcript");
                    }
                    Ok(transcript) => on_transcript(transcript).await,
                    Err(e) => warn!("Recognition stream error: {}", e),
                }
            }
            debug!("Recognition result stream ended");
            reader_ended.cancel();
        });

        info!(
            provider,
            language = %config.language,
            sample_rate = config.sample_rate,
            "Recognition stream started"
        );

        Ok(Self {
            provider,
            audio_tx: Some(audio),
            reader_task: Some(reader_task),
            stream_task: task,
            ended,
            frames_forwarded: 0,
            frames_dropped: 0,
        })
    }

    /// Forward one audio frame to the recognizer.
    ///
    /// Never blocks. Returns `false` when the frame was dropped, either because
    /// the bridge is closed or because the provider is not keeping up.
    pub fn push_audio(&mut self, frame: Bytes) -> bool {
        let Some(audio_tx) = &self.audio_tx else {
            self.frames_dropped += 1;
            debug!("Recognition bridge closed, dropping {} bytes", frame.len());
            return false;
        };

        match audio_tx.try_send(frame) {
            Ok(()) => {
                self.frames_forwarded += 1;
                true
            }
            Err(TrySendError::Full(frame)) => {
                self.frames_dropped += 1;
                warn!(
                    provider = self.provider,
                    dropped = self.frames_dropped,
                    "Recognition queue full, dropping {} bytes",
                    frame.len()
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.frames_dropped += 1;
                warn!(
                    provider = self.provider,
                    "Recognition stream closed by provider"
                );
                self.audio_tx = None;
                self.ended.cancel();
                false
            }
        }
    }

    /// Stop recognition. Safe to call more than once.
    ///
    /// No transcript callback runs after this returns.
    pub fn close(&mut self) {
        let was_open = self.audio_tx.take().is_some();
        self.ended.cancel();

        if let Some(reader) = self.reader_task.take() {
            reader.abort();
        }

        // Dropping the audio sender lets the provider finish the stream
        // gracefully; the I/O task is only aborted if it lingers.
        if let Some(mut stream_task) = self.stream_task.take() {
            tokio::spawn(async move {
                if tokio::time::timeout(STREAM_DRAIN_TIMEOUT, &mut stream_task)
                    .await
                    .is_err()
                {
                    debug!("Recognition stream did not drain in time, aborting");
                    stream_task.abort();
                }
            });
        }

        if was_open {
            info!(
                provider = self.provider,
                forwarded = self.frames_forwarded,
                dropped = self.frames_dropped,
                "Recognition stream closed"
            );
        }
    }

    pub fn is_open(&self) -> bool {
        self.audio_tx.is_some() && !self.ended.is_cancelled()
    }

    /// Cancelled once the stream stops, whether the provider ended it or
    /// [`close`](Self::close) was called.
    pub fn end_signal(&self) -> CancellationToken {
        self.ended.clone()
    }

    pub fn frames_forwarded(&self) -> u64 {
        self.frames_forwarded
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }
}

impl Drop for RecognitionBridge {
    fn drop(&mut self) {
        self.audio_tx = None;
        self.ended.cancel();
        if let Some(reader) = self.reader_task.take() {
            reader.abort();
        }
        if let Some(stream_task) = self.stream_task.take() {
            stream_task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stt::base::Transcript;
    use async_trait::async_trait;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::sync::{Mutex, mpsc};

    /// Recognizer whose stream endpoints are handed back to the test.
    struct ChannelRecognizer {
        failures_before_success: AtomicU32,
        endpoints: Mutex<Option<(mpsc::Receiver<Bytes>, mpsc::Sender<STTResult<Transcript>>)>>,
        queue_capacity: usize,
    }

    impl ChannelRecognizer {
        fn new(failures_before_success: u32, queue_capacity: usize) -> Self {
            Self {
                failures_before_success: AtomicU32::new(failures_before_success),
                endpoints: Mutex::new(None),
                queue_capacity,
            }
        }
    }

    #[async_trait]
    impl SpeechRecognizer for ChannelRecognizer {
        async fn open_stream(&self, _config: &RecognitionConfig) -> STTResult<RecognitionStream> {
            if self.failures_before_success.load(Ordering::SeqCst) > 0 {
                self.failures_before_success.fetch_sub(1, Ordering::SeqCst);
                return Err(STTError::RecognitionUnavailable("connection refused".into()));
            }
            let (audio_tx, audio_rx) = mpsc::channel(self.queue_capacity);
            let (results_tx, results_rx) = mpsc::channel(8);
            *self.endpoints.lock().await = Some((audio_rx, results_tx));
            Ok(RecognitionStream {
                audio: audio_tx,
                results: results_rx,
                task: None,
            })
        }

        fn provider_name(&self) -> &'static str {
            "channel"
        }
    }

    fn fast_policy(max_attempts: u32) -> CallPolicy {
        CallPolicy {
            timeout: Duration::from_millis(200),
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            backoff_multiplier: 2.0,
        }
    }

    fn collecting_callback() -> (TranscriptCallback, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let callback: TranscriptCallback = Arc::new(
            move |transcript: Transcript| -> Pin<Box<dyn Future<Output = ()> + Send>> {
                let tx = tx.clone();
                Box::pin(async move {
                    let _ = tx.send(transcript.text);
                })
            },
        );
        (callback, rx)
    }

    #[tokio::test]
    async fn test_transcripts_delivered_in_order_and_empty_skipped() {
        let recognizer = ChannelRecognizer::new(0, 8);
        let config = RecognitionConfig::linear16("en-US", 16000);
        let (callback, mut delivered) = collecting_callback();

        let mut bridge = RecognitionBridge::start(&recognizer, &config, &fast_policy(1), callback)
            .await
            .unwrap();
        let (_audio_rx, results_tx) = recognizer.endpoints.lock().await.take().unwrap();

        results_tx.send(Ok(Transcript::new("hello", 0.9))).await.unwrap();
        results_tx.send(Ok(Transcript::new("   ", 0.1))).await.unwrap();
        results_tx
            .send(Err(STTError::StreamError("bad frame".into())))
            .await
            .unwrap();
        results_tx.send(Ok(Transcript::new("world", 0.8))).await.unwrap();

        assert_eq!(delivered.recv().await.unwrap(), "hello");
        assert_eq!(delivered.recv().await.unwrap(), "world");
        bridge.close();
    }

    #[tokio::test]
    async fn test_push_audio_forwards_frames() {
        let recognizer = ChannelRecognizer::new(0, 8);
        let config = RecognitionConfig::linear16("en-US", 16000);
        let (callback, _delivered) = collecting_callback();

        let mut bridge = RecognitionBridge::start(&recognizer, &config, &fast_policy(1), callback)
            .await
            .unwrap();
        let (mut audio_rx, _results_tx) = recognizer.endpoints.lock().await.take().unwrap();

        assert!(bridge.push_audio(Bytes::from_static(&[1, 2, 3, 4])));
        assert_eq!(audio_rx.recv().await.unwrap(), Bytes::from_static(&[1, 2, 3, 4]));
        assert_eq!(bridge.frames_forwarded(), 1);
    }

    #[tokio::test]
    async fn test_push_audio_drops_when_queue_full() {
        let recognizer = ChannelRecognizer::new(0, 1);
        let config = RecognitionConfig::linear16("en-US", 8000);
        let (callback, _delivered) = collecting_callback();

        let mut bridge = RecognitionBridge::start(&recognizer, &config, &fast_policy(1), callback)
            .await
            .unwrap();
        let (_audio_rx, _results_tx) = recognizer.endpoints.lock().await.take().unwrap();

        assert!(bridge.push_audio(Bytes::from_static(&[0; 4])));
        assert!(!bridge.push_audio(Bytes::from_static(&[0; 4])));
        assert_eq!(bridge.frames_dropped(), 1);
    }

    #[tokio::test]
    async fn test_start_retries_then_succeeds() {
        let recognizer = ChannelRecognizer::new(1, 8);
        let config = RecognitionConfig::linear16("en-US", 16000);
        let (callback, _delivered) = collecting_callback();

        let bridge =
            RecognitionBridge::start(&recognizer, &config, &fast_policy(2), callback).await;
        assert!(bridge.is_ok());
    }

    #[tokio::test]
    async fn test_start_fails_when_unreachable() {
        let recognizer = ChannelRecognizer::new(5, 8);
        let config = RecognitionConfig::linear16("en-US", 16000);
        let (callback, _delivered) = collecting_callback();

        let result =
            RecognitionBridge::start(&recognizer, &config, &fast_policy(2), callback).await;
        assert!(matches!(result, Err(STTError::RecognitionUnavailable(_))));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_stops_delivery() {
        let recognizer = ChannelRecognizer::new(0, 8);
        let config = RecognitionConfig::linear16("en-US", 16000);
        let (callback, mut delivered) = collecting_callback();

        let mut bridge = RecognitionBridge::start(&recognizer, &config, &fast_policy(1), callback)
            .await
            .unwrap();
        let (_audio_rx, results_tx) = recognizer.endpoints.lock().await.take().unwrap();

        bridge.close();
        bridge.close();
        assert!(!bridge.is_open());
        assert!(!bridge.push_audio(Bytes::from_static(&[0; 2])));

        let _ = results_tx.send(Ok(Transcript::new("late", 1.0))).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(delivered.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_end_signal_fires_when_provider_ends_results() {
        let recognizer = ChannelRecognizer::new(0, 8);
        let config = RecognitionConfig::linear16("en-US", 16000);
        let (callback, _delivered) = collecting_callback();

        let bridge = RecognitionBridge::start(&recognizer, &config, &fast_policy(1), callback)
            .await
            .unwrap();
        let ended = bridge.end_signal();
        let (_audio_rx, results_tx) = recognizer.endpoints.lock().await.take().unwrap();
        assert!(!ended.is_cancelled());

        drop(results_tx);
        tokio::time::timeout(Duration::from_secs(1), ended.cancelled())
            .await
            .expect("end signal did not fire");
        assert!(!bridge.is_open());
    }

    #[tokio::test]
    async fn test_end_signal_fires_when_audio_side_closes() {
        let recognizer = ChannelRecognizer::new(0, 8);
        let config = RecognitionConfig::linear16("en-US", 16000);
        let (callback, _delivered) = collecting_callback();

        let mut bridge = RecognitionBridge::start(&recognizer, &config, &fast_policy(1), callback)
            .await
            .unwrap();
        let ended = bridge.end_signal();
        let (audio_rx, _results_tx) = recognizer.endpoints.lock().await.take().unwrap();

        drop(audio_rx);
        assert!(!bridge.push_audio(Bytes::from_static(&[0; 4])));
        assert!(ended.is_cancelled());
        assert!(!bridge.is_open());
        assert_eq!(bridge.frames_dropped(), 1);
    }
}
