use crate::gateway::InferenceGateway;
use crate::transport::InferenceTransport;
use async_trait::async_trait;
use sensemux_core::GatewayError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Where synthesized speech ends up. The UI layer owns the actual audio
/// output; `stop` must release whatever source is currently playing.
#[async_trait]
pub trait PlaybackSink: Send + Sync {
    async fn play(&self, samples: Arc<Vec<i16>>, sample_rate: u32);
    fn stop(&self);
}

/// Sink that only counts calls; stands in for the UI's audio output.
pub struct NullSink {
    play_count: AtomicUsize,
    stop_count: AtomicUsize,
}

impl NullSink {
    pub fn new() -> Self {
        Self {
            play_count: AtomicUsize::new(0),
            stop_count: AtomicUsize::new(0),
        }
    }

    pub fn play_count(&self) -> usize {
        self.play_count.load(Ordering::Relaxed)
    }

    pub fn stop_count(&self) -> usize {
        self.stop_count.load(Ordering::Relaxed)
    }
}

impl Default for NullSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlaybackSink for NullSink {
    async fn play(&self, _samples: Arc<Vec<i16>>, _sample_rate: u32) {
        self.play_count.fetch_add(1, Ordering::Relaxed);
    }

    fn stop(&self) {
        self.stop_count.fetch_add(1, Ordering::Relaxed);
    }
}

/// Speech synthesis with last-writer-wins semantics: a new `speak` stops
/// whatever is playing and aborts any synthesis still in flight before it
/// proceeds. Decoded utterances are cached by voice+text.
pub struct SpeechDirector {
    transport: Arc<dyn InferenceTransport>,
    gateway: Arc<InferenceGateway>,
    sink: Arc<dyn PlaybackSink>,
    voice: String,
    sample_rate: u32,
    cache: Mutex<HashMap<String, Arc<Vec<i16>>>>,
    active: Mutex<Option<oneshot::Sender<()>>>,
}

impl SpeechDirector {
    pub fn new(
        transport: Arc<dyn InferenceTransport>,
        gateway: Arc<InferenceGateway>,
        sink: Arc<dyn PlaybackSink>,
        voice: impl Into<String>,
        sample_rate: u32,
    ) -> Self {
        Self {
            transport,
            gateway,
            sink,
            voice: voice.into(),
            sample_rate,
            cache: Mutex::new(HashMap::new()),
            active: Mutex::new(None),
        }
    }

    pub fn cached_utterances(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    pub async fn speak(&self, text: &str) -> Result<(), GatewayError> {
        // Preempt: cancel any in-flight synthesis, then release the
        // playing source before this request proceeds.
        if let Some(previous) = self.active.lock().unwrap().take() {
            let _ = previous.send(());
        }
        self.sink.stop();

        let key = format!("{}:{}", self.voice, text);
        let cached = self.cache.lock().unwrap().get(&key).cloned();
        let samples = match cached {
            Some(samples) => samples,
            None => {
                let (cancel_tx, cancel_rx) = oneshot::channel();
                *self.active.lock().unwrap() = Some(cancel_tx);

                let transport = Arc::clone(&self.transport);
                let voice = self.voice.clone();
                let text = text.to_string();
                let synthesis = self.gateway.invoke(move || {
                    let transport = Arc::clone(&transport);
                    let voice = voice.clone();
                    let text = text.clone();
                    async move { transport.synthesize_speech(&text, &voice).await }
                });

                let bytes = tokio::select! {
                    _ = cancel_rx => {
                        tracing::debug!("speech synthesis preempted");
                        return Err(GatewayError::Aborted);
                    }
                    result = synthesis => result?,
                };
                self.active.lock().unwrap().take();

                let samples = Arc::new(decode_pcm16(&bytes));
                self.cache.lock().unwrap().insert(key, Arc::clone(&samples));
                samples
            }
        };

        self.sink.play(samples, self.sample_rate).await;
        Ok(())
    }
}

fn decode_pcm16(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayTuning;
    use crate::null_transport::NullTransport;
    use std::time::Duration;

    fn director(latency: Duration) -> (Arc<SpeechDirector>, Arc<NullTransport>, Arc<NullSink>) {
        let transport = Arc::new(NullTransport::with_latency(latency));
        let sink = Arc::new(NullSink::new());
        let director = Arc::new(SpeechDirector::new(
            Arc::clone(&transport) as Arc<dyn InferenceTransport>,
            Arc::new(InferenceGateway::new(GatewayTuning::default())),
            Arc::clone(&sink) as Arc<dyn PlaybackSink>,
            "Kore",
            24000,
        ));
        (director, transport, sink)
    }

    #[test]
    fn test_decode_pcm16_little_endian() {
        let bytes = [0x01, 0x00, 0xFF, 0x7F, 0x00, 0x80];
        assert_eq!(decode_pcm16(&bytes), vec![1, 32767, -32768]);
    }

    #[test]
    fn test_decode_pcm16_ignores_trailing_odd_byte() {
        assert_eq!(decode_pcm16(&[0x01, 0x00, 0x99]), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_speak_synthesizes_and_plays() {
        let (director, transport, sink) = director(Duration::ZERO);
        director.speak("status nominal").await.unwrap();
        assert_eq!(transport.speech_count(), 1);
        assert_eq!(sink.play_count(), 1);
        assert_eq!(director.cached_utterances(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_speak_serves_repeat_text_from_cache() {
        let (director, transport, sink) = director(Duration::ZERO);
        director.speak("alert").await.unwrap();
        director.speak("alert").await.unwrap();
        assert_eq!(transport.speech_count(), 1);
        assert_eq!(sink.play_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_speak_aborts_in_flight_synthesis() {
        let (director, transport, sink) = director(Duration::from_millis(1_000));

        let first = {
            let director = Arc::clone(&director);
            tokio::spawn(async move { director.speak("long utterance").await })
        };
        // Let the first synthesis get in flight, then preempt it.
        tokio::time::sleep(Duration::from_millis(100)).await;
        director.speak("urgent").await.unwrap();

        let first = first.await.unwrap();
        assert!(matches!(first, Err(GatewayError::Aborted)));
        // Each speak stops the sink before proceeding.
        assert_eq!(sink.stop_count(), 2);
        // Only the preempting utterance played.
        assert_eq!(sink.play_count(), 1);
        assert_eq!(transport.speech_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_speak_leaves_cache_empty() {
        let (director, _transport, _sink) = director(Duration::from_millis(1_000));

        let first = {
            let director = Arc::clone(&director);
            tokio::spawn(async move { director.speak("never finished").await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        director.speak("winner").await.unwrap();

        assert!(matches!(first.await.unwrap(), Err(GatewayError::Aborted)));
        // Only the completed utterance was cached.
        assert_eq!(director.cached_utterances(), 1);
    }
}
