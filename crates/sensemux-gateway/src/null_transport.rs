use crate::transport::{InferenceRequest, InferenceTransport};
use async_trait::async_trait;
use sensemux_core::GatewayError;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Loopback transport: no network, optional simulated latency, scripted
/// replies for tests. With an empty script every call answers `"{}"`,
/// which normalizes into the caller's fallback-shaped record.
#[derive(Debug)]
pub struct NullTransport {
    latency: Mutex<Duration>,
    infer_count: AtomicUsize,
    speech_count: AtomicUsize,
    script: Mutex<VecDeque<Result<String, GatewayError>>>,
}

impl NullTransport {
    pub fn new() -> Self {
        Self {
            latency: Mutex::new(Duration::ZERO),
            infer_count: AtomicUsize::new(0),
            speech_count: AtomicUsize::new(0),
            script: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_latency(latency: Duration) -> Self {
        let transport = Self::new();
        *transport.latency.lock().unwrap() = latency;
        transport
    }

    /// Queue the reply for a future `infer` call (FIFO).
    pub fn push_reply(&self, reply: Result<String, GatewayError>) {
        self.script.lock().unwrap().push_back(reply);
    }

    pub fn infer_count(&self) -> usize {
        self.infer_count.load(Ordering::Relaxed)
    }

    pub fn speech_count(&self) -> usize {
        self.speech_count.load(Ordering::Relaxed)
    }

    fn latency(&self) -> Duration {
        *self.latency.lock().unwrap()
    }
}

impl Default for NullTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceTransport for NullTransport {
    fn name(&self) -> &str {
        "null"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), GatewayError> {
        if let Some(ms) = config.get("latency_ms").and_then(|v| v.as_integer()) {
            *self.latency.lock().unwrap() = Duration::from_millis(ms.max(0) as u64);
        }
        Ok(())
    }

    async fn infer(&self, request: InferenceRequest) -> Result<String, GatewayError> {
        let count = self.infer_count.fetch_add(1, Ordering::Relaxed) + 1;
        let latency = self.latency();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        tracing::trace!(
            call = count,
            has_image = request.image_jpeg_b64.is_some(),
            has_audio = request.audio_pcm_b64.is_some(),
            "NullTransport infer"
        );
        match self.script.lock().unwrap().pop_front() {
            Some(reply) => reply,
            None => Ok("{}".to_string()),
        }
    }

    async fn synthesize_speech(&self, text: &str, _voice: &str) -> Result<Vec<u8>, GatewayError> {
        self.speech_count.fetch_add(1, Ordering::Relaxed);
        let latency = self.latency();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        // A short burst of silence, two bytes per sample.
        Ok(vec![0u8; text.len().clamp(2, 64) * 2])
    }
}
