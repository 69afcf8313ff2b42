use async_trait::async_trait;
use sensemux_core::GatewayError;

/// One inference round-trip's worth of payload: a text instruction plus
/// optional inline image/audio parts.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub instruction: String,
    pub image_jpeg_b64: Option<String>,
    pub audio_pcm_b64: Option<String>,
    pub audio_sample_rate: u32,
}

impl InferenceRequest {
    pub fn text(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            image_jpeg_b64: None,
            audio_pcm_b64: None,
            audio_sample_rate: 16000,
        }
    }
}

/// The wire boundary to the remote inference service.
///
/// Implementations are registered via [`TransportRegistry`](crate::TransportRegistry)
/// and must classify their own failures with [`classify_remote_error`] so
/// every caller sees the same tagged variants.
#[async_trait]
pub trait InferenceTransport: Send + Sync + std::fmt::Debug {
    /// Returns the transport's plugin name (e.g. `"remote"`, `"null"`).
    fn name(&self) -> &str;
    /// One-time initialisation with transport-specific TOML configuration.
    async fn initialize(&mut self, config: toml::Value) -> Result<(), GatewayError>;
    /// Submit a multimodal request; the reply is the raw text blob, which
    /// is expected (not guaranteed) to contain JSON.
    async fn infer(&self, request: InferenceRequest) -> Result<String, GatewayError>;
    /// Synthesize speech for `text`, returning raw little-endian PCM16 bytes.
    async fn synthesize_speech(&self, text: &str, voice: &str) -> Result<Vec<u8>, GatewayError>;
}

/// Classify a remote failure exactly once, at the wire boundary. Rate-limit
/// signatures (HTTP 429, or a message mentioning 429 / quota /
/// resource_exhausted) become `QuotaExceeded`; everything else `Transient`.
pub fn classify_remote_error(status: Option<u16>, message: &str) -> GatewayError {
    let lowered = message.to_lowercase();
    let is_quota = status == Some(429)
        || lowered.contains("429")
        || lowered.contains("quota")
        || lowered.contains("resource_exhausted");
    if is_quota {
        GatewayError::QuotaExceeded(message.to_string())
    } else {
        GatewayError::Transient(message.to_string())
    }
}
