use crate::transport::{classify_remote_error, InferenceRequest, InferenceTransport};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sensemux_core::GatewayError;
use serde_json::{json, Value};

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// HTTP transport to the hosted generateContent API. Auth is the `key`
/// query parameter; inline parts carry the JPEG frame and the PCM16 audio
/// blob tagged with its sample rate.
#[derive(Debug)]
pub struct RemoteTransport {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    tts_model: String,
}

impl RemoteTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: String::new(),
            tts_model: String::new(),
        }
    }

    fn url(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            model
        )
    }

    async fn post(&self, model: &str, payload: &Value) -> Result<Value, GatewayError> {
        let response = self
            .client
            .post(self.url(model))
            .query(&[("key", self.api_key.as_str())])
            .json(payload)
            .send()
            .await
            .map_err(|e| classify_remote_error(None, &e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_remote_error(
                Some(status.as_u16()),
                &format!("{status}: {body}"),
            ));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| classify_remote_error(None, &e.to_string()))
    }

    fn first_candidate_parts(payload: &Value) -> Vec<Value> {
        payload
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|rows| rows.first())
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for RemoteTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceTransport for RemoteTransport {
    fn name(&self) -> &str {
        "remote"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), GatewayError> {
        let api_key = config
            .get("api_key")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                GatewayError::InitializationFailed(
                    "missing 'api_key' in remote config".to_string(),
                )
            })?;
        self.api_key = api_key.to_string();

        if let Some(endpoint) = config.get("endpoint").and_then(|v| v.as_str()) {
            self.endpoint = endpoint.to_string();
        }
        let model = config
            .get("model")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                GatewayError::InitializationFailed("missing 'model' in remote config".to_string())
            })?;
        self.model = model.to_string();
        self.tts_model = config
            .get("tts_model")
            .and_then(|v| v.as_str())
            .unwrap_or(model)
            .to_string();

        tracing::info!(
            endpoint = %self.endpoint,
            model = %self.model,
            tts_model = %self.tts_model,
            "RemoteTransport initialized"
        );
        Ok(())
    }

    async fn infer(&self, request: InferenceRequest) -> Result<String, GatewayError> {
        let mut parts = vec![json!({ "text": request.instruction })];
        if let Some(image) = &request.image_jpeg_b64 {
            parts.push(json!({
                "inlineData": { "mimeType": "image/jpeg", "data": image }
            }));
        }
        if let Some(audio) = &request.audio_pcm_b64 {
            parts.push(json!({
                "inlineData": {
                    "mimeType": format!("audio/pcm;rate={}", request.audio_sample_rate),
                    "data": audio,
                }
            }));
        }
        let payload = json!({
            "contents": [{ "parts": parts }],
            "generationConfig": { "responseMimeType": "application/json" },
        });

        let response = self.post(&self.model, &payload).await?;
        let text: String = Self::first_candidate_parts(&response)
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect();
        if text.is_empty() {
            return Err(GatewayError::Transient(
                "response contained no text part".to_string(),
            ));
        }
        Ok(text)
    }

    async fn synthesize_speech(&self, text: &str, voice: &str) -> Result<Vec<u8>, GatewayError> {
        let payload = json!({
            "contents": [{ "parts": [{ "text": text }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice } }
                },
            },
        });

        let response = self.post(&self.tts_model, &payload).await?;
        let data = Self::first_candidate_parts(&response)
            .iter()
            .find_map(|part| {
                part.get("inlineData")
                    .and_then(|inline| inline.get("data"))
                    .and_then(Value::as_str)
                    .map(str::to_owned)
            })
            .ok_or_else(|| {
                GatewayError::Transient("response contained no audio part".to_string())
            })?;
        BASE64
            .decode(data)
            .map_err(|e| classify_remote_error(None, &e.to_string()))
    }
}
