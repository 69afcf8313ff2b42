use async_trait::async_trait;
use sensemux_core::{
    AnalysisRecord, BehaviorReading, CapturePayload, GatewayError, RecordPayload, SignReading,
};
use sensemux_gateway::{normalize, InferenceGateway, InferenceRequest, InferenceTransport};
use std::sync::Arc;

/// One panel's analytical contract: shape the request for its instruction,
/// push it through the gateway, and normalize the reply into a typed
/// record. `Ok(None)` means the cycle completed but produced nothing worth
/// appending.
#[async_trait]
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &str;
    async fn analyze(&self, payload: &CapturePayload) -> Result<Option<RecordPayload>, GatewayError>;
}

// ── BehaviorAnalyzer ──────────────────────────────────────────

const BEHAVIOR_INSTRUCTION: &str = "ROLE: Behavioral auditor.\n\
TASK: Execute a simultaneous visual and acoustic audit of the subject.\n\
1. If an audio part is present, analyze the PCM stream for environmental \
markers: typing (KEYBOARD), speech (SPEECH), background hum (ENVIRONMENTAL), \
sudden alerts (ALARM).\n\
2. Track gaze persistence, focus, and visible objects in the frame.\n\
OUTPUT STRICT JSON with keys: action, thinking, focusLevel (0-100), \
isDistracted (bool), emotion_score (0.0-1.0), emotion_label, \
detected_objects [{label, box_2d}], acoustic_alert \
(ALARM|SPEECH|KEYBOARD|ENVIRONMENTAL|HUMAN_NOISE|NONE), acoustic_transcript.";

pub struct BehaviorAnalyzer {
    transport: Arc<dyn InferenceTransport>,
    gateway: Arc<InferenceGateway>,
    audio_sample_rate: u32,
}

impl BehaviorAnalyzer {
    pub fn new(
        transport: Arc<dyn InferenceTransport>,
        gateway: Arc<InferenceGateway>,
        audio_sample_rate: u32,
    ) -> Self {
        Self {
            transport,
            gateway,
            audio_sample_rate,
        }
    }
}

#[async_trait]
impl Analyzer for BehaviorAnalyzer {
    fn name(&self) -> &str {
        "behavior"
    }

    async fn analyze(
        &self,
        payload: &CapturePayload,
    ) -> Result<Option<RecordPayload>, GatewayError> {
        let request = InferenceRequest {
            instruction: BEHAVIOR_INSTRUCTION.to_string(),
            image_jpeg_b64: payload.image_jpeg_b64.clone(),
            audio_pcm_b64: payload.audio_pcm_b64.clone(),
            audio_sample_rate: self.audio_sample_rate,
        };
        let transport = Arc::clone(&self.transport);
        let text = self
            .gateway
            .invoke(move || {
                let transport = Arc::clone(&transport);
                let request = request.clone();
                async move { transport.infer(request).await }
            })
            .await?;

        let parsed = normalize::parse(Some(&text), BehaviorReading::default());
        Ok(Some(RecordPayload::Behavior(AnalysisRecord {
            timestamp_seconds: payload.captured_at_seconds,
            was_fallback: parsed.was_fallback,
            data: parsed.value,
        })))
    }
}

// ── SignAnalyzer ──────────────────────────────────────────────

pub struct SignAnalyzer {
    transport: Arc<dyn InferenceTransport>,
    gateway: Arc<InferenceGateway>,
    variant: String,
}

impl SignAnalyzer {
    pub fn new(
        transport: Arc<dyn InferenceTransport>,
        gateway: Arc<InferenceGateway>,
        variant: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            gateway,
            variant: variant.into(),
        }
    }

    fn instruction(&self) -> String {
        format!(
            "ROLE: Sign language interpreter.\n\
TASK: Identify the sign gesture performed in this frame using {} standards. \
Analyze handshape, palm orientation, location, and movement markers; \
identify the gloss and a natural meaning; detect the hand bounding box \
[ymin, xmin, ymax, xmax]. If no sign is clearly performed, return \"None\" \
for recognizedSign.\n\
OUTPUT STRICT JSON with keys: recognizedSign, gloss, meaning, confidence \
(0-100), contextHint, intensity (0-100), velocity (0-100), sentiment \
(Neutral|Positive|Urgent|Negative), handBox.",
            self.variant
        )
    }
}

#[async_trait]
impl Analyzer for SignAnalyzer {
    fn name(&self) -> &str {
        "sign"
    }

    async fn analyze(
        &self,
        payload: &CapturePayload,
    ) -> Result<Option<RecordPayload>, GatewayError> {
        let request = InferenceRequest {
            instruction: self.instruction(),
            image_jpeg_b64: payload.image_jpeg_b64.clone(),
            audio_pcm_b64: None,
            audio_sample_rate: 16000,
        };
        let transport = Arc::clone(&self.transport);
        let text = self
            .gateway
            .invoke(move || {
                let transport = Arc::clone(&transport);
                let request = request.clone();
                async move { transport.infer(request).await }
            })
            .await?;

        let parsed = normalize::parse(Some(&text), SignReading::default());
        let reading = parsed.value;
        // An idle frame is not history.
        if reading.recognized_sign.is_empty()
            || reading.recognized_sign.eq_ignore_ascii_case("none")
        {
            return Ok(None);
        }
        Ok(Some(RecordPayload::Sign(AnalysisRecord {
            timestamp_seconds: payload.captured_at_seconds,
            was_fallback: parsed.was_fallback,
            data: reading,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensemux_gateway::{GatewayTuning, NullTransport};

    fn payload() -> CapturePayload {
        CapturePayload {
            image_jpeg_b64: Some("/9j/fake".to_string()),
            audio_pcm_b64: Some("AAAA".to_string()),
            captured_at_seconds: 12.5,
        }
    }

    fn wire(transport: &Arc<NullTransport>) -> (Arc<dyn InferenceTransport>, Arc<InferenceGateway>) {
        (
            Arc::clone(transport) as Arc<dyn InferenceTransport>,
            Arc::new(InferenceGateway::new(GatewayTuning::default())),
        )
    }

    #[tokio::test]
    async fn test_behavior_analyzer_normalizes_reply() {
        let transport = Arc::new(NullTransport::new());
        transport.push_reply(Ok(
            r#"{"action":"reading documents","focusLevel":88,"acoustic_alert":"KEYBOARD"}"#
                .to_string(),
        ));
        let (t, g) = wire(&transport);
        let analyzer = BehaviorAnalyzer::new(t, g, 16000);

        let record = analyzer.analyze(&payload()).await.unwrap().unwrap();
        match record {
            RecordPayload::Behavior(record) => {
                assert_eq!(record.timestamp_seconds, 12.5);
                assert!(!record.was_fallback);
                assert_eq!(record.data.action, "reading documents");
                assert_eq!(record.data.focus_level, 88.0);
                // Omitted fields keep the fallback defaults.
                assert_eq!(record.data.emotion_label, "Neutral");
            }
            other => panic!("expected behavior record, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_behavior_analyzer_absorbs_malformed_reply() {
        let transport = Arc::new(NullTransport::new());
        transport.push_reply(Ok("static noise, no json here".to_string()));
        let (t, g) = wire(&transport);
        let analyzer = BehaviorAnalyzer::new(t, g, 16000);

        let record = analyzer.analyze(&payload()).await.unwrap().unwrap();
        assert!(record.was_fallback());
        assert_eq!(record.summary(), "Uplink established");
    }

    #[tokio::test]
    async fn test_sign_analyzer_drops_none_readings() {
        let transport = Arc::new(NullTransport::new());
        transport.push_reply(Ok(r#"{"recognizedSign":"None"}"#.to_string()));
        let (t, g) = wire(&transport);
        let analyzer = SignAnalyzer::new(t, g, "ASL");

        assert!(analyzer.analyze(&payload()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_analyzer_keeps_recognized_sign() {
        let transport = Arc::new(NullTransport::new());
        transport.push_reply(Ok(
            r#"{"recognizedSign":"Hello","gloss":"HELLO","confidence":96}"#.to_string(),
        ));
        let (t, g) = wire(&transport);
        let analyzer = SignAnalyzer::new(t, g, "ASL");

        let record = analyzer.analyze(&payload()).await.unwrap().unwrap();
        match record {
            RecordPayload::Sign(record) => {
                assert_eq!(record.data.gloss, "HELLO");
                assert_eq!(record.data.confidence, 96.0);
            }
            other => panic!("expected sign record, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sign_analyzer_default_reply_yields_nothing() {
        // The fallback reading is a "None" sign, so an unparseable reply
        // appends nothing rather than a phantom gesture.
        let transport = Arc::new(NullTransport::new());
        transport.push_reply(Ok("no gesture data".to_string()));
        let (t, g) = wire(&transport);
        let analyzer = SignAnalyzer::new(t, g, "ASL");

        assert!(analyzer.analyze(&payload()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_analyzer_propagates_gateway_errors() {
        let transport = Arc::new(NullTransport::new());
        transport.push_reply(Err(GatewayError::Transient("link down".to_string())));
        let (t, g) = wire(&transport);
        let analyzer = BehaviorAnalyzer::new(t, g, 16000);

        let out = analyzer.analyze(&payload()).await;
        assert!(matches!(out, Err(GatewayError::Transient(_))));
    }

    #[test]
    fn test_sign_instruction_carries_variant() {
        let transport = Arc::new(NullTransport::new());
        let (t, g) = wire(&transport);
        let analyzer = SignAnalyzer::new(t, g, "BSL");
        assert!(analyzer.instruction().contains("BSL"));
    }
}
