use serde::{Deserialize, Serialize};

/// One microphone callback's worth of samples.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// A raw video frame as delivered by the capture boundary.
/// `rgb` is tightly packed RGB8, `width * height * 3` bytes.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

/// Everything one capture tick managed to sample, ready for transmission.
/// Produced fresh each tick and discarded after the inference call that
/// consumes it completes or fails.
#[derive(Debug, Clone)]
pub struct CapturePayload {
    pub image_jpeg_b64: Option<String>,
    pub audio_pcm_b64: Option<String>,
    pub captured_at_seconds: f64,
}

/// A normalized result handed to the history sink. `was_fallback` is set
/// when the normalizer had to substitute the caller's defaults wholesale.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRecord<T> {
    pub timestamp_seconds: f64,
    pub was_fallback: bool,
    pub data: T,
}

/// Environmental sound classification reported by the behavior audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcousticAlert {
    Alarm,
    Speech,
    Keyboard,
    Environmental,
    HumanNoise,
    #[default]
    #[serde(other)]
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DetectedObject {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub box_2d: [f64; 4],
}

/// One behavior-audit reading. Field names follow the remote service's
/// JSON keys, which mix naming styles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorReading {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub thinking: String,
    #[serde(rename = "focusLevel", default)]
    pub focus_level: f32,
    #[serde(rename = "isDistracted", default)]
    pub is_distracted: bool,
    #[serde(default)]
    pub emotion_score: f32,
    #[serde(default)]
    pub emotion_label: String,
    #[serde(default)]
    pub detected_objects: Vec<DetectedObject>,
    #[serde(default)]
    pub acoustic_alert: AcousticAlert,
    #[serde(default)]
    pub acoustic_transcript: String,
}

impl Default for BehaviorReading {
    fn default() -> Self {
        Self {
            action: "Uplink established".to_string(),
            thinking: "Modality buffer active.".to_string(),
            focus_level: 50.0,
            is_distracted: false,
            emotion_score: 0.5,
            emotion_label: "Neutral".to_string(),
            detected_objects: Vec::new(),
            acoustic_alert: AcousticAlert::None,
            acoustic_transcript: String::new(),
        }
    }
}

/// One sign-interpretation reading. A `recognized_sign` of `"None"` means
/// no sign was clearly performed in the frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignReading {
    #[serde(rename = "recognizedSign", default)]
    pub recognized_sign: String,
    #[serde(default)]
    pub gloss: String,
    #[serde(default)]
    pub meaning: String,
    #[serde(default)]
    pub confidence: f32,
    #[serde(rename = "contextHint", default)]
    pub context_hint: String,
    #[serde(default)]
    pub intensity: f32,
    #[serde(default)]
    pub velocity: f32,
    #[serde(default)]
    pub sentiment: String,
    #[serde(rename = "handBox", default)]
    pub hand_box: Option<[f64; 4]>,
}

impl Default for SignReading {
    fn default() -> Self {
        Self {
            recognized_sign: "None".to_string(),
            gloss: String::new(),
            meaning: String::new(),
            confidence: 0.0,
            context_hint: String::new(),
            intensity: 50.0,
            velocity: 50.0,
            sentiment: "Neutral".to_string(),
            hand_box: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreMetrics {
    #[serde(rename = "focusPersistence", default)]
    pub focus_persistence: f32,
    #[serde(rename = "stressVariability", default)]
    pub stress_variability: f32,
    #[serde(rename = "acousticClarity", default)]
    pub acoustic_clarity: f32,
}

impl Default for CoreMetrics {
    fn default() -> Self {
        Self {
            focus_persistence: 70.0,
            stress_variability: 40.0,
            acoustic_clarity: 85.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RoadmapStep {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub recommendation: String,
}

/// End-of-session synthesis over a stream's full history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    #[serde(rename = "focusScore", default)]
    pub focus_score: f32,
    #[serde(rename = "performanceVerdict", default)]
    pub performance_verdict: String,
    #[serde(rename = "executiveSummary", default)]
    pub executive_summary: String,
    #[serde(rename = "coreMetrics", default)]
    pub core_metrics: CoreMetrics,
    #[serde(rename = "strategicRoadmap", default)]
    pub strategic_roadmap: Vec<RoadmapStep>,
}

impl Default for SessionReport {
    fn default() -> Self {
        Self {
            focus_score: 75.0,
            performance_verdict: "Audit synthesis complete".to_string(),
            executive_summary: "Session history processed.".to_string(),
            core_metrics: CoreMetrics::default(),
            strategic_roadmap: Vec::new(),
        }
    }
}

/// Side-channel notification raised when a behavior reading carries a
/// non-`NONE` acoustic alert.
#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub stream_id: String,
    pub timestamp_seconds: f64,
    pub message: String,
}

/// The typed result of one completed capture-and-infer cycle.
#[derive(Debug, Clone, Serialize)]
pub enum RecordPayload {
    Behavior(AnalysisRecord<BehaviorReading>),
    Sign(AnalysisRecord<SignReading>),
}

impl RecordPayload {
    pub fn timestamp_seconds(&self) -> f64 {
        match self {
            RecordPayload::Behavior(record) => record.timestamp_seconds,
            RecordPayload::Sign(record) => record.timestamp_seconds,
        }
    }

    pub fn was_fallback(&self) -> bool {
        match self {
            RecordPayload::Behavior(record) => record.was_fallback,
            RecordPayload::Sign(record) => record.was_fallback,
        }
    }

    /// One-line digest for operator logs.
    pub fn summary(&self) -> String {
        match self {
            RecordPayload::Behavior(record) => record.data.action.clone(),
            RecordPayload::Sign(record) => format!(
                "{} ({})",
                record.data.recognized_sign, record.data.gloss
            ),
        }
    }
}

/// A record stamped with the stream it came from, as appended to history.
#[derive(Debug, Clone, Serialize)]
pub struct StreamRecord {
    pub stream_id: String,
    pub payload: RecordPayload,
}
