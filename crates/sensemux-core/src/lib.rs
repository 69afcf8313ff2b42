pub mod config;
pub mod error;
pub mod types;

pub use config::{
    AppConfig, AudioConfig, GatewayConfig, GeneralConfig, PanelConfig, PanelKind, RemoteConfig,
    SpeechConfig, VideoConfig,
};
pub use error::{CaptureError, ConfigError, GatewayError};
pub use types::{
    AcousticAlert, AlertEvent, AnalysisRecord, AudioChunk, BehaviorReading, CapturePayload,
    CoreMetrics, DetectedObject, RawFrame, RecordPayload, RoadmapStep, SessionReport, SignReading,
    StreamRecord,
};
