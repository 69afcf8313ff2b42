use crate::error::ConfigError;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub video: VideoConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub speech: SpeechConfig,

    #[serde(default)]
    pub panel: Vec<PanelConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct VideoConfig {
    #[serde(default = "default_video_source")]
    pub source: String,

    #[serde(default = "default_frame_width")]
    pub frame_width: u32,

    #[serde(default = "default_frame_height")]
    pub frame_height: u32,

    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: f32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            source: default_video_source(),
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AudioConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_device_name")]
    pub device_name: String,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_buffer_size")]
    pub buffer_size: u32,

    #[serde(default = "default_ring_capacity")]
    pub ring_capacity_samples: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            device_name: default_device_name(),
            sample_rate: default_sample_rate(),
            buffer_size: default_buffer_size(),
            ring_capacity_samples: default_ring_capacity(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    #[serde(default = "default_transport")]
    pub transport: String,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    #[serde(default = "default_throttle_window_ms")]
    pub throttle_window_ms: u64,

    #[serde(default = "default_throttle_wait_slice_ms")]
    pub throttle_wait_slice_ms: u64,

    #[serde(default)]
    pub remote: Option<RemoteConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            throttle_window_ms: default_throttle_window_ms(),
            throttle_wait_slice_ms: default_throttle_wait_slice_ms(),
            remote: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, serde::Serialize)]
pub struct RemoteConfig {
    pub api_key: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_tts_model")]
    pub tts_model: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SpeechConfig {
    #[serde(default = "default_voice")]
    pub voice: String,

    #[serde(default = "default_speech_sample_rate")]
    pub sample_rate: u32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            voice: default_voice(),
            sample_rate: default_speech_sample_rate(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PanelKind {
    Behavior,
    Sign,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PanelConfig {
    pub id: String,

    pub kind: PanelKind,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default)]
    pub audio: bool,

    #[serde(default = "default_variant")]
    pub variant: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_video_source() -> String {
    "pattern".to_string()
}

fn default_frame_width() -> u32 {
    640
}

fn default_frame_height() -> u32 {
    360
}

fn default_jpeg_quality() -> f32 {
    0.4
}

fn default_device_name() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_buffer_size() -> u32 {
    4096
}

fn default_ring_capacity() -> usize {
    64000
}

fn default_transport() -> String {
    "remote".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    1.5
}

fn default_throttle_window_ms() -> u64 {
    60_000
}

fn default_throttle_wait_slice_ms() -> u64 {
    5_000
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-3-pro-preview".to_string()
}

fn default_tts_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

fn default_voice() -> String {
    "Kore".to_string()
}

fn default_speech_sample_rate() -> u32 {
    24000
}

fn default_true() -> bool {
    true
}

fn default_interval_ms() -> u64 {
    3500
}

fn default_variant() -> String {
    "ASL".to_string()
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}]+)\}").unwrap();
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                errors.push(var_name.to_string());
            }
        }
    }

    if let Some(first_missing) = errors.into_iter().next() {
        return Err(ConfigError::EnvVarNotFound(first_missing));
    }

    Ok(result)
}

impl AppConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let interpolated = interpolate_env_vars(&content)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (for testing).
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parse_valid_toml() {
        let toml_str = r#"
[general]
log_level = "debug"

[video]
frame_width = 320
frame_height = 180
jpeg_quality = 0.6

[audio]
enabled = true
device_name = "USB Microphone"
sample_rate = 16000

[gateway]
transport = "remote"
max_retries = 2

[gateway.remote]
api_key = "k-123"
model = "forensic-pro"

[[panel]]
id = "mirror"
kind = "behavior"
interval_ms = 3500
audio = true

[[panel]]
id = "interpreter"
kind = "sign"
interval_ms = 3000
variant = "BSL"
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.video.frame_width, 320);
        assert_eq!(config.video.jpeg_quality, 0.6);
        assert!(config.audio.enabled);
        assert_eq!(config.audio.device_name, "USB Microphone");
        assert_eq!(config.gateway.max_retries, 2);
        let remote = config.gateway.remote.as_ref().unwrap();
        assert_eq!(remote.api_key, "k-123");
        assert_eq!(remote.model, "forensic-pro");
        assert_eq!(config.panel.len(), 2);
        assert_eq!(config.panel[0].id, "mirror");
        assert_eq!(config.panel[0].kind, PanelKind::Behavior);
        assert!(config.panel[0].audio);
        assert_eq!(config.panel[1].kind, PanelKind::Sign);
        assert_eq!(config.panel[1].variant, "BSL");
        assert_eq!(config.panel[1].interval_ms, 3000);
    }

    #[test]
    fn test_config_parse_minimal_toml() {
        let toml_str = r#"
[[panel]]
id = "mirror"
kind = "behavior"
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.video.source, "pattern");
        assert_eq!(config.video.frame_width, 640);
        assert_eq!(config.video.frame_height, 360);
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.audio.ring_capacity_samples, 64000);
        assert!(!config.audio.enabled);
        assert_eq!(config.gateway.transport, "remote");
        assert_eq!(config.gateway.max_retries, 3);
        assert_eq!(config.gateway.initial_delay_ms, 10_000);
        assert_eq!(config.gateway.throttle_window_ms, 60_000);
        assert_eq!(config.gateway.throttle_wait_slice_ms, 5_000);
        assert_eq!(config.panel[0].interval_ms, 3500);
        assert!(config.panel[0].enabled);
        assert!(!config.panel[0].audio);
        assert_eq!(config.panel[0].variant, "ASL");
    }

    #[test]
    fn test_config_env_var_interpolation() {
        std::env::set_var("SENSEMUX_TEST_KEY", "secret123");
        let toml_str = r#"
[gateway.remote]
api_key = "${SENSEMUX_TEST_KEY}"
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.gateway.remote.unwrap().api_key, "secret123");
        std::env::remove_var("SENSEMUX_TEST_KEY");
    }

    #[test]
    fn test_config_missing_env_var_error() {
        let toml_str = r#"
[gateway.remote]
api_key = "${DEFINITELY_DOES_NOT_EXIST_12345}"
"#;
        let result = AppConfig::from_toml_str(toml_str);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("DEFINITELY_DOES_NOT_EXIST_12345"));
    }

    #[test]
    fn test_config_invalid_toml_error() {
        let toml_str = "this is not valid toml [[[";
        let result = AppConfig::from_toml_str(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_default_values() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.gateway.transport, "remote");
        assert_eq!(config.gateway.backoff_multiplier, 1.5);
        assert_eq!(config.speech.voice, "Kore");
        assert_eq!(config.speech.sample_rate, 24000);
        assert!(config.panel.is_empty());
        assert!(config.gateway.remote.is_none());
    }

    #[test]
    fn test_config_load_from_file() {
        let dir = std::env::temp_dir().join("sensemux_test_config");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.toml");
        std::fs::write(
            &path,
            r#"
[general]
log_level = "warn"

[[panel]]
id = "test_panel"
kind = "sign"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.panel[0].id, "test_panel");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_config_load_from_file_not_found() {
        let result = AppConfig::load_from_file(std::path::Path::new("/nonexistent/path.toml"));
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("failed to read config file"));
    }

    #[test]
    fn test_config_unknown_panel_kind_error() {
        let toml_str = r#"
[[panel]]
id = "mystery"
kind = "telepathy"
"#;
        assert!(AppConfig::from_toml_str(toml_str).is_err());
    }
}
