use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to enumerate devices: {0}")]
    DeviceEnumeration(String),

    #[error("failed to build stream: {0}")]
    StreamBuild(String),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport not found: {0}")]
    TransportNotFound(String),

    #[error("transport initialization failed: {0}")]
    InitializationFailed(String),

    #[error("quota exhausted: {0}")]
    QuotaExceeded(String),

    #[error("transient remote failure: {0}")]
    Transient(String),

    #[error("request aborted")]
    Aborted,
}
