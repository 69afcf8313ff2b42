use crate::ring::AudioRingBuffer;
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use sensemux_core::{AudioChunk, CaptureError};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

// ── Device lookup ─────────────────────────────────────────────

pub fn find_input_device(name: &str) -> Result<Device, CaptureError> {
    let host = cpal::default_host();
    if name == "default" {
        return host
            .default_input_device()
            .ok_or_else(|| CaptureError::DeviceNotFound("no default input device".to_string()));
    }

    let devices = host
        .input_devices()
        .map_err(|e| CaptureError::DeviceEnumeration(e.to_string()))?;
    for device in devices {
        let dev_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        if dev_name == name {
            return Ok(device);
        }
    }
    Err(CaptureError::DeviceNotFound(format!(
        "input device not found: {}",
        name
    )))
}

// ── MicHandle ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicStatus {
    Ok,
    Error,
    Disabled,
}

#[derive(Clone)]
pub struct MicHandle {
    enabled: Arc<AtomicBool>,
    status: Arc<AtomicU8>,
    id: String,
}

impl MicHandle {
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, v: bool) {
        self.enabled.store(v, Ordering::Relaxed);
    }

    pub fn status(&self) -> MicStatus {
        match self.status.load(Ordering::Relaxed) {
            1 => MicStatus::Error,
            2 => MicStatus::Disabled,
            _ => MicStatus::Ok,
        }
    }

    pub fn set_status(&self, s: MicStatus) {
        let v = match s {
            MicStatus::Ok => 0,
            MicStatus::Error => 1,
            MicStatus::Disabled => 2,
        };
        self.status.store(v, Ordering::Relaxed);
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

// ── MicNode ───────────────────────────────────────────────────

/// Live microphone tap. Each callback buffer lands in the stream's ring
/// buffer as one chunk; the buffer keeps only the most recent seconds and
/// the encoder drains it on each capture tick.
pub struct MicNode {
    _stream: Stream,
}

impl MicNode {
    pub fn new(
        device: &Device,
        ring: Arc<Mutex<AudioRingBuffer>>,
        sample_rate: u32,
        buffer_size: u32,
        id: &str,
    ) -> Result<(Self, MicHandle), CaptureError> {
        let config = StreamConfig {
            channels: 1,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Fixed(buffer_size),
        };

        let enabled = Arc::new(AtomicBool::new(true));
        let enabled_flag = Arc::clone(&enabled);
        let status = Arc::new(AtomicU8::new(0));
        let status_flag = Arc::clone(&status);

        let err_callback = move |err: cpal::StreamError| {
            tracing::error!("mic stream error: {}", err);
            status_flag.store(1, Ordering::Relaxed); // Error
        };

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !enabled_flag.load(Ordering::Relaxed) {
                        return;
                    }
                    if let Ok(mut ring) = ring.lock() {
                        ring.push(AudioChunk {
                            samples: data.to_vec(),
                            sample_rate,
                        });
                    }
                },
                err_callback,
                None,
            )
            .map_err(|e| CaptureError::StreamBuild(e.to_string()))?;

        let handle = MicHandle {
            enabled,
            status,
            id: id.to_string(),
        };
        Ok((Self { _stream: stream }, handle))
    }
}
