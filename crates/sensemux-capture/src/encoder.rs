use crate::frame::FrameSource;
use crate::ring::AudioRingBuffer;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::RgbImage;
use sensemux_core::{CapturePayload, RawFrame};
use std::sync::{Arc, Mutex};

/// Compress a raw frame to base64 JPEG at the given size and quality
/// (0.0–1.0). `None` when the frame is unusable; capture failures are
/// never fatal to the caller's tick loop.
pub fn encode_frame(frame: &RawFrame, width: u32, height: u32, quality: f32) -> Option<String> {
    if frame.width == 0 || frame.height == 0 || width == 0 || height == 0 {
        return None;
    }
    let image = match RgbImage::from_raw(frame.width, frame.height, frame.rgb.clone()) {
        Some(image) => image,
        None => {
            tracing::warn!(
                width = frame.width,
                height = frame.height,
                len = frame.rgb.len(),
                "frame byte length does not match dimensions, dropping"
            );
            return None;
        }
    };
    let resized = image::imageops::resize(&image, width, height, FilterType::Triangle);
    let mut jpeg = Vec::new();
    let quality = (quality.clamp(0.01, 1.0) * 100.0) as u8;
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality);
    if let Err(e) = encoder.encode_image(&resized) {
        tracing::warn!("jpeg encode failed: {e}");
        return None;
    }
    Some(BASE64.encode(&jpeg))
}

/// Pack all buffered audio into base64 little-endian PCM16, clamping each
/// sample into `[-32768, 32767]`. Drains the ring buffer as a side effect;
/// a second call right after returns `None`.
pub fn encode_audio(buffer: &mut AudioRingBuffer) -> Option<String> {
    let chunks = buffer.drain_all();
    if chunks.is_empty() {
        return None;
    }
    let total: usize = chunks.iter().map(|c| c.samples.len()).sum();
    if total == 0 {
        return None;
    }
    let mut pcm = Vec::with_capacity(total * 2);
    for chunk in &chunks {
        for &sample in &chunk.samples {
            let value = (sample * 32768.0).clamp(-32768.0, 32767.0) as i16;
            pcm.extend_from_slice(&value.to_le_bytes());
        }
    }
    Some(BASE64.encode(&pcm))
}

/// One stream's capture front-end: a frame source, an optional audio ring,
/// and the encoding parameters. `capture` yields at most one payload per
/// tick; no usable frame means no payload (and the audio buffer is left
/// untouched for the next tick).
pub struct Sampler {
    frames: Arc<dyn FrameSource>,
    audio: Option<Arc<Mutex<AudioRingBuffer>>>,
    frame_width: u32,
    frame_height: u32,
    jpeg_quality: f32,
}

impl Sampler {
    pub fn new(
        frames: Arc<dyn FrameSource>,
        audio: Option<Arc<Mutex<AudioRingBuffer>>>,
        frame_width: u32,
        frame_height: u32,
        jpeg_quality: f32,
    ) -> Self {
        Self {
            frames,
            audio,
            frame_width,
            frame_height,
            jpeg_quality,
        }
    }

    pub fn capture(&self, captured_at_seconds: f64) -> Option<CapturePayload> {
        let frame = self.frames.grab_frame()?;
        let image = encode_frame(&frame, self.frame_width, self.frame_height, self.jpeg_quality)?;
        let audio = self.audio.as_ref().and_then(|ring| {
            let mut ring = ring.lock().unwrap();
            encode_audio(&mut ring)
        });
        Some(CapturePayload {
            image_jpeg_b64: Some(image),
            audio_pcm_b64: audio,
            captured_at_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::TestPatternSource;
    use sensemux_core::AudioChunk;

    fn frame(width: u32, height: u32) -> RawFrame {
        TestPatternSource::new(width, height).grab_frame().unwrap()
    }

    #[test]
    fn test_encode_frame_produces_base64_jpeg() {
        let encoded = encode_frame(&frame(64, 36), 32, 18, 0.4).unwrap();
        let bytes = BASE64.decode(encoded).unwrap();
        // JPEG SOI marker
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_encode_frame_zero_size_returns_none() {
        let bad = RawFrame {
            width: 0,
            height: 0,
            rgb: Vec::new(),
        };
        assert!(encode_frame(&bad, 640, 360, 0.4).is_none());
    }

    #[test]
    fn test_encode_frame_mismatched_length_returns_none() {
        let bad = RawFrame {
            width: 10,
            height: 10,
            rgb: vec![0; 7],
        };
        assert!(encode_frame(&bad, 640, 360, 0.4).is_none());
    }

    #[test]
    fn test_encode_audio_drains_buffer() {
        let mut ring = AudioRingBuffer::new(1000);
        ring.push(AudioChunk {
            samples: vec![0.5; 100],
            sample_rate: 16000,
        });
        let encoded = encode_audio(&mut ring);
        assert!(encoded.is_some());
        assert!(ring.is_empty());
        // Second drain on the already-empty buffer yields nothing.
        assert!(encode_audio(&mut ring).is_none());
    }

    #[test]
    fn test_encode_audio_clamps_to_i16_range() {
        let mut ring = AudioRingBuffer::new(1000);
        ring.push(AudioChunk {
            samples: vec![2.0, -2.0, 0.0],
            sample_rate: 16000,
        });
        let bytes = BASE64.decode(encode_audio(&mut ring).unwrap()).unwrap();
        let samples: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(samples, vec![32767, -32768, 0]);
    }

    #[test]
    fn test_encode_audio_concatenates_chunks_in_order() {
        let mut ring = AudioRingBuffer::new(1000);
        ring.push(AudioChunk {
            samples: vec![0.25; 2],
            sample_rate: 16000,
        });
        ring.push(AudioChunk {
            samples: vec![-0.25; 2],
            sample_rate: 16000,
        });
        let bytes = BASE64.decode(encode_audio(&mut ring).unwrap()).unwrap();
        let samples: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(samples.len(), 4);
        assert!(samples[0] > 0 && samples[1] > 0);
        assert!(samples[2] < 0 && samples[3] < 0);
    }

    #[test]
    fn test_sampler_without_audio() {
        let sampler = Sampler::new(Arc::new(TestPatternSource::new(64, 36)), None, 32, 18, 0.4);
        let payload = sampler.capture(1.5).unwrap();
        assert!(payload.image_jpeg_b64.is_some());
        assert!(payload.audio_pcm_b64.is_none());
        assert_eq!(payload.captured_at_seconds, 1.5);
    }

    #[test]
    fn test_sampler_with_audio_drains_ring() {
        let ring = Arc::new(Mutex::new(AudioRingBuffer::new(1000)));
        ring.lock().unwrap().push(AudioChunk {
            samples: vec![0.1; 50],
            sample_rate: 16000,
        });
        let sampler = Sampler::new(
            Arc::new(TestPatternSource::new(64, 36)),
            Some(Arc::clone(&ring)),
            32,
            18,
            0.4,
        );
        let payload = sampler.capture(0.0).unwrap();
        assert!(payload.audio_pcm_b64.is_some());
        assert!(ring.lock().unwrap().is_empty());

        // Next tick with no new audio still produces an image-only payload.
        let payload = sampler.capture(2.5).unwrap();
        assert!(payload.image_jpeg_b64.is_some());
        assert!(payload.audio_pcm_b64.is_none());
    }

    struct NeverReady;

    impl FrameSource for NeverReady {
        fn grab_frame(&self) -> Option<RawFrame> {
            None
        }
    }

    #[test]
    fn test_sampler_no_frame_no_payload_and_audio_untouched() {
        let ring = Arc::new(Mutex::new(AudioRingBuffer::new(1000)));
        ring.lock().unwrap().push(AudioChunk {
            samples: vec![0.1; 50],
            sample_rate: 16000,
        });
        let sampler = Sampler::new(Arc::new(NeverReady), Some(Arc::clone(&ring)), 32, 18, 0.4);
        assert!(sampler.capture(0.0).is_none());
        assert_eq!(ring.lock().unwrap().total_samples(), 50);
    }
}
