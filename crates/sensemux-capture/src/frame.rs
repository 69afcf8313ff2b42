use sensemux_core::RawFrame;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Boundary to whatever owns the live video element. Implementations hand
/// out the most recent decoded frame, or `None` while no frame is ready.
pub trait FrameSource: Send + Sync {
    fn grab_frame(&self) -> Option<RawFrame>;
}

/// Synthetic frame generator: a horizontal gradient with a sweeping
/// vertical bar, enough signal for the encoder path without hardware.
pub struct TestPatternSource {
    width: u32,
    height: u32,
    grabs: AtomicUsize,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            grabs: AtomicUsize::new(0),
        }
    }

    pub fn grab_count(&self) -> usize {
        self.grabs.load(Ordering::Relaxed)
    }
}

impl FrameSource for TestPatternSource {
    fn grab_frame(&self) -> Option<RawFrame> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let tick = self.grabs.fetch_add(1, Ordering::Relaxed) as u32;
        let bar_x = (tick * 8) % self.width;
        let mut rgb = Vec::with_capacity((self.width * self.height * 3) as usize);
        for _y in 0..self.height {
            for x in 0..self.width {
                let shade = ((x * 255) / self.width.max(1)) as u8;
                if x == bar_x {
                    rgb.extend_from_slice(&[255, 255, 255]);
                } else {
                    rgb.extend_from_slice(&[shade, shade / 2, 128]);
                }
            }
        }
        Some(RawFrame {
            width: self.width,
            height: self.height,
            rgb,
        })
    }
}
