use sensemux_core::AudioChunk;
use std::collections::VecDeque;

pub const DEFAULT_CAPACITY_SAMPLES: usize = 64_000; // ~4s of 16kHz mono

/// Bounded buffer of recent microphone chunks. Eviction granularity is
/// whole chunks from the head, so immediately after eviction the buffer
/// may hold fewer samples than capacity: an approximate sliding window,
/// not an exact one.
#[derive(Debug)]
pub struct AudioRingBuffer {
    chunks: VecDeque<AudioChunk>,
    total_samples: usize,
    capacity_samples: usize,
}

impl AudioRingBuffer {
    pub fn new(capacity_samples: usize) -> Self {
        Self {
            chunks: VecDeque::new(),
            total_samples: 0,
            capacity_samples,
        }
    }

    /// Append a chunk, then drop whole chunks from the head until the
    /// total is back under capacity.
    pub fn push(&mut self, chunk: AudioChunk) {
        self.total_samples += chunk.samples.len();
        self.chunks.push_back(chunk);
        while self.total_samples > self.capacity_samples {
            match self.chunks.pop_front() {
                Some(evicted) => self.total_samples -= evicted.samples.len(),
                None => break,
            }
        }
    }

    /// Atomically take every buffered chunk, leaving the buffer empty.
    pub fn drain_all(&mut self) -> Vec<AudioChunk> {
        self.total_samples = 0;
        std::mem::take(&mut self.chunks).into()
    }

    pub fn total_samples(&self) -> usize {
        self.total_samples
    }

    pub fn capacity_samples(&self) -> usize {
        self.capacity_samples
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl Default for AudioRingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY_SAMPLES)
    }
}
