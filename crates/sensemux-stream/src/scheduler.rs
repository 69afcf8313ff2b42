use crate::analyzer::Analyzer;
use sensemux_capture::Sampler;
use sensemux_core::{GatewayError, StreamRecord};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

// ── In-flight guard ───────────────────────────────────────────

/// Per-stream lock: at most one capture-and-infer cycle in flight.
#[derive(Clone)]
pub struct InFlightGuard {
    busy: Arc<AtomicBool>,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self {
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn try_begin(&self) -> Option<InFlightPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlightPermit {
                busy: Arc::clone(&self.busy),
            })
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Held for the duration of one cycle. Dropping it releases the guard on
/// every exit path, success, failure, or panic alike.
pub struct InFlightPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

// ── Stream phase ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Idle,
    Armed,
    Capturing,
    Cooldown,
}

impl StreamPhase {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => StreamPhase::Armed,
            2 => StreamPhase::Capturing,
            3 => StreamPhase::Cooldown,
            _ => StreamPhase::Idle,
        }
    }
}

// ── StreamScheduler ───────────────────────────────────────────

/// Periodic capture-and-infer driver for one stream. Each tick checks the
/// live armed flag and the in-flight guard before sampling; the network
/// round-trip runs in its own task so ticks keep firing (and keep being
/// skipped) while a cycle is slow.
pub struct StreamScheduler {
    id: String,
    interval: Duration,
    sampler: Sampler,
    analyzer: Arc<dyn Analyzer>,
    record_tx: mpsc::UnboundedSender<StreamRecord>,
}

impl StreamScheduler {
    pub fn new(
        id: impl Into<String>,
        interval: Duration,
        sampler: Sampler,
        analyzer: Arc<dyn Analyzer>,
        record_tx: mpsc::UnboundedSender<StreamRecord>,
    ) -> Self {
        Self {
            id: id.into(),
            interval,
            sampler,
            analyzer,
            record_tx,
        }
    }

    /// Start the periodic timer. The first tick fires immediately.
    pub fn arm(self) -> StreamHandle {
        let StreamScheduler {
            id,
            interval,
            sampler,
            analyzer,
            record_tx,
        } = self;

        let (armed_tx, mut armed_rx) = watch::channel(true);
        let armed_tx = Arc::new(armed_tx);
        let phase = Arc::new(AtomicU8::new(StreamPhase::Armed as u8));
        let guard = InFlightGuard::new();

        let loop_id = id.clone();
        let loop_phase = Arc::clone(&phase);
        let loop_guard = guard.clone();
        let loop_armed_tx = Arc::clone(&armed_tx);
        // Separate receiver for synchronous state queries, so the select
        // arm awaiting change notifications keeps the other one.
        let status_rx = armed_rx.clone();
        let epoch = Instant::now();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !*status_rx.borrow() {
                            break;
                        }
                        let Some(permit) = loop_guard.try_begin() else {
                            tracing::trace!(stream_id = %loop_id, "cycle in flight, tick skipped");
                            continue;
                        };
                        let Some(payload) = sampler.capture(epoch.elapsed().as_secs_f64()) else {
                            tracing::trace!(stream_id = %loop_id, "no payload this tick");
                            drop(permit);
                            continue;
                        };
                        loop_phase.store(StreamPhase::Capturing as u8, Ordering::Relaxed);

                        let analyzer = Arc::clone(&analyzer);
                        let record_tx = record_tx.clone();
                        let cycle_id = loop_id.clone();
                        let cycle_phase = Arc::clone(&loop_phase);
                        let cycle_armed_tx = Arc::clone(&loop_armed_tx);
                        let cycle_armed_rx = status_rx.clone();
                        tokio::spawn(async move {
                            let _permit = permit;
                            match analyzer.analyze(&payload).await {
                                Ok(Some(result)) => {
                                    if *cycle_armed_rx.borrow() {
                                        let _ = record_tx.send(StreamRecord {
                                            stream_id: cycle_id,
                                            payload: result,
                                        });
                                    } else {
                                        tracing::debug!(
                                            stream_id = %cycle_id,
                                            "stream disarmed, late result discarded"
                                        );
                                    }
                                }
                                Ok(None) => {}
                                Err(GatewayError::QuotaExceeded(message)) => {
                                    tracing::warn!(
                                        stream_id = %cycle_id,
                                        "quota exhausted, stream cooling down: {message}"
                                    );
                                    cycle_phase
                                        .store(StreamPhase::Cooldown as u8, Ordering::Relaxed);
                                    let _ = cycle_armed_tx.send(false);
                                }
                                Err(GatewayError::Aborted) => {
                                    tracing::debug!(stream_id = %cycle_id, "cycle aborted");
                                }
                                Err(e) => {
                                    tracing::warn!(stream_id = %cycle_id, "cycle failed: {e}");
                                }
                            }
                            if cycle_phase.load(Ordering::Relaxed)
                                == StreamPhase::Capturing as u8
                            {
                                cycle_phase.store(StreamPhase::Armed as u8, Ordering::Relaxed);
                            }
                        });
                    }
                    changed = armed_rx.changed() => {
                        if changed.is_err() || !*status_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            if loop_phase.load(Ordering::Relaxed) != StreamPhase::Cooldown as u8 {
                loop_phase.store(StreamPhase::Idle as u8, Ordering::Relaxed);
            }
        });

        StreamHandle {
            id,
            armed: armed_tx,
            phase,
            guard,
            task: Some(task),
        }
    }
}

// ── StreamHandle ──────────────────────────────────────────────

pub struct StreamHandle {
    id: String,
    armed: Arc<watch::Sender<bool>>,
    phase: Arc<AtomicU8>,
    guard: InFlightGuard,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl StreamHandle {
    pub fn stream_id(&self) -> &str {
        &self.id
    }

    pub fn is_armed(&self) -> bool {
        *self.armed.borrow()
    }

    pub fn phase(&self) -> StreamPhase {
        StreamPhase::from_u8(self.phase.load(Ordering::Relaxed))
    }

    pub fn is_in_flight(&self) -> bool {
        self.guard.is_busy()
    }

    /// Stop the periodic timer. Any cycle already in flight completes on
    /// its own; its result is discarded.
    pub fn disarm(&self) {
        let _ = self.armed.send(false);
    }

    /// Disarm and wait for the tick loop to wind down.
    pub async fn shutdown(mut self) {
        self.disarm();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}
