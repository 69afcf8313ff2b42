use sensemux_core::{GatewayConfig, GatewayError};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct GatewayTuning {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
    pub throttle_window: Duration,
    pub throttle_wait_slice: Duration,
}

impl Default for GatewayTuning {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(10_000),
            backoff_multiplier: 1.5,
            throttle_window: Duration::from_millis(60_000),
            throttle_wait_slice: Duration::from_millis(5_000),
        }
    }
}

impl From<&GatewayConfig> for GatewayTuning {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            backoff_multiplier: config.backoff_multiplier,
            throttle_window: Duration::from_millis(config.throttle_window_ms),
            throttle_wait_slice: Duration::from_millis(config.throttle_wait_slice_ms),
        }
    }
}

/// Shared throttle state. One quota failure poisons it for every caller,
/// so concurrent streams self-limit without each failing individually.
#[derive(Debug)]
pub struct GatewayState {
    pub is_throttled: bool,
    pub throttle_until: Instant,
}

impl GatewayState {
    pub fn new() -> Self {
        Self {
            is_throttled: false,
            throttle_until: Instant::now(),
        }
    }
}

impl Default for GatewayState {
    fn default() -> Self {
        Self::new()
    }
}

/// The sole choke point for remote calls: cooldown/circuit-breaker state
/// plus retry-with-backoff against quota errors. Transient and aborted
/// failures pass through to the caller untouched.
pub struct InferenceGateway {
    tuning: GatewayTuning,
    state: Arc<Mutex<GatewayState>>,
}

impl InferenceGateway {
    pub fn new(tuning: GatewayTuning) -> Self {
        Self::with_shared_state(tuning, Arc::new(Mutex::new(GatewayState::new())))
    }

    /// Build a gateway over caller-owned state, letting tests (and
    /// multi-gateway setups) observe or share the throttle flag.
    pub fn with_shared_state(tuning: GatewayTuning, state: Arc<Mutex<GatewayState>>) -> Self {
        Self { tuning, state }
    }

    pub fn state(&self) -> Arc<Mutex<GatewayState>> {
        Arc::clone(&self.state)
    }

    pub fn is_throttled(&self) -> bool {
        self.state.lock().unwrap().is_throttled
    }

    /// Hold while the throttle window is active, but never longer than one
    /// wait slice per attempt, so callers' own timer loops stay responsive.
    async fn wait_while_throttled(&self) {
        let wait = {
            let mut state = self.state.lock().unwrap();
            let now = Instant::now();
            if !state.is_throttled {
                None
            } else if now < state.throttle_until {
                Some((state.throttle_until - now).min(self.tuning.throttle_wait_slice))
            } else {
                state.is_throttled = false;
                None
            }
        };
        if let Some(delay) = wait {
            tracing::warn!(delay_ms = delay.as_millis() as u64, "quota window active, holding");
            tokio::time::sleep(delay).await;
        }
    }

    /// Run `operation`, retrying quota-classified failures with exponential
    /// backoff until the retry budget runs out. Success clears the shared
    /// throttle flag; a quota failure arms it for the full window.
    pub async fn invoke<T, F, Fut>(&self, mut operation: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut retries_left = self.tuning.max_retries;
        let mut delay = self.tuning.initial_delay;

        loop {
            self.wait_while_throttled().await;

            match operation().await {
                Ok(value) => {
                    self.state.lock().unwrap().is_throttled = false;
                    return Ok(value);
                }
                Err(GatewayError::QuotaExceeded(message)) => {
                    {
                        let mut state = self.state.lock().unwrap();
                        state.is_throttled = true;
                        state.throttle_until = Instant::now() + self.tuning.throttle_window;
                    }
                    if retries_left == 0 {
                        return Err(GatewayError::QuotaExceeded(message));
                    }
                    tracing::warn!(
                        retries_left,
                        delay_ms = delay.as_millis() as u64,
                        "quota exceeded, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    retries_left -= 1;
                    delay = delay.mul_f64(self.tuning.backoff_multiplier);
                }
                // Transient and aborted failures are the caller's problem;
                // retrying them here would hide real errors and delay
                // cancellation.
                Err(other) => return Err(other),
            }
        }
    }
}
