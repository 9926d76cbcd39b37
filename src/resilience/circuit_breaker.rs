use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerSnapshot {
    pub failure_threshold: u32,
    pub cooldown_ms: u64,
    pub consecutive_failures: u32,
    /// Remaining open time in ms, if currently open.
    pub open_remaining_ms: Option<u64>,
    /// A trial call is in flight after the cooldown.
    pub half_open: bool,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

#[derive(Debug)]
struct State {
    consecutive_failures: u32,
    open_until: Option<Instant>,
    trial_in_flight: bool,
}

/// Skips the AI service for a cooldown after repeated consecutive failures.
///
/// While open, callers go straight to seeded data instead of waiting on a
/// timeout per request. After the cooldown exactly one trial call is let
/// through (half-open): its success closes the breaker, its failure reopens it
/// for another cooldown. Other callers are refused until the trial reports.
pub struct CircuitBreaker {
    cfg: CircuitBreakerConfig,
    state: Mutex<State>,
}

impl CircuitBreaker {
    pub fn new(cfg: CircuitBreakerConfig) -> Self {
        Self {
            cfg,
            state: Mutex::new(State {
                consecutive_failures: 0,
                open_until: None,
                trial_in_flight: false,
            }),
        }
    }

    pub fn allow(&self) -> bool {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match st.open_until {
            Some(until) if Instant::now() < until => false,
            Some(_) if st.trial_in_flight => false,
            Some(_) => {
                st.trial_in_flight = true;
                tracing::info!("AI circuit breaker half-open, allowing one trial call");
                true
            }
            None => true,
        }
    }

    pub fn on_success(&self) {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if st.trial_in_flight {
            tracing::info!("AI circuit breaker closed after successful trial");
        }
        st.consecutive_failures = 0;
        st.open_until = None;
        st.trial_in_flight = false;
    }

    pub fn on_failure(&self) {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        st.consecutive_failures = st.consecutive_failures.saturating_add(1);
        if st.trial_in_flight {
            st.trial_in_flight = false;
            st.open_until = Some(Instant::now() + self.cfg.cooldown);
            tracing::warn!(
                cooldown_ms = self.cfg.cooldown.as_millis() as u64,
                "AI circuit breaker trial failed, reopened"
            );
            return;
        }
        if st.consecutive_failures >= self.cfg.failure_threshold && st.open_until.is_none() {
            st.open_until = Some(Instant::now() + self.cfg.cooldown);
            tracing::warn!(
                failures = st.consecutive_failures,
                cooldown_ms = self.cfg.cooldown.as_millis() as u64,
                "AI circuit breaker opened"
            );
        }
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let now = Instant::now();
        let st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        CircuitBreakerSnapshot {
            failure_threshold: self.cfg.failure_threshold,
            cooldown_ms: self.cfg.cooldown.as_millis() as u64,
            consecutive_failures: st.consecutive_failures,
            open_remaining_ms: st
                .open_until
                .filter(|until| *until > now)
                .map(|until| (until - now).as_millis() as u64),
            half_open: st.trial_in_flight,
        }
    }
}
