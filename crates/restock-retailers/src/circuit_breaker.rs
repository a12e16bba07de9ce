use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use restock_core::CircuitState;

/// Failure threshold and cool-down for one retailer's breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct CircuitInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    /// Set while the single half-open trial call is outstanding.
    trial_in_flight: bool,
    /// Bumped for every trial admitted, so a stale permit cannot touch a
    /// later trial.
    trial_id: u64,
}

impl Default for CircuitInner {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            trial_in_flight: false,
            trial_id: 0,
        }
    }
}

/// Point-in-time view of a breaker, for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
}

/// Consecutive-failure circuit breaker for one retailer.
///
/// `Closed` passes every call. `Open` rejects until the cool-down elapses,
/// then moves to `HalfOpen` and admits exactly one trial call.
#[derive(Debug)]
pub struct CircuitBreaker {
    retailer: String,
    config: CircuitBreakerConfig,
    inner: Mutex<CircuitInner>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(retailer: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            retailer: retailer.into(),
            config,
            inner: Mutex::new(CircuitInner::default()),
        }
    }

    /// Asks permission to call the retailer. `None` means short-circuit.
    ///
    /// The returned permit must be resolved with [`CallPermit::succeed`] or
    /// [`CallPermit::fail`]. A half-open trial permit dropped unresolved
    /// (the call was cancelled) reopens the breaker and restarts the
    /// cool-down.
    pub fn try_acquire(&self) -> Option<CallPermit<'_>> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Some(CallPermit::new(self, None)),
            CircuitState::HalfOpen if inner.trial_in_flight => None,
            CircuitState::HalfOpen => Some(self.admit_trial(&mut inner)),
            CircuitState::Open => {
                let cooled = inner
                    .opened_at
                    .is_some_and(|at| at.elapsed() >= self.config.cooldown);
                if !cooled {
                    return None;
                }
                inner.state = CircuitState::HalfOpen;
                inner.opened_at = None;
                tracing::info!(
                    retailer = %self.retailer,
                    "circuit breaker half-open, admitting trial call"
                );
                Some(self.admit_trial(&mut inner))
            }
        }
    }

    fn admit_trial(&self, inner: &mut CircuitInner) -> CallPermit<'_> {
        inner.trial_in_flight = true;
        inner.trial_id = inner.trial_id.wrapping_add(1);
        CallPermit::new(self, Some(inner.trial_id))
    }

    /// Reopens the breaker when `trial_id` is still the outstanding trial.
    fn abandon_trial(&self, trial_id: u64) {
        let mut inner = self.lock();
        if inner.state != CircuitState::HalfOpen
            || !inner.trial_in_flight
            || inner.trial_id != trial_id
        {
            return;
        }
        inner.state = CircuitState::Open;
        inner.opened_at = Some(Instant::now());
        inner.trial_in_flight = false;
        tracing::info!(
            retailer = %self.retailer,
            "half-open trial abandoned, circuit breaker reopened"
        );
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            tracing::info!(retailer = %self.retailer, "circuit breaker closed");
        }
        let trial_id = inner.trial_id;
        *inner = CircuitInner {
            trial_id,
            ..CircuitInner::default()
        };
    }

    /// Counts one failure. Returns `true` when this failure tripped the
    /// breaker open.
    pub fn record_failure(&self) -> bool {
        let mut inner = self.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);

        let trip = match inner.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => inner.consecutive_failures >= self.config.failure_threshold,
            CircuitState::Open => false,
        };
        if trip {
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
            inner.trial_in_flight = false;
            tracing::info!(
                retailer = %self.retailer,
                failures = inner.consecutive_failures,
                cooldown_secs = self.config.cooldown.as_secs(),
                "circuit breaker opened"
            );
        }
        trip
    }

    /// Forces the breaker closed and clears its counters.
    pub fn reset(&self) {
        let mut inner = self.lock();
        let trial_id = inner.trial_id;
        *inner = CircuitInner {
            trial_id,
            ..CircuitInner::default()
        };
        tracing::info!(retailer = %self.retailer, "circuit breaker reset");
    }

    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    #[must_use]
    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CircuitInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Permission for one call, returned by [`CircuitBreaker::try_acquire`].
#[must_use = "an unresolved half-open trial permit reopens the breaker when dropped"]
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: Option<u64>,
    resolved: bool,
}

impl<'a> CallPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, trial: Option<u64>) -> Self {
        Self {
            breaker,
            trial,
            resolved: false,
        }
    }

    /// `true` for the single call admitted while half-open.
    #[must_use]
    pub fn is_trial(&self) -> bool {
        self.trial.is_some()
    }

    pub fn succeed(mut self) {
        self.resolved = true;
        self.breaker.record_success();
    }

    /// Counts the call as failed. Returns `true` when this tripped the
    /// breaker open.
    pub fn fail(mut self) -> bool {
        self.resolved = true;
        self.breaker.record_failure()
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if let (false, Some(trial_id)) = (self.resolved, self.trial) {
            self.breaker.abandon_trial(trial_id);
        }
    }
}
