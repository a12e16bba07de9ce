//! Per-retailer request pacing and retry with backoff.
//!
//! Pacing is interval based: a retailer allowing `N` requests per minute gets
//! one request every `60_000 / N` ms, never faster than the floor for its
//! integration kind. A rolling one-hour window enforces `requests_per_hour`.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use restock_core::{RateLimitConfig, RetailerKind};

use crate::error::RetailerError;

/// Minimum gap between two scraping requests to the same site.
pub const SCRAPING_MIN_INTERVAL_MS: u64 = 2_000;

const HOUR: Duration = Duration::from_secs(3_600);

/// Upper bound on a single backoff sleep.
const MAX_DELAY_MS: u64 = 30_000;

/// Minimum inter-request interval for a retailer of `kind` allowing
/// `requests_per_minute` requests.
#[must_use]
pub fn min_request_interval(kind: RetailerKind, requests_per_minute: u32) -> Duration {
    let floor_ms = match kind {
        RetailerKind::Api | RetailerKind::Affiliate => 0,
        RetailerKind::Scraping => SCRAPING_MIN_INTERVAL_MS,
    };
    let per_minute_ms = 60_000 / u64::from(requests_per_minute.max(1));
    Duration::from_millis(per_minute_ms.max(floor_ms))
}

/// Outcome of asking the limiter for a request slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Proceed now.
    Ready,
    /// A slot is reserved; proceed after sleeping this long.
    Wait(Duration),
    /// The hourly budget is spent. Nothing was reserved.
    HourlyExhausted { retry_after: Duration },
}

#[derive(Debug, Default)]
struct LimiterState {
    /// Start time of the most recently reserved slot. May lie in the future.
    last_slot: Option<Instant>,
    /// Slot start times within the last hour, oldest first.
    window: VecDeque<Instant>,
}

#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    requests_per_hour: u32,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(kind: RetailerKind, limits: RateLimitConfig) -> Self {
        Self {
            min_interval: min_request_interval(kind, limits.requests_per_minute),
            requests_per_hour: limits.requests_per_hour,
            state: Mutex::new(LimiterState::default()),
        }
    }

    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Returns `true` and records the request when one may proceed right now.
    ///
    /// A `false` answer reserves nothing.
    pub fn check_rate_limit(&self) -> bool {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if self.hourly_wait(&mut state, now).is_some() {
            return false;
        }
        if Self::next_free(&state, self.min_interval, now) > now {
            return false;
        }
        state.last_slot = Some(now);
        state.window.push_back(now);
        true
    }

    /// Reserves the next free slot, which may be in the future.
    ///
    /// Concurrent callers are handed consecutive slots, so they never
    /// bunch up once they wake.
    pub fn reserve(&self) -> RateDecision {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(retry_after) = self.hourly_wait(&mut state, now) {
            return RateDecision::HourlyExhausted { retry_after };
        }
        let slot = Self::next_free(&state, self.min_interval, now);
        state.last_slot = Some(slot);
        state.window.push_back(slot);
        if slot > now {
            RateDecision::Wait(slot - now)
        } else {
            RateDecision::Ready
        }
    }

    fn next_free(state: &LimiterState, min_interval: Duration, now: Instant) -> Instant {
        state
            .last_slot
            .map_or(now, |last| (last + min_interval).max(now))
    }

    /// Drops slots older than an hour; returns how long until one frees up
    /// when the hourly budget is spent.
    fn hourly_wait(&self, state: &mut LimiterState, now: Instant) -> Option<Duration> {
        while state
            .window
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) >= HOUR)
        {
            state.window.pop_front();
        }
        let budget = usize::try_from(self.requests_per_hour).unwrap_or(usize::MAX);
        if state.window.len() < budget {
            return None;
        }
        let oldest = state.window.front().copied().unwrap_or(now);
        Some((oldest + HOUR).saturating_duration_since(now))
    }
}

/// Executes `operation`, retrying retryable [`RetailerError`]s with
/// exponential backoff and jitter.
///
/// The n-th retry sleeps `backoff_ms * 2^(n-1)` ms ± 25 %, capped at 30 s.
/// A rate-limit answer waits at least its `Retry-After`, still under the cap.
/// Non-retryable errors return immediately.
pub async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_ms: u64,
    mut operation: F,
) -> Result<T, RetailerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RetailerError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retryable()
                    || matches!(err, RetailerError::CircuitOpen { .. })
                    || attempt >= max_retries
                {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let mut delay_ms =
                    (computed.min(MAX_DELAY_MS) as f64 * (rand::random::<f64>() * 0.5 + 0.75))
                        as u64;
                if let RetailerError::RateLimited {
                    retry_after_secs, ..
                } = &err
                {
                    delay_ms = delay_ms.max(retry_after_secs.saturating_mul(1_000));
                }
                let delay_ms = delay_ms.min(MAX_DELAY_MS);
                tracing::warn!(
                    retailer = %err.retailer(),
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient retailer error, retrying after backoff"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
