use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use restock_retailers::{CircuitBreaker, CircuitBreakerConfig, RetailerAdapter};

/// Everything the aggregator owns for one retailer.
///
/// The adapter carries its own pacing and metrics; the breaker and the
/// runtime on/off switch live here so adapters never decide whether they
/// get called.
pub struct RetailerEntry {
    pub adapter: Arc<dyn RetailerAdapter>,
    pub breaker: CircuitBreaker,
    active: AtomicBool,
}

impl RetailerEntry {
    #[must_use]
    pub fn new(adapter: Arc<dyn RetailerAdapter>, breaker: CircuitBreakerConfig) -> Self {
        let active = adapter.config().active;
        Self {
            breaker: CircuitBreaker::new(adapter.id(), breaker),
            active: AtomicBool::new(active),
            adapter,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        self.adapter.id()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    /// The retailer's own timeout, capped by the aggregator-wide ceiling.
    #[must_use]
    pub fn call_timeout(&self, ceiling: Duration) -> Duration {
        self.adapter.config().timeout().min(ceiling)
    }
}

impl std::fmt::Debug for RetailerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetailerEntry")
            .field("retailer", &self.id())
            .field("active", &self.is_active())
            .field("breaker", &self.breaker.state())
            .finish()
    }
}
