use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use restock_core::RetailerMetrics;

/// Accumulates request counters for one retailer.
#[derive(Debug)]
pub struct MetricsRecorder {
    inner: Mutex<RetailerMetrics>,
}

impl MetricsRecorder {
    #[must_use]
    pub fn new(retailer_id: &str) -> Self {
        Self {
            inner: Mutex::new(RetailerMetrics::empty(retailer_id)),
        }
    }

    pub fn record_success(&self, elapsed: Duration) {
        self.record(elapsed, true);
    }

    pub fn record_failure(&self, elapsed: Duration) {
        self.record(elapsed, false);
    }

    pub fn record_rate_limit_hit(&self) {
        self.update(|m| m.rate_limit_hits += 1);
    }

    pub fn record_breaker_trip(&self) {
        self.update(|m| m.circuit_breaker_trips += 1);
    }

    #[must_use]
    pub fn snapshot(&self) -> RetailerMetrics {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn reset(&self) {
        self.update(|m| *m = RetailerMetrics::empty(m.retailer_id.clone()));
    }

    #[allow(clippy::cast_precision_loss)]
    fn record(&self, elapsed: Duration, success: bool) {
        let elapsed_ms = elapsed.as_secs_f64() * 1_000.0;
        self.update(|m| {
            m.total_requests += 1;
            if success {
                m.successful_requests += 1;
            } else {
                m.failed_requests += 1;
            }
            let n = m.total_requests as f64;
            m.average_response_ms += (elapsed_ms - m.average_response_ms) / n;
            m.last_request_at = Some(Utc::now());
        });
    }

    fn update(&self, f: impl FnOnce(&mut RetailerMetrics)) {
        f(&mut self.inner.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_averages_requests() {
        let metrics = MetricsRecorder::new("walmart");
        metrics.record_success(Duration::from_millis(100));
        metrics.record_success(Duration::from_millis(300));
        metrics.record_failure(Duration::from_millis(200));

        let snap = metrics.snapshot();
        assert_eq!(snap.retailer_id, "walmart");
        assert_eq!(snap.total_requests, 3);
        assert_eq!(snap.successful_requests, 2);
        assert_eq!(snap.failed_requests, 1);
        assert!((snap.average_response_ms - 200.0).abs() < 1e-6);
        assert!(snap.last_request_at.is_some());
    }

    #[test]
    fn side_counters_do_not_touch_request_totals() {
        let metrics = MetricsRecorder::new("walmart");
        metrics.record_rate_limit_hit();
        metrics.record_breaker_trip();
        metrics.record_breaker_trip();
        let snap = metrics.snapshot();
        assert_eq!(snap.total_requests, 0);
        assert_eq!(snap.rate_limit_hits, 1);
        assert_eq!(snap.circuit_breaker_trips, 2);
    }

    #[test]
    fn reset_keeps_the_retailer_id() {
        let metrics = MetricsRecorder::new("walmart");
        metrics.record_failure(Duration::from_millis(5));
        metrics.reset();
        assert_eq!(metrics.snapshot(), RetailerMetrics::empty("walmart"));
    }
}
