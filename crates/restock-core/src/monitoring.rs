//! Observability snapshots handed to monitoring collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Lifetime request counters for one retailer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetailerMetrics {
    pub retailer_id: String,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_response_ms: f64,
    pub rate_limit_hits: u64,
    pub circuit_breaker_trips: u64,
    pub last_request_at: Option<DateTime<Utc>>,
}

impl RetailerMetrics {
    #[must_use]
    pub fn empty(retailer_id: impl Into<String>) -> Self {
        Self {
            retailer_id: retailer_id.into(),
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            average_response_ms: 0.0,
            rate_limit_hits: 0,
            circuit_breaker_trips: 0,
            last_request_at: None,
        }
    }

    /// Fraction of requests that succeeded; `1.0` before any request.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 1.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = self.successful_requests as f64 / self.total_requests as f64;
        rate
    }
}

/// Result of one health probe against one retailer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetailerHealthStatus {
    pub retailer_id: String,
    pub is_healthy: bool,
    pub last_response_ms: Option<u64>,
    pub success_rate: f64,
    pub errors: Vec<String>,
    pub circuit_state: CircuitState,
    pub checked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_rate_defaults_to_one_without_traffic() {
        let metrics = RetailerMetrics::empty("walmart");
        assert!((metrics.success_rate() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn success_rate_divides_successes_by_total() {
        let mut metrics = RetailerMetrics::empty("walmart");
        metrics.total_requests = 4;
        metrics.successful_requests = 3;
        assert!((metrics.success_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn circuit_state_uses_screaming_case_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&CircuitState::HalfOpen).unwrap(),
            "\"HALF_OPEN\""
        );
        assert_eq!(CircuitState::Open.to_string(), "OPEN");
    }
}
