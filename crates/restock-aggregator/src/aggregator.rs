//! Fan-out over every configured retailer.
//!
//! Each call goes to the active retailers concurrently. A retailer whose
//! breaker is open is skipped without touching the network; every other
//! failure or timeout is logged and left out of the merged result. Nothing
//! an adapter does can make these methods fail.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use restock_core::{
    AppConfig, AvailabilityRequest, AvailabilityResponse, CircuitState, RetailerConfig,
    RetailerHealthStatus, RetailerMetrics,
};
use restock_retailers::{
    adapter_for, CircuitBreakerConfig, ClientSettings, RetailerAdapter, RetailerError,
    RetailerErrorKind,
};

use crate::error::AggregatorError;
use crate::registry::RetailerEntry;

/// Ceiling on one adapter call when none is configured.
pub const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(15);

pub struct Aggregator {
    retailers: HashMap<String, RetailerEntry>,
    breaker_config: CircuitBreakerConfig,
    adapter_timeout: Duration,
    /// Latest probe result per retailer.
    health: Mutex<HashMap<String, RetailerHealthStatus>>,
}

impl Aggregator {
    #[must_use]
    pub fn new(breaker_config: CircuitBreakerConfig, adapter_timeout: Duration) -> Self {
        Self {
            retailers: HashMap::new(),
            breaker_config,
            adapter_timeout,
            health: Mutex::new(HashMap::new()),
        }
    }

    /// Builds an adapter for every retailer in `retailers`.
    ///
    /// Inactive retailers that cannot be built (typically a missing API key)
    /// are skipped with a warning, since nothing calls them until an
    /// operator enables them.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError::Adapter`] when an active retailer's adapter
    /// cannot be constructed.
    pub fn from_config(
        config: &AppConfig,
        retailers: Vec<RetailerConfig>,
    ) -> Result<Self, AggregatorError> {
        let breaker_config = CircuitBreakerConfig {
            failure_threshold: config.breaker_failure_threshold,
            cooldown: Duration::from_secs(config.breaker_cooldown_secs),
        };
        let mut aggregator =
            Self::new(breaker_config, Duration::from_millis(config.adapter_timeout_ms));
        let settings = ClientSettings::from(config);

        for retailer in retailers {
            let id = retailer.id.clone();
            let active = retailer.active;
            match adapter_for(retailer, &settings) {
                Ok(Some(adapter)) => aggregator.register(adapter),
                Ok(None) => {}
                Err(e) if !active => {
                    tracing::warn!(retailer = %id, error = %e, "skipping inactive retailer");
                }
                Err(source) => {
                    return Err(AggregatorError::Adapter {
                        retailer: id,
                        source,
                    })
                }
            }
        }

        tracing::info!(
            retailers = aggregator.retailers.len(),
            "aggregator initialised"
        );
        Ok(aggregator)
    }

    /// Adds `adapter`, replacing any retailer with the same id. Its initial
    /// active flag comes from the adapter's config.
    pub fn register(&mut self, adapter: Arc<dyn RetailerAdapter>) {
        let entry = RetailerEntry::new(adapter, self.breaker_config);
        let id = entry.id().to_string();
        if self.retailers.insert(id.clone(), entry).is_some() {
            tracing::warn!(retailer = %id, "replaced previously registered retailer");
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.retailers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.retailers.is_empty()
    }

    /// Every registered retailer id, active or not, sorted.
    #[must_use]
    pub fn retailer_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.retailers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Asks every targeted retailer about `request`.
    ///
    /// Targets are the active retailers, narrowed by `retailer_ids` and by the
    /// request's own `retailer_ids` when either is given. Returns only the
    /// successful responses, in retailer id order; an empty vector when all
    /// of them failed.
    pub async fn check_availability(
        &self,
        request: &AvailabilityRequest,
        retailer_ids: Option<&[String]>,
    ) -> Vec<AvailabilityResponse> {
        let targets = self.targets(retailer_ids, request.retailer_ids.as_deref());
        if targets.is_empty() {
            tracing::debug!(product = %request.product_id, "no active retailers to ask");
            return Vec::new();
        }

        let calls = targets.into_iter().map(|entry| async move {
            let response = self
                .guarded(entry, "check_availability", || {
                    entry.adapter.check_availability(request)
                })
                .await?;
            owned_by(entry, response)
        });

        let responses: Vec<AvailabilityResponse> =
            join_all(calls).await.into_iter().flatten().collect();
        tracing::debug!(
            product = %request.product_id,
            responses = responses.len(),
            "availability fan-out complete"
        );
        responses
    }

    /// Runs `query` against every targeted retailer and concatenates the
    /// results. Same failure handling as [`Self::check_availability`].
    pub async fn search_products(
        &self,
        query: &str,
        retailer_ids: Option<&[String]>,
    ) -> Vec<AvailabilityResponse> {
        let targets = self.targets(retailer_ids, None);
        let calls = targets.into_iter().map(|entry| async move {
            let responses = self
                .guarded(entry, "search_products", || entry.adapter.search_products(query))
                .await
                .unwrap_or_default();
            responses
                .into_iter()
                .filter_map(|r| owned_by(entry, r))
                .collect::<Vec<_>>()
        });
        join_all(calls).await.into_iter().flatten().collect()
    }

    /// Enables or disables a retailer for future fan-outs. `false` for an
    /// unknown id.
    pub fn set_retailer_status(&self, retailer_id: &str, active: bool) -> bool {
        let Some(entry) = self.retailers.get(retailer_id) else {
            return false;
        };
        if entry.is_active() != active {
            tracing::info!(retailer = retailer_id, active, "retailer status changed");
        }
        entry.set_active(active);
        true
    }

    /// Forces a retailer's breaker closed. `false` for an unknown id.
    pub fn reset_circuit_breaker(&self, retailer_id: &str) -> bool {
        let Some(entry) = self.retailers.get(retailer_id) else {
            return false;
        };
        entry.breaker.reset();
        true
    }

    /// Zeroes a retailer's request counters. `false` for an unknown id.
    pub fn reset_metrics(&self, retailer_id: &str) -> bool {
        let Some(entry) = self.retailers.get(retailer_id) else {
            return false;
        };
        entry.adapter.reset_metrics();
        tracing::info!(retailer = retailer_id, "metrics reset");
        true
    }

    /// Hands a validated product page URL to a retailer's adapter.
    /// `false` for an unknown id.
    pub fn register_url_hint(&self, retailer_id: &str, product_id: &str, url: &str) -> bool {
        let Some(entry) = self.retailers.get(retailer_id) else {
            return false;
        };
        entry.adapter.register_url_hint(product_id, url);
        true
    }

    /// Request counters for every registered retailer, sorted by id.
    #[must_use]
    pub fn metrics(&self) -> Vec<RetailerMetrics> {
        let mut all: Vec<RetailerMetrics> =
            self.retailers.values().map(|e| e.adapter.metrics()).collect();
        all.sort_by(|a, b| a.retailer_id.cmp(&b.retailer_id));
        all
    }

    #[must_use]
    pub fn circuit_states(&self) -> HashMap<String, CircuitState> {
        self.retailers
            .iter()
            .map(|(id, entry)| (id.clone(), entry.breaker.state()))
            .collect()
    }

    /// The most recent probe result per retailer, sorted by id. Empty until
    /// the first probe.
    #[must_use]
    pub fn health_statuses(&self) -> Vec<RetailerHealthStatus> {
        let mut all: Vec<RetailerHealthStatus> = self
            .health
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        all.sort_by(|a, b| a.retailer_id.cmp(&b.retailer_id));
        all
    }

    /// Probes every active retailer concurrently and records the results.
    ///
    /// Probes bypass the breaker and do not feed it.
    pub async fn probe_health(&self) -> Vec<RetailerHealthStatus> {
        let probes = self
            .targets(None, None)
            .into_iter()
            .map(|entry| self.probe(entry));
        let statuses = join_all(probes).await;

        let mut latest = self.health.lock().unwrap_or_else(PoisonError::into_inner);
        latest.clear();
        for status in &statuses {
            latest.insert(status.retailer_id.clone(), status.clone());
        }
        statuses
    }

    async fn probe(&self, entry: &RetailerEntry) -> RetailerHealthStatus {
        let limit = entry.call_timeout(self.adapter_timeout);
        let result = match tokio::time::timeout(limit, entry.adapter.health_check()).await {
            Ok(result) => result,
            Err(_) => Err(timed_out(entry.id(), limit)),
        };

        let circuit_state = entry.breaker.state();
        let mut errors = Vec::new();
        let last_response_ms = match result {
            Ok(latency) => Some(u64::try_from(latency.as_millis()).unwrap_or(u64::MAX)),
            Err(e) => {
                errors.push(e.to_string());
                None
            }
        };
        if circuit_state == CircuitState::Open {
            errors.push(format!("{}: circuit breaker is open", entry.id()));
        }
        if !errors.is_empty() {
            tracing::warn!(retailer = %entry.id(), errors = ?errors, "retailer unhealthy");
        }

        RetailerHealthStatus {
            retailer_id: entry.id().to_string(),
            is_healthy: errors.is_empty(),
            last_response_ms,
            success_rate: entry.adapter.metrics().success_rate(),
            errors,
            circuit_state,
            checked_at: Utc::now(),
        }
    }

    fn targets(
        &self,
        explicit: Option<&[String]>,
        from_request: Option<&[String]>,
    ) -> Vec<&RetailerEntry> {
        let allowed =
            |ids: Option<&[String]>, id: &str| ids.is_none_or(|ids| ids.iter().any(|i| i == id));
        let mut targets: Vec<&RetailerEntry> = self
            .retailers
            .values()
            .filter(|e| e.is_active())
            .filter(|e| allowed(explicit, e.id()) && allowed(from_request, e.id()))
            .collect();
        targets.sort_by(|a, b| a.id().cmp(b.id()));
        targets
    }

    /// Runs one adapter call under the retailer's breaker and timeout.
    ///
    /// `NotFound` counts as a healthy answer for the breaker. A timeout is
    /// recorded as a failed request on the adapter's metrics. If this future
    /// is dropped during a half-open trial, the permit reopens the breaker.
    async fn guarded<T, F, Fut>(
        &self,
        entry: &RetailerEntry,
        operation: &'static str,
        call: F,
    ) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RetailerError>>,
    {
        let Some(permit) = entry.breaker.try_acquire() else {
            tracing::debug!(retailer = %entry.id(), operation, "circuit open, skipping retailer");
            return None;
        };

        let limit = entry.call_timeout(self.adapter_timeout);
        let outcome = match tokio::time::timeout(limit, call()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                entry.adapter.scaffold().metrics().record_failure(limit);
                Err(timed_out(entry.id(), limit))
            }
        };

        match outcome {
            Ok(value) => {
                permit.succeed();
                Some(value)
            }
            Err(e) if e.kind() == RetailerErrorKind::NotFound => {
                permit.succeed();
                tracing::debug!(
                    retailer = %entry.id(),
                    operation,
                    error = %e,
                    "retailer has no match"
                );
                None
            }
            Err(e) => {
                if permit.fail() {
                    entry.adapter.scaffold().metrics().record_breaker_trip();
                }
                tracing::warn!(
                    retailer = %entry.id(),
                    operation,
                    kind = %e.kind(),
                    error = %e,
                    "retailer call failed"
                );
                None
            }
        }
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default(), DEFAULT_ADAPTER_TIMEOUT)
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("retailers", &self.retailer_ids())
            .field("adapter_timeout", &self.adapter_timeout)
            .finish_non_exhaustive()
    }
}

fn timed_out(retailer: &str, limit: Duration) -> RetailerError {
    RetailerError::network(retailer, format!("timed out after {} ms", limit.as_millis()))
}

/// Drops a response that claims to come from a different retailer.
fn owned_by(entry: &RetailerEntry, response: AvailabilityResponse) -> Option<AvailabilityResponse> {
    if response.retailer_id == entry.id() {
        Some(response)
    } else {
        tracing::warn!(
            retailer = %entry.id(),
            claimed = %response.retailer_id,
            "dropping response with mismatched retailer id"
        );
        None
    }
}

#[cfg(test)]
#[path = "aggregator_test.rs"]
mod tests;
