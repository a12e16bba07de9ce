use std::time::Duration;

use async_trait::async_trait;
use restock_core::{AvailabilityRequest, AvailabilityResponse, RetailerConfig, RetailerMetrics};

use crate::error::RetailerError;
use crate::scaffold::Scaffold;

/// The capability every retailer integration provides.
///
/// Implementations compose a [`Scaffold`] for pacing, retries and metrics;
/// the defaulted methods delegate to it.
#[async_trait]
pub trait RetailerAdapter: Send + Sync {
    fn scaffold(&self) -> &Scaffold;

    /// Looks one catalog product up at this retailer.
    async fn check_availability(
        &self,
        request: &AvailabilityRequest,
    ) -> Result<AvailabilityResponse, RetailerError>;

    /// Free-text product search. Responses carry the retailer's own item id
    /// as `product_id`.
    async fn search_products(
        &self,
        query: &str,
    ) -> Result<Vec<AvailabilityResponse>, RetailerError>;

    /// Cheap reachability probe; returns the observed latency.
    async fn health_check(&self) -> Result<Duration, RetailerError> {
        self.scaffold().probe(&self.config().base_url).await
    }

    fn id(&self) -> &str {
        self.scaffold().id()
    }

    fn config(&self) -> &RetailerConfig {
        self.scaffold().config()
    }

    fn metrics(&self) -> RetailerMetrics {
        self.scaffold().metrics().snapshot()
    }

    fn reset_metrics(&self) {
        self.scaffold().metrics().reset();
    }

    /// Remembers a validated product page so later lookups can skip search.
    fn register_url_hint(&self, product_id: &str, url: &str) {
        self.scaffold().remember_url(product_id, url);
    }
}

/// One way of identifying a product at a retailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKey<'a> {
    Sku(&'a str),
    Upc(&'a str),
    /// Retailer item id mapped to the catalog product in config.
    Mapped(&'a str),
}

impl LookupKey<'_> {
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            LookupKey::Sku(v) | LookupKey::Upc(v) | LookupKey::Mapped(v) => v,
        }
    }
}

/// Identifiers to try, in preference order: SKU, UPC, mapped id.
#[must_use]
pub fn lookup_keys<'a>(
    config: &'a RetailerConfig,
    request: &'a AvailabilityRequest,
) -> Vec<LookupKey<'a>> {
    let present = |v: &'a Option<String>| v.as_deref().filter(|s| !s.trim().is_empty());
    let mut keys = Vec::with_capacity(3);
    if let Some(sku) = present(&request.sku) {
        keys.push(LookupKey::Sku(sku));
    }
    if let Some(upc) = present(&request.upc) {
        keys.push(LookupKey::Upc(upc));
    }
    if let Some(mapped) = config.mapped_id(&request.product_id) {
        keys.push(LookupKey::Mapped(mapped));
    }
    keys
}

/// Tries `keys` in order with `lookup`. A `NotFound` moves on to the next
/// key; any other error stops the search.
///
/// # Errors
///
/// Returns the first non-`NotFound` error, or `NotFound` when every key
/// missed or there were no keys at all.
pub async fn first_found<'k, T, F, Fut>(
    retailer: &str,
    request: &AvailabilityRequest,
    keys: &[LookupKey<'k>],
    mut lookup: F,
) -> Result<T, RetailerError>
where
    F: FnMut(LookupKey<'k>) -> Fut,
    Fut: std::future::Future<Output = Result<T, RetailerError>>,
{
    for key in keys {
        match lookup(*key).await {
            Ok(found) => return Ok(found),
            Err(RetailerError::NotFound { .. }) => {
                tracing::debug!(retailer, key = ?key, "lookup key missed, trying next");
            }
            Err(other) => return Err(other),
        }
    }
    Err(RetailerError::not_found(
        retailer,
        format!(
            "product '{}' not found by SKU, UPC, or mapped id",
            request.product_id
        ),
    ))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use restock_core::{RateLimitConfig, RetailerKind, RetryPolicy};

    use super::*;

    fn config() -> RetailerConfig {
        RetailerConfig {
            id: "walmart".to_string(),
            name: "Walmart".to_string(),
            slug: "walmart".to_string(),
            kind: RetailerKind::Affiliate,
            base_url: "https://api.walmart.test".to_string(),
            api_key: Some("k".to_string()),
            api_key_env: None,
            rate_limit: RateLimitConfig {
                requests_per_minute: 60,
                requests_per_hour: 1_000,
            },
            timeout_ms: 1_000,
            retry: RetryPolicy::default(),
            active: true,
            product_ids: HashMap::from([("p1".to_string(), "555".to_string())]),
        }
    }

    #[test]
    fn keys_follow_sku_upc_mapped_order() {
        let config = config();
        let request = AvailabilityRequest::new("p1").with_upc("0123").with_sku("9");
        assert_eq!(
            lookup_keys(&config, &request),
            vec![
                LookupKey::Sku("9"),
                LookupKey::Upc("0123"),
                LookupKey::Mapped("555")
            ]
        );
        let bare = AvailabilityRequest::new("other");
        assert!(lookup_keys(&config, &bare).is_empty());
    }

    #[tokio::test]
    async fn first_found_skips_misses_and_stops_on_hard_errors() {
        let config = config();
        let request = AvailabilityRequest::new("p1").with_sku("9").with_upc("0123");
        let keys = lookup_keys(&config, &request);

        let found = first_found("walmart", &request, &keys, |key| async move {
            match key {
                LookupKey::Mapped(id) => Ok(id.to_string()),
                _ => Err(RetailerError::not_found("walmart", key.value())),
            }
        })
        .await
        .unwrap();
        assert_eq!(found, "555");

        let err = first_found("walmart", &request, &keys, |_| async {
            Err::<(), _>(RetailerError::Auth {
                retailer: "walmart".to_string(),
                status: 401,
            })
        })
        .await
        .unwrap_err();
        assert!(matches!(err, RetailerError::Auth { .. }));
    }
}
