use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use restock_core::UrlCandidate;

use crate::error::DiscoveryError;

/// Persistence for generated and validated candidates, keyed by
/// (product, retailer). Implemented by whatever storage the host
/// application uses.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Replaces the stored candidates for `(product_id, retailer_id)`.
    async fn save_candidates(
        &self,
        product_id: &str,
        retailer_id: &str,
        candidates: &[UrlCandidate],
    ) -> Result<(), DiscoveryError>;

    async fn load_candidates(
        &self,
        product_id: &str,
        retailer_id: &str,
    ) -> Result<Vec<UrlCandidate>, DiscoveryError>;

    /// Records that `url` was checked and found to be a live product page.
    async fn record_validated(
        &self,
        product_id: &str,
        retailer_id: &str,
        url: &str,
    ) -> Result<(), DiscoveryError>;

    async fn validated_url(
        &self,
        product_id: &str,
        retailer_id: &str,
    ) -> Result<Option<String>, DiscoveryError>;
}

type Key = (String, String);

/// Process-local [`CandidateStore`].
#[derive(Debug, Default)]
pub struct InMemoryCandidateStore {
    candidates: Mutex<HashMap<Key, Vec<UrlCandidate>>>,
    validated: Mutex<HashMap<Key, String>>,
}

impl InMemoryCandidateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(product_id: &str, retailer_id: &str) -> Key {
    (product_id.to_string(), retailer_id.to_string())
}

#[async_trait]
impl CandidateStore for InMemoryCandidateStore {
    async fn save_candidates(
        &self,
        product_id: &str,
        retailer_id: &str,
        candidates: &[UrlCandidate],
    ) -> Result<(), DiscoveryError> {
        self.candidates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key(product_id, retailer_id), candidates.to_vec());
        Ok(())
    }

    async fn load_candidates(
        &self,
        product_id: &str,
        retailer_id: &str,
    ) -> Result<Vec<UrlCandidate>, DiscoveryError> {
        Ok(self
            .candidates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key(product_id, retailer_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn record_validated(
        &self,
        product_id: &str,
        retailer_id: &str,
        url: &str,
    ) -> Result<(), DiscoveryError> {
        self.validated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key(product_id, retailer_id), url.to_string());
        Ok(())
    }

    async fn validated_url(
        &self,
        product_id: &str,
        retailer_id: &str,
    ) -> Result<Option<String>, DiscoveryError> {
        Ok(self
            .validated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key(product_id, retailer_id))
            .cloned())
    }
}
