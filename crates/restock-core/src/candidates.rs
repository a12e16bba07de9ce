//! Candidate product-page URLs for retailers without a lookup API.

use serde::{Deserialize, Serialize};

/// Catalog facts a URL template can draw from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductHints {
    pub product_id: String,
    pub name: Option<String>,
    pub set_name: Option<String>,
    pub sku: Option<String>,
    pub upc: Option<String>,
}

/// Which template family produced a candidate, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateReason {
    SkuPath,
    SearchSku,
    SearchUpc,
    SearchSlug,
}

impl CandidateReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateReason::SkuPath => "sku_path",
            CandidateReason::SearchSku => "search_sku",
            CandidateReason::SearchUpc => "search_upc",
            CandidateReason::SearchSlug => "search_slug",
        }
    }
}

/// A generated, unverified guess at a retailer product-page URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlCandidate {
    pub url: String,
    /// 0.0–1.0; higher means a more specific template.
    pub confidence: f64,
    pub reason: CandidateReason,
    /// Stable identifier of the template that produced this URL.
    pub pattern_id: String,
}
