//! Candidate product-page URLs from catalog hints.
//!
//! Each retailer has a fixed list of URL templates. A template expands only
//! when every placeholder it uses has a value, so a product without a SKU
//! simply gets fewer candidates.

use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use restock_core::{CandidateReason, ProductHints, UrlCandidate};

use crate::store::CandidateStore;

/// Characters kept verbatim when a hint is spliced into a URL.
const URL_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// One URL shape for one retailer. Placeholders: `{sku}`, `{upc}`,
/// `{slug}` (slugified name + set), `{query}` (URL-encoded name + set).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UrlTemplate {
    pub pattern_id: &'static str,
    pub reason: CandidateReason,
    pub confidence: f64,
    pub template: &'static str,
}

const fn template(
    pattern_id: &'static str,
    reason: CandidateReason,
    confidence: f64,
    template: &'static str,
) -> UrlTemplate {
    UrlTemplate {
        pattern_id,
        reason,
        confidence,
        template,
    }
}

const BESTBUY: &[UrlTemplate] = &[
    template(
        "bestbuy.site_sku",
        CandidateReason::SkuPath,
        0.95,
        "https://www.bestbuy.com/site/{slug}/{sku}.p?skuId={sku}",
    ),
    template(
        "bestbuy.site_sku_bare",
        CandidateReason::SkuPath,
        0.9,
        "https://www.bestbuy.com/site/{sku}.p?skuId={sku}",
    ),
    template(
        "bestbuy.search_upc",
        CandidateReason::SearchUpc,
        0.45,
        "https://www.bestbuy.com/site/searchpage.jsp?st={upc}",
    ),
    template(
        "bestbuy.search_name",
        CandidateReason::SearchSlug,
        0.2,
        "https://www.bestbuy.com/site/searchpage.jsp?st={query}",
    ),
];

const WALMART: &[UrlTemplate] = &[
    template(
        "walmart.ip_slug_id",
        CandidateReason::SkuPath,
        0.9,
        "https://www.walmart.com/ip/{slug}/{sku}",
    ),
    template(
        "walmart.ip_id",
        CandidateReason::SkuPath,
        0.85,
        "https://www.walmart.com/ip/{sku}",
    ),
    template(
        "walmart.search_upc",
        CandidateReason::SearchUpc,
        0.45,
        "https://www.walmart.com/search?q={upc}",
    ),
    template(
        "walmart.search_name",
        CandidateReason::SearchSlug,
        0.2,
        "https://www.walmart.com/search?q={query}",
    ),
];

const TARGET: &[UrlTemplate] = &[
    template(
        "target.p_tcin",
        CandidateReason::SkuPath,
        0.9,
        "https://www.target.com/p/{slug}/-/A-{sku}",
    ),
    template(
        "target.search_upc",
        CandidateReason::SearchUpc,
        0.45,
        "https://www.target.com/s?searchTerm={upc}",
    ),
    template(
        "target.search_name",
        CandidateReason::SearchSlug,
        0.2,
        "https://www.target.com/s?searchTerm={query}",
    ),
];

const GAMESTOP: &[UrlTemplate] = &[
    template(
        "gamestop.trading_cards_sku",
        CandidateReason::SkuPath,
        0.85,
        "https://www.gamestop.com/toys-games/trading-cards/products/{slug}/{sku}.html",
    ),
    template(
        "gamestop.search_sku",
        CandidateReason::SearchSku,
        0.5,
        "https://www.gamestop.com/search/?q={sku}",
    ),
    template(
        "gamestop.search_name",
        CandidateReason::SearchSlug,
        0.2,
        "https://www.gamestop.com/search/?q={query}",
    ),
];

const SAMSCLUB: &[UrlTemplate] = &[
    template(
        "samsclub.p_slug_id",
        CandidateReason::SkuPath,
        0.85,
        "https://www.samsclub.com/p/{slug}/{sku}",
    ),
    template(
        "samsclub.search_upc",
        CandidateReason::SearchUpc,
        0.45,
        "https://www.samsclub.com/s/{upc}",
    ),
    template(
        "samsclub.search_name",
        CandidateReason::SearchSlug,
        0.2,
        "https://www.samsclub.com/s/{query}",
    ),
];

const POKEMONCENTER: &[UrlTemplate] = &[
    template(
        "pokemoncenter.product_sku_slug",
        CandidateReason::SkuPath,
        0.9,
        "https://www.pokemoncenter.com/product/{sku}/{slug}",
    ),
    template(
        "pokemoncenter.search_sku",
        CandidateReason::SearchSku,
        0.5,
        "https://www.pokemoncenter.com/search/{sku}",
    ),
    template(
        "pokemoncenter.search_name",
        CandidateReason::SearchSlug,
        0.2,
        "https://www.pokemoncenter.com/search/{query}",
    ),
];

/// URL templates for a retailer; empty for one without any.
#[must_use]
pub fn templates_for(retailer_id: &str) -> &'static [UrlTemplate] {
    match retailer_id {
        "bestbuy" => BESTBUY,
        "walmart" => WALMART,
        "target" => TARGET,
        "gamestop" => GAMESTOP,
        "samsclub" => SAMSCLUB,
        "pokemoncenter" => POKEMONCENTER,
        _ => &[],
    }
}

/// URL-safe slug: lowercase ASCII words joined by `-`. Accented vowels are
/// folded to their base letter; other non-ASCII characters and punctuation
/// are dropped.
#[must_use]
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(fold_accent)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else if c.is_whitespace() || c == '/' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn fold_accent(c: char) -> char {
    match c {
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'á' | 'à' | 'â' | 'ä' => 'a',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        other => other,
    }
}

/// Name followed by set name, unless the name already mentions the set.
fn display_text(hints: &ProductHints) -> Option<String> {
    let name = hints.name.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let set = hints.set_name.as_deref().map(str::trim).filter(|s| !s.is_empty());
    match (name, set) {
        (Some(n), Some(s)) if n.to_lowercase().contains(&s.to_lowercase()) => Some(n.to_string()),
        (Some(n), Some(s)) => Some(format!("{n} {s}")),
        (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
        (None, None) => None,
    }
}

struct Values {
    sku: Option<String>,
    upc: Option<String>,
    slug: Option<String>,
    query: Option<String>,
}

impl Values {
    fn from_hints(hints: &ProductHints) -> Self {
        let encode = |s: &str| utf8_percent_encode(s, URL_COMPONENT).to_string();
        let sku = hints
            .sku
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(encode);
        let upc = hints
            .upc
            .as_deref()
            .map(|u| u.chars().filter(char::is_ascii_digit).collect::<String>())
            .filter(|u| !u.is_empty());
        let text = display_text(hints);
        let slug = text.as_deref().map(slugify).filter(|s| !s.is_empty());
        let query = slug.as_ref().map(|s| encode(&s.replace('-', " ")));
        Self {
            sku,
            upc,
            slug,
            query,
        }
    }

    fn expand(&self, template: &str) -> Option<String> {
        let mut url = template.to_string();
        for (placeholder, value) in [
            ("{sku}", &self.sku),
            ("{upc}", &self.upc),
            ("{slug}", &self.slug),
            ("{query}", &self.query),
        ] {
            if url.contains(placeholder) {
                url = url.replace(placeholder, value.as_deref()?);
            }
        }
        Some(url)
    }
}

/// Expands `retailer_id`'s templates over `hints`.
///
/// Candidates come back highest confidence first, one per distinct URL.
/// Pure: no I/O.
#[must_use]
pub fn generate_candidates(retailer_id: &str, hints: &ProductHints) -> Vec<UrlCandidate> {
    let values = Values::from_hints(hints);
    let mut candidates: Vec<UrlCandidate> = Vec::new();
    for t in templates_for(retailer_id) {
        let Some(url) = values.expand(t.template) else {
            continue;
        };
        if candidates.iter().any(|c| c.url == url) {
            continue;
        }
        candidates.push(UrlCandidate {
            url,
            confidence: t.confidence,
            reason: t.reason,
            pattern_id: t.pattern_id.to_string(),
        });
    }
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    candidates
}

/// [`generate_candidates`] plus optional best-effort persistence.
#[derive(Clone, Default)]
pub struct CandidateGenerator {
    store: Option<Arc<dyn CandidateStore>>,
}

impl CandidateGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_store(store: Arc<dyn CandidateStore>) -> Self {
        Self { store: Some(store) }
    }

    /// Generates candidates and hands them to the store, if any. A store
    /// failure is logged; the candidates are returned regardless.
    pub async fn generate(&self, retailer_id: &str, hints: &ProductHints) -> Vec<UrlCandidate> {
        let candidates = generate_candidates(retailer_id, hints);
        tracing::debug!(
            retailer = retailer_id,
            product = %hints.product_id,
            count = candidates.len(),
            "generated url candidates"
        );

        if let Some(store) = &self.store {
            if !candidates.is_empty() {
                if let Err(e) = store
                    .save_candidates(&hints.product_id, retailer_id, &candidates)
                    .await
                {
                    tracing::warn!(
                        retailer = retailer_id,
                        product = %hints.product_id,
                        error = %e,
                        "failed to persist url candidates"
                    );
                }
            }
        }
        candidates
    }

    /// Records a validated URL in the store, if any. Failures are logged.
    pub async fn record_validated(&self, product_id: &str, retailer_id: &str, url: &str) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.record_validated(product_id, retailer_id, url).await {
            tracing::warn!(
                retailer = retailer_id,
                product = product_id,
                error = %e,
                "failed to persist validated url"
            );
        }
    }
}

impl std::fmt::Debug for CandidateGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateGenerator")
            .field("has_store", &self.store.is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "generator_test.rs"]
mod tests;
