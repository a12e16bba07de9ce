//! Decides whether a fetched candidate URL is a live single-product page.

use std::sync::LazyLock;

use regex::Regex;
use restock_core::{RetailerConfig, RetailerKind, UrlCandidate};
use scraper::{Html, Selector};
use restock_retailers::extract::extract_product_page;
use restock_retailers::html::{find_meta_content, visible_text};
use restock_retailers::jsonld;
use restock_retailers::{ClientSettings, RetailerError, Scaffold};

use crate::error::DiscoveryError;

/// Search and listing URL shapes across the supported retailers.
static SEARCH_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(?:[?&](?:searchterm|q|query|st|keyword|text)=",
        r"|/search(?:/|\?|$)|/s/|/s\?|searchpage\.jsp|/category/|/c/)",
    ))
    .expect("valid regex")
});
static PRODUCT_TILE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        ".product-tile, .product-card, .product-grid-tile, .plp-card, .sc-plp-cards-card, \
         .search-result-item",
    )
    .expect("valid selector")
});
static CTA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:add to (?:cart|bag|basket)|pre-?order now|buy now)\b")
        .expect("valid regex")
});

/// This many product tiles on one page make it a listing.
const LISTING_TILE_THRESHOLD: usize = 3;

/// Signals found on one fetched page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CandidateEvaluation {
    pub product_page: bool,
    pub price: bool,
    pub cta: bool,
    pub jsonld: bool,
}

/// Which signal combination proves a product page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationPolicy {
    /// Product page, price and a visible call to action.
    RequireCta,
    /// As [`ValidationPolicy::RequireCta`], or product page, price and
    /// structured product data. For sites that render the buy button
    /// client-side.
    AllowJsonLd,
}

impl ValidationPolicy {
    #[must_use]
    pub fn for_retailer(retailer_id: &str) -> Self {
        match retailer_id {
            "target" | "pokemoncenter" => ValidationPolicy::AllowJsonLd,
            _ => ValidationPolicy::RequireCta,
        }
    }
}

impl CandidateEvaluation {
    #[must_use]
    pub fn is_valid(&self, policy: ValidationPolicy) -> bool {
        let base = self.product_page && self.price;
        match policy {
            ValidationPolicy::RequireCta => base && self.cta,
            ValidationPolicy::AllowJsonLd => base && (self.cta || self.jsonld),
        }
    }
}

/// `true` when the URL itself looks like a search or listing page.
#[must_use]
pub fn is_search_url(url: &str) -> bool {
    SEARCH_URL_RE.is_match(url)
}

/// Scores a fetched page. Search and listing pages, by URL shape or by a
/// grid of product tiles, are never product pages.
#[must_use]
pub fn evaluate_html(url: &str, html: &str) -> CandidateEvaluation {
    let page = extract_product_page(html);
    let jsonld = jsonld::has_product(html);

    let doc = Html::parse_document(html);
    let tiles = doc.select(&PRODUCT_TILE).count();
    let listing = is_search_url(url) || tiles >= LISTING_TILE_THRESHOLD;
    let og_product = find_meta_content(&doc, "property", "og:type")
        .is_some_and(|t| t.eq_ignore_ascii_case("product"));
    let has_identity = jsonld || og_product || page.name.is_some();

    CandidateEvaluation {
        product_page: !listing && has_identity,
        price: page.price.is_some(),
        cta: CTA_RE.is_match(&visible_text(doc.root_element())),
        jsonld,
    }
}

/// Outcome of checking one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateCheck {
    pub candidate: UrlCandidate,
    /// Where the fetch ended up after redirects; the URL to persist.
    pub final_url: String,
    pub evaluation: CandidateEvaluation,
    /// Reachable and valid under the retailer's policy.
    pub live: bool,
}

/// Fetches candidates with browser headers and scraping-speed pacing.
pub struct CandidateChecker {
    scaffold: Scaffold,
    policy: ValidationPolicy,
}

impl CandidateChecker {
    /// Checker for `config`'s retailer. Requests always go out as scraping
    /// traffic, whatever the retailer's integration kind.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Client`] if the HTTP client cannot be built.
    pub fn new(
        config: &RetailerConfig,
        settings: &ClientSettings,
    ) -> Result<Self, DiscoveryError> {
        let mut config = config.clone();
        config.kind = RetailerKind::Scraping;
        let policy = ValidationPolicy::for_retailer(&config.id);
        let scaffold = Scaffold::new(config, settings).map_err(DiscoveryError::Client)?;
        Ok(Self { scaffold, policy })
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// Fetches and evaluates one candidate. A page that answers with an
    /// error status is simply not live. The page is scored under the URL it
    /// was finally served from, so a product URL that redirects to search
    /// results is not live either.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Fetch`] when the site could not be reached
    /// at all (network failure, rate limiting).
    pub async fn check(
        &self,
        candidate: &UrlCandidate,
    ) -> Result<CandidateCheck, DiscoveryError> {
        let retailer = self.scaffold.id();
        let page = match self.scaffold.fetch_page(&candidate.url).await {
            Ok(page) => page,
            Err(
                e @ (RetailerError::NotFound { .. }
                | RetailerError::Auth { .. }
                | RetailerError::Server {
                    status: Some(_), ..
                }),
            ) => {
                tracing::debug!(
                    retailer,
                    url = %candidate.url,
                    error = %e,
                    "candidate rejected by status"
                );
                return Ok(CandidateCheck {
                    candidate: candidate.clone(),
                    final_url: candidate.url.clone(),
                    evaluation: CandidateEvaluation::default(),
                    live: false,
                });
            }
            Err(source) => {
                return Err(DiscoveryError::Fetch {
                    url: candidate.url.clone(),
                    source,
                })
            }
        };

        let evaluation = evaluate_html(&page.url, &page.body);
        let live = evaluation.is_valid(self.policy);
        tracing::debug!(
            retailer,
            url = %candidate.url,
            final_url = %page.url,
            pattern = %candidate.pattern_id,
            ?evaluation,
            live,
            "candidate evaluated"
        );
        Ok(CandidateCheck {
            candidate: candidate.clone(),
            final_url: page.url,
            evaluation,
            live,
        })
    }

    /// Checks `candidates` in order and returns the first live one. Fetch
    /// errors are logged and the next candidate is tried.
    pub async fn first_live(&self, candidates: &[UrlCandidate]) -> Option<CandidateCheck> {
        for candidate in candidates {
            match self.check(candidate).await {
                Ok(check) if check.live => return Some(check),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        retailer = %self.scaffold.id(),
                        error = %e,
                        "candidate check failed"
                    );
                }
            }
        }
        None
    }
}

impl std::fmt::Debug for CandidateChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateChecker")
            .field("retailer", &self.scaffold.id())
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT_PAGE: &str = r#"<html><head>
        <title>Pokémon TCG: Scarlet &amp; Violet 151 Elite Trainer Box | GameStop</title>
        <meta property="og:type" content="product">
        </head><body>
        <h1>Pokémon TCG: Scarlet &amp; Violet 151 Elite Trainer Box</h1>
        <span class="actual-price">$49.99</span>
        <button class="add-to-cart">Add to Cart</button>
        </body></html>"#;

    #[test]
    fn product_page_with_price_and_cta_is_valid() {
        let eval = evaluate_html(
            "https://www.gamestop.com/toys-games/trading-cards/products/151-etb/20007182.html",
            PRODUCT_PAGE,
        );
        assert_eq!(
            eval,
            CandidateEvaluation {
                product_page: true,
                price: true,
                cta: true,
                jsonld: false,
            }
        );
        assert!(eval.is_valid(ValidationPolicy::RequireCta));
    }

    #[test]
    fn search_urls_are_never_product_pages() {
        for url in [
            "https://www.target.com/s?searchTerm=pokemon+151",
            "https://www.gamestop.com/search/?q=151",
            "https://www.pokemoncenter.com/search/etb",
            "https://www.samsclub.com/s/pokemon",
            "https://www.bestbuy.com/site/searchpage.jsp?st=pokemon",
        ] {
            let eval = evaluate_html(url, PRODUCT_PAGE);
            assert!(!eval.product_page, "{url}");
            assert!(eval.price);
            assert!(!eval.is_valid(ValidationPolicy::AllowJsonLd));
        }
    }

    #[test]
    fn tile_grid_is_a_listing() {
        let html = r#"<html><body>
            <div class="product-tile"><a href="/p/1">A</a> $9.99 Add to Cart</div>
            <div class="product-tile"><a href="/p/2">B</a> $19.99 Add to Cart</div>
            <div class="product-tile"><a href="/p/3">C</a> $29.99 Add to Cart</div>
            <h1>Results</h1>
            </body></html>"#;
        let eval = evaluate_html("https://www.gamestop.com/collectibles/trading-cards", html);
        assert!(!eval.product_page);
        assert!(eval.cta);
    }

    #[test]
    fn jsonld_policy_accepts_missing_cta() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@type":"Product","name":"Paldean Fates Tin",
             "offers":{"@type":"Offer","price":"24.99","availability":"https://schema.org/InStock"}}
            </script></head><body><div id="root"></div></body></html>"#;
        let eval = evaluate_html("https://www.target.com/p/paldean-fates-tin/-/A-88897904", html);
        assert!(eval.product_page && eval.price && eval.jsonld);
        assert!(!eval.cta);
        assert!(!eval.is_valid(ValidationPolicy::RequireCta));
        assert!(eval.is_valid(ValidationPolicy::AllowJsonLd));
    }

    #[test]
    fn policy_overrides_by_retailer() {
        assert_eq!(ValidationPolicy::for_retailer("target"), ValidationPolicy::AllowJsonLd);
        assert_eq!(
            ValidationPolicy::for_retailer("pokemoncenter"),
            ValidationPolicy::AllowJsonLd
        );
        assert_eq!(ValidationPolicy::for_retailer("gamestop"), ValidationPolicy::RequireCta);
    }

    #[test]
    fn page_without_price_is_not_valid() {
        let html = "<html><head><title>Coming Soon</title></head>\
                    <body><h1>Coming Soon</h1>Add to Cart</body></html>";
        let eval = evaluate_html("https://www.walmart.com/ip/coming-soon/123", html);
        assert!(eval.product_page);
        assert!(!eval.price);
        assert!(!eval.is_valid(ValidationPolicy::RequireCta));
    }
}
