//! Generic HTML adapter for retailers without an API.
//!
//! Each site is described by a [`ScrapingProfile`]: where search lives, what
//! a product link looks like, and the card strategies to try. Availability
//! text that is missing entirely is read as "in stock".

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use regex::Regex;
use restock_core::{AvailabilityRequest, AvailabilityResponse, RetailerConfig};
use serde_json::Value;

use crate::adapter::RetailerAdapter;
use crate::classify::{in_stock_from_text, is_pokemon_tcg};
use crate::error::RetailerError;
use crate::extract::{extract_cards, extract_product_page, CardStrategy, ProductCard};
use crate::html::canonical_url;
use crate::listing::Listing;
use crate::scaffold::{ClientSettings, Scaffold};

/// Search results enriched from their product pages, per search. Each page
/// fetch waits out the politeness interval.
const MAX_ENRICHED_RESULTS: usize = 3;

/// Site-specific knowledge for one scraped retailer.
#[derive(Debug, Clone)]
pub struct ScrapingProfile {
    /// Path and query appended to `base_url`; `{query}` is replaced with the
    /// URL-encoded search text.
    pub search_path: &'static str,
    /// Matches hrefs that point at a single product page.
    pub product_link: Regex,
    /// Tried in order; the first to yield cards wins.
    pub strategies: Vec<CardStrategy>,
}

impl ScrapingProfile {
    /// Profile for a known site, or a generic one keyed on `/product` links.
    #[must_use]
    pub fn for_retailer(retailer_id: &str) -> Self {
        match retailer_id {
            "gamestop" => Self::build(
                "/search/?q={query}",
                concat!(
                    r"/(?:toys-games|trading-cards|collectibles)/[^?#]*/\d+\.html",
                    r"|/products/[^?#]+\.html",
                ),
                &["product-tile", "product-grid-tile"],
            ),
            "samsclub" => Self::build(
                "/s/{query}",
                r"/(?:ip|p)/[^?#]+/(?:prod)?\d+",
                &["sc-plp-cards-card", "bst-product-card"],
            ),
            "pokemoncenter" => Self::build(
                "/search/{query}",
                r"/product/[0-9]{2,3}-[0-9]{5}",
                &["product-card", "product-tile"],
            ),
            _ => Self::build(
                "/search?q={query}",
                r"/(?:product|products|p|ip)/[^?#]+",
                &["product-card", "product-tile"],
            ),
        }
    }

    fn build(search_path: &'static str, link: &str, classes: &[&'static str]) -> Self {
        let product_link = Regex::new(link).expect("valid product link regex");
        let mut strategies: Vec<CardStrategy> = classes
            .iter()
            .copied()
            .map(CardStrategy::ContainerClass)
            .collect();
        strategies.push(CardStrategy::AnchorPattern(product_link.clone()));
        Self {
            search_path,
            product_link,
            strategies,
        }
    }
}

pub struct ScrapingAdapter {
    scaffold: Scaffold,
    profile: ScrapingProfile,
}

impl ScrapingAdapter {
    /// # Errors
    ///
    /// Returns [`RetailerError::Server`] if the HTTP client cannot be built.
    pub fn new(config: RetailerConfig, settings: &ClientSettings) -> Result<Self, RetailerError> {
        let profile = ScrapingProfile::for_retailer(&config.id);
        Self::with_profile(config, settings, profile)
    }

    /// # Errors
    ///
    /// Returns [`RetailerError::Server`] if the HTTP client cannot be built.
    pub fn with_profile(
        config: RetailerConfig,
        settings: &ClientSettings,
        profile: ScrapingProfile,
    ) -> Result<Self, RetailerError> {
        Ok(Self {
            scaffold: Scaffold::new(config, settings)?,
            profile,
        })
    }

    fn base(&self) -> &str {
        self.scaffold.config().base_url.trim_end_matches('/')
    }

    fn search_url(&self, query: &str) -> String {
        let encoded = utf8_percent_encode(query, NON_ALPHANUMERIC).to_string();
        format!(
            "{}{}",
            self.base(),
            self.profile.search_path.replace("{query}", &encoded)
        )
    }

    async fn search_cards(&self, query: &str) -> Result<Vec<ProductCard>, RetailerError> {
        let url = self.search_url(query);
        let html = self.scaffold.get_html(&url).await?;
        let cards = extract_cards(
            &html,
            &url,
            &self.profile.strategies,
            &self.profile.product_link,
        );
        tracing::debug!(
            retailer = %self.id(),
            query,
            count = cards.len(),
            "scraped search results"
        );
        Ok(cards)
    }

    /// Fills price and availability from the product page when the search
    /// card lacked them. A failed fetch keeps the card as it was.
    async fn enrich(&self, mut card: ProductCard) -> ProductCard {
        if card.price.is_some() && card.availability_text.is_some() {
            return card;
        }
        match self.scaffold.get_html(&card.url).await {
            Ok(html) => {
                let page = extract_product_page(&html);
                card.price = card.price.or(page.price);
                card.availability_text = card.availability_text.or(page.availability_text);
                card.image = card.image.or(page.image);
            }
            Err(e) => {
                tracing::warn!(
                    retailer = %self.id(),
                    url = %card.url,
                    error = %e,
                    "product page enrichment failed"
                );
            }
        }
        card
    }

    /// Reads a known product page directly.
    async fn from_product_page(&self, url: &str) -> Result<ProductCard, RetailerError> {
        let html = self.scaffold.get_html(url).await?;
        let page = extract_product_page(&html);
        let name = page
            .name
            .ok_or_else(|| RetailerError::server(self.id(), format!("no product data at {url}")))?;
        Ok(ProductCard {
            name,
            url: url.to_string(),
            price: page.price,
            availability_text: page.availability_text,
            image: page.image,
        })
    }

    fn card_to_listing(&self, card: ProductCard) -> Listing {
        let in_stock = in_stock_from_text(card.availability_text.as_deref());
        let mut extra = serde_json::Map::new();
        extra.insert(
            "source".to_string(),
            Value::String(self.config().kind.to_string()),
        );
        Listing {
            product_url: card.url,
            name: Some(card.name),
            in_stock,
            status_text: card.availability_text,
            price: card.price,
            image: card.image,
            extra,
            ..Listing::default()
        }
    }

    /// Search texts for a request, most specific first.
    fn queries(request: &AvailabilityRequest) -> Vec<&str> {
        [
            request.sku.as_deref(),
            request.upc.as_deref(),
            request.name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .collect()
    }
}

/// Words too common in catalog names to tell two products apart.
const GENERIC_WORDS: &[&str] = &["pokemon", "pokémon", "tcg", "the", "and", "of", "for"];

fn name_words(name: &str) -> Vec<String> {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 1 && !GENERIC_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Picks the search card that is the requested product. Only trading card
/// products qualify. A card whose URL or name carries the request's SKU wins;
/// otherwise the card sharing the most name words, provided it shares at
/// least half of them. Identifier-only requests take the first card.
fn best_match(cards: Vec<ProductCard>, request: &AvailabilityRequest) -> Option<ProductCard> {
    let cards: Vec<ProductCard> = cards
        .into_iter()
        .filter(|c| is_pokemon_tcg(&c.name, None))
        .collect();

    if let Some(sku) = request.sku.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let sku = sku.to_lowercase();
        if let Some(index) = cards.iter().position(|c| {
            c.url.to_lowercase().contains(&sku) || c.name.to_lowercase().contains(&sku)
        }) {
            return cards.into_iter().nth(index);
        }
    }

    let wanted = request.name.as_deref().map(name_words).unwrap_or_default();
    if wanted.is_empty() {
        return cards.into_iter().next();
    }

    let mut best: Option<(ProductCard, usize)> = None;
    for card in cards {
        let words = name_words(&card.name);
        let shared = wanted.iter().filter(|w| words.contains(*w)).count();
        if best.as_ref().is_none_or(|(_, top)| shared > *top) {
            best = Some((card, shared));
        }
    }
    best.filter(|(_, shared)| shared * 2 >= wanted.len())
        .map(|(card, _)| card)
}

#[async_trait]
impl RetailerAdapter for ScrapingAdapter {
    fn scaffold(&self) -> &Scaffold {
        &self.scaffold
    }

    async fn check_availability(
        &self,
        request: &AvailabilityRequest,
    ) -> Result<AvailabilityResponse, RetailerError> {
        // Config may map a catalog product straight to its page URL.
        let hinted = self.scaffold.url_hint(&request.product_id).or_else(|| {
            self.config()
                .mapped_id(&request.product_id)
                .filter(|m| m.starts_with("http"))
                .map(str::to_string)
        });

        if let Some(url) = hinted {
            match self.from_product_page(&url).await {
                Ok(card) => {
                    return Ok(self
                        .card_to_listing(card)
                        .into_response(self.id(), &request.product_id));
                }
                Err(e @ RetailerError::NotFound { .. }) => {
                    tracing::warn!(
                        retailer = %self.id(),
                        url,
                        error = %e,
                        "hinted product URL is gone, searching instead"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        // Search hits are never cached as URL hints: only a validated page
        // registered through `register_url_hint` skips the search.
        for query in Self::queries(request) {
            let cards = self.search_cards(query).await?;
            let Some(card) = best_match(cards, request) else {
                tracing::debug!(retailer = %self.id(), query, "no search result fits the request");
                continue;
            };
            let card = self.enrich(card).await;
            return Ok(self
                .card_to_listing(card)
                .into_response(self.id(), &request.product_id));
        }

        Err(RetailerError::not_found(
            self.id(),
            format!("no search result for product '{}'", request.product_id),
        ))
    }

    async fn search_products(
        &self,
        query: &str,
    ) -> Result<Vec<AvailabilityResponse>, RetailerError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let cards: Vec<ProductCard> = self
            .search_cards(query.trim())
            .await?
            .into_iter()
            .filter(|c| is_pokemon_tcg(&c.name, None))
            .collect();

        let mut responses = Vec::with_capacity(cards.len());
        for (index, card) in cards.into_iter().enumerate() {
            let card = if index < MAX_ENRICHED_RESULTS {
                self.enrich(card).await
            } else {
                card
            };
            let product_id = canonical_url(&card.url);
            responses.push(self.card_to_listing(card).into_response(self.id(), &product_id));
        }
        Ok(responses)
    }
}
