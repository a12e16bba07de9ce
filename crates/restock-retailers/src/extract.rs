//! Product data from retailer HTML.
//!
//! Search pages go through an ordered list of [`CardStrategy`] values; the
//! first strategy that yields any card wins. Product pages are read from
//! JSON-LD first, then meta/itemprop markers, then visible text.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};

use crate::html::{
    absolutize_url, anchors, canonical_url, find_itemprop, find_meta_content, page_title,
    visible_text,
};
use crate::jsonld;
use crate::price::find_price;

static IMAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("valid selector"));
static STOCK_PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(out of stock|sold out|in stock|pre-?order|coming soon|limited stock",
        r"|low stock|only \d+ left|unavailable|not available|discontinued)\b",
    ))
    .expect("valid regex")
});

/// One product tile from a search or listing page.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductCard {
    pub name: String,
    pub url: String,
    pub price: Option<Decimal>,
    pub availability_text: Option<String>,
    pub image: Option<String>,
}

/// A single way of finding product tiles in search-result markup.
#[derive(Debug, Clone)]
pub enum CardStrategy {
    /// Elements carrying this class each hold one product. Only text inside
    /// the element belongs to its card.
    ContainerClass(&'static str),
    /// Any anchor whose `href` matches the pattern is a product link.
    AnchorPattern(Regex),
}

impl CardStrategy {
    /// Runs this strategy. `link_pattern` identifies product links inside a
    /// container.
    #[must_use]
    pub fn extract(&self, html: &str, base_url: &str, link_pattern: &Regex) -> Vec<ProductCard> {
        let doc = Html::parse_document(html);
        self.extract_from(&doc, base_url, link_pattern)
    }

    fn extract_from(&self, doc: &Html, base_url: &str, link_pattern: &Regex) -> Vec<ProductCard> {
        match self {
            CardStrategy::ContainerClass(class) => {
                let Ok(selector) = Selector::parse(&format!(".{class}")) else {
                    tracing::warn!(class, "container class is not a valid selector");
                    return Vec::new();
                };
                doc.select(&selector)
                    .filter_map(|container| card_from_container(container, base_url, link_pattern))
                    .collect()
            }
            CardStrategy::AnchorPattern(pattern) => anchors(doc.root_element())
                .into_iter()
                .filter(|a| pattern.is_match(&a.href))
                .filter_map(|a| {
                    let url = absolutize_url(base_url, &a.href)?;
                    let name = Some(a.text).filter(|t| !t.is_empty()).or(a.label)?;
                    Some(ProductCard {
                        name,
                        url,
                        price: None,
                        availability_text: None,
                        image: None,
                    })
                })
                .collect(),
        }
    }
}

/// Runs `strategies` in order and returns the first non-empty result,
/// de-duplicated by canonical URL.
#[must_use]
pub fn extract_cards(
    html: &str,
    base_url: &str,
    strategies: &[CardStrategy],
    link_pattern: &Regex,
) -> Vec<ProductCard> {
    let doc = Html::parse_document(html);
    for (index, strategy) in strategies.iter().enumerate() {
        let cards = strategy.extract_from(&doc, base_url, link_pattern);
        if !cards.is_empty() {
            tracing::debug!(strategy = index, count = cards.len(), "card strategy matched");
            return dedupe_cards(cards);
        }
    }
    Vec::new()
}

/// Keeps the first card per canonical URL, filling gaps from later
/// duplicates.
#[must_use]
pub fn dedupe_cards(cards: Vec<ProductCard>) -> Vec<ProductCard> {
    let mut seen: Vec<(String, ProductCard)> = Vec::new();
    for card in cards {
        let key = canonical_url(&card.url);
        if let Some((_, existing)) = seen.iter_mut().find(|(k, _)| *k == key) {
            existing.price = existing.price.or(card.price);
            if existing.availability_text.is_none() {
                existing.availability_text = card.availability_text;
            }
            if existing.image.is_none() {
                existing.image = card.image;
            }
        } else {
            seen.push((key, card));
        }
    }
    seen.into_iter().map(|(_, card)| card).collect()
}

fn card_from_container(
    container: ElementRef<'_>,
    base_url: &str,
    link_pattern: &Regex,
) -> Option<ProductCard> {
    let links: Vec<_> = anchors(container)
        .into_iter()
        .filter(|a| link_pattern.is_match(&a.href))
        .collect();
    let link = links.first()?;
    let url = absolutize_url(base_url, &link.href)?;
    let image = container.select(&IMAGE).next();

    let name = links
        .iter()
        .map(|a| a.text.clone())
        .find(|t| !t.is_empty())
        .or_else(|| link.label.clone())
        .or_else(|| {
            let alt = image?.value().attr("alt")?.trim();
            (!alt.is_empty()).then(|| alt.to_string())
        })?;

    let text = visible_text(container);
    let price = if text.contains('$') {
        find_price(&text)
    } else {
        None
    };
    let image = image
        .and_then(|img| img.value().attr("src").or_else(|| img.value().attr("data-src")))
        .and_then(|src| absolutize_url(base_url, src));

    Some(ProductCard {
        name,
        url,
        price,
        availability_text: stock_phrase(&text),
        image,
    })
}

fn stock_phrase(text: &str) -> Option<String> {
    STOCK_PHRASE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// What a product page says about itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPage {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub availability_text: Option<String>,
    pub image: Option<String>,
    pub sku: Option<String>,
    pub from_jsonld: bool,
}

/// Reads a product page: JSON-LD, then meta/itemprop markers, then visible
/// text. Each field comes from the first layer that has it.
#[must_use]
pub fn extract_product_page(html: &str) -> ProductPage {
    let mut page = ProductPage::default();

    if let Some(product) = jsonld::extract_products(html).into_iter().next() {
        page.from_jsonld = true;
        page.name = product.name;
        page.price = product.price;
        page.availability_text = product.availability;
        page.image = product.image;
        page.sku = product.sku;
    }

    let doc = Html::parse_document(html);
    if page.name.is_none() {
        page.name = find_meta_content(&doc, "property", "og:title")
            .or_else(|| find_itemprop(&doc, "name"))
            .or_else(|| page_title(&doc));
    }
    if page.price.is_none() {
        page.price = find_meta_content(&doc, "property", "product:price:amount")
            .or_else(|| find_meta_content(&doc, "property", "og:price:amount"))
            .or_else(|| find_itemprop(&doc, "price"))
            .and_then(|raw| find_price(&raw));
    }
    if page.availability_text.is_none() {
        page.availability_text = find_meta_content(&doc, "property", "product:availability")
            .or_else(|| find_meta_content(&doc, "property", "og:availability"))
            .or_else(|| find_itemprop(&doc, "availability"));
    }
    if page.image.is_none() {
        page.image = find_meta_content(&doc, "property", "og:image");
    }

    if page.price.is_none() || page.availability_text.is_none() {
        let text = visible_text(doc.root_element());
        if page.price.is_none() && text.contains('$') {
            page.price = find_price(&text);
        }
        if page.availability_text.is_none() {
            page.availability_text = stock_phrase(&text);
        }
    }

    page
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
