//! Keyword heuristics shared by every adapter.

use restock_core::AvailabilityStatus;

/// Stock counts at or below this are reported as `low_stock`.
pub const LOW_STOCK_THRESHOLD: u32 = 5;

const TCG_POSITIVE: &[&str] = &[
    "tcg",
    "trading card",
    "booster",
    "elite trainer box",
    "etb",
    "collection box",
    "premium collection",
    "blister",
    "tin",
    "build & battle",
    "build and battle",
    "card game",
    "theme deck",
];

const TCG_NEGATIVE: &[&str] = &[
    "video game",
    "nintendo switch",
    "plush",
    "figure",
    "funko",
    "lego",
    "t-shirt",
    "hoodie",
    "backpack",
    "costume",
    "poster",
    "sleeves only",
];

const OUT_OF_STOCK_TEXT: &[&str] = &[
    "out of stock",
    "outofstock",
    "sold out",
    "soldout",
    "unavailable",
    "not available",
    "discontinued",
];

/// `true` when `name` (plus optional category or description text) reads like
/// a Pokémon trading card product.
///
/// Any negative keyword rejects the product even when a positive one matched.
#[must_use]
pub fn is_pokemon_tcg(name: &str, category: Option<&str>) -> bool {
    let haystack = match category {
        Some(c) => format!("{name} {c}").to_lowercase(),
        None => name.to_lowercase(),
    };
    let words: Vec<&str> = haystack
        .split(|c: char| !c.is_alphanumeric() && c != '&' && c != '-')
        .filter(|w| !w.is_empty())
        .collect();
    let normalized = words.join(" ");

    let has = |kw: &str| {
        if kw.contains(' ') {
            normalized.contains(kw)
        } else {
            words.iter().any(|w| *w == kw || w.strip_suffix('s') == Some(kw))
        }
    };

    if TCG_NEGATIVE.iter().any(|kw| has(kw)) {
        return false;
    }
    TCG_POSITIVE.iter().any(|kw| has(kw))
}

/// Maps raw stock signals to a status.
///
/// A definite "not in stock" always wins. Otherwise explicit status text
/// beats inference from `stock_level`.
#[must_use]
pub fn classify_availability(
    in_stock: bool,
    raw_status: Option<&str>,
    stock_level: Option<u32>,
) -> AvailabilityStatus {
    if !in_stock {
        return AvailabilityStatus::OutOfStock;
    }

    if let Some(text) = raw_status.map(str::to_lowercase) {
        if text.contains("pre-order") || text.contains("preorder") || text.contains("pre order")
        {
            return AvailabilityStatus::PreOrder;
        }
        if text.contains("discontinued") {
            return AvailabilityStatus::Discontinued;
        }
        let says_low = text
            .split(|c: char| !c.is_alphanumeric())
            .any(|w| w == "low");
        if says_low || text.contains("limited") {
            return AvailabilityStatus::LowStock;
        }
    }

    match stock_level {
        Some(0) => AvailabilityStatus::OutOfStock,
        Some(n) if n <= LOW_STOCK_THRESHOLD => AvailabilityStatus::LowStock,
        _ => AvailabilityStatus::InStock,
    }
}

/// Reads stock text with no boolean signal attached. Missing or
/// unrecognized text counts as in stock.
#[must_use]
pub fn in_stock_from_text(raw_status: Option<&str>) -> bool {
    let Some(text) = raw_status.map(str::to_lowercase) else {
        return true;
    };
    !OUT_OF_STOCK_TEXT.iter().any(|n| text.contains(n))
}
