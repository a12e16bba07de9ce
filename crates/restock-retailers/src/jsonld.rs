//! schema.org `Product` extraction from `<script type="application/ld+json">`.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::price::price_from_json;

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]+type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("valid regex")
});

/// The fields of a JSON-LD `Product` the adapters care about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonLdProduct {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub url: Option<String>,
    pub image: Option<String>,
    pub price: Option<Decimal>,
    /// Raw `availability` value, e.g. `https://schema.org/InStock`.
    pub availability: Option<String>,
}

/// Every `Product` node on the page, including ones nested in `@graph`.
#[must_use]
pub fn extract_products(html: &str) -> Vec<JsonLdProduct> {
    let mut products = Vec::new();

    for cap in SCRIPT_RE.captures_iter(html) {
        let Some(json_text) = cap.get(1) else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<Value>(json_text.as_str().trim()) else {
            tracing::debug!("skipping unparseable JSON-LD block");
            continue;
        };

        let mut nodes: Vec<Value> = match value {
            Value::Array(items) => items,
            other => vec![other],
        };
        let graph: Vec<Value> = nodes
            .iter()
            .filter_map(|n| n.get("@graph").and_then(Value::as_array))
            .flatten()
            .cloned()
            .collect();
        nodes.extend(graph);

        products.extend(nodes.iter().filter(|n| is_type(n, "Product")).map(to_product));
    }

    products
}

#[must_use]
pub fn has_product(html: &str) -> bool {
    !extract_products(html).is_empty()
}

/// `@type` may be a string or an array of strings.
fn is_type(node: &Value, wanted: &str) -> bool {
    match node.get("@type") {
        Some(Value::String(s)) => s.eq_ignore_ascii_case(wanted),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|s| s.eq_ignore_ascii_case(wanted)),
        _ => false,
    }
}

fn to_product(node: &Value) -> JsonLdProduct {
    let text = |key: &str| {
        node.get(key).and_then(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    };
    let image = match node.get("image") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Array(items)) => items.iter().find_map(Value::as_str).map(str::to_string),
        Some(obj @ Value::Object(_)) => obj.get("url").and_then(Value::as_str).map(str::to_string),
        _ => None,
    };

    // `offers` may be one Offer, an AggregateOffer, or a list of either.
    let offers: Vec<&Value> = match node.get("offers") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(v @ Value::Object(_)) => vec![v],
        _ => Vec::new(),
    };
    let price = offers.iter().find_map(|o| {
        o.get("price")
            .or_else(|| o.get("lowPrice"))
            .and_then(price_from_json)
    });
    let availability = offers
        .iter()
        .find_map(|o| o.get("availability").and_then(Value::as_str))
        .map(str::to_string);

    JsonLdProduct {
        name: text("name"),
        sku: text("sku").or_else(|| text("productID")),
        url: text("url"),
        image,
        price,
        availability,
    }
}
