use std::sync::LazyLock;

use regex::Regex;

static BESTBUY_SKU_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:/(\d{6,8})\.p\b|[?&]skuId=(\d{6,8}))").expect("valid regex")
});
static WALMART_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/ip/(?:[^/?#]+/)?(\d{5,12})").expect("valid regex"));

/// Direct add-to-cart link for a product page, where the retailer supports one.
///
/// Returns `None` for retailers without a deep-link template, and when no
/// item id can be read from `product_url` (the link would only open an
/// empty cart).
#[must_use]
pub fn build_cart_url(retailer_id: &str, product_url: &str) -> Option<String> {
    match retailer_id {
        "bestbuy" => {
            let caps = BESTBUY_SKU_RE.captures(product_url)?;
            let sku = caps.get(1).or_else(|| caps.get(2))?.as_str();
            Some(format!("https://api.bestbuy.com/click/-/{sku}/cart"))
        }
        "walmart" => {
            let id = WALMART_ITEM_RE.captures(product_url)?.get(1)?.as_str();
            Some(format!(
                "https://affil.walmart.com/cart/addToCart?items={id}"
            ))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bestbuy_uses_sku_from_either_url_shape() {
        assert_eq!(
            build_cart_url(
                "bestbuy",
                "https://www.bestbuy.com/site/pokemon-151-etb/6548371.p?skuId=6548371"
            )
            .as_deref(),
            Some("https://api.bestbuy.com/click/-/6548371/cart")
        );
        assert_eq!(
            build_cart_url("bestbuy", "https://www.bestbuy.com/site/x?skuId=6548372").as_deref(),
            Some("https://api.bestbuy.com/click/-/6548372/cart")
        );
    }

    #[test]
    fn walmart_reads_item_id_from_ip_path() {
        assert_eq!(
            build_cart_url(
                "walmart",
                "https://www.walmart.com/ip/Pokemon-151-Booster-Bundle/5116491234"
            )
            .as_deref(),
            Some("https://affil.walmart.com/cart/addToCart?items=5116491234")
        );
    }

    #[test]
    fn no_template_or_no_id_yields_none() {
        assert_eq!(
            build_cart_url("target", "https://www.target.com/p/-/A-88897904"),
            None
        );
        assert_eq!(
            build_cart_url("pokemoncenter", "https://www.pokemoncenter.com/product/290-85325"),
            None
        );
        assert_eq!(build_cart_url("walmart", "https://www.walmart.com/cart"), None);
        assert_eq!(build_cart_url("bestbuy", "https://www.bestbuy.com/"), None);
    }
}
