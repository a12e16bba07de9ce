use std::str::FromStr;

use super::*;

fn product_link() -> Regex {
    Regex::new(r"/product/").unwrap()
}

const SEARCH_HTML: &str = r#"
<ul class="grid">
  <li class="product-tile">
    <a href="/product/151-etb?ref=search"><img src="/img/etb.png" alt="151 ETB"></a>
    <a href="/product/151-etb" class="name">Scarlet &amp; Violet 151 Elite Trainer Box</a>
    <span class="price">$49.99</span>
    <span class="stock">Out of Stock</span>
  </li>
  <li class="product-tile">
    <a href="/product/paldea-booster"><span>Paldea Evolved Booster Pack</span></a>
    <span class="price">$4.99</span>
  </li>
  <li class="product-tile">
    <a href="/product/151-etb">Scarlet &amp; Violet 151 Elite Trainer Box</a>
  </li>
</ul>
"#;

#[test]
fn container_strategy_reads_name_price_and_stock() {
    let cards = extract_cards(
        SEARCH_HTML,
        "https://shop.test/search?q=151",
        &[CardStrategy::ContainerClass("product-tile")],
        &product_link(),
    );

    assert_eq!(cards.len(), 2, "duplicate tile should collapse: {cards:?}");
    let etb = &cards[0];
    assert_eq!(etb.name, "Scarlet & Violet 151 Elite Trainer Box");
    assert_eq!(etb.url, "https://shop.test/product/151-etb?ref=search");
    assert_eq!(etb.price, Some(Decimal::from_str("49.99").unwrap()));
    assert_eq!(etb.availability_text.as_deref(), Some("Out of Stock"));
    assert_eq!(etb.image.as_deref(), Some("https://shop.test/img/etb.png"));

    let booster = &cards[1];
    assert_eq!(booster.name, "Paldea Evolved Booster Pack");
    assert_eq!(booster.availability_text, None);
}

#[test]
fn trailing_page_text_stays_out_of_the_last_card() {
    let html = r#"<html><body>
    <main>
      <div class="product-tile">
        <a href="/product/obsidian-flames-etb">Obsidian Flames Elite Trainer Box</a>
        <span>$44.99</span> <span>Sold out</span>
      </div>
      <div class="product-tile">
        <a href="/product/surging-sparks-booster-bundle">Surging Sparks Booster Bundle</a>
        <span>$29.99</span>
      </div>
    </main>
    <aside class="facets">
      <h3>Availability</h3>
      <label><input type="checkbox"> In stock (12)</label>
      <label><input type="checkbox"> Pre-order (3)</label>
      <span>Under $10.00</span>
    </aside>
    </body></html>"#;
    let cards = extract_cards(
        html,
        "https://shop.test/search?q=pokemon",
        &[CardStrategy::ContainerClass("product-tile")],
        &product_link(),
    );

    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].availability_text.as_deref(), Some("Sold out"));
    let last = &cards[1];
    assert_eq!(last.name, "Surging Sparks Booster Bundle");
    assert_eq!(last.price, Some(Decimal::from_str("29.99").unwrap()));
    assert_eq!(last.availability_text, None);
}

#[test]
fn container_class_matches_one_token_of_many() {
    let html = r#"<div class="grid-cell product-card is-featured">
        <a href="/product/prismatic-evolutions-etb" title="Prismatic Evolutions ETB">
          <img data-src="/img/pe.png" alt="">
        </a>
        <p>$59.99 Coming soon</p>
    </div>"#;
    let cards = extract_cards(
        html,
        "https://shop.test/",
        &[CardStrategy::ContainerClass("product-card")],
        &product_link(),
    );

    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].name, "Prismatic Evolutions ETB");
    assert_eq!(cards[0].image.as_deref(), Some("https://shop.test/img/pe.png"));
    assert_eq!(cards[0].availability_text.as_deref(), Some("Coming soon"));
}

#[test]
fn falls_back_to_anchor_scan_when_no_container_matches() {
    let html = r#"<div class="new-layout">
        <a href="/product/crown-zenith-etb">Crown Zenith ETB</a>
        <a href="/help">Help</a>
        <a href="/product/crown-zenith-etb#reviews">Crown Zenith ETB</a>
    </div>"#;
    let strategies = [
        CardStrategy::ContainerClass("product-tile"),
        CardStrategy::AnchorPattern(product_link()),
    ];
    let cards = extract_cards(html, "https://shop.test/", &strategies, &product_link());
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].name, "Crown Zenith ETB");
    assert_eq!(cards[0].price, None);
}

#[test]
fn no_strategy_matching_yields_empty() {
    let strategies = [CardStrategy::ContainerClass("product-tile")];
    assert!(extract_cards("<html></html>", "https://shop.test/", &strategies, &product_link())
        .is_empty());
}

#[test]
fn product_page_prefers_jsonld() {
    let html = r#"<html><head>
        <meta property="og:title" content="Wrong Title">
        <script type="application/ld+json">{"@type":"Product","name":"Booster Bundle",
          "offers":{"price":"26.94","availability":"https://schema.org/InStock"}}</script>
        </head><body>$99.99 Sold out</body></html>"#;
    let page = extract_product_page(html);
    assert!(page.from_jsonld);
    assert_eq!(page.name.as_deref(), Some("Booster Bundle"));
    assert_eq!(page.price, Some(Decimal::from_str("26.94").unwrap()));
    assert_eq!(
        page.availability_text.as_deref(),
        Some("https://schema.org/InStock")
    );
}

#[test]
fn product_page_falls_back_to_meta_then_text() {
    let html = r#"<html><head>
        <meta property="og:title" content="Paldean Fates Tin">
        <meta property="product:price:amount" content="24.99">
        </head><body><button>Add to Cart</button> Pre-order now</body></html>"#;
    let page = extract_product_page(html);
    assert!(!page.from_jsonld);
    assert_eq!(page.name.as_deref(), Some("Paldean Fates Tin"));
    assert_eq!(page.price, Some(Decimal::from_str("24.99").unwrap()));
    assert_eq!(page.availability_text.as_deref(), Some("Pre-order"));
}

#[test]
fn product_page_without_signals_is_empty_not_an_error() {
    let page = extract_product_page("<html><body>nothing here</body></html>");
    assert_eq!(page.price, None);
    assert_eq!(page.availability_text, None);
}
