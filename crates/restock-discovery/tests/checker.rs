//! Candidate checking against a `wiremock` site. Checks are paced like
//! scraping traffic, so each test stays at two requests.

use std::collections::HashMap;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use restock_core::{
    CandidateReason, RateLimitConfig, RetailerConfig, RetailerKind, RetryPolicy, UrlCandidate,
};
use restock_discovery::{CandidateChecker, DiscoveryError};
use restock_retailers::ClientSettings;

const PRODUCT_HTML: &str = r#"<html><head>
<title>Pokémon TCG: Paldean Fates Elite Trainer Box | GameStop</title>
<meta property="og:type" content="product">
</head><body>
<h1>Pokémon TCG: Paldean Fates Elite Trainer Box</h1>
<span class="actual-price">$59.99</span>
<button>Add to Cart</button>
</body></html>"#;

// Configured as an API retailer; checks still go out as page fetches.
fn config(base_url: &str) -> RetailerConfig {
    RetailerConfig {
        id: "gamestop".to_string(),
        name: "GameStop".to_string(),
        slug: "gamestop".to_string(),
        kind: RetailerKind::Api,
        base_url: base_url.to_string(),
        api_key: Some("unused".to_string()),
        api_key_env: None,
        rate_limit: RateLimitConfig {
            requests_per_minute: 60,
            requests_per_hour: 1_000,
        },
        timeout_ms: 5_000,
        retry: RetryPolicy {
            max_retries: 0,
            backoff_ms: 0,
        },
        active: true,
        product_ids: HashMap::new(),
    }
}

fn candidate(url: String, confidence: f64) -> UrlCandidate {
    UrlCandidate {
        url,
        confidence,
        reason: CandidateReason::SkuPath,
        pattern_id: "gamestop.trading_cards_sku".to_string(),
    }
}

#[tokio::test]
async fn first_live_skips_missing_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/paldean-fates-etb/20011157.html"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products/20011157.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PRODUCT_HTML))
        .expect(1)
        .mount(&server)
        .await;

    let checker =
        CandidateChecker::new(&config(&server.uri()), &ClientSettings::default()).unwrap();
    let candidates = vec![
        candidate(
            format!("{}/products/paldean-fates-etb/20011157.html", server.uri()),
            0.85,
        ),
        candidate(format!("{}/products/20011157.html", server.uri()), 0.8),
    ];

    let live = checker.first_live(&candidates).await.unwrap();
    assert_eq!(live.candidate.url, candidates[1].url);
    assert_eq!(live.final_url, candidates[1].url);
    assert!(live.evaluation.product_page);
    assert!(live.evaluation.price);
    assert!(live.evaluation.cta);
}

#[tokio::test]
async fn rate_limiting_is_a_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
        .mount(&server)
        .await;

    let checker =
        CandidateChecker::new(&config(&server.uri()), &ClientSettings::default()).unwrap();
    let url = format!("{}/products/20011157.html", server.uri());
    let err = checker.check(&candidate(url.clone(), 0.85)).await.unwrap_err();
    assert!(matches!(err, DiscoveryError::Fetch { url: ref u, .. } if *u == url));
}

#[tokio::test]
async fn forbidden_page_is_not_live() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let checker =
        CandidateChecker::new(&config(&server.uri()), &ClientSettings::default()).unwrap();
    let check = checker
        .check(&candidate(format!("{}/products/1.html", server.uri()), 0.5))
        .await
        .unwrap();
    assert!(!check.live);
    assert!(!check.evaluation.product_page);
}

#[tokio::test]
async fn redirect_to_search_results_is_not_live() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/toys-games/trading-cards/products/retired-etb/123.html"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/search/?q=pokemon"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><title>Search results</title></head><body>
            <h1>Search results</h1>
            <div class="result"><a href="/products/20011157.html">Paldean Fates ETB</a>
            <span>$59.99</span><button>Add to Cart</button></div>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    let checker =
        CandidateChecker::new(&config(&server.uri()), &ClientSettings::default()).unwrap();
    let url = format!(
        "{}/toys-games/trading-cards/products/retired-etb/123.html",
        server.uri()
    );
    let check = checker.check(&candidate(url, 0.85)).await.unwrap();
    assert_eq!(check.final_url, format!("{}/search/?q=pokemon", server.uri()));
    assert!(!check.evaluation.product_page);
    assert!(check.evaluation.price);
    assert!(check.evaluation.cta);
    assert!(!check.live);
}
