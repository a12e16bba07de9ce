use std::sync::Arc;

use async_trait::async_trait;
use restock_core::{CandidateReason, ProductHints, UrlCandidate};

use super::*;
use crate::error::DiscoveryError;
use crate::store::InMemoryCandidateStore;

fn hints() -> ProductHints {
    ProductHints {
        product_id: "pkmn-151-etb".to_string(),
        name: Some("Pokémon TCG: Elite Trainer Box".to_string()),
        set_name: Some("Scarlet & Violet 151".to_string()),
        sku: Some("6548371".to_string()),
        upc: Some("0-820650-85351-7".to_string()),
    }
}

#[test]
fn slug_folds_accents_and_drops_punctuation() {
    assert_eq!(slugify("Pokémon TCG: Scarlet & Violet 151"), "pokemon-tcg-scarlet-violet-151");
    assert_eq!(slugify("  Trainer's   Toolkit  "), "trainers-toolkit");
    assert_eq!(slugify("Build/Battle"), "build-battle");
    assert_eq!(slugify("***"), "");
}

#[test]
fn sku_path_ranks_first_and_name_search_last() {
    let candidates = generate_candidates("bestbuy", &hints());
    assert_eq!(candidates.len(), 4);
    assert_eq!(
        candidates[0].url,
        "https://www.bestbuy.com/site/pokemon-tcg-elite-trainer-box-scarlet-violet-151/6548371.p?skuId=6548371"
    );
    assert_eq!(candidates[0].reason, CandidateReason::SkuPath);
    assert_eq!(candidates[0].pattern_id, "bestbuy.site_sku");
    assert_eq!(
        candidates[2].url,
        "https://www.bestbuy.com/site/searchpage.jsp?st=0820650853517"
    );
    let last = candidates.last().unwrap();
    assert_eq!(last.reason, CandidateReason::SearchSlug);
    assert!(last
        .url
        .ends_with("st=pokemon%20tcg%20elite%20trainer%20box%20scarlet%20violet%20151"));
    assert!(candidates
        .windows(2)
        .all(|w| w[0].confidence >= w[1].confidence));
}

#[test]
fn templates_need_every_placeholder() {
    let name_only = ProductHints {
        product_id: "p".to_string(),
        name: Some("Paldean Fates Booster Bundle".to_string()),
        ..ProductHints::default()
    };
    let candidates = generate_candidates("target", &name_only);
    assert_eq!(candidates.len(), 1);
    assert_eq!(
        candidates[0].url,
        "https://www.target.com/s?searchTerm=paldean%20fates%20booster%20bundle"
    );

    assert!(generate_candidates("target", &ProductHints::default()).is_empty());
}

#[test]
fn set_name_is_not_repeated() {
    let hints = ProductHints {
        product_id: "p".to_string(),
        name: Some("Scarlet & Violet 151 Elite Trainer Box".to_string()),
        set_name: Some("Scarlet & Violet 151".to_string()),
        sku: Some("699-17220".to_string()),
        upc: None,
    };
    let candidates = generate_candidates("pokemoncenter", &hints);
    assert_eq!(
        candidates[0].url,
        "https://www.pokemoncenter.com/product/699-17220/scarlet-violet-151-elite-trainer-box"
    );
    assert_eq!(candidates[1].reason, CandidateReason::SearchSku);
}

#[test]
fn slug_templates_are_skipped_without_a_name() {
    let hints = ProductHints {
        product_id: "p".to_string(),
        sku: Some("5116491234".to_string()),
        upc: Some("820650853517".to_string()),
        ..ProductHints::default()
    };
    let candidates = generate_candidates("walmart", &hints);
    let urls: Vec<&str> = candidates.iter().map(|c| c.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://www.walmart.com/ip/5116491234",
            "https://www.walmart.com/search?q=820650853517"
        ]
    );
}

#[test]
fn candidates_are_unique_by_url() {
    let hints = ProductHints {
        product_id: "p".to_string(),
        name: Some("ETB".to_string()),
        sku: Some("etb".to_string()),
        ..ProductHints::default()
    };
    let candidates = generate_candidates("pokemoncenter", &hints);
    let urls: Vec<&str> = candidates.iter().map(|c| c.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://www.pokemoncenter.com/product/etb/etb",
            "https://www.pokemoncenter.com/search/etb"
        ]
    );
    assert_eq!(candidates[1].reason, CandidateReason::SearchSku);
}

#[test]
fn unknown_retailer_has_no_templates() {
    assert!(generate_candidates("costco", &hints()).is_empty());
}

#[tokio::test]
async fn generator_persists_candidates() {
    let store = Arc::new(InMemoryCandidateStore::new());
    let generator = CandidateGenerator::with_store(Arc::clone(&store) as Arc<dyn CandidateStore>);

    let candidates = generator.generate("gamestop", &hints()).await;
    assert_eq!(candidates.len(), 3);
    let stored = store.load_candidates("pkmn-151-etb", "gamestop").await.unwrap();
    assert_eq!(stored, candidates);

    generator
        .record_validated("pkmn-151-etb", "gamestop", &candidates[0].url)
        .await;
    assert_eq!(
        store.validated_url("pkmn-151-etb", "gamestop").await.unwrap(),
        Some(candidates[0].url.clone())
    );
}

struct BrokenStore;

#[async_trait]
impl CandidateStore for BrokenStore {
    async fn save_candidates(
        &self,
        _product_id: &str,
        _retailer_id: &str,
        _candidates: &[UrlCandidate],
    ) -> Result<(), DiscoveryError> {
        Err(DiscoveryError::Store("disk full".to_string()))
    }

    async fn load_candidates(
        &self,
        _product_id: &str,
        _retailer_id: &str,
    ) -> Result<Vec<UrlCandidate>, DiscoveryError> {
        Err(DiscoveryError::Store("disk full".to_string()))
    }

    async fn record_validated(
        &self,
        _product_id: &str,
        _retailer_id: &str,
        _url: &str,
    ) -> Result<(), DiscoveryError> {
        Err(DiscoveryError::Store("disk full".to_string()))
    }

    async fn validated_url(
        &self,
        _product_id: &str,
        _retailer_id: &str,
    ) -> Result<Option<String>, DiscoveryError> {
        Err(DiscoveryError::Store("disk full".to_string()))
    }
}

#[tokio::test]
async fn store_failure_does_not_fail_generation() {
    let generator = CandidateGenerator::with_store(Arc::new(BrokenStore));
    let candidates = generator.generate("samsclub", &hints()).await;
    assert_eq!(candidates, generate_candidates("samsclub", &hints()));
    assert!(!candidates.is_empty());
    generator.record_validated("pkmn-151-etb", "samsclub", "https://x").await;
}
