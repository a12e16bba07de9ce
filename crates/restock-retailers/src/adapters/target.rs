//! Target product summary API, keyed by TCIN. UPCs are resolved through the
//! keyword search endpoint, which matches barcodes exactly.

use async_trait::async_trait;
use restock_core::{AvailabilityRequest, AvailabilityResponse, RetailerConfig};
use serde::Deserialize;
use serde_json::Value;

use super::{api_key, json_string};
use crate::adapter::{first_found, lookup_keys, LookupKey, RetailerAdapter};
use crate::error::RetailerError;
use crate::listing::Listing;
use crate::price::price_from_json;
use crate::scaffold::{ClientSettings, Scaffold};

#[derive(Debug, Default, Deserialize)]
struct SummaryEnvelope {
    #[serde(default)]
    data: SummaryData,
}

#[derive(Debug, Default, Deserialize)]
struct SummaryData {
    #[serde(default)]
    product_summaries: Vec<TargetProduct>,
    #[serde(default)]
    search: Option<SearchBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchBlock {
    #[serde(default)]
    products: Vec<TargetProduct>,
}

#[derive(Debug, Deserialize)]
struct TargetProduct {
    tcin: Value,
    #[serde(default)]
    item: TargetItem,
    #[serde(default)]
    price: TargetPrice,
    #[serde(default)]
    fulfillment: TargetFulfillment,
}

#[derive(Debug, Default, Deserialize)]
struct TargetItem {
    #[serde(default)]
    product_description: Option<Description>,
    #[serde(default)]
    enrichment: Option<Enrichment>,
}

#[derive(Debug, Default, Deserialize)]
struct Description {
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Enrichment {
    #[serde(default)]
    buy_url: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TargetPrice {
    #[serde(default)]
    current_retail: Value,
    #[serde(default)]
    reg_retail: Value,
}

#[derive(Debug, Default, Deserialize)]
struct TargetFulfillment {
    #[serde(default)]
    shipping_options: Option<ShippingOptions>,
}

#[derive(Debug, Default, Deserialize)]
struct ShippingOptions {
    /// `IN_STOCK`, `LIMITED_STOCK`, `OUT_OF_STOCK`, `PRE_ORDER_SELLABLE`, ...
    #[serde(default)]
    availability_status: Option<String>,
    #[serde(default)]
    available_to_promise_quantity: Option<f64>,
}

impl TargetProduct {
    fn into_listing(self) -> Listing {
        let tcin = json_string(&self.tcin);
        let shipping = self.fulfillment.shipping_options.unwrap_or_default();
        let raw = shipping.availability_status.unwrap_or_default();
        let in_stock = !raw.is_empty() && !raw.contains("OUT_OF_STOCK") && raw != "UNAVAILABLE";
        let status_text = match raw.as_str() {
            "PRE_ORDER_SELLABLE" => Some("pre-order".to_string()),
            "LIMITED_STOCK" => Some("limited stock".to_string()),
            "DISCONTINUED" => Some("discontinued".to_string()),
            "" => None,
            other => Some(other.to_lowercase().replace('_', " ")),
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let stock_level = shipping
            .available_to_promise_quantity
            .filter(|q| q.is_finite() && *q >= 0.0)
            .map(|q| q as u32);

        let enrichment = self.item.enrichment.unwrap_or_default();
        let tcin_path = tcin.clone().unwrap_or_default();
        Listing {
            product_url: enrichment
                .buy_url
                .unwrap_or_else(|| format!("https://www.target.com/p/-/A-{tcin_path}")),
            name: self.item.product_description.and_then(|d| d.title),
            retailer_item_id: tcin,
            in_stock,
            status_text,
            stock_level,
            price: price_from_json(&self.price.current_retail),
            original_price: price_from_json(&self.price.reg_retail),
            image: enrichment.image_url,
            ..Listing::default()
        }
    }
}

pub struct TargetAdapter {
    scaffold: Scaffold,
    api_key: String,
}

impl TargetAdapter {
    /// # Errors
    ///
    /// Returns [`RetailerError::Auth`] without an API key, or
    /// [`RetailerError::Server`] if the HTTP client cannot be built.
    pub fn new(config: RetailerConfig, settings: &ClientSettings) -> Result<Self, RetailerError> {
        let api_key = api_key(&config)?;
        Ok(Self {
            scaffold: Scaffold::new(config, settings)?,
            api_key,
        })
    }

    fn base(&self) -> &str {
        self.scaffold.config().base_url.trim_end_matches('/')
    }

    async fn summary(&self, tcin: &str) -> Result<TargetProduct, RetailerError> {
        let url = format!("{}/product_summary", self.base());
        let envelope: SummaryEnvelope = self
            .scaffold
            .send_json(|client| {
                client
                    .get(&url)
                    .query(&[("key", self.api_key.as_str()), ("tcins", tcin)])
            })
            .await?;
        envelope
            .data
            .product_summaries
            .into_iter()
            .next()
            .ok_or_else(|| RetailerError::not_found(self.id(), format!("tcin {tcin}")))
    }

    async fn search(&self, keyword: &str) -> Result<Vec<TargetProduct>, RetailerError> {
        let url = format!("{}/plp_search", self.base());
        let envelope: SummaryEnvelope = self
            .scaffold
            .send_json(|client| {
                client
                    .get(&url)
                    .query(&[("key", self.api_key.as_str()), ("keyword", keyword)])
            })
            .await?;
        Ok(envelope
            .data
            .search
            .map(|s| s.products)
            .unwrap_or_default())
    }

    async fn lookup(&self, key: LookupKey<'_>) -> Result<TargetProduct, RetailerError> {
        match key {
            LookupKey::Sku(tcin) | LookupKey::Mapped(tcin) => self.summary(tcin).await,
            LookupKey::Upc(upc) => self
                .search(upc)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| RetailerError::not_found(self.id(), format!("upc {upc}"))),
        }
    }
}

#[async_trait]
impl RetailerAdapter for TargetAdapter {
    fn scaffold(&self) -> &Scaffold {
        &self.scaffold
    }

    async fn check_availability(
        &self,
        request: &AvailabilityRequest,
    ) -> Result<AvailabilityResponse, RetailerError> {
        let keys = lookup_keys(self.config(), request);
        let product = first_found(self.id(), request, &keys, move |key| self.lookup(key)).await?;
        Ok(product.into_listing().into_response(self.id(), &request.product_id))
    }

    async fn search_products(
        &self,
        query: &str,
    ) -> Result<Vec<AvailabilityResponse>, RetailerError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .search(query.trim())
            .await?
            .into_iter()
            .map(|p| {
                let listing = p.into_listing();
                let tcin = listing.retailer_item_id.clone().unwrap_or_default();
                listing.into_response(self.id(), &tcin)
            })
            .collect())
    }
}
