//! Walmart affiliate API. The consumer id travels in the `WM_CONSUMER.ID`
//! header.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{Client, RequestBuilder};
use restock_core::{AvailabilityRequest, AvailabilityResponse, RetailerConfig};
use serde::Deserialize;
use serde_json::Value;

use super::{api_key, json_string};
use crate::adapter::{first_found, lookup_keys, LookupKey, RetailerAdapter};
use crate::error::RetailerError;
use crate::listing::Listing;
use crate::price::price_from_json;
use crate::scaffold::{ClientSettings, Scaffold};

const CONSUMER_ID_HEADER: &str = "WM_CONSUMER.ID";

#[derive(Debug, Deserialize)]
struct ItemsPage {
    #[serde(default)]
    items: Vec<WalmartItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalmartItem {
    item_id: Value,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    sale_price: Value,
    #[serde(default)]
    msrp: Value,
    /// `Available`, `Limited Supply`, `Last few items`, `Not available`.
    #[serde(default)]
    stock: Option<String>,
    #[serde(default)]
    available_online: Option<bool>,
    #[serde(default)]
    product_url: Option<String>,
    #[serde(default)]
    large_image: Option<String>,
    #[serde(default)]
    preorder: Option<bool>,
}

impl WalmartItem {
    fn into_listing(self) -> Listing {
        let item_id = json_string(&self.item_id);
        let stock_says_available = self
            .stock
            .as_deref()
            .is_none_or(|s| !s.eq_ignore_ascii_case("not available"));
        let in_stock =
            self.available_online.unwrap_or(stock_says_available) && stock_says_available;

        let status_text = if self.preorder == Some(true) {
            Some("pre-order".to_string())
        } else {
            match self.stock.as_deref() {
                Some(s) if s.eq_ignore_ascii_case("last few items") => {
                    Some("low stock".to_string())
                }
                other => other.map(str::to_string),
            }
        };

        let item_path = item_id.clone().unwrap_or_default();
        Listing {
            product_url: self
                .product_url
                .unwrap_or_else(|| format!("https://www.walmart.com/ip/{item_path}")),
            name: self.name,
            retailer_item_id: item_id,
            in_stock,
            status_text,
            price: price_from_json(&self.sale_price),
            original_price: price_from_json(&self.msrp),
            image: self.large_image,
            ..Listing::default()
        }
    }
}

pub struct WalmartAdapter {
    scaffold: Scaffold,
    consumer_id: String,
}

impl WalmartAdapter {
    /// # Errors
    ///
    /// Returns [`RetailerError::Auth`] without an API key, or
    /// [`RetailerError::Server`] if the HTTP client cannot be built.
    pub fn new(config: RetailerConfig, settings: &ClientSettings) -> Result<Self, RetailerError> {
        let consumer_id = api_key(&config)?;
        Ok(Self {
            scaffold: Scaffold::new(config, settings)?,
            consumer_id,
        })
    }

    fn get(&self, client: &Client, url: &str) -> RequestBuilder {
        client
            .get(url)
            .header(CONSUMER_ID_HEADER, self.consumer_id.as_str())
            .query(&[("format", "json")])
    }

    fn base(&self) -> &str {
        self.scaffold.config().base_url.trim_end_matches('/')
    }

    async fn lookup(&self, key: LookupKey<'_>) -> Result<WalmartItem, RetailerError> {
        match key {
            LookupKey::Sku(id) | LookupKey::Mapped(id) => {
                let url = format!(
                    "{}/items/{}",
                    self.base(),
                    utf8_percent_encode(id, NON_ALPHANUMERIC)
                );
                self.scaffold.send_json(|client| self.get(client, &url)).await
            }
            LookupKey::Upc(upc) => {
                let url = format!("{}/items", self.base());
                let page: ItemsPage = self
                    .scaffold
                    .send_json(|client| self.get(client, &url).query(&[("upc", upc)]))
                    .await?;
                page.items
                    .into_iter()
                    .next()
                    .ok_or_else(|| RetailerError::not_found(self.id(), format!("upc {upc}")))
            }
        }
    }
}

#[async_trait]
impl RetailerAdapter for WalmartAdapter {
    fn scaffold(&self) -> &Scaffold {
        &self.scaffold
    }

    async fn check_availability(
        &self,
        request: &AvailabilityRequest,
    ) -> Result<AvailabilityResponse, RetailerError> {
        let keys = lookup_keys(self.config(), request);
        let item = first_found(self.id(), request, &keys, move |key| self.lookup(key)).await?;
        Ok(item.into_listing().into_response(self.id(), &request.product_id))
    }

    async fn search_products(
        &self,
        query: &str,
    ) -> Result<Vec<AvailabilityResponse>, RetailerError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/search", self.base());
        let page: ItemsPage = self
            .scaffold
            .send_json(|client| self.get(client, &url).query(&[("query", query.trim())]))
            .await?;

        Ok(page
            .items
            .into_iter()
            .map(|item| {
                let listing = item.into_listing();
                let item_id = listing.retailer_item_id.clone().unwrap_or_default();
                listing.into_response(self.id(), &item_id)
            })
            .collect())
    }
}
