//! Best Buy Products API.
//!
//! Lookups use the `products(attr=value)` filter syntax; an empty result
//! list is a miss. Store pickup availability is a second, optional call.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use restock_core::{AvailabilityRequest, AvailabilityResponse, RetailerConfig, StoreAvailability};
use serde::Deserialize;
use serde_json::Value;

use super::{api_key, json_string};
use crate::adapter::{first_found, lookup_keys, LookupKey, RetailerAdapter};
use crate::error::RetailerError;
use crate::listing::Listing;
use crate::price::price_from_json;
use crate::scaffold::{ClientSettings, Scaffold};

const SHOW_FIELDS: &str = "sku,upc,name,salePrice,regularPrice,onlineAvailability,\
onlineAvailabilityText,orderable,url,image,quantityLimit";
const SEARCH_PAGE_SIZE: &str = "25";

#[derive(Debug, Deserialize)]
struct ProductsPage {
    #[serde(default)]
    products: Vec<BestBuyProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BestBuyProduct {
    sku: Value,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    sale_price: Value,
    #[serde(default)]
    regular_price: Value,
    #[serde(default)]
    online_availability: bool,
    #[serde(default)]
    online_availability_text: Option<String>,
    /// `Available`, `PreOrder`, `SoldOut`, `ComingSoon`, ...
    #[serde(default)]
    orderable: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StoresPage {
    #[serde(default)]
    stores: Vec<BestBuyStore>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BestBuyStore {
    #[serde(rename = "storeID")]
    store_id: Value,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    postal_code: Option<String>,
    #[serde(default)]
    distance: Option<f64>,
}

impl BestBuyProduct {
    fn into_listing(self) -> Listing {
        let sku = json_string(&self.sku);
        let sku_path = sku.clone().unwrap_or_default();
        let status_text = match self.orderable.as_deref() {
            Some("PreOrder") => Some("pre-order".to_string()),
            Some("Discontinued") => Some("discontinued".to_string()),
            _ => self.online_availability_text,
        };
        let in_stock = self.online_availability
            || matches!(self.orderable.as_deref(), Some("PreOrder" | "Available"));
        Listing {
            product_url: self
                .url
                .unwrap_or_else(|| {
                    format!("https://www.bestbuy.com/site/{sku_path}.p?skuId={sku_path}")
                }),
            name: self.name,
            retailer_item_id: sku,
            in_stock,
            status_text,
            price: price_from_json(&self.sale_price),
            original_price: price_from_json(&self.regular_price),
            image: self.image,
            ..Listing::default()
        }
    }
}

pub struct BestBuyAdapter {
    scaffold: Scaffold,
    api_key: String,
}

impl BestBuyAdapter {
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

    async fn query_products(
        &self,
        filter: &str,
        page_size: &str,
    ) -> Result<Vec<BestBuyProduct>, RetailerError> {
        let url = format!("{}/products({filter})", self.base());
        let page: ProductsPage = self
            .scaffold
            .send_json(|client| {
                client.get(&url).query(&[
                    ("apiKey", self.api_key.as_str()),
                    ("format", "json"),
                    ("show", SHOW_FIELDS),
                    ("pageSize", page_size),
                ])
            })
            .await?;
        Ok(page.products)
    }

    async fn lookup(&self, key: LookupKey<'_>) -> Result<BestBuyProduct, RetailerError> {
        let value = utf8_percent_encode(key.value(), NON_ALPHANUMERIC).to_string();
        let filter = match key {
            LookupKey::Sku(_) | LookupKey::Mapped(_) => format!("sku={value}"),
            LookupKey::Upc(_) => format!("upc={value}"),
        };
        self.query_products(&filter, "1")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RetailerError::not_found(self.id(), filter))
    }

    /// Pickup availability near `zip`. Failures are logged and yield `None`;
    /// the online answer stands on its own.
    async fn store_availability(
        &self,
        sku: &str,
        zip: &str,
        radius_miles: Option<u32>,
    ) -> Option<Vec<StoreAvailability>> {
        let url = format!("{}/products/{sku}/stores.json", self.base());
        let result: Result<StoresPage, _> = self
            .scaffold
            .send_json(|client| {
                client
                    .get(&url)
                    .query(&[("postalCode", zip), ("apiKey", self.api_key.as_str())])
            })
            .await;

        match result {
            Ok(page) => Some(
                page.stores
                    .into_iter()
                    .filter(|s| match (radius_miles, s.distance) {
                        (Some(radius), Some(d)) => d <= f64::from(radius),
                        _ => true,
                    })
                    .map(|s| StoreAvailability {
                        store_id: json_string(&s.store_id).unwrap_or_default(),
                        name: s.name.unwrap_or_default(),
                        address: s.address,
                        city: s.city,
                        state: s.state,
                        postal_code: s.postal_code,
                        distance_miles: s.distance,
                        in_stock: true,
                    })
                    .collect(),
            ),
            Err(e) => {
                tracing::warn!(
                    retailer = %self.id(),
                    sku,
                    error = %e,
                    "store availability lookup failed"
                );
                None
            }
        }
    }
}

#[async_trait]
impl RetailerAdapter for BestBuyAdapter {
    fn scaffold(&self) -> &Scaffold {
        &self.scaffold
    }

    async fn check_availability(
        &self,
        request: &AvailabilityRequest,
    ) -> Result<AvailabilityResponse, RetailerError> {
        let keys = lookup_keys(self.config(), request);
        let product = first_found(self.id(), request, &keys, move |key| self.lookup(key)).await?;
        let mut listing = product.into_listing();

        if let (Some(zip), Some(sku)) = (
            request.zip_code.as_deref(),
            listing.retailer_item_id.clone(),
        ) {
            listing.store_locations = self
                .store_availability(&sku, zip, request.radius_miles)
                .await;
        }

        Ok(listing.into_response(self.id(), &request.product_id))
    }

    async fn search_products(
        &self,
        query: &str,
    ) -> Result<Vec<AvailabilityResponse>, RetailerError> {
        let terms: Vec<String> = query
            .split_whitespace()
            .map(|t| format!("search={}", utf8_percent_encode(t, NON_ALPHANUMERIC)))
            .collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let filter = format!("({})", terms.join("&"));
        let products = self.query_products(&filter, SEARCH_PAGE_SIZE).await?;

        Ok(products
            .into_iter()
            .map(|p| {
                let listing = p.into_listing();
                let item_id = listing.retailer_item_id.clone().unwrap_or_default();
                listing.into_response(self.id(), &item_id)
            })
            .collect())
    }
}
