use chrono::Utc;
use restock_core::{AvailabilityResponse, StoreAvailability};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::cart::build_cart_url;
use crate::classify::classify_availability;

/// Retailer-neutral product facts an adapter has gathered, before they are
/// turned into an [`AvailabilityResponse`].
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub product_url: String,
    pub name: Option<String>,
    pub retailer_item_id: Option<String>,
    pub in_stock: bool,
    pub status_text: Option<String>,
    pub stock_level: Option<u32>,
    pub price: Option<Decimal>,
    pub original_price: Option<Decimal>,
    pub image: Option<String>,
    pub store_locations: Option<Vec<StoreAvailability>>,
    pub extra: Map<String, Value>,
}

impl Listing {
    /// Classifies availability and derives the cart link.
    ///
    /// An original price that is not above the sale price is dropped.
    #[must_use]
    pub fn into_response(self, retailer_id: &str, product_id: &str) -> AvailabilityResponse {
        let availability_status =
            classify_availability(self.in_stock, self.status_text.as_deref(), self.stock_level);
        let cart_url = build_cart_url(retailer_id, &self.product_url);
        let original_price = match (self.price, self.original_price) {
            (Some(p), Some(o)) if o > p => Some(o),
            _ => None,
        };

        let mut metadata = self.extra;
        if let Some(name) = self.name {
            metadata.insert("name".to_string(), Value::String(name));
        }
        if let Some(item_id) = self.retailer_item_id {
            metadata.insert("retailer_item_id".to_string(), Value::String(item_id));
        }
        if let Some(image) = self.image {
            metadata.insert("image_url".to_string(), Value::String(image));
        }
        if let Some(text) = self.status_text {
            metadata.insert("raw_status".to_string(), Value::String(text));
        }

        AvailabilityResponse {
            product_id: product_id.to_string(),
            retailer_id: retailer_id.to_string(),
            in_stock: availability_status.is_purchasable(),
            price: self.price,
            original_price,
            availability_status,
            product_url: self.product_url,
            cart_url,
            store_locations: self.store_locations,
            checked_at: Utc::now(),
            metadata,
        }
    }
}
