use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single "is this product available?" question, fanned out to retailers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    /// Catalog product id. Echoed back on every response.
    pub product_id: String,
    pub sku: Option<String>,
    pub upc: Option<String>,
    /// Catalog display name; scraping adapters fall back to it as a search query.
    pub name: Option<String>,
    pub zip_code: Option<String>,
    /// Store search radius in miles. Only meaningful with `zip_code`.
    pub radius_miles: Option<u32>,
    /// Restrict the fan-out to these retailer ids.
    pub retailer_ids: Option<Vec<String>>,
}

impl AvailabilityRequest {
    #[must_use]
    pub fn new(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    #[must_use]
    pub fn with_upc(mut self, upc: impl Into<String>) -> Self {
        self.upc = Some(upc.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_location(mut self, zip_code: impl Into<String>, radius_miles: u32) -> Self {
        self.zip_code = Some(zip_code.into());
        self.radius_miles = Some(radius_miles);
        self
    }

    #[must_use]
    pub fn with_retailers<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.retailer_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    InStock,
    OutOfStock,
    LowStock,
    PreOrder,
    Discontinued,
}

impl AvailabilityStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AvailabilityStatus::InStock => "in_stock",
            AvailabilityStatus::OutOfStock => "out_of_stock",
            AvailabilityStatus::LowStock => "low_stock",
            AvailabilityStatus::PreOrder => "pre_order",
            AvailabilityStatus::Discontinued => "discontinued",
        }
    }

    /// Whether a shopper can place an order right now. Pre-orders count.
    #[must_use]
    pub fn is_purchasable(self) -> bool {
        matches!(
            self,
            AvailabilityStatus::InStock
                | AvailabilityStatus::LowStock
                | AvailabilityStatus::PreOrder
        )
    }
}

impl std::fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One store from a "buy online, pick up in store" lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreAvailability {
    pub store_id: String,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub distance_miles: Option<f64>,
    pub in_stock: bool,
}

/// Canonical availability answer from one retailer.
///
/// Built once per adapter call and handed to callers as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub product_id: String,
    pub retailer_id: String,
    pub in_stock: bool,
    pub price: Option<Decimal>,
    pub original_price: Option<Decimal>,
    pub availability_status: AvailabilityStatus,
    pub product_url: String,
    pub cart_url: Option<String>,
    pub store_locations: Option<Vec<StoreAvailability>>,
    pub checked_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl AvailabilityResponse {
    /// `true` when the retailer reported a discount off the original price.
    #[must_use]
    pub fn is_discounted(&self) -> bool {
        matches!((self.price, self.original_price), (Some(p), Some(o)) if p < o)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(price: Option<Decimal>, original: Option<Decimal>) -> AvailabilityResponse {
        AvailabilityResponse {
            product_id: "pkmn-151-etb".to_string(),
            retailer_id: "bestbuy".to_string(),
            in_stock: true,
            price,
            original_price: original,
            availability_status: AvailabilityStatus::InStock,
            product_url: "https://www.bestbuy.com/site/6548371.p".to_string(),
            cart_url: None,
            store_locations: None,
            checked_at: Utc::now(),
            metadata: serde_json::Map::new(),
        }
    }

    #[test]
    fn builder_sets_optional_fields() {
        let req = AvailabilityRequest::new("pkmn-151-etb")
            .with_sku("6548371")
            .with_upc("820650853517")
            .with_location("55401", 25)
            .with_retailers(["bestbuy", "target"]);
        assert_eq!(req.product_id, "pkmn-151-etb");
        assert_eq!(req.sku.as_deref(), Some("6548371"));
        assert_eq!(req.upc.as_deref(), Some("820650853517"));
        assert_eq!(req.zip_code.as_deref(), Some("55401"));
        assert_eq!(req.radius_miles, Some(25));
        assert_eq!(
            req.retailer_ids,
            Some(vec!["bestbuy".to_string(), "target".to_string()])
        );
    }

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_string(&AvailabilityStatus::PreOrder).unwrap();
        assert_eq!(json, "\"pre_order\"");
        assert_eq!(AvailabilityStatus::LowStock.to_string(), "low_stock");
    }

    #[test]
    fn only_orderable_statuses_are_purchasable() {
        assert!(AvailabilityStatus::PreOrder.is_purchasable());
        assert!(AvailabilityStatus::LowStock.is_purchasable());
        assert!(!AvailabilityStatus::OutOfStock.is_purchasable());
        assert!(!AvailabilityStatus::Discontinued.is_purchasable());
    }

    #[test]
    fn discount_requires_both_prices() {
        let sale = Decimal::new(4499, 2);
        let list = Decimal::new(4999, 2);
        assert!(response(Some(sale), Some(list)).is_discounted());
        assert!(!response(Some(list), Some(list)).is_discounted());
        assert!(!response(Some(sale), None).is_discounted());
    }
}
