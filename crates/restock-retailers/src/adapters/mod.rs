//! Concrete retailer integrations and the factory that picks one per
//! config entry.

pub mod bestbuy;
pub mod scraping;
pub mod target;
pub mod walmart;

use std::sync::Arc;

use restock_core::{RetailerConfig, RetailerKind};
use serde_json::Value;

use crate::adapter::RetailerAdapter;
use crate::error::RetailerError;
use crate::scaffold::ClientSettings;

pub use bestbuy::BestBuyAdapter;
pub use scraping::{ScrapingAdapter, ScrapingProfile};
pub use target::TargetAdapter;
pub use walmart::WalmartAdapter;

/// Builds the adapter for `config`.
///
/// API and affiliate integrations are matched by retailer id; every
/// `scraping` entry gets the generic scraping adapter with its site profile.
/// Returns `Ok(None)` for an API retailer this crate has no integration for.
///
/// # Errors
///
/// Returns [`RetailerError`] if the adapter cannot be constructed, e.g. an
/// API retailer without a key.
pub fn adapter_for(
    config: RetailerConfig,
    settings: &ClientSettings,
) -> Result<Option<Arc<dyn RetailerAdapter>>, RetailerError> {
    let id = config.id.clone();
    let adapter: Arc<dyn RetailerAdapter> = match (config.kind, id.as_str()) {
        (RetailerKind::Scraping, _) => Arc::new(ScrapingAdapter::new(config, settings)?),
        (_, "bestbuy") => Arc::new(BestBuyAdapter::new(config, settings)?),
        (_, "walmart") => Arc::new(WalmartAdapter::new(config, settings)?),
        (_, "target") => Arc::new(TargetAdapter::new(config, settings)?),
        (kind, id) => {
            tracing::warn!(retailer = id, kind = %kind, "no adapter for retailer, skipping");
            return Ok(None);
        }
    };
    Ok(Some(adapter))
}

/// The configured API key.
fn api_key(config: &RetailerConfig) -> Result<String, RetailerError> {
    config
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| RetailerError::Auth {
            retailer: config.id.clone(),
            status: 401,
        })
}

/// Retailer ids arrive as JSON numbers or strings.
fn json_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
