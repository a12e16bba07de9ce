use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// How a retailer is integrated. Drives HTTP headers and the politeness
/// floor applied by the rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetailerKind {
    Api,
    Affiliate,
    Scraping,
}

impl RetailerKind {
    #[must_use]
    pub fn requires_api_key(self) -> bool {
        matches!(self, RetailerKind::Api | RetailerKind::Affiliate)
    }
}

impl std::fmt::Display for RetailerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetailerKind::Api => write!(f, "api"),
            RetailerKind::Affiliate => write!(f, "affiliate"),
            RetailerKind::Scraping => write!(f, "scraping"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub requests_per_hour: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// Base delay for exponential backoff: `backoff_ms * 2^attempt`.
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_ms: 500,
        }
    }
}

fn default_active() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// One retailer entry from `config/retailers.yaml`.
///
/// `active` is the only field the aggregator flips at runtime; everything
/// else is fixed at startup.
#[derive(Clone, Serialize, Deserialize)]
pub struct RetailerConfig {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub kind: RetailerKind,
    pub base_url: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Environment variable holding the API key, resolved at load time.
    #[serde(default, skip_serializing)]
    pub api_key_env: Option<String>,
    pub rate_limit: RateLimitConfig,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Catalog product id → retailer item id (SKU, TCIN, item id).
    #[serde(default)]
    pub product_ids: HashMap<String, String>,
}

impl RetailerConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Retailer item id mapped to a catalog product id, if configured.
    #[must_use]
    pub fn mapped_id(&self, product_id: &str) -> Option<&str> {
        self.product_ids.get(product_id).map(String::as_str)
    }
}

impl std::fmt::Debug for RetailerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetailerConfig")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("slug", &self.slug)
            .field("kind", &self.kind)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("api_key_env", &self.api_key_env)
            .field("rate_limit", &self.rate_limit)
            .field("timeout_ms", &self.timeout_ms)
            .field("retry", &self.retry)
            .field("active", &self.active)
            .field("product_ids", &self.product_ids.len())
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct RetailersFile {
    pub retailers: Vec<RetailerConfig>,
}

/// Load, resolve API keys for, and validate the retailers file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_retailers(path: &Path) -> Result<RetailersFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::RetailersFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_retailers(&content, |key| std::env::var(key))
}

/// Parse retailers YAML, resolving `api_key_env` references through `lookup`.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_retailers<F>(content: &str, lookup: F) -> Result<RetailersFile, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let mut file: RetailersFile = serde_yaml::from_str(content)?;

    for retailer in &mut file.retailers {
        if retailer.api_key.is_none() {
            if let Some(var) = &retailer.api_key_env {
                retailer.api_key = lookup(var).ok().filter(|k| !k.trim().is_empty());
            }
        }
    }

    validate_retailers(&file)?;
    Ok(file)
}

fn validate_retailers(file: &RetailersFile) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();
    let mut seen_slugs = HashSet::new();

    for retailer in &file.retailers {
        if retailer.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "retailer id must be non-empty".to_string(),
            ));
        }

        if !seen_ids.insert(retailer.id.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate retailer id: '{}'",
                retailer.id
            )));
        }

        if !seen_slugs.insert(retailer.slug.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate retailer slug: '{}' (from retailer '{}')",
                retailer.slug, retailer.id
            )));
        }

        if !(retailer.base_url.starts_with("https://") || retailer.base_url.starts_with("http://"))
        {
            return Err(ConfigError::Validation(format!(
                "retailer '{}' has non-http base_url '{}'",
                retailer.id, retailer.base_url
            )));
        }

        let limits = &retailer.rate_limit;
        if limits.requests_per_minute == 0 || limits.requests_per_hour == 0 {
            return Err(ConfigError::Validation(format!(
                "retailer '{}' must allow at least one request per minute and per hour",
                retailer.id
            )));
        }

        if retailer.timeout_ms == 0 {
            return Err(ConfigError::Validation(format!(
                "retailer '{}' has a zero timeout",
                retailer.id
            )));
        }

        if retailer.active && retailer.kind.requires_api_key() && retailer.api_key.is_none() {
            return Err(ConfigError::Validation(format!(
                "retailer '{}' is an active {} integration but has no API key",
                retailer.id, retailer.kind
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    const SAMPLE: &str = r"
retailers:
  - id: bestbuy
    name: Best Buy
    slug: best-buy
    kind: api
    base_url: https://api.bestbuy.com/v1
    api_key_env: BESTBUY_API_KEY
    rate_limit:
      requests_per_minute: 300
      requests_per_hour: 50000
    product_ids:
      pkmn-151-etb: '6548371'
  - id: gamestop
    name: GameStop
    slug: gamestop
    kind: scraping
    base_url: https://www.gamestop.com
    rate_limit:
      requests_per_minute: 20
      requests_per_hour: 600
    timeout_ms: 20000
    retry:
      max_retries: 1
      backoff_ms: 2000
";

    fn env_with_key() -> impl Fn(&str) -> Result<String, VarError> {
        let map: HashMap<&str, &str> = HashMap::from([("BESTBUY_API_KEY", "bb-secret")]);
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    fn no_env(_: &str) -> Result<String, VarError> {
        Err(VarError::NotPresent)
    }

    #[test]
    fn parses_sample_and_resolves_api_key_from_env() {
        let file = parse_retailers(SAMPLE, env_with_key()).unwrap();
        assert_eq!(file.retailers.len(), 2);

        let bestbuy = &file.retailers[0];
        assert_eq!(bestbuy.kind, RetailerKind::Api);
        assert_eq!(bestbuy.api_key.as_deref(), Some("bb-secret"));
        assert_eq!(bestbuy.timeout_ms, 10_000);
        assert_eq!(bestbuy.retry, RetryPolicy::default());
        assert!(bestbuy.active);
        assert_eq!(bestbuy.mapped_id("pkmn-151-etb"), Some("6548371"));
        assert_eq!(bestbuy.mapped_id("unknown"), None);

        let gamestop = &file.retailers[1];
        assert_eq!(gamestop.kind, RetailerKind::Scraping);
        assert_eq!(gamestop.timeout(), Duration::from_secs(20));
        assert_eq!(gamestop.retry.max_retries, 1);
    }

    #[test]
    fn active_api_retailer_without_key_fails_validation() {
        let err = parse_retailers(SAMPLE, no_env).unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(ref msg) if msg.contains("bestbuy")),
            "got: {err:?}"
        );
    }

    #[test]
    fn inactive_api_retailer_without_key_is_accepted() {
        let yaml = SAMPLE.replace(
            "    api_key_env: BESTBUY_API_KEY\n",
            "    api_key_env: BESTBUY_API_KEY\n    active: false\n",
        );
        let file = parse_retailers(&yaml, no_env).unwrap();
        assert!(!file.retailers[0].active);
        assert!(file.retailers[0].api_key.is_none());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let yaml = SAMPLE.replace("id: gamestop", "id: bestbuy");
        let err = parse_retailers(&yaml, env_with_key()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Validation(ref msg) if msg.contains("duplicate retailer id")
        ));
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let yaml = SAMPLE.replace("requests_per_minute: 20", "requests_per_minute: 0");
        let err = parse_retailers(&yaml, env_with_key()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = parse_retailers("retailers: [", no_env).unwrap_err();
        assert!(matches!(err, ConfigError::RetailersFileParse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_retailers(Path::new("/nonexistent/retailers.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::RetailersFileIo { .. }));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let file = parse_retailers(SAMPLE, env_with_key()).unwrap();
        let rendered = format!("{:?}", file.retailers[0]);
        assert!(!rendered.contains("bb-secret"));
        assert!(rendered.contains("[redacted]"));
    }
}
