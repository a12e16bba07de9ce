use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Process-wide settings for the aggregation layer.
///
/// Per-retailer settings (rate limits, timeouts, API keys) live in the
/// retailers file at `retailers_path`; this struct only carries the knobs
/// that apply to every retailer.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub retailers_path: PathBuf,
    /// User agent sent to official and affiliate APIs.
    pub api_user_agent: String,
    /// User agent sent when fetching retailer HTML.
    pub browser_user_agent: String,
    /// Consecutive failures before a retailer's breaker opens.
    pub breaker_failure_threshold: u32,
    /// Seconds an open breaker waits before allowing a half-open trial.
    pub breaker_cooldown_secs: u64,
    pub health_interval_secs: u64,
    /// Hard ceiling on a single adapter call, applied on top of the
    /// retailer's own configured timeout.
    pub adapter_timeout_ms: u64,
}
