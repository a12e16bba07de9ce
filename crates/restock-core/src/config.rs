use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let env = parse_environment(&or_default("RESTOCK_ENV", "development"))?;
    let log_level = or_default("RESTOCK_LOG_LEVEL", "info");
    let retailers_path = PathBuf::from(or_default(
        "RESTOCK_RETAILERS_PATH",
        "./config/retailers.yaml",
    ));
    let api_user_agent = or_default("RESTOCK_USER_AGENT", "restock/0.1 (availability-monitor)");
    let browser_user_agent = or_default(
        "RESTOCK_BROWSER_USER_AGENT",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    );

    let breaker_failure_threshold = parse_u32("RESTOCK_BREAKER_FAILURE_THRESHOLD", "5")?;
    if breaker_failure_threshold == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "RESTOCK_BREAKER_FAILURE_THRESHOLD".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let breaker_cooldown_secs = parse_u64("RESTOCK_BREAKER_COOLDOWN_SECS", "60")?;
    let health_interval_secs = parse_u64("RESTOCK_HEALTH_INTERVAL_SECS", "300")?;
    if health_interval_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "RESTOCK_HEALTH_INTERVAL_SECS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let adapter_timeout_ms = parse_u64("RESTOCK_ADAPTER_TIMEOUT_MS", "15000")?;

    Ok(AppConfig {
        env,
        log_level,
        retailers_path,
        api_user_agent,
        browser_user_agent,
        breaker_failure_threshold,
        breaker_cooldown_secs,
        health_interval_secs,
        adapter_timeout_ms,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "RESTOCK_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
