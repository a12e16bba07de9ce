use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn parse_environment_accepts_known_values() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "RESTOCK_ENV"));
}

#[test]
fn build_app_config_uses_defaults_with_empty_env() {
    let map = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.log_level, "info");
    assert_eq!(
        cfg.retailers_path.to_string_lossy(),
        "./config/retailers.yaml"
    );
    assert_eq!(cfg.api_user_agent, "restock/0.1 (availability-monitor)");
    assert!(cfg.browser_user_agent.starts_with("Mozilla/5.0"));
    assert_eq!(cfg.breaker_failure_threshold, 5);
    assert_eq!(cfg.breaker_cooldown_secs, 60);
    assert_eq!(cfg.health_interval_secs, 300);
    assert_eq!(cfg.adapter_timeout_ms, 15_000);
}

#[test]
fn build_app_config_reads_overrides() {
    let mut map = HashMap::new();
    map.insert("RESTOCK_ENV", "production");
    map.insert("RESTOCK_BREAKER_FAILURE_THRESHOLD", "3");
    map.insert("RESTOCK_BREAKER_COOLDOWN_SECS", "30");
    map.insert("RESTOCK_HEALTH_INTERVAL_SECS", "120");
    map.insert("RESTOCK_ADAPTER_TIMEOUT_MS", "8000");
    map.insert("RESTOCK_USER_AGENT", "custom-agent/2.0");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Production);
    assert_eq!(cfg.breaker_failure_threshold, 3);
    assert_eq!(cfg.breaker_cooldown_secs, 30);
    assert_eq!(cfg.health_interval_secs, 120);
    assert_eq!(cfg.adapter_timeout_ms, 8000);
    assert_eq!(cfg.api_user_agent, "custom-agent/2.0");
}

#[test]
fn build_app_config_rejects_non_numeric_threshold() {
    let mut map = HashMap::new();
    map.insert("RESTOCK_BREAKER_FAILURE_THRESHOLD", "lots");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(
            result,
            Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "RESTOCK_BREAKER_FAILURE_THRESHOLD"
        ),
        "expected InvalidEnvVar(RESTOCK_BREAKER_FAILURE_THRESHOLD), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_zero_threshold() {
    let mut map = HashMap::new();
    map.insert("RESTOCK_BREAKER_FAILURE_THRESHOLD", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::InvalidEnvVar { .. })));
}

#[test]
fn build_app_config_rejects_zero_health_interval() {
    let mut map = HashMap::new();
    map.insert("RESTOCK_HEALTH_INTERVAL_SECS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(
            result,
            Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "RESTOCK_HEALTH_INTERVAL_SECS"
        ),
        "got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_invalid_timeout() {
    let mut map = HashMap::new();
    map.insert("RESTOCK_ADAPTER_TIMEOUT_MS", "-5");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(
            result,
            Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "RESTOCK_ADAPTER_TIMEOUT_MS"
        ),
        "got: {result:?}"
    );
}
