//! Core domain types and configuration for the restock aggregation layer.
//!
//! Everything here is transport-free: retailer adapters, the aggregator, and
//! URL discovery all speak in these types.

pub mod app_config;
pub mod availability;
pub mod candidates;
pub mod config;
pub mod error;
pub mod monitoring;
pub mod retailers;

pub use app_config::{AppConfig, Environment};
pub use availability::{
    AvailabilityRequest, AvailabilityResponse, AvailabilityStatus, StoreAvailability,
};
pub use candidates::{CandidateReason, ProductHints, UrlCandidate};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::ConfigError;
pub use monitoring::{CircuitState, RetailerHealthStatus, RetailerMetrics};
pub use retailers::{
    load_retailers, parse_retailers, RateLimitConfig, RetailerConfig, RetailerKind,
    RetailersFile, RetryPolicy,
};
