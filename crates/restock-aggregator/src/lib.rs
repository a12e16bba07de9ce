//! Orchestration over the retailer adapters: concurrent fan-out, per-retailer
//! circuit breakers, operator controls, and background health probing.

pub mod aggregator;
pub mod error;
pub mod health;
pub mod registry;
pub mod telemetry;

pub use aggregator::{Aggregator, DEFAULT_ADAPTER_TIMEOUT};
pub use error::AggregatorError;
pub use health::HealthMonitor;
pub use registry::RetailerEntry;
