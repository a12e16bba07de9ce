pub mod adapter;
pub mod adapters;
pub mod cart;
pub mod circuit_breaker;
pub mod classify;
pub mod error;
pub mod extract;
pub mod html;
pub mod jsonld;
pub mod listing;
pub mod metrics;
pub mod price;
pub mod rate_limit;
pub mod scaffold;

pub use adapter::RetailerAdapter;
pub use adapters::{
    adapter_for, BestBuyAdapter, ScrapingAdapter, ScrapingProfile, TargetAdapter, WalmartAdapter,
};
pub use cart::build_cart_url;
pub use circuit_breaker::{BreakerSnapshot, CallPermit, CircuitBreaker, CircuitBreakerConfig};
pub use classify::{classify_availability, is_pokemon_tcg};
pub use error::{RetailerError, RetailerErrorKind};
pub use metrics::MetricsRecorder;
pub use price::parse_price;
pub use rate_limit::{min_request_interval, RateLimiter};
pub use scaffold::{ClientSettings, FetchedPage, Scaffold};
