use restock_retailers::RetailerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to fetch candidate {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: RetailerError,
    },

    #[error("failed to build candidate checker: {0}")]
    Client(#[source] RetailerError),

    #[error("candidate store error: {0}")]
    Store(String),
}
