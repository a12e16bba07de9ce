use restock_retailers::RetailerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("failed to build adapter for retailer '{retailer}': {source}")]
    Adapter {
        retailer: String,
        #[source]
        source: RetailerError,
    },
}
