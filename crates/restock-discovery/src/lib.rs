//! Product-page URL discovery: guesses retailer URLs from catalog hints and
//! checks which of them are live product pages.

pub mod checker;
pub mod error;
pub mod generator;
pub mod store;

pub use checker::{
    evaluate_html, is_search_url, CandidateCheck, CandidateChecker, CandidateEvaluation,
    ValidationPolicy,
};
pub use error::DiscoveryError;
pub use generator::{generate_candidates, slugify, templates_for, CandidateGenerator, UrlTemplate};
pub use store::{CandidateStore, InMemoryCandidateStore};
