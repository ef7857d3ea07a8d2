//! Bookdex: a catalog scraper and query API for an online bookstore
//!
//! This crate crawls a paginated book catalog, extracts one structured
//! record per title, and persists the result as a CSV snapshot. The same
//! binary can serve the snapshot over an HTTP API, including a trigger
//! endpoint that re-runs the crawl in the background.

pub mod api;
pub mod config;
pub mod crawler;
pub mod dataset;

use thiserror::Error;

/// Main error type for bookdex operations
#[derive(Debug, Error)]
pub enum BookdexError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Crawl aborted: first listing page {url} unavailable: {source}")]
    FirstPageUnavailable {
        url: String,
        #[source]
        source: crawler::FetchError,
    },

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Listing parse error: {0}")]
    Listing(#[from] crawler::ListingError),

    #[error("Extraction error: {0}")]
    Extract(#[from] crawler::ExtractError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] dataset::DatasetError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for bookdex operations
pub type Result<T> = std::result::Result<T, BookdexError>;

// Re-export commonly used types
pub use config::Settings;
pub use dataset::{BookRecord, Snapshot};
