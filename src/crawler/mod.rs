//! Crawler module: fetching, parsing, extraction and orchestration
//!
//! The crawl is a single-pass batch pipeline run strictly sequentially:
//! - [`fetcher`] performs HTTP GETs with retry on transient failures
//! - [`listing`] pulls detail links and the next-page link from one
//!   listing page
//! - [`extract`] turns one detail page into a [`crate::BookRecord`]
//! - [`orchestrator`] drives pagination, assigns ids and persists the
//!   snapshot

mod extract;
mod fetcher;
mod listing;
mod orchestrator;

pub use extract::{extract_book, rating_from_token, ExtractError};
pub use fetcher::{build_http_client, fetch_page, FetchError, USER_AGENT};
pub use listing::{parse_listing, Listing, ListingError};
pub use orchestrator::{scrape, Crawler};
