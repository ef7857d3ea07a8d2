//! Crawl orchestration
//!
//! Drives pagination sequentially: one listing page, then each of its
//! detail pages in order, then the next listing page. Records are
//! collected in memory, assigned 1-based ids once pagination
//! terminates, and written as one atomic snapshot.
//!
//! Failure policy:
//! - first listing page unfetchable or unparsable: fatal, nothing is
//!   written
//! - later listing page failure: pagination ends early, partial results
//!   are still saved
//! - single detail page failure (fetch or extraction): warn and skip,
//!   never aborts the run

use std::collections::HashSet;
use std::path::Path;

use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::config::Settings;
use crate::crawler::extract::{extract_book, ExtractError};
use crate::crawler::fetcher::{build_http_client, fetch_page, FetchError};
use crate::crawler::listing::{parse_listing, Listing, ListingError};
use crate::dataset::{self, BookRecord};
use crate::{BookdexError, Result};

/// Why one detail page produced no record
#[derive(Debug, Error)]
enum SkipReason {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

pub struct Crawler {
    settings: Settings,
    client: Client,
}

impl Crawler {
    pub fn new(settings: Settings) -> Result<Self> {
        let client = build_http_client(&settings)?;
        Ok(Self { settings, client })
    }

    /// Runs one full crawl from `start_url` and writes the snapshot to
    /// `output_path`. Returns the number of records written.
    pub async fn run(&self, start_url: &Url, output_path: &Path) -> Result<usize> {
        let mut records: Vec<BookRecord> = Vec::new();
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut skipped = 0usize;
        let mut page_url = start_url.clone();
        let mut page_index = 1usize;

        loop {
            tracing::info!("Fetching listing page {}: {}", page_index, page_url);

            let listing = match self.fetch_listing(&page_url).await {
                Ok(listing) => listing,
                Err(BookdexError::Fetch(source)) if page_index == 1 => {
                    return Err(BookdexError::FirstPageUnavailable {
                        url: page_url.to_string(),
                        source,
                    })
                }
                Err(e) if page_index == 1 => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        "Listing page {} failed ({}), ending pagination with partial results",
                        page_url,
                        e
                    );
                    break;
                }
            };

            for detail_url in &listing.detail_urls {
                if !seen_urls.insert(detail_url.to_string()) {
                    tracing::debug!("Skipping already-seen detail link {}", detail_url);
                    continue;
                }

                match self.collect_detail(detail_url).await {
                    Ok(record) => {
                        tracing::debug!("Collected `{}`", record.title);
                        records.push(record);
                    }
                    Err(reason) => {
                        skipped += 1;
                        tracing::warn!("Skipping {}: {}", detail_url, reason);
                    }
                }

                tokio::time::sleep(self.settings.detail_delay).await;
            }

            match listing.next_url {
                Some(next) => {
                    page_url = next;
                    page_index += 1;
                    tokio::time::sleep(self.settings.page_delay).await;
                }
                None => break,
            }
        }

        // Ids are ordinal positions in collection order, assigned only
        // now that the crawl is complete.
        for (index, record) in records.iter_mut().enumerate() {
            record.id = (index + 1) as u32;
        }

        let digest = dataset::write_snapshot(output_path, &records)?;
        tracing::info!(
            "Wrote {} records to {} ({} skipped, sha256 {})",
            records.len(),
            output_path.display(),
            skipped,
            digest
        );

        Ok(records.len())
    }

    /// Fetches and parses one listing page
    async fn fetch_listing(&self, page_url: &Url) -> Result<Listing> {
        let html = fetch_page(&self.client, page_url.as_str(), &self.settings.retry).await?;
        parse_listing(&html, page_url).map_err(ListingError::into)
    }

    /// Fetches and extracts one detail page
    async fn collect_detail(&self, detail_url: &Url) -> std::result::Result<BookRecord, SkipReason> {
        let html = fetch_page(&self.client, detail_url.as_str(), &self.settings.retry).await?;
        Ok(extract_book(&html, detail_url)?)
    }
}

/// Runs one crawl with the configured start URL and output path
///
/// Convenience wrapper over [`Crawler`] used by the CLI and the API's
/// trigger endpoint.
pub async fn scrape(settings: Settings) -> Result<usize> {
    let start_url = settings.base_url.clone();
    let output_path = settings.data_path.clone();
    Crawler::new(settings)?.run(&start_url, &output_path).await
}
