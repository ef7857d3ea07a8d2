//! Dataset snapshot handling
//!
//! The CSV snapshot is the contract between the scraper and the API
//! layer: columns `id,title,price,rating,availability,category,
//! image_url,book_url`, header row, UTF-8, empty cells for absent
//! optional fields. Each crawl replaces the snapshot wholesale; the
//! write goes through a temp file and a rename so readers never see a
//! partially written table.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Dataset-specific errors
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// One scraped catalog entry
///
/// Field order matches the snapshot column order. `rating`, `category`
/// and `image_url` may be absent; everything else is always populated
/// for a successfully extracted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    /// 1-based position in collection order, assigned once the crawl
    /// completes. Not stable across re-scrapes.
    pub id: u32,
    pub title: String,
    /// Raw currency-formatted text as scraped, e.g. `£53.74`
    pub price: String,
    /// Star rating 1..=5, decoded from the page's rank word
    pub rating: Option<u8>,
    pub availability: String,
    /// Third breadcrumb entry on the detail page
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub book_url: String,
}

impl BookRecord {
    /// Derived numeric price: leading `£` stripped, remainder parsed as
    /// a decimal. `None` when the raw text does not parse.
    pub fn price_num(&self) -> Option<f64> {
        parse_price(&self.price)
    }
}

/// Parses a raw currency string into its numeric value
pub fn parse_price(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let amount = trimmed.strip_prefix('£').unwrap_or(trimmed).trim();
    if amount.is_empty() {
        return None;
    }
    amount.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Writes a full set of records as one snapshot, replacing any prior
/// file at `path`. Returns the SHA-256 digest of the written bytes.
pub fn write_snapshot(path: &Path, records: &[BookRecord]) -> Result<String, DatasetError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| DatasetError::Io(e.into_error()))?;

    // Temp file in the same directory, then rename: readers observe
    // either the old or the new complete table, never a partial one.
    let tmp = path.with_extension("csv.tmp");
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, path)?;

    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// An immutable, fully loaded copy of the snapshot
#[derive(Debug, Default)]
pub struct Snapshot {
    pub books: Vec<BookRecord>,
}

impl Snapshot {
    /// Loads the snapshot from disk
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut books = Vec::new();
        for row in reader.deserialize() {
            books.push(row?);
        }
        Ok(Snapshot { books })
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Looks up a record by its assigned id
    pub fn get(&self, id: u32) -> Option<&BookRecord> {
        self.books.iter().find(|b| b.id == id)
    }

    /// Sorted, distinct category names
    pub fn categories(&self) -> Vec<String> {
        let mut cats: Vec<String> = self
            .books
            .iter()
            .filter_map(|b| b.category.clone())
            .collect();
        cats.sort();
        cats.dedup();
        cats
    }
}
