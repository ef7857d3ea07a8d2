//! Listing-page parsing
//!
//! Extracts the detail-page links (in document order) and the
//! pagination "next" link from one catalog listing page. Individual
//! malformed entries are dropped silently; a page with no recognizable
//! catalog markup at all fails as malformed.

use scraper::{Html, Selector};
use thiserror::Error;
use url::Url;

/// Listing-page specific errors
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("No catalog markup found on listing page {url}")]
    MalformedPage { url: String },
}

/// Links extracted from one listing page
#[derive(Debug, Clone)]
pub struct Listing {
    /// Absolute detail-page URLs, in document order
    pub detail_urls: Vec<Url>,

    /// Absolute URL of the next listing page, if pagination continues
    pub next_url: Option<Url>,
}

/// Parses one listing page's HTML
///
/// Detail links come from the product anchors
/// (`article.product_pod h3 a`); the next page from `li.next > a`.
/// Relative hrefs are resolved against `base_url`, the URL the page
/// was fetched from.
pub fn parse_listing(html: &str, base_url: &Url) -> Result<Listing, ListingError> {
    let document = Html::parse_document(html);

    let mut detail_urls = Vec::new();
    if let Ok(selector) = Selector::parse("article.product_pod h3 a") {
        for anchor in document.select(&selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            match base_url.join(href) {
                Ok(url) => detail_urls.push(url),
                Err(e) => tracing::debug!("Dropping unresolvable product href {href:?}: {e}"),
            }
        }
    }

    if detail_urls.is_empty() {
        return Err(ListingError::MalformedPage {
            url: base_url.to_string(),
        });
    }

    let next_url = Selector::parse("li.next > a").ok().and_then(|selector| {
        document
            .select(&selector)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| base_url.join(href).ok())
    });

    Ok(Listing {
        detail_urls,
        next_url,
    })
}
