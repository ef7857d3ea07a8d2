//! Detail-page record extraction
//!
//! Turns one detail page's HTML into a [`BookRecord`]. Title, price and
//! availability are required; rating, category and image URL are
//! extracted on a best-effort basis and left absent when the markup
//! does not carry them.

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

use crate::dataset::BookRecord;

/// A detail page that lacks a required field
#[derive(Debug, Error)]
#[error("Missing required field `{field}` on {url}")]
pub struct ExtractError {
    pub field: &'static str,
    pub url: String,
}

/// Closed vocabulary mapping the page's rank word to a star rating
const RATING_WORDS: [(&str, u8); 5] = [
    ("One", 1),
    ("Two", 2),
    ("Three", 3),
    ("Four", 4),
    ("Five", 5),
];

/// Maps a single rank token to its rating value, if recognized
pub fn rating_from_token(token: &str) -> Option<u8> {
    RATING_WORDS
        .iter()
        .find(|(word, _)| *word == token)
        .map(|(_, value)| *value)
}

/// Extracts one book record from a detail page
///
/// `detail_url` is both the crawl key (`book_url`) and the base for
/// resolving the thumbnail's relative source path. The record's `id` is
/// left at zero; the orchestrator assigns ids once the crawl completes.
pub fn extract_book(html: &str, detail_url: &Url) -> Result<BookRecord, ExtractError> {
    let document = Html::parse_document(html);

    let missing = |field: &'static str| ExtractError {
        field,
        url: detail_url.to_string(),
    };

    let title = first_text(&document, "div.product_main h1").ok_or_else(|| missing("title"))?;
    let price = first_text(&document, "p.price_color").ok_or_else(|| missing("price"))?;
    let availability =
        first_text(&document, "p.availability").ok_or_else(|| missing("availability"))?;

    Ok(BookRecord {
        id: 0,
        title,
        price,
        rating: extract_rating(&document),
        availability,
        category: extract_category(&document),
        image_url: extract_image_url(&document, detail_url),
        book_url: detail_url.to_string(),
    })
}

/// First matching element's text, whitespace-normalized; None when the
/// selector matches nothing or the text is empty
fn first_text(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document
        .select(&selector)
        .next()
        .map(collapse_text)
        .filter(|s| !s.is_empty())
}

fn collapse_text(element: ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rating from the indicator's class tokens, e.g.
/// `<p class="star-rating Three">` decodes to 3
fn extract_rating(document: &Html) -> Option<u8> {
    let selector = Selector::parse("p.star-rating").ok()?;
    let element = document.select(&selector).next()?;
    element.value().classes().find_map(rating_from_token)
}

/// Category is the third breadcrumb entry (Home / Books / <category>);
/// absent when the trail is shorter
fn extract_category(document: &Html) -> Option<String> {
    let selector = Selector::parse("ul.breadcrumb li a").ok()?;
    document
        .select(&selector)
        .nth(2)
        .map(collapse_text)
        .filter(|s| !s.is_empty())
}

fn extract_image_url(document: &Html, detail_url: &Url) -> Option<String> {
    let selector = Selector::parse("div.thumbnail img").ok()?;
    let src = document
        .select(&selector)
        .next()
        .and_then(|img| img.value().attr("src"))?;
    detail_url.join(src).ok().map(|u| u.to_string())
}
