//! Environment-sourced configuration
//!
//! All runtime knobs come from environment variables with sensible
//! defaults, so the scrape entry point is invocable with no arguments.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `SCRAPER_BASE_URL` | `https://books.toscrape.com/` |
//! | `DATA_PATH` | `data/books.csv` |
//! | `LOG_LEVEL` | `info` |
//! | `BIND_ADDR` | `127.0.0.1:8000` |
//! | `ADMIN_TOKEN` | unset (crawl trigger disabled) |
//! | `SCRAPER_MAX_RETRIES` | `5` |
//! | `SCRAPER_BACKOFF_MS` | `500` |
//! | `SCRAPER_TIMEOUT_SECS` | `10` |
//! | `SCRAPER_DETAIL_DELAY_MS` | `200` |
//! | `SCRAPER_PAGE_DELAY_MS` | `500` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Retry behavior for a single fetch
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per URL, including the first
    pub max_attempts: u32,

    /// Delay before the first retry; doubles on each subsequent one
    pub backoff: Duration,

    /// Per-request timeout
    pub timeout: Duration,
}

/// Runtime settings for both the scraper and the API server
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root URL of the catalog site to crawl
    pub base_url: Url,

    /// Where the CSV snapshot is written and loaded from
    pub data_path: PathBuf,

    /// Base tracing filter level (`error`..`trace`)
    pub log_level: String,

    /// Listen address for the API server
    pub bind_addr: SocketAddr,

    /// Bearer token required by the crawl trigger endpoint
    pub admin_token: Option<String>,

    pub retry: RetryPolicy,

    /// Politeness delay between detail-page fetches
    pub detail_delay: Duration,

    /// Politeness delay between listing-page transitions
    pub page_delay: Duration,
}

impl Settings {
    /// Loads settings from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings from an arbitrary variable lookup
    ///
    /// Split out from [`Settings::from_env`] so tests can supply
    /// variables without mutating the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = parse_var(
            &get,
            "SCRAPER_BASE_URL",
            "https://books.toscrape.com/",
            |raw| {
                let url = Url::parse(raw).map_err(|e| e.to_string())?;
                match url.scheme() {
                    "http" | "https" => Ok(url),
                    other => Err(format!("unsupported scheme {other:?}")),
                }
            },
        )?;

        let data_path = PathBuf::from(get("DATA_PATH").unwrap_or_else(|| "data/books.csv".into()));

        let log_level = get("LOG_LEVEL").unwrap_or_else(|| "info".into());

        let bind_addr = parse_var(&get, "BIND_ADDR", "127.0.0.1:8000", |raw| {
            raw.parse::<SocketAddr>().map_err(|e| e.to_string())
        })?;

        let admin_token = get("ADMIN_TOKEN").filter(|t| !t.trim().is_empty());

        let max_attempts = parse_var(&get, "SCRAPER_MAX_RETRIES", "5", |raw| {
            match raw.parse::<u32>() {
                Ok(0) => Err("must be at least 1".into()),
                Ok(n) => Ok(n),
                Err(e) => Err(e.to_string()),
            }
        })?;

        let backoff_ms = parse_var(&get, "SCRAPER_BACKOFF_MS", "500", parse_u64)?;
        let timeout_secs = parse_var(&get, "SCRAPER_TIMEOUT_SECS", "10", parse_u64)?;
        let detail_delay_ms = parse_var(&get, "SCRAPER_DETAIL_DELAY_MS", "200", parse_u64)?;
        let page_delay_ms = parse_var(&get, "SCRAPER_PAGE_DELAY_MS", "500", parse_u64)?;

        Ok(Settings {
            base_url,
            data_path,
            log_level,
            bind_addr,
            admin_token,
            retry: RetryPolicy {
                max_attempts,
                backoff: Duration::from_millis(backoff_ms),
                timeout: Duration::from_secs(timeout_secs),
            },
            detail_delay: Duration::from_millis(detail_delay_ms),
            page_delay: Duration::from_millis(page_delay_ms),
        })
    }
}

fn parse_u64(raw: &str) -> Result<u64, String> {
    raw.parse::<u64>().map_err(|e| e.to_string())
}

fn parse_var<T>(
    get: impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: &str,
    parse: impl Fn(&str) -> Result<T, String>,
) -> Result<T, ConfigError> {
    let raw = get(var).unwrap_or_else(|| default.to_string());
    parse(raw.trim()).map_err(|reason| ConfigError::Invalid {
        var,
        value: raw,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = from_map(&[]).unwrap();
        assert_eq!(settings.base_url.as_str(), "https://books.toscrape.com/");
        assert_eq!(settings.data_path, PathBuf::from("data/books.csv"));
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.retry.backoff, Duration::from_millis(500));
        assert_eq!(settings.retry.timeout, Duration::from_secs(10));
        assert_eq!(settings.detail_delay, Duration::from_millis(200));
        assert_eq!(settings.page_delay, Duration::from_millis(500));
        assert!(settings.admin_token.is_none());
    }

    #[test]
    fn test_overrides() {
        let settings = from_map(&[
            ("SCRAPER_BASE_URL", "http://127.0.0.1:9000/catalog/"),
            ("DATA_PATH", "/tmp/out.csv"),
            ("SCRAPER_MAX_RETRIES", "2"),
            ("ADMIN_TOKEN", "s3cret"),
        ])
        .unwrap();
        assert_eq!(settings.base_url.as_str(), "http://127.0.0.1:9000/catalog/");
        assert_eq!(settings.data_path, PathBuf::from("/tmp/out.csv"));
        assert_eq!(settings.retry.max_attempts, 2);
        assert_eq!(settings.admin_token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_rejects_bad_scheme() {
        let err = from_map(&[("SCRAPER_BASE_URL", "ftp://example.com/")]).unwrap_err();
        assert!(err.to_string().contains("SCRAPER_BASE_URL"));
    }

    #[test]
    fn test_rejects_zero_retries() {
        assert!(from_map(&[("SCRAPER_MAX_RETRIES", "0")]).is_err());
    }

    #[test]
    fn test_rejects_unparsable_bind_addr() {
        assert!(from_map(&[("BIND_ADDR", "not-an-addr")]).is_err());
    }

    #[test]
    fn test_blank_admin_token_is_unset() {
        let settings = from_map(&[("ADMIN_TOKEN", "   ")]).unwrap();
        assert!(settings.admin_token.is_none());
    }
}
