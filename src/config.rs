//! Environment-driven settings.

use crate::cache::DEFAULT_TTL;
use crate::error::{Error, Result};
use crate::extract::DEFAULT_EXTRACT_BASE_URL;
use crate::fetch::DEFAULT_FETCH_BASE_URL;
use crate::pricing::PriceTable;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default directory for output files.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Scraper settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the extraction service.
    pub openai_api_key: String,
    /// Base URL of the extraction service.
    pub openai_base_url: String,
    /// API key for the page-fetch service.
    pub firecrawl_api_key: String,
    /// Base URL of the page-fetch service.
    pub firecrawl_base_url: String,
    /// Where output files are written.
    pub output_dir: PathBuf,
    /// Optional price table override file.
    pub prices_path: Option<PathBuf>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry attempts for transient failures.
    pub max_retries: u32,
    /// How long fetched pages stay cached.
    pub cache_ttl: Duration,
}

impl Config {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| Error::Config(format!("{key} is not set")))
        };

        Ok(Self {
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_EXTRACT_BASE_URL.to_string()),
            firecrawl_api_key: required("FIRECRAWL_API_KEY")?,
            firecrawl_base_url: get("FIRECRAWL_BASE_URL")
                .unwrap_or_else(|| DEFAULT_FETCH_BASE_URL.to_string()),
            output_dir: get("SCRAPER_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            prices_path: get("SCRAPER_PRICES").map(PathBuf::from),
            timeout: Duration::from_secs(
                parse(&get, "SCRAPER_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            max_retries: parse(&get, "SCRAPER_MAX_RETRIES")?.unwrap_or(DEFAULT_MAX_RETRIES),
            cache_ttl: parse(&get, "SCRAPER_CACHE_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TTL),
        })
    }

    /// Load the price table: the override file if configured, else the built-in one.
    pub fn price_table(&self) -> Result<PriceTable> {
        match &self.prices_path {
            Some(path) => PriceTable::load(path),
            None => Ok(PriceTable::default()),
        }
    }
}

fn parse<T, G>(get: &G, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| Error::Config(format!("{key} must be a number, got {v:?}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("FIRECRAWL_API_KEY", "fc-test"),
        ]))
        .unwrap();

        assert_eq!(config.openai_base_url, DEFAULT_EXTRACT_BASE_URL);
        assert_eq!(config.firecrawl_base_url, DEFAULT_FETCH_BASE_URL);
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert!(config.prices_path.is_none());
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.cache_ttl, DEFAULT_TTL);
        assert!(config.price_table().unwrap().get("gpt-4o-mini").is_some());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("FIRECRAWL_API_KEY", "fc-test"),
            ("OPENAI_BASE_URL", "http://localhost:1234"),
            ("SCRAPER_OUTPUT_DIR", "/tmp/scrapes"),
            ("SCRAPER_TIMEOUT_SECS", " 5 "),
            ("SCRAPER_MAX_RETRIES", "0"),
            ("SCRAPER_CACHE_TTL_SECS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.openai_base_url, "http://localhost:1234");
        assert_eq!(config.output_dir, PathBuf::from("/tmp/scrapes"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 0);
        assert!(config.cache_ttl.is_zero());
    }

    #[test]
    fn test_missing_or_invalid() {
        let err = Config::from_lookup(lookup(&[("FIRECRAWL_API_KEY", "fc")])).unwrap_err();
        assert!(matches!(err, Error::Config(m) if m.contains("OPENAI_API_KEY")));

        let err = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk"),
            ("FIRECRAWL_API_KEY", "  "),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(m) if m.contains("FIRECRAWL_API_KEY")));

        let err = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk"),
            ("FIRECRAWL_API_KEY", "fc"),
            ("SCRAPER_MAX_RETRIES", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(m) if m.contains("SCRAPER_MAX_RETRIES")));
    }
}
