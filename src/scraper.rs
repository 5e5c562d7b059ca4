//! The scrape pipeline: fetch, persist raw text, build schema, extract,
//! price, persist results.

use crate::cache::{page_key, Cache};
use crate::error::{Error, Result};
use crate::export::{self, Exporter};
use crate::extract::Extractor;
use crate::fetch::{validate_url, FetchedPage, PageFetcher};
use crate::pricing::{calculate_cost, PriceTable, Usage};
use crate::schema::{build_container_type, build_record_type, Listings};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What to scrape.
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    /// Page to fetch.
    pub url: String,
    /// Field descriptors, in display order.
    pub fields: Vec<String>,
    /// Model used for extraction and pricing.
    pub model: String,
}

/// Everything a finished scrape produced.
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    /// `YYYYMMDD_HHMMSS` stamp shared by all output files.
    pub timestamp: String,
    /// The fetched page.
    pub page: FetchedPage,
    /// Extracted records.
    pub listings: Listings,
    /// Units consumed and their cost.
    pub usage: Usage,
    /// Files written, in write order.
    pub files: Vec<PathBuf>,
}

impl ScrapeOutcome {
    /// The fetch failure to report when the page did not return 200.
    ///
    /// Extraction still ran on whatever text came back.
    pub fn fetch_error(&self) -> Option<Error> {
        (!self.page.is_ok()).then(|| Error::FetchFailed {
            url: self.page.url.clone(),
            status: self.page.status_code,
        })
    }
}

/// Runs scrapes against a page fetcher and an extractor.
pub struct Scraper<F, E> {
    fetcher: F,
    extractor: E,
    prices: Arc<PriceTable>,
    cache: Option<Arc<dyn Cache>>,
    exporter: Option<Exporter>,
}

impl<F: PageFetcher, E: Extractor> Scraper<F, E> {
    /// Create a scraper that neither caches nor writes files.
    pub fn new(fetcher: F, extractor: E, prices: Arc<PriceTable>) -> Self {
        Self {
            fetcher,
            extractor,
            prices,
            cache: None,
            exporter: None,
        }
    }

    /// Reuse fetched pages from `cache`.
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Write raw markdown, JSON and CSV through `exporter`.
    pub fn with_exporter(mut self, exporter: Exporter) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// The price table in use.
    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    /// Run one scrape.
    ///
    /// Unknown models, invalid URLs and bad field names fail before any
    /// network call. A non-200 page is not fatal: it is logged, its raw
    /// text is persisted and extraction runs on it. See
    /// [`ScrapeOutcome::fetch_error`].
    pub async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeOutcome> {
        self.prices.require(&request.model)?;
        validate_url(&request.url)?;
        let container = build_container_type(build_record_type(request.fields.as_slice())?);

        let timestamp = export::timestamp();
        let mut files = Vec::new();

        let page = self.fetch(&request.url).await?;
        if let Some(exporter) = &self.exporter {
            files.push(exporter.save_markdown(&timestamp, &page.markdown)?);
        }

        if !page.is_ok() {
            warn!(
                url = %page.url,
                status = page.status_code,
                empty = page.markdown.trim().is_empty(),
                "Page did not return 200, extracting from what was fetched"
            );
        }

        let extraction = self
            .extractor
            .extract(&page.markdown, &container, &request.model)
            .await?;
        let usage = calculate_cost(
            &self.prices,
            extraction.input_tokens,
            extraction.output_tokens,
            &request.model,
        )?;

        if let Some(exporter) = &self.exporter {
            files.push(exporter.save_json(&timestamp, &extraction.listings)?);
            files.push(exporter.save_csv(&timestamp, &extraction.listings)?);
        }

        info!(
            url = %page.url,
            records = extraction.listings.len(),
            total_cost = usage.total_cost,
            "Scrape complete"
        );

        Ok(ScrapeOutcome {
            timestamp,
            page,
            listings: extraction.listings,
            usage,
            files,
        })
    }

    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let key = page_key(url);
        if let Some(cache) = &self.cache {
            if let Some(entry) = cache.get(&key) {
                match serde_json::from_value::<FetchedPage>(entry.value) {
                    Ok(page) => {
                        debug!(url, "Using cached page");
                        return Ok(page);
                    }
                    Err(e) => {
                        warn!(url, error = %e, "Dropping unreadable cache entry");
                        cache.delete(&key);
                    }
                }
            }
        }

        let page = self.fetcher.fetch(url).await?;

        if let Some(cache) = &self.cache {
            if page.is_ok() {
                cache.set(&key, serde_json::to_value(&page)?);
            }
        }
        Ok(page)
    }
}
