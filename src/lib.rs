//! LLM-powered web scraping.
//!
//! Fetch a page as markdown, ask a model to fill a record type built from
//! free-text field descriptors, and account for the tokens it cost.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use genai_scraper::{
//!     OpenAiExtractor, PageClient, PriceTable, ScrapeRequest, Scraper, Transport,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), genai_scraper::Error> {
//!     let fetcher = PageClient::new(
//!         Transport::builder("fc-key", "https://api.firecrawl.dev").build()?,
//!     );
//!     let extractor = OpenAiExtractor::new(
//!         Transport::builder("sk-key", "https://api.openai.com").build()?,
//!     );
//!     let scraper = Scraper::new(fetcher, extractor, Arc::new(PriceTable::default()));
//!
//!     let outcome = scraper
//!         .scrape(&ScrapeRequest {
//!             url: "https://example.com/rentals".into(),
//!             fields: vec!["Title".into(), "Price".into(), "Bedrooms".into()],
//!             model: "gpt-4o-mini".into(),
//!         })
//!         .await?;
//!
//!     for record in outcome.listings.records() {
//!         println!("{:?}", record.get("title"));
//!     }
//!     println!("cost: ${:.4}", outcome.usage.total_cost);
//!     Ok(())
//! }
//! ```

mod cache;
mod config;
mod error;
mod export;
mod extract;
mod fetch;
mod pricing;
mod schema;
mod scraper;
mod transport;
mod types;

pub use cache::{page_key, Cache, CacheEntry, MemoryCache, DEFAULT_TTL};
pub use config::{Config, DEFAULT_OUTPUT_DIR};
pub use error::{Error, Result};
pub use export::{file_name, timestamp, to_csv, to_json, ExportKind, Exporter};
pub use extract::{Extraction, Extractor, OpenAiExtractor, DEFAULT_EXTRACT_BASE_URL};
pub use fetch::{validate_url, FetchedPage, PageClient, PageFetcher, DEFAULT_FETCH_BASE_URL};
pub use pricing::{calculate_cost, PriceEntry, PriceTable, Usage, DEFAULT_MODEL};
pub use schema::{
    build_container_type, build_record_type, sanitize_field_name, Attribute, ContainerType,
    Listings, Record, RecordType, LISTINGS_KEY,
};
pub use scraper::{ScrapeOutcome, ScrapeRequest, Scraper};
pub use transport::{Transport, TransportBuilder, VERSION};
