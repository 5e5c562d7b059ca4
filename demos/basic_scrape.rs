//! Basic scrape example.
//!
//! Fetches a page, extracts a few fields and prints the records and cost,
//! then extracts a different field set from the cached copy of the page.
//!
//! Run with:
//! `OPENAI_API_KEY=sk-... FIRECRAWL_API_KEY=fc-... cargo run --example basic_scrape -- <url>`

use genai_scraper::{
    Config, MemoryCache, OpenAiExtractor, PageClient, ScrapeRequest, Scraper, Transport,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), genai_scraper::Error> {
    let config = Config::from_env()?;
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://news.ycombinator.com".into());

    let fetcher = PageClient::new(
        Transport::builder(config.firecrawl_api_key.clone(), config.firecrawl_base_url.clone())
            .build()?,
    );
    let extractor = OpenAiExtractor::new(
        Transport::builder(config.openai_api_key.clone(), config.openai_base_url.clone())
            .build()?,
    );
    let scraper = Scraper::new(fetcher, extractor, Arc::new(config.price_table()?))
        .with_cache(Arc::new(MemoryCache::new(8, config.cache_ttl)));
    let model = "gpt-4o-mini";
    if let Some(entry) = scraper.prices().get(model) {
        println!(
            "{model}: ${} in / ${} out per 1M tokens",
            entry.input_per_million, entry.output_per_million
        );
    }

    // Describe the fields in plain language
    let outcome = scraper
        .scrape(&ScrapeRequest {
            url: url.clone(),
            fields: vec!["Title".into(), "Points".into(), "Number of comments".into()],
            model: model.into(),
        })
        .await?;

    for record in outcome.listings.records() {
        println!("{:?}", record.iter().collect::<Vec<_>>());
    }

    println!(
        "Tokens used: {} input, {} output",
        outcome.usage.input_tokens, outcome.usage.output_tokens
    );
    println!("Cost: ${:.6}", outcome.usage.total_cost);

    // Same page, different fields: served from the cache
    let authors = scraper
        .scrape(&ScrapeRequest {
            url,
            fields: vec!["Author".into()],
            model: model.into(),
        })
        .await?;
    println!("{} authors, cost ${:.6}", authors.listings.len(), authors.usage.total_cost);

    Ok(())
}
