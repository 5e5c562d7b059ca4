//! Page fetching: URL in, markdown plus page metadata out.

use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::types::{FetchFormat, FetchRequest, FetchResponse};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{debug, warn};

/// Default base URL of the page-fetch service.
pub const DEFAULT_FETCH_BASE_URL: &str = "https://api.firecrawl.dev";

/// A fetched page converted to text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedPage {
    /// URL that was requested.
    pub url: String,
    /// Page content as markdown.
    pub markdown: String,
    /// Screenshot of the page, when the service produced one.
    pub screenshot_url: Option<String>,
    /// Page title.
    pub title: Option<String>,
    /// HTTP status the target page returned.
    pub status_code: u16,
}

impl FetchedPage {
    /// True when the target page answered 200.
    pub fn is_ok(&self) -> bool {
        self.status_code == 200
    }
}

/// Something that can turn a URL into a [`FetchedPage`].
pub trait PageFetcher: Send + Sync {
    /// Fetch a page.
    ///
    /// A non-200 target status is not an error here; it is reported in
    /// [`FetchedPage::status_code`].
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedPage>> + Send;
}

/// Reject anything that is not an absolute http(s) URL.
pub fn validate_url(url: &str) -> Result<()> {
    let url = url.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') => Ok(()),
        _ => Err(Error::Validation {
            message: format!("not an http(s) URL: {url:?}"),
        }),
    }
}

/// Client for a Firecrawl-style `/v1/scrape` service.
///
/// # Example
///
/// ```rust,no_run
/// use genai_scraper::{PageClient, PageFetcher, Transport};
///
/// #[tokio::main]
/// async fn main() -> Result<(), genai_scraper::Error> {
///     let transport = Transport::builder("fc-key", "https://api.firecrawl.dev").build()?;
///     let page = PageClient::new(transport).fetch("https://example.com").await?;
///     println!("{} ({})", page.title.unwrap_or_default(), page.status_code);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct PageClient {
    transport: Transport,
    screenshot: bool,
}

impl PageClient {
    /// Create a client over a configured transport.
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            screenshot: true,
        }
    }

    /// Ask for a screenshot alongside the markdown.
    pub fn with_screenshot(mut self, screenshot: bool) -> Self {
        self.screenshot = screenshot;
        self
    }
}

impl PageFetcher for PageClient {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        validate_url(url)?;

        let mut formats = vec![FetchFormat::Markdown];
        if self.screenshot {
            formats.push(FetchFormat::Screenshot);
        }
        let request = FetchRequest {
            url: url.trim().to_string(),
            formats,
            only_main_content: true,
        };

        let response: FetchResponse = self.transport.post("/v1/scrape", &request).await?;
        if !response.success {
            return Err(Error::Api {
                status: 200,
                message: response
                    .error
                    .unwrap_or_else(|| "scrape was not successful".into()),
                detail: None,
            });
        }

        let data = response.data.ok_or_else(|| Error::Api {
            status: 200,
            message: "scrape response has no data".into(),
            detail: None,
        })?;

        let status_code = data.metadata.status_code.unwrap_or_else(|| {
            warn!(url, "Scrape response has no status code, assuming 200");
            200
        });
        debug!(
            url,
            status = status_code,
            source_url = ?data.metadata.source_url,
            "Fetched page"
        );

        Ok(FetchedPage {
            url: request.url,
            markdown: data.markdown.unwrap_or_default(),
            screenshot_url: data.screenshot,
            title: data.metadata.title,
            status_code,
        })
    }
}
