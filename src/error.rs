//! Error types for the scraper.

use thiserror::Error;

/// Result type for scraper operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the scraper.
#[derive(Error, Debug)]
pub enum Error {
    /// The fetched page did not return 200. Reported, never returned by a scrape.
    #[error("Fetching {url} returned status {status}")]
    FetchFailed {
        /// URL that was fetched
        url: String,
        /// HTTP status reported for the target page
        status: u16,
    },

    /// The extraction service did not produce a value of the requested shape.
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    /// No price entry exists for the model.
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Two field descriptors sanitize to the same attribute name.
    #[error("Field {field:?} collides with {existing:?} (both map to attribute `{name}`)")]
    FieldCollision {
        /// The rejected field descriptor
        field: String,
        /// The earlier field descriptor that claimed the name
        existing: String,
        /// The sanitized attribute name
        name: String,
    },

    /// A remote service returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
        /// Additional detail
        detail: Option<String>,
    },

    /// Rate limit exceeded.
    #[error("Rate limited. Retry after {retry_after} seconds")]
    RateLimit {
        /// Seconds to wait before retrying
        retry_after: u64,
        /// Error message
        message: String,
    },

    /// Request validation failed.
    #[error("Validation error: {message}")]
    Validation {
        /// Error message
        message: String,
    },

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Network or HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV rendering error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Filesystem error while persisting results.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request timeout.
    #[error("Request timed out")]
    Timeout,
}

impl Error {
    /// Create an error from a non-success service response.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();

        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let text = response.text().await.unwrap_or_default();
        let (message, detail) = match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(body) => body.into_parts(),
            Err(_) if !text.trim().is_empty() => (text.trim().to_string(), None),
            Err(_) => ("Unknown error".into(), None),
        };

        match status {
            400 | 422 => Error::Validation { message },
            401 | 403 => Error::Authentication(message),
            429 => Error::RateLimit {
                retry_after,
                message,
            },
            _ => Error::Api {
                status,
                message,
                detail,
            },
        }
    }
}

/// Error bodies differ between services: OpenAI nests an object under
/// `error`, Firecrawl sends a plain string plus `details`.
#[derive(serde::Deserialize)]
struct ErrorResponse {
    error: Option<ErrorBody>,
    details: Option<serde_json::Value>,
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Message(String),
    Object {
        message: Option<String>,
        #[serde(rename = "type")]
        kind: Option<String>,
    },
}

impl ErrorResponse {
    fn into_parts(self) -> (String, Option<String>) {
        let details = self.details.map(|d| match d {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
        match self.error {
            Some(ErrorBody::Message(message)) => (message, details),
            Some(ErrorBody::Object { message, kind }) => (
                message.unwrap_or_else(|| "Unknown error".into()),
                kind.or(details),
            ),
            None => ("Unknown error".into(), details),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_error_body() {
        let body: ErrorResponse = serde_json::from_str(
            r#"{"error": {"message": "Invalid schema", "type": "invalid_request_error"}}"#,
        )
        .unwrap();
        let (message, detail) = body.into_parts();
        assert_eq!(message, "Invalid schema");
        assert_eq!(detail.as_deref(), Some("invalid_request_error"));
    }

    #[test]
    fn test_firecrawl_error_body() {
        let body: ErrorResponse =
            serde_json::from_str(r#"{"success": false, "error": "Payment required", "details": "no credits"}"#)
                .unwrap();
        let (message, detail) = body.into_parts();
        assert_eq!(message, "Payment required");
        assert_eq!(detail.as_deref(), Some("no credits"));
    }

    #[test]
    fn test_display() {
        let err = Error::FieldCollision {
            field: "Title".into(),
            existing: "title".into(),
            name: "title".into(),
        };
        assert!(err.to_string().contains("`title`"));
        assert_eq!(
            Error::UnknownModel("gpt-9".into()).to_string(),
            "Unknown model: gpt-9"
        );
    }
}
