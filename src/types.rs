//! Wire types for the page-fetch and extraction services.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for the page-fetch service's scrape endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    /// URL to fetch.
    pub url: String,
    /// Output formats to produce.
    pub formats: Vec<FetchFormat>,
    /// Strip navigation, headers and footers.
    pub only_main_content: bool,
}

/// Output format requested from the page-fetch service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FetchFormat {
    /// Page converted to markdown.
    Markdown,
    /// Screenshot URL.
    Screenshot,
}

/// Response from the scrape endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchResponse {
    /// Whether the service handled the request.
    pub success: bool,
    /// Scraped content.
    pub data: Option<FetchData>,
    /// Error message when `success` is false.
    pub error: Option<String>,
}

/// Scraped page content.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchData {
    /// Page as markdown.
    #[serde(default)]
    pub markdown: Option<String>,
    /// Screenshot URL.
    #[serde(default)]
    pub screenshot: Option<String>,
    /// Page metadata.
    #[serde(default)]
    pub metadata: FetchMetadata,
}

/// Metadata about the scraped page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchMetadata {
    /// Page title.
    pub title: Option<String>,
    /// HTTP status the target page returned.
    pub status_code: Option<u16>,
    /// URL after redirects.
    #[serde(rename = "sourceURL")]
    pub source_url: Option<String>,
}

/// Request body for the chat completions endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation.
    pub messages: Vec<ChatMessage>,
    /// Structured output constraint.
    pub response_format: ResponseFormat,
}

/// One chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// `system`, `user` or `assistant`.
    pub role: String,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// System message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    /// User message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Response format constraint.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Output must match a JSON Schema.
    JsonSchema {
        /// Schema definition.
        json_schema: JsonSchemaFormat,
    },
}

/// Named JSON Schema for structured output.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSchemaFormat {
    /// Schema name.
    pub name: String,
    /// Enforce the schema exactly.
    pub strict: bool,
    /// The schema.
    pub schema: Value,
}

/// Response from the chat completions endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// Model that served the request.
    #[serde(default)]
    pub model: Option<String>,
    /// Generated choices.
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    /// Token usage.
    pub usage: Option<ChatUsage>,
}

/// One generated choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    /// Generated message.
    pub message: ChatResponseMessage,
    /// Why generation stopped.
    pub finish_reason: Option<String>,
}

/// Assistant message as returned by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponseMessage {
    /// Generated text.
    pub content: Option<String>,
    /// Refusal text, set when the model declined.
    pub refusal: Option<String>,
}

/// Token usage reported by the extraction service.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ChatUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: u64,
    /// Tokens in the completion.
    pub completion_tokens: u64,
}
