//! Structured extraction through a chat-completions model.

use crate::error::{Error, Result};
use crate::schema::{ContainerType, Listings, CONTAINER_SCHEMA_NAME};
use crate::transport::Transport;
use crate::types::{ChatMessage, ChatRequest, ChatResponse, JsonSchemaFormat, ResponseFormat};
use std::future::Future;
use tracing::{debug, info};

/// Default base URL of the extraction service.
pub const DEFAULT_EXTRACT_BASE_URL: &str = "https://api.openai.com";

const SYSTEM_PROMPT: &str = "You extract structured data from web page text. \
Read the page content you are given and return every listing it contains, \
filling in only the requested fields. Use null for any field the page does \
not state. Do not invent values and do not add fields that were not requested.";

/// Listings extracted from a page plus the units the call consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Parsed container value.
    pub listings: Listings,
    /// Units spent on the prompt.
    pub input_tokens: u64,
    /// Units spent on the completion.
    pub output_tokens: u64,
}

/// Something that can fill a [`ContainerType`] from page text.
pub trait Extractor: Send + Sync {
    /// Extract records of the container's shape from `text` using `model`.
    ///
    /// Values that do not conform to the container fail with
    /// [`Error::ExtractionFailed`].
    fn extract(
        &self,
        text: &str,
        container: &ContainerType,
        model: &str,
    ) -> impl Future<Output = Result<Extraction>> + Send;
}

/// Build the chat request for one extraction.
pub fn build_request(text: &str, container: &ContainerType, model: &str) -> ChatRequest {
    let fields: Vec<&str> = container
        .record_type()
        .attributes()
        .iter()
        .map(|a| a.label.as_str())
        .collect();

    let user = format!(
        "Extract the following fields: {}\n\nPage content:\n\n{}",
        if fields.is_empty() {
            "(none)".to_string()
        } else {
            fields.join(", ")
        },
        text
    );

    ChatRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)],
        response_format: ResponseFormat::JsonSchema {
            json_schema: JsonSchemaFormat {
                name: CONTAINER_SCHEMA_NAME.to_string(),
                strict: true,
                schema: container.json_schema(),
            },
        },
    }
}

/// Turn a chat response into an [`Extraction`].
pub fn parse_response(response: ChatResponse, container: &ContainerType) -> Result<Extraction> {
    let usage = response
        .usage
        .ok_or_else(|| Error::ExtractionFailed("response has no usage information".into()))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::ExtractionFailed("response has no choices".into()))?;

    if let Some(refusal) = choice.message.refusal {
        return Err(Error::ExtractionFailed(format!("model refused: {refusal}")));
    }
    if choice.finish_reason.as_deref() == Some("length") {
        return Err(Error::ExtractionFailed(
            "output was truncated at the token limit".into(),
        ));
    }

    let content = choice
        .message
        .content
        .ok_or_else(|| Error::ExtractionFailed("response has no content".into()))?;
    let listings = container.parse_str(&content)?;

    Ok(Extraction {
        listings,
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
    })
}

/// Client for an OpenAI-compatible `/v1/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiExtractor {
    transport: Transport,
}

impl OpenAiExtractor {
    /// Create an extractor over a configured transport.
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }
}

impl Extractor for OpenAiExtractor {
    async fn extract(
        &self,
        text: &str,
        container: &ContainerType,
        model: &str,
    ) -> Result<Extraction> {
        let request = build_request(text, container, model);
        debug!(
            model,
            fields = container.record_type().len(),
            chars = text.len(),
            "Requesting extraction"
        );

        let response: ChatResponse = self
            .transport
            .post("/v1/chat/completions", &request)
            .await?;
        let served_by = response.model.clone();
        let extraction = parse_response(response, container)?;

        info!(
            model,
            served_by = served_by.as_deref().unwrap_or(model),
            records = extraction.listings.len(),
            input_tokens = extraction.input_tokens,
            output_tokens = extraction.output_tokens,
            "Extraction complete"
        );
        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{build_container_type, build_record_type};
    use serde_json::json;

    fn container() -> ContainerType {
        build_container_type(build_record_type(&["Title", "Price"]).unwrap())
    }

    fn response(body: serde_json::Value) -> ChatResponse {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_build_request() {
        let request = build_request("# Apartments", &container(), "gpt-4o-mini");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["messages"][0]["role"], "system");
        let user = value["messages"][1]["content"].as_str().unwrap();
        assert!(user.contains("Title, Price"));
        assert!(user.ends_with("# Apartments"));

        let format = &value["response_format"];
        assert_eq!(format["type"], "json_schema");
        assert_eq!(format["json_schema"]["name"], CONTAINER_SCHEMA_NAME);
        assert_eq!(format["json_schema"]["strict"], true);
        assert_eq!(
            format["json_schema"]["schema"]["properties"]["listings"]["items"]["required"],
            json!(["title", "price"])
        );
    }

    #[test]
    fn test_parse_response() {
        let extraction = parse_response(
            response(json!({
                "choices": [{
                    "message": {"content": r#"{"listings": [{"title": "Loft", "price": null}]}"#, "refusal": null},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 1200, "completion_tokens": 40, "total_tokens": 1240}
            })),
            &container(),
        )
        .unwrap();

        assert_eq!(extraction.input_tokens, 1200);
        assert_eq!(extraction.output_tokens, 40);
        assert_eq!(extraction.listings.records()[0].get("title"), Some("Loft"));
    }

    #[test]
    fn test_parse_response_failures() {
        let usage = json!({"prompt_tokens": 1, "completion_tokens": 1});
        let cases = [
            json!({"choices": [], "usage": usage}),
            json!({"choices": [{"message": {"content": null, "refusal": "no"}, "finish_reason": "stop"}], "usage": usage}),
            json!({"choices": [{"message": {"content": "{\"listings\": [", "refusal": null}, "finish_reason": "length"}], "usage": usage}),
            json!({"choices": [{"message": {"content": null, "refusal": null}, "finish_reason": "stop"}], "usage": usage}),
            json!({"choices": [{"message": {"content": "{\"rows\": []}", "refusal": null}, "finish_reason": "stop"}], "usage": usage}),
            json!({"choices": [{"message": {"content": "{\"listings\": []}", "refusal": null}, "finish_reason": "stop"}]}),
        ];

        for case in cases {
            let err = parse_response(response(case.clone()), &container()).unwrap_err();
            assert!(matches!(err, Error::ExtractionFailed(_)), "{case}: {err:?}");
        }
    }
}
