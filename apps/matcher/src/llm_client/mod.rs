//! LLM Client: the single point of entry for all reasoning-service calls.
//!
//! ARCHITECTURAL RULE: No other module may call the OpenAI API directly.
//! All LLM interactions MUST go through this module.
//!
//! Every structured call is made with temperature 0 and top_p 1 so repeated
//! requests stay as close to reproducible as the service allows.
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM refused the request: {0}")]
    Refusal(String),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// One part of the user message sent to the Responses API.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputPart<'a> {
    InputText { text: &'a str },
    InputFile { file_id: &'a str },
}

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    input: Vec<InputMessage<'a>>,
    text: TextOptions<'a>,
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct InputMessage<'a> {
    role: &'a str,
    content: Vec<InputPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextOptions<'a> {
    format: JsonSchemaFormat<'a>,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'a str,
    name: &'a str,
    schema: &'a Value,
    strict: bool,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    #[serde(default)]
    pub output: Vec<OutputItem>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct OutputItem {
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
pub struct OutputContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: Option<String>,
    pub refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text of the first `output_text` part of the first message.
    pub fn text(&self) -> Result<&str, LlmError> {
        let message = self
            .output
            .iter()
            .find(|item| item.item_type == "message")
            .ok_or(LlmError::EmptyContent)?;

        if let Some(refusal) = message
            .content
            .iter()
            .find(|c| c.content_type == "refusal")
            .and_then(|c| c.refusal.as_deref())
        {
            return Err(LlmError::Refusal(refusal.to_string()));
        }

        message
            .content
            .iter()
            .find(|c| c.content_type == "output_text")
            .and_then(|c| c.text.as_deref())
            .filter(|t| !t.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

/// The single LLM client used by the matching pipeline.
/// Wraps the Responses and Files APIs with retry logic and structured output helpers.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_output_tokens: u32,
    retry_base_delay: Duration,
}

impl LlmClient {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        max_output_tokens: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            base_url,
            model,
            max_output_tokens,
            retry_base_delay: Duration::from_millis(1000),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Requests a structured response conforming to `schema` and deserializes it.
    /// A response that does not match `T` is a parse error and is not retried.
    pub async fn parse<T: DeserializeOwned>(
        &self,
        instructions: &str,
        content: Vec<InputPart<'_>>,
        schema_name: &str,
        schema: &Value,
    ) -> Result<T, LlmError> {
        let request_body = ResponsesRequest {
            model: &self.model,
            instructions,
            input: vec![InputMessage {
                role: "user",
                content,
            }],
            text: TextOptions {
                format: JsonSchemaFormat {
                    format_type: "json_schema",
                    name: schema_name,
                    schema,
                    strict: true,
                },
            },
            temperature: 0.0,
            top_p: 1.0,
            max_output_tokens: self.max_output_tokens,
        };
        let url = format!("{}/responses", self.base_url);

        let response = self
            .send_with_retry(|| Ok(self.client.post(&url).json(&request_body)))
            .await?;
        let llm_response: LlmResponse = response.json().await?;

        if let Some(usage) = &llm_response.usage {
            debug!(
                "LLM call succeeded: schema={schema_name}, input_tokens={}, output_tokens={}",
                usage.input_tokens, usage.output_tokens
            );
        }

        let text = llm_response.text()?;
        serde_json::from_str(text).map_err(LlmError::Parse)
    }

    /// Uploads a PDF for later `input_file` references and returns its file id.
    pub async fn upload_file(&self, filename: &str, bytes: &[u8]) -> Result<String, LlmError> {
        let url = format!("{}/files", self.base_url);

        let response = self
            .send_with_retry(|| {
                let part = reqwest::multipart::Part::bytes(bytes.to_vec())
                    .file_name(filename.to_string())
                    .mime_str("application/pdf")?;
                let form = reqwest::multipart::Form::new()
                    .text("purpose", "user_data")
                    .part("file", part);
                Ok(self.client.post(&url).multipart(form))
            })
            .await?;

        let uploaded: UploadedFile = response.json().await?;
        debug!("Uploaded {filename} ({} bytes) as {}", bytes.len(), uploaded.id);
        Ok(uploaded.id)
    }

    /// Sends a request built by `build`, retrying on 429, 5xx and transport
    /// errors with exponential backoff. Other non-success statuses fail immediately.
    async fn send_with_retry<F>(&self, build: F) -> Result<reqwest::Response, LlmError>
    where
        F: Fn() -> Result<RequestBuilder, LlmError>,
    {
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = self.retry_base_delay * (1 << (attempt - 1));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match build()?.bearer_auth(&self.api_key).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<OpenAiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            return Ok(response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize)]
    struct Answer {
        value: u32,
    }

    fn client_for(server: &MockServer) -> LlmClient {
        let mut client = LlmClient::new(
            "sk-test".to_string(),
            server.uri(),
            "gpt-test".to_string(),
            256,
            Duration::from_secs(5),
        );
        client.retry_base_delay = Duration::from_millis(1);
        client
    }

    fn message_with_text(text: &str) -> Value {
        json!({
            "output": [
                {"type": "reasoning", "content": []},
                {"type": "message", "content": [{"type": "output_text", "text": text}]}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 3}
        })
    }

    fn schema() -> Value {
        json!({"type": "object", "properties": {"value": {"type": "integer"}}})
    }

    #[test]
    fn test_text_skips_non_message_items() {
        let response: LlmResponse =
            serde_json::from_value(message_with_text("{\"value\": 1}")).unwrap();
        assert_eq!(response.text().unwrap(), "{\"value\": 1}");
    }

    #[test]
    fn test_text_surfaces_refusal() {
        let response: LlmResponse = serde_json::from_value(json!({
            "output": [{"type": "message", "content": [{"type": "refusal", "refusal": "no"}]}]
        }))
        .unwrap();
        assert!(matches!(response.text(), Err(LlmError::Refusal(r)) if r == "no"));
    }

    #[test]
    fn test_text_empty_output_is_error() {
        let response: LlmResponse = serde_json::from_value(json!({"output": []})).unwrap();
        assert!(matches!(response.text(), Err(LlmError::EmptyContent)));
    }

    #[tokio::test]
    async fn test_parse_sends_deterministic_decoding_options() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-test",
                "temperature": 0.0,
                "top_p": 1.0,
                "max_output_tokens": 256,
                "text": {"format": {"type": "json_schema", "name": "answer", "strict": true}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(message_with_text("{\"value\": 42}")))
            .expect(1)
            .mount(&server)
            .await;

        let answer: Answer = client_for(&server)
            .parse(
                "answer",
                vec![InputPart::InputText { text: "question" }],
                "answer",
                &schema(),
            )
            .await
            .unwrap();
        assert_eq!(answer.value, 42);
    }

    #[tokio::test]
    async fn test_parse_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(message_with_text("{\"value\": 7}")))
            .mount(&server)
            .await;

        let answer: Answer = client_for(&server)
            .parse("answer", vec![], "answer", &schema())
            .await
            .unwrap();
        assert_eq!(answer.value, 7);
    }

    #[tokio::test]
    async fn test_parse_does_not_retry_malformed_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(message_with_text("not json")))
            .expect(1)
            .mount(&server)
            .await;

        let result: Result<Answer, _> = client_for(&server)
            .parse("answer", vec![], "answer", &schema())
            .await;
        assert!(matches!(result, Err(LlmError::Parse(_))));
    }

    #[tokio::test]
    async fn test_client_error_surfaces_api_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"error": {"message": "bad schema"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let result: Result<Answer, _> = client_for(&server)
            .parse("answer", vec![], "answer", &schema())
            .await;
        match result {
            Err(LlmError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad schema");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upload_file_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "file-abc", "object": "file"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let id = client_for(&server)
            .upload_file("resume.pdf", b"%PDF-1.4")
            .await
            .unwrap();
        assert_eq!(id, "file-abc");
    }

    #[test]
    fn test_input_parts_serialize_with_type_tag() {
        let parts = vec![
            InputPart::InputText { text: "hello" },
            InputPart::InputFile { file_id: "file-1" },
        ];
        let value = serde_json::to_value(&parts).unwrap();
        assert_eq!(
            value,
            json!([
                {"type": "input_text", "text": "hello"},
                {"type": "input_file", "file_id": "file-1"}
            ])
        );
    }
}
