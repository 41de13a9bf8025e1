use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, info, warn};

use super::types::*;
use crate::error::{GeneratorError, GeneratorResult};
use crate::extract::extract_html;
use crate::prompts::{initial_prompt, revision_prompt, SYSTEM_PROMPT};
use crate::{ContentGenerator, GenerationRequest};

pub const DEFAULT_BASE_URL: &str = "https://aipipe.org/openrouter/v1";
pub const DEFAULT_MODEL: &str = "openai/gpt-5-nano";

const DEFAULT_MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;
const MAX_BACKOFF_MS: u64 = 60000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Client for an OpenAI-compatible chat completions API
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    api_key: String,
    base_url: String,
    max_retries: u32,
    initial_backoff_ms: u64,
}

impl ChatClient {
    pub fn new(api_key: String, base_url: String) -> GeneratorResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GeneratorError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff_ms: INITIAL_BACKOFF_MS,
        })
    }

    pub fn with_retries(mut self, max_retries: u32, initial_backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.initial_backoff_ms = initial_backoff.as_millis() as u64;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn with_retry<T, F, Fut>(&self, operation: F, operation_name: &str) -> GeneratorResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = GeneratorResult<T>>,
    {
        let mut retries = 0;
        let mut backoff_ms = self.initial_backoff_ms;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(GeneratorError::RateLimited { retry_after }) => {
                    if retries >= self.max_retries {
                        error!(
                            "{} failed after {} retries due to rate limiting",
                            operation_name, retries
                        );
                        return Err(GeneratorError::RateLimited { retry_after });
                    }

                    let wait_ms = retry_after
                        .map(|s| s * 1000)
                        .unwrap_or(backoff_ms)
                        .min(MAX_BACKOFF_MS);

                    warn!(
                        "{} rate limited, retrying in {}ms (attempt {}/{})",
                        operation_name,
                        wait_ms,
                        retries + 1,
                        self.max_retries
                    );

                    tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                    retries += 1;
                    backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
                }
                Err(GeneratorError::Api {
                    ref message,
                    status_code: Some(code),
                }) if code >= 500 => {
                    if retries >= self.max_retries {
                        error!(
                            "{} failed after {} retries due to server error: {}",
                            operation_name, retries, message
                        );
                        return Err(GeneratorError::Api {
                            message: message.clone(),
                            status_code: Some(code),
                        });
                    }

                    warn!(
                        "{} server error ({}), retrying in {}ms (attempt {}/{})",
                        operation_name,
                        code,
                        backoff_ms,
                        retries + 1,
                        self.max_retries
                    );

                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    retries += 1;
                    backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
                }
                Err(e) => {
                    if retries > 0 {
                        info!("{} failed after {} retries: {}", operation_name, retries, e);
                    }
                    return Err(e);
                }
            }
        }
    }

    pub async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        model: &str,
        temperature: Option<f32>,
    ) -> GeneratorResult<String> {
        self.with_retry(
            || async {
                self.chat_completion_inner(messages.clone(), model, temperature)
                    .await
            },
            "chat_completion",
        )
        .await
    }

    async fn chat_completion_inner(
        &self,
        messages: Vec<ChatMessage>,
        model: &str,
        temperature: Option<f32>,
    ) -> GeneratorResult<String> {
        debug!(
            "Creating chat completion with {} messages, model {}",
            messages.len(),
            model
        );

        let request = ChatCompletionRequest {
            model: model.to_string(),
            messages,
            temperature,
            max_tokens: None,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                warn!("Rate limited by chat API");
                return Err(GeneratorError::RateLimited { retry_after: None });
            }

            if let Ok(error_resp) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
                error!(
                    "Chat API error: {} (type: {:?})",
                    error_resp.error.message, error_resp.error.error_type
                );
                return Err(GeneratorError::Api {
                    message: error_resp.error.message,
                    status_code: Some(status.as_u16()),
                });
            }

            return Err(GeneratorError::Api {
                message: error_text,
                status_code: Some(status.as_u16()),
            });
        }

        let chat_response: ChatCompletionResponse = response.json().await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(GeneratorError::EmptyResponse)
    }
}

/// `ContentGenerator` backed by a chat model.
#[derive(Clone)]
pub struct LlmGenerator {
    client: ChatClient,
    model: String,
}

impl LlmGenerator {
    pub fn new(client: ChatClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ContentGenerator for LlmGenerator {
    async fn generate(&self, request: &GenerationRequest) -> GeneratorResult<String> {
        let prompt = match &request.existing {
            Some(existing) => revision_prompt(&request.brief, existing),
            None => initial_prompt(&request.brief, &request.attachments),
        };

        info!(
            model = %self.model,
            revision = request.is_revision(),
            prompt_chars = prompt.len(),
            "Generating artifact"
        );

        let messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];
        let reply = self.client.chat_completion(messages, &self.model, None).await?;

        let html = extract_html(&reply);
        if html.is_empty() {
            return Err(GeneratorError::EmptyResponse);
        }

        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "id": "gen-1",
            "model": "openai/gpt-5-nano",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })
    }

    fn generator(server: &MockServer) -> LlmGenerator {
        let client = ChatClient::new("test-key".to_string(), format!("{}/", server.uri()))
            .unwrap()
            .with_retries(1, Duration::from_millis(10));
        LlmGenerator::new(client, DEFAULT_MODEL)
    }

    #[test]
    fn test_client_trims_base_url() {
        let client = ChatClient::new(
            "test-key".to_string(),
            "https://openrouter.ai/api/v1/".to_string(),
        )
        .unwrap();
        assert_eq!(client.base_url(), "https://openrouter.ai/api/v1");
    }

    #[tokio::test]
    async fn test_generate_initial_strips_fence() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(json!({ "model": DEFAULT_MODEL })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("```html\n<html>todo</html>\n```")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let html = generator(&server)
            .generate(&GenerationRequest::initial("a todo list", vec![]))
            .await
            .unwrap();

        assert_eq!(html, "<html>todo</html>");
    }

    #[tokio::test]
    async fn test_generate_revision_sends_existing_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("<html>v2</html>")))
            .mount(&server)
            .await;

        let html = generator(&server)
            .generate(&GenerationRequest::revision("add dark mode", vec![], "<html>v1</html>"))
            .await
            .unwrap();
        assert_eq!(html, "<html>v2</html>");

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let user_prompt = body["messages"][1]["content"].as_str().unwrap();
        assert!(user_prompt.contains("<html>v1</html>"));
        assert!(user_prompt.contains("add dark mode"));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "invalid key", "type": "auth" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = generator(&server)
            .generate(&GenerationRequest::initial("a todo list", vec![]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GeneratorError::Api { status_code: Some(401), ref message } if message == "invalid key"
        ));
    }

    #[tokio::test]
    async fn test_server_error_retried_then_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .expect(2)
            .mount(&server)
            .await;

        let err = generator(&server)
            .generate(&GenerationRequest::initial("a todo list", vec![]))
            .await
            .unwrap_err();

        assert!(matches!(err, GeneratorError::Api { status_code: Some(502), .. }));
    }

    #[tokio::test]
    async fn test_empty_reply_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("```html\n```")))
            .mount(&server)
            .await;

        let err = generator(&server)
            .generate(&GenerationRequest::initial("a todo list", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, GeneratorError::EmptyResponse));
    }
}
