use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, warn};

use crate::error::{LlmError, LlmResult};
use crate::types::{ApiErrorResponse, ModelResponse, ResponseRequest};

const DEFAULT_MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;
const MAX_BACKOFF_MS: u64 = 60000;

/// RPC-style contract for the language-model collaborator.
///
/// The orchestrator only ever sees this trait; tests substitute scripted
/// implementations.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn create_response(&self, request: ResponseRequest) -> LlmResult<ModelResponse>;
}

/// HTTP client for the Responses API
#[derive(Clone)]
pub struct ResponsesClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ResponsesClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
        }
    }

    async fn with_retry<T, F, Fut>(&self, operation: F, operation_name: &str) -> LlmResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = LlmResult<T>>,
    {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(LlmError::RateLimited { retry_after }) => {
                    if retries >= DEFAULT_MAX_RETRIES {
                        error!(
                            "{} failed after {} retries due to rate limiting",
                            operation_name, retries
                        );
                        return Err(LlmError::RateLimited { retry_after });
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
                        DEFAULT_MAX_RETRIES
                    );

                    tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                    retries += 1;
                    backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
                }
                Err(LlmError::Api {
                    ref message,
                    status_code: Some(code),
                }) if code >= 500 => {
                    if retries >= DEFAULT_MAX_RETRIES {
                        error!(
                            "{} failed after {} retries due to server error: {}",
                            operation_name, retries, message
                        );
                        return Err(LlmError::Api {
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
                        DEFAULT_MAX_RETRIES
                    );

                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    retries += 1;
                    backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn create_response_inner(&self, request: &ResponseRequest) -> LlmResult<ModelResponse> {
        debug!(
            "Creating model response with {} input items, model {}",
            request.input.len(),
            request.model
        );

        let response = self
            .client
            .post(format!("{}/responses", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                warn!("Rate limited by model API");
                return Err(LlmError::RateLimited { retry_after: None });
            }

            if let Ok(error_resp) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
                error!(
                    "Model API error: {} (type: {:?})",
                    error_resp.error.message, error_resp.error.error_type
                );
                return Err(LlmError::Api {
                    message: error_resp.error.message,
                    status_code: Some(status.as_u16()),
                });
            }

            return Err(LlmError::Api {
                message: error_text,
                status_code: Some(status.as_u16()),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ModelClient for ResponsesClient {
    async fn create_response(&self, request: ResponseRequest) -> LlmResult<ModelResponse> {
        self.with_retry(
            || async { self.create_response_inner(&request).await },
            "create_response",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolbelt_core::ThreadItem;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ResponseRequest {
        ResponseRequest::new("gpt-5-nano", vec![ThreadItem::user("hello")])
            .with_instructions("be brief")
    }

    #[tokio::test]
    async fn test_create_response_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/responses"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"model": "gpt-5-nano"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "resp_1",
                "model": "gpt-5-nano",
                "output": [{
                    "type": "message",
                    "role": "assistant",
                    "content": [{"type": "output_text", "text": "hi"}]
                }]
            })))
            .mount(&server)
            .await;

        let client = ResponsesClient::new("test-key".to_string(), server.uri());
        let response = client.create_response(request()).await.unwrap();

        assert_eq!(response.output_text(), "hi");
    }

    #[tokio::test]
    async fn test_create_response_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"message": "bad input", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let client = ResponsesClient::new("test-key".to_string(), server.uri());
        let error = client.create_response(request()).await.unwrap_err();

        match error {
            LlmError::Api {
                message,
                status_code,
            } => {
                assert_eq!(message, "bad input");
                assert_eq!(status_code, Some(400));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_is_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "output": [{
                    "type": "message",
                    "role": "assistant",
                    "content": [{"type": "output_text", "text": "recovered"}]
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ResponsesClient::new("test-key".to_string(), server.uri());
        // Paused time auto-advances through the backoff sleep.
        let response = client.create_response(request()).await.unwrap();

        assert_eq!(response.output_text(), "recovered");
    }
}
