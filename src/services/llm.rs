use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::ServiceError;
use crate::services::prompt;
use crate::services::{GeneratedTranscript, RewriteContext, SegmentRewriter, TranscriptGenerator};

/// Environment variable consulted when `[llm] api_key` is empty.
pub const API_KEY_ENV: &str = "TUBESCRIBE_LLM_KEY";

/// Initial delay between retries (doubles with each attempt).
const INITIAL_RETRY_DELAY_MS: u64 = 1000;

/// Completion budget for a full transcript.
const GENERATION_MAX_TOKENS: u32 = 16_384;

/// Completion budget for a single refined segment.
const REFINEMENT_MAX_TOKENS: u32 = 1_024;

#[derive(Debug, Serialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

/// Azure OpenAI chat completions client. Serves as both the transcript
/// generator and the segment rewriter.
pub struct LlmClient {
    endpoint: String,
    api_key: String,
    deployment: String,
    api_version: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("deployment", &self.deployment)
            .finish()
    }
}

impl LlmClient {
    /// Create a new LLM client from the `[llm]` config section.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let endpoint = if config.endpoint.is_empty() {
            anyhow::bail!(
                "LLM endpoint not configured. \
                 Set [llm] endpoint in tubescribe.toml"
            );
        } else {
            config.endpoint.trim_end_matches('/').to_string()
        };

        let api_key = if !config.api_key.is_empty() {
            config.api_key.clone()
        } else {
            std::env::var(API_KEY_ENV).with_context(|| {
                format!(
                    "LLM API key not configured. Set [llm] api_key or {}",
                    API_KEY_ENV
                )
            })?
        };

        let deployment = if config.deployment.is_empty() {
            anyhow::bail!(
                "LLM deployment not configured. \
                 Set [llm] deployment in tubescribe.toml"
            );
        } else {
            config.deployment.clone()
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client for LlmClient")?;

        Ok(Self {
            endpoint,
            api_key,
            deployment,
            api_version: config.api_version.clone(),
            max_retries: config.max_retries,
            client,
        })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }

    /// Send a chat completion request and return the response text.
    /// 5xx responses and transient network errors are retried with backoff.
    #[tracing::instrument(skip_all, fields(deployment = %self.deployment))]
    pub async fn chat(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_completion_tokens: u32,
        json_mode: bool,
    ) -> Result<String, ServiceError> {
        let request = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            max_completion_tokens,
            response_format: json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        tracing::debug!(
            "Sending chat completion request (~{} prompt tokens)",
            prompt::estimate_tokens(user_prompt)
        );

        let url = self.completions_url();
        let mut last_error: Option<ServiceError> = None;
        let mut retry_delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS);

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tracing::warn!(
                    attempt,
                    max_retries = self.max_retries,
                    delay_ms = retry_delay.as_millis() as u64,
                    "Retrying chat completion after transient failure"
                );
                tokio::time::sleep(retry_delay).await;
                retry_delay *= 2;
            }

            let result = self
                .client
                .post(&url)
                .header("api-key", &self.api_key)
                .json(&request)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let chat_response: ChatResponse = response.json().await.map_err(|e| {
                            ServiceError::InvalidResponse(format!(
                                "Failed to parse chat completion response: {}",
                                e
                            ))
                        })?;
                        return Self::extract_text(&chat_response);
                    }

                    let message = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "unable to read response body".to_string());
                    let error = ServiceError::ServerError {
                        status: status.as_u16(),
                        message,
                    };

                    if status.is_server_error() && attempt < self.max_retries {
                        last_error = Some(error);
                        continue;
                    }
                    return Err(error);
                }
                Err(e) => {
                    if is_retryable(&e) && attempt < self.max_retries {
                        last_error = Some(ServiceError::Network(e));
                        continue;
                    }
                    return Err(ServiceError::Network(e));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ServiceError::InvalidResponse("Unexpected retry loop exit".to_string())
        }))
    }

    fn extract_text(response: &ChatResponse) -> Result<String, ServiceError> {
        if let Some(usage) = &response.usage {
            tracing::info!(
                "Token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens
            );
        }

        let choice = response.choices.first().ok_or_else(|| {
            ServiceError::InvalidResponse("No choices in chat completion response".to_string())
        })?;

        if let Some(reason) = &choice.finish_reason {
            if reason != "stop" {
                tracing::warn!("Chat completion finish_reason: {}", reason);
            }
        }

        Ok(choice.message.content.clone())
    }
}

fn is_retryable(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

#[async_trait]
impl TranscriptGenerator for LlmClient {
    fn name(&self) -> &str {
        "azure-openai"
    }

    async fn generate(&self, url: &str, title: &str) -> Result<GeneratedTranscript, ServiceError> {
        let (system, user) = prompt::build_generation_prompt(url, title);
        let raw = self
            .chat(&system, &user, GENERATION_MAX_TOKENS, true)
            .await?;
        prompt::parse_generated_transcript(&raw)
    }
}

#[async_trait]
impl SegmentRewriter for LlmClient {
    fn name(&self) -> &str {
        "azure-openai"
    }

    async fn rewrite(&self, context: &RewriteContext) -> Result<String, ServiceError> {
        let (system, user) = prompt::build_refinement_prompt(context);
        self.chat(&system, &user, REFINEMENT_MAX_TOKENS, false)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> LlmConfig {
        LlmConfig {
            endpoint: "https://example.openai.azure.com/".to_string(),
            api_key: "test-key".to_string(),
            deployment: "gpt-4o".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_config_missing_endpoint() {
        let config = LlmConfig {
            endpoint: String::new(),
            ..configured()
        };
        let result = LlmClient::from_config(&config);
        assert!(result.is_err());
        assert!(
            result.unwrap_err().to_string().contains("endpoint"),
            "Error should mention endpoint"
        );
    }

    #[test]
    fn test_from_config_missing_deployment() {
        let config = LlmConfig {
            deployment: String::new(),
            ..configured()
        };
        let result = LlmClient::from_config(&config);
        assert!(result.is_err());
        assert!(
            result.unwrap_err().to_string().contains("deployment"),
            "Error should mention deployment"
        );
    }

    #[test]
    fn test_from_config_success_builds_url() {
        let client = LlmClient::from_config(&configured()).unwrap();
        assert_eq!(
            client.completions_url(),
            "https://example.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-06-01"
        );
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let client = LlmClient::from_config(&configured()).unwrap();
        let debug_output = format!("{:?}", client);
        assert!(!debug_output.contains("test-key"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn test_request_serialization_json_mode() {
        let request = ChatRequest {
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "Hello world".to_string(),
            }],
            max_completion_tokens: 10,
            response_format: Some(ResponseFormat {
                kind: "json_object",
            }),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"response_format\":{\"type\":\"json_object\"}"));

        let request = ChatRequest {
            response_format: None,
            ..request
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("response_format"));
    }

    #[test]
    fn test_response_deserialization() {
        let json = r#"{
            "id": "chatcmpl-123",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Polished text here"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 9, "completion_tokens": 12, "total_tokens": 21}
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        let text = LlmClient::extract_text(&response).unwrap();
        assert_eq!(text, "Polished text here");
    }

    #[test]
    fn test_response_without_choices_is_invalid() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let err = LlmClient::extract_text(&response).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidResponse(_)));
    }
}
