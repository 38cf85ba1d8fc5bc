//! Anthropic Messages API client
//!
//! Uses a long-lived reqwest::Client for connection pooling.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

use super::{decode_turn, CompletionService, ContentBlock, ConversationMessage, ModelTurn};
use crate::error::MentorError;
use crate::tools::ToolDefinition;
use crate::Result;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MAX_TOKENS: u32 = 2048;
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Reusable Messages API client (connection-pooled)
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(api_key: String, base_url: &str, model: &str, max_tokens: u32) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            max_tokens,
        })
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [ConversationMessage],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolDefinition],
}

fn no_tools(tools: &&[ToolDefinition]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

/// Prefer the provider's own error message over the raw body.
fn provider_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| format!("{}: {}", e.error.kind, e.error.message))
        .unwrap_or_else(|_| body.to_string())
}

#[async_trait]
impl CompletionService for AnthropicClient {
    async fn complete(
        &self,
        system: &str,
        messages: &[ConversationMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelTurn> {
        if self.api_key.is_empty() {
            return Err(MentorError::completion(None, "ANTHROPIC_API_KEY not configured"));
        }

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages,
            tools,
        };

        info!(model = %self.model, messages = messages.len(), "Calling completion service");

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Completion request failed: {}", e);
                MentorError::completion(None, format!("request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, "Completion service error response: {}", body);
            return Err(MentorError::completion(Some(status.as_u16()), provider_message(&body)));
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            error!("Failed to parse completion response: {}", e);
            MentorError::completion(None, format!("invalid response: {}", e))
        })?;

        if let Some(usage) = &parsed.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                stop_reason = ?parsed.stop_reason,
                "Completion received"
            );
        }

        Ok(decode_turn(parsed.content, parsed.stop_reason.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatMessage;
    use crate::tools::{create_default_registry, CALCULATE_TOOL};
    use axum::{
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base: &str) -> AnthropicClient {
        AnthropicClient::new("sk-ant-test".into(), base, DEFAULT_MODEL, DEFAULT_MAX_TOKENS).unwrap()
    }

    #[tokio::test]
    async fn test_tool_use_response_decodes_to_tool_request() {
        let router = Router::new().route(
            "/v1/messages",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers["x-api-key"], "sk-ant-test");
                assert_eq!(headers["anthropic-version"], "2023-06-01");
                assert_eq!(body["model"], DEFAULT_MODEL);
                assert_eq!(body["max_tokens"], 2048);
                assert_eq!(body["system"], "be a mentor");
                assert_eq!(body["messages"][0], json!({ "role": "user", "content": "runway?" }));
                assert_eq!(body["tools"][0]["name"], "calculate");
                Json(json!({
                    "id": "msg_01",
                    "type": "message",
                    "role": "assistant",
                    "content": [
                        { "type": "text", "text": "Let me check." },
                        {
                            "type": "tool_use",
                            "id": "toolu_01",
                            "name": "calculate",
                            "input": { "calculation_type": "runway", "inputs": { "currentCash": 50000, "monthlyBurnRate": 10000 } }
                        }
                    ],
                    "stop_reason": "tool_use",
                    "usage": { "input_tokens": 900, "output_tokens": 60 }
                }))
            }),
        );
        let base = serve(router).await;

        let turn = client(&base)
            .complete(
                "be a mentor",
                &[ConversationMessage::from(&ChatMessage::user("runway?"))],
                &create_default_registry().definitions(),
            )
            .await
            .unwrap();

        match turn {
            ModelTurn::ToolRequest { call, assistant } => {
                assert_eq!(call.name, CALCULATE_TOOL);
                assert_eq!(call.id, "toolu_01");
                assert_eq!(assistant.len(), 2);
            }
            other => panic!("expected tool request, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_end_turn_response_decodes_to_text() {
        let router = Router::new().route(
            "/v1/messages",
            post(|| async {
                Json(json!({
                    "content": [{ "type": "text", "text": "Go interview five customers." }],
                    "stop_reason": "end_turn"
                }))
            }),
        );
        let base = serve(router).await;

        let turn = client(&base).complete("s", &[], &[]).await.unwrap();
        assert_eq!(turn, ModelTurn::FinalText(Some("Go interview five customers.".into())));
    }

    #[tokio::test]
    async fn test_provider_status_is_preserved() {
        let router = Router::new().route(
            "/v1/messages",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({
                        "type": "error",
                        "error": { "type": "rate_limit_error", "message": "Number of requests has exceeded your rate limit" }
                    })),
                )
            }),
        );
        let base = serve(router).await;

        let err = client(&base).complete("s", &[], &[]).await.unwrap_err();
        match err {
            MentorError::Completion { status, message } => {
                assert_eq!(status, Some(429));
                assert!(message.starts_with("rate_limit_error: "));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_empty_tool_list_is_omitted() {
        let request = MessagesRequest {
            model: DEFAULT_MODEL,
            max_tokens: 16,
            system: "s",
            messages: &[],
            tools: &[],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("tools").is_none());
    }
}
