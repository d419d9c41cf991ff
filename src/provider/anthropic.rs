// src/provider/anthropic.rs — Anthropic Messages API provider

use async_trait::async_trait;
use std::time::Duration;

use super::{ChatRequest, ChatResponse, ModelProvider, Role, StopReason, TokenUsage};
use crate::infra::errors::DevflowError;

const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicProvider {
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        self
    }

    fn api_url(&self) -> &str {
        "https://api.anthropic.com/v1/messages"
    }

    pub(crate) fn build_request_body(request: &ChatRequest) -> serde_json::Value {
        // System text travels in the top-level field, never as a message.
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| {
                serde_json::json!({
                    "role": m.role.as_str(),
                    "content": m.content,
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });

        if let Some(system) = &request.system {
            body["system"] = serde_json::json!(system);
        }
        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        body
    }

    /// Decode a 2xx body. A body with no `text` content block is a
    /// non-retriable provider error.
    pub(crate) fn parse_response(resp: &serde_json::Value) -> Result<ChatResponse, DevflowError> {
        let texts: Vec<&str> = resp["content"]
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|c| c["type"] == "text")
                    .filter_map(|c| c["text"].as_str())
                    .collect()
            })
            .unwrap_or_default();

        if texts.is_empty() {
            let detail = resp["error"]["message"]
                .as_str()
                .unwrap_or("no text content block");
            return Err(DevflowError::Provider {
                provider: "anthropic".into(),
                message: format!("Malformed response: {}", detail),
                retriable: false,
            });
        }

        let usage = TokenUsage {
            input_tokens: resp["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: resp["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
        };

        let stop_reason = match resp["stop_reason"].as_str() {
            Some("end_turn") => StopReason::EndTurn,
            Some("max_tokens") => StopReason::MaxTokens,
            Some("stop_sequence") => StopReason::StopSequence,
            _ => StopReason::Unknown,
        };

        Ok(ChatResponse {
            content: texts.concat(),
            usage,
            stop_reason,
        })
    }
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    fn id(&self) -> &str {
        "anthropic"
    }

    fn name(&self) -> &str {
        "Anthropic"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, DevflowError> {
        let body = Self::build_request_body(&request);

        let response = self
            .client
            .post(self.api_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| DevflowError::Provider {
                provider: "anthropic".into(),
                message: e.to_string(),
                retriable: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5);
            return Err(DevflowError::RateLimited {
                provider: "anthropic".into(),
                retry_after_ms: retry_after * 1000,
            });
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(DevflowError::Provider {
                provider: "anthropic".into(),
                message: format!("HTTP {}: {}", status, error_body),
                // 529 "overloaded" is a server error too
                retriable: status.is_server_error(),
            });
        }

        let resp: serde_json::Value = response.json().await.map_err(|e| DevflowError::Provider {
            provider: "anthropic".into(),
            message: format!("Failed to parse response: {}", e),
            retriable: false,
        })?;

        Self::parse_response(&resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Message;

    #[test]
    fn test_body_uses_top_level_system() {
        let req = ChatRequest {
            model: "claude-3-5-sonnet-latest".into(),
            messages: vec![Message::system("ignored"), Message::user("review this")],
            system: Some("You are a reviewer.".into()),
            ..Default::default()
        };
        let body = AnthropicProvider::build_request_body(&req);
        assert_eq!(body["system"], "You are a reviewer.");
        let msgs = body["messages"].as_array().unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0]["role"], "user");
        assert_eq!(body["max_tokens"], 4096);
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_parse_response_joins_text_blocks() {
        let resp = serde_json::json!({
            "content": [
                { "type": "text", "text": "Hello " },
                { "type": "tool_use", "id": "t1" },
                { "type": "text", "text": "world" }
            ],
            "usage": { "input_tokens": 20, "output_tokens": 4 },
            "stop_reason": "max_tokens"
        });
        let parsed = AnthropicProvider::parse_response(&resp).unwrap();
        assert_eq!(parsed.content, "Hello world");
        assert_eq!(parsed.usage, TokenUsage::new(20, 4));
        assert_eq!(parsed.stop_reason, StopReason::MaxTokens);
    }

    #[test]
    fn test_parse_response_without_text_is_error() {
        let err = AnthropicProvider::parse_response(&serde_json::json!({})).unwrap_err();
        assert!(matches!(err, DevflowError::Provider { retriable: false, .. }));

        let tool_only = serde_json::json!({
            "content": [{ "type": "tool_use", "id": "t1" }],
            "stop_reason": "end_turn"
        });
        assert!(AnthropicProvider::parse_response(&tool_only).is_err());
    }

    #[test]
    fn test_parse_response_error_body_is_reported() {
        let resp = serde_json::json!({ "type": "error", "error": { "message": "Overloaded" } });
        let err = AnthropicProvider::parse_response(&resp).unwrap_err();
        assert!(err.to_string().contains("Overloaded"));
    }
}
