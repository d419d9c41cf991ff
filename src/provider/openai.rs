// src/provider/openai.rs — OpenAI Chat Completions provider
//
// Also serves OpenAI-compatible endpoints (DeepSeek) through `with_base_url`.

use async_trait::async_trait;
use std::time::Duration;

use super::{ChatRequest, ChatResponse, ModelProvider, StopReason, TokenUsage};
use crate::infra::errors::DevflowError;

pub struct OpenAIProvider {
    id: String,
    display_name: String,
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl OpenAIProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url("openai", "OpenAI", api_key, "https://api.openai.com/v1".into())
    }

    pub fn with_base_url(
        id: impl Into<String>,
        display_name: impl Into<String>,
        api_key: String,
        base_url: String,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            api_key,
            client: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        self
    }

    pub(crate) fn build_request_body(request: &ChatRequest) -> serde_json::Value {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(serde_json::json!({
                "role": "system",
                "content": system,
            }));
        }
        for m in &request.messages {
            messages.push(serde_json::json!({
                "role": m.role.as_str(),
                "content": m.content,
            }));
        }

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        body
    }

    /// Decode a 2xx body. A body without `choices[0].message.content` is a
    /// non-retriable provider error, carrying the API's own message if any.
    pub(crate) fn parse_response(
        provider: &str,
        resp: &serde_json::Value,
    ) -> Result<ChatResponse, DevflowError> {
        let choice = &resp["choices"][0];
        let Some(content) = choice["message"]["content"].as_str() else {
            let detail = resp["error"]["message"]
                .as_str()
                .unwrap_or("no choices[0].message.content");
            return Err(DevflowError::Provider {
                provider: provider.to_string(),
                message: format!("Malformed response: {}", detail),
                retriable: false,
            });
        };

        let usage = TokenUsage {
            input_tokens: resp["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: resp["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
        };

        let stop_reason = match choice["finish_reason"].as_str() {
            Some("stop") => StopReason::EndTurn,
            Some("length") => StopReason::MaxTokens,
            _ => StopReason::Unknown,
        };

        Ok(ChatResponse {
            content: content.to_string(),
            usage,
            stop_reason,
        })
    }
}

#[async_trait]
impl ModelProvider for OpenAIProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.display_name
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, DevflowError> {
        let body = Self::build_request_body(&request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| DevflowError::Provider {
                provider: self.id.clone(),
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
                provider: self.id.clone(),
                retry_after_ms: retry_after * 1000,
            });
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(DevflowError::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {}: {}", status, error_body),
                retriable: status.is_server_error(),
            });
        }

        let resp: serde_json::Value = response.json().await.map_err(|e| DevflowError::Provider {
            provider: self.id.clone(),
            message: format!("Failed to parse response: {}", e),
            retriable: false,
        })?;

        Self::parse_response(&self.id, &resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Message;

    #[test]
    fn test_body_puts_system_first() {
        let req = ChatRequest {
            model: "gpt-4o-mini-2024-07-18".into(),
            messages: vec![Message::user("hi")],
            temperature: Some(0.7),
            system: Some("be brief".into()),
            ..Default::default()
        };
        let body = OpenAIProvider::build_request_body(&req);
        assert_eq!(body["model"], "gpt-4o-mini-2024-07-18");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be brief");
        assert_eq!(body["messages"][1]["role"], "user");
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_body_without_temperature() {
        let req = ChatRequest {
            model: "o1-mini".into(),
            messages: vec![Message::user("hi")],
            ..Default::default()
        };
        let body = OpenAIProvider::build_request_body(&req);
        assert!(body.get("temperature").is_none());
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_parse_response() {
        let resp = serde_json::json!({
            "choices": [{
                "message": { "role": "assistant", "content": "0.8" },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 3 }
        });
        let parsed = OpenAIProvider::parse_response("openai", &resp).unwrap();
        assert_eq!(parsed.content, "0.8");
        assert_eq!(parsed.usage, TokenUsage::new(12, 3));
        assert_eq!(parsed.stop_reason, StopReason::EndTurn);
    }

    #[test]
    fn test_parse_response_missing_fields() {
        let resp = serde_json::json!({ "usage": { "prompt_tokens": 5, "completion_tokens": 0 } });
        let err = OpenAIProvider::parse_response("openai", &resp).unwrap_err();
        assert!(matches!(err, DevflowError::Provider { retriable: false, .. }));
        assert!(!err.is_retriable());
    }

    #[test]
    fn test_parse_response_error_body_is_reported() {
        let resp = serde_json::json!({ "error": { "message": "The model is overloaded" } });
        let err = OpenAIProvider::parse_response("deepseek", &resp).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("deepseek"), "{msg}");
        assert!(msg.contains("The model is overloaded"), "{msg}");
    }

    #[test]
    fn test_parse_response_allows_empty_content() {
        let resp = serde_json::json!({
            "choices": [{ "message": { "content": "" }, "finish_reason": "length" }]
        });
        let parsed = OpenAIProvider::parse_response("openai", &resp).unwrap();
        assert!(parsed.content.is_empty());
        assert_eq!(parsed.stop_reason, StopReason::MaxTokens);
        assert_eq!(parsed.usage.total(), 0);
    }

    #[test]
    fn test_custom_base_url_identity() {
        let p = OpenAIProvider::with_base_url(
            "deepseek",
            "DeepSeek",
            "k".into(),
            "https://api.deepseek.com/v1".into(),
        );
        assert_eq!(p.id(), "deepseek");
        assert_eq!(p.name(), "DeepSeek");
    }
}
