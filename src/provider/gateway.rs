// src/provider/gateway.rs — Model gateway: one call signature over every backend
//
// Resolves the model name, routes to the backend's (retry-wrapped) provider,
// and books token usage into the shared cost tracker.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::anthropic::AnthropicProvider;
use super::catalog::{Backend, ModelSpec};
use super::openai::OpenAIProvider;
use super::retry::{RetryConfig, RetryProvider};
use super::{estimate_tokens, ChatRequest, Message, ModelProvider, StopReason, TokenUsage};
use crate::core::cost::CostTracker;
use crate::infra::config::GatewayConfig;
use crate::infra::errors::DevflowError;

const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";

/// API keys per backend. Missing entries are filled from the environment.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
    pub deepseek: Option<String>,
}

impl ApiKeys {
    /// Explicit keys win; otherwise `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`,
    /// `DEEPSEEK_API_KEY`. Empty strings count as absent.
    pub fn resolve(
        openai: Option<String>,
        anthropic: Option<String>,
        deepseek: Option<String>,
    ) -> Self {
        Self {
            openai: non_empty(openai).or_else(|| env_key("OPENAI_API_KEY")),
            anthropic: non_empty(anthropic).or_else(|| env_key("ANTHROPIC_API_KEY")),
            deepseek: non_empty(deepseek).or_else(|| env_key("DEEPSEEK_API_KEY")),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.openai.is_none() && self.anthropic.is_none() && self.deepseek.is_none()
    }
}

fn non_empty(key: Option<String>) -> Option<String> {
    key.filter(|k| !k.trim().is_empty())
}

fn env_key(var: &str) -> Option<String> {
    non_empty(std::env::var(var).ok())
}

/// Per-call knobs for [`ModelGateway::query_with`].
#[derive(Debug, Clone, Default)]
pub struct QueryOptions<'a> {
    pub temperature: Option<f32>,
    /// Label for the cost breakdown (agent role, solver stage, ...).
    pub phase: Option<&'a str>,
}

/// Receives the running cost estimate (USD) after every booked call.
pub type CostSink = Arc<dyn Fn(f64) + Send + Sync>;

pub struct ModelGateway {
    providers: HashMap<Backend, Arc<dyn ModelProvider>>,
    retry: RetryConfig,
    default_temperature: f32,
    max_tokens: Option<u32>,
    cost_sink: Option<CostSink>,
    costs: Arc<Mutex<CostTracker>>,
}

impl ModelGateway {
    /// An empty gateway; register providers with [`with_provider`](Self::with_provider).
    pub fn new(retry: RetryConfig) -> Self {
        Self {
            providers: HashMap::new(),
            retry,
            default_temperature: 0.7,
            max_tokens: None,
            cost_sink: None,
            costs: Arc::new(Mutex::new(CostTracker::new())),
        }
    }

    /// Build a gateway with an HTTP provider for every backend that has a key.
    pub fn from_keys(keys: &ApiKeys, config: &GatewayConfig) -> Result<Self, DevflowError> {
        if keys.is_empty() {
            return Err(DevflowError::NoApiKey);
        }

        let timeout = config.request_timeout();
        let mut gateway = Self::new(RetryConfig::from(config))
            .with_default_temperature(config.temperature)
            .with_max_tokens(config.max_tokens);

        if let Some(key) = &keys.openai {
            gateway = gateway.with_provider(
                Backend::OpenAI,
                Arc::new(OpenAIProvider::new(key.clone()).with_timeout(timeout)),
            );
        }
        if let Some(key) = &keys.anthropic {
            gateway = gateway.with_provider(
                Backend::Anthropic,
                Arc::new(AnthropicProvider::new(key.clone()).with_timeout(timeout)),
            );
        }
        if let Some(key) = &keys.deepseek {
            gateway = gateway.with_provider(
                Backend::DeepSeek,
                Arc::new(
                    OpenAIProvider::with_base_url(
                        "deepseek",
                        "DeepSeek",
                        key.clone(),
                        DEEPSEEK_BASE_URL.into(),
                    )
                    .with_timeout(timeout),
                ),
            );
        }

        Ok(gateway)
    }

    /// Register (or replace) the provider for a backend. It is wrapped in the
    /// gateway's retry policy.
    pub fn with_provider(mut self, backend: Backend, provider: Arc<dyn ModelProvider>) -> Self {
        let wrapped: Arc<dyn ModelProvider> =
            Arc::new(RetryProvider::with_config(provider, self.retry.clone()));
        self.providers.insert(backend, wrapped);
        self
    }

    pub fn with_default_temperature(mut self, temperature: f32) -> Self {
        self.default_temperature = temperature;
        self
    }

    /// Completion cap for every request this gateway sends.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_cost_sink(mut self, sink: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.cost_sink = Some(Arc::new(sink));
        self
    }

    pub fn has_backend(&self, backend: Backend) -> bool {
        self.providers.contains_key(&backend)
    }

    /// Shared handle to the cost tracker.
    pub fn costs(&self) -> Arc<Mutex<CostTracker>> {
        self.costs.clone()
    }

    /// Snapshot of the tracker.
    pub fn cost_snapshot(&self) -> CostTracker {
        self.costs
            .lock()
            .map(|t| t.clone())
            .unwrap_or_default()
    }

    /// Current spend estimate in USD.
    pub fn cost_estimate(&self) -> f64 {
        self.costs.lock().map(|t| t.estimate()).unwrap_or(0.0)
    }

    pub fn total_calls(&self) -> u64 {
        self.costs.lock().map(|t| t.total_calls()).unwrap_or(0)
    }

    /// Send a system prompt + user prompt to `model` and return the raw text.
    pub async fn query(
        &self,
        model: &str,
        system_prompt: &str,
        prompt: &str,
    ) -> Result<String, DevflowError> {
        self.query_with(model, system_prompt, prompt, QueryOptions::default())
            .await
    }

    pub async fn query_with(
        &self,
        model: &str,
        system_prompt: &str,
        prompt: &str,
        options: QueryOptions<'_>,
    ) -> Result<String, DevflowError> {
        let spec = ModelSpec::resolve(model)?;
        let provider = self
            .providers
            .get(&spec.backend)
            .ok_or_else(|| DevflowError::MissingApiKey {
                backend: spec.backend.to_string(),
            })?;

        let request = self.build_request(&spec, system_prompt, prompt, &options);

        tracing::debug!(
            model = spec.api_model,
            backend = %spec.backend,
            prompt_chars = prompt.len(),
            "Querying model"
        );

        let response = provider.chat(request).await?;

        if response.stop_reason == StopReason::MaxTokens {
            tracing::warn!(model = spec.api_model, "Response truncated at max_tokens");
        }

        let usage = if response.usage.total() == 0 {
            TokenUsage::new(
                estimate_tokens(system_prompt) + estimate_tokens(prompt),
                estimate_tokens(&response.content),
            )
        } else {
            response.usage.clone()
        };
        self.record_usage(spec.cost_key, &usage, options.phase);

        Ok(response.content)
    }

    fn build_request(
        &self,
        spec: &ModelSpec,
        system_prompt: &str,
        prompt: &str,
        options: &QueryOptions<'_>,
    ) -> ChatRequest {
        if spec.reasoning {
            // No system role and fixed sampling on reasoning models.
            let content = if system_prompt.trim().is_empty() {
                prompt.to_string()
            } else {
                format!("{}\n\n{}", system_prompt.trim(), prompt)
            };
            return ChatRequest {
                model: spec.api_model.to_string(),
                messages: vec![Message::user(content)],
                max_tokens: self.max_tokens,
                temperature: None,
                system: None,
            };
        }

        let temperature = match spec.backend {
            Backend::Anthropic => options.temperature,
            Backend::OpenAI | Backend::DeepSeek => {
                Some(options.temperature.unwrap_or(self.default_temperature))
            }
        };

        ChatRequest {
            model: spec.api_model.to_string(),
            messages: vec![Message::user(prompt)],
            max_tokens: self.max_tokens,
            temperature,
            system: Some(system_prompt.to_string()),
        }
    }

    fn record_usage(&self, cost_key: &str, usage: &TokenUsage, phase: Option<&str>) {
        let estimate = {
            let Ok(mut tracker) = self.costs.lock() else {
                tracing::warn!("Cost tracker lock poisoned; usage not recorded");
                return;
            };
            match phase {
                Some(phase) => tracker.record_with_phase(cost_key, usage, phase),
                None => tracker.record(cost_key, usage),
            }
            tracker.estimate()
        };
        tracing::debug!(estimate, "Current cost estimate");
        if let Some(sink) = &self.cost_sink {
            sink(estimate);
        }
    }
}
