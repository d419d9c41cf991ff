// src/provider/catalog.rs — Model name resolution
//
// Maps the short model names users type to a backend, the dated API model id
// the backend expects, and the key the cost tracker prices it under.

use serde::{Deserialize, Serialize};

use crate::infra::errors::DevflowError;

/// Chat backend a model is served from.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    OpenAI,
    Anthropic,
    DeepSeek,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::OpenAI => "openai",
            Backend::Anthropic => "anthropic",
            Backend::DeepSeek => "deepseek",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub backend: Backend,
    pub api_model: &'static str,
    pub cost_key: &'static str,
    /// Reasoning models reject `temperature` and the system role.
    pub reasoning: bool,
}

impl ModelSpec {
    const fn new(
        backend: Backend,
        api_model: &'static str,
        cost_key: &'static str,
        reasoning: bool,
    ) -> Self {
        Self {
            backend,
            api_model,
            cost_key,
            reasoning,
        }
    }

    /// Resolve a user-facing model name.
    pub fn resolve(model: &str) -> Result<Self, DevflowError> {
        let spec = match model.trim() {
            "gpt-4o-mini" | "gpt4omini" => {
                Self::new(Backend::OpenAI, "gpt-4o-mini-2024-07-18", "gpt-4o-mini", false)
            }
            "gpt-4o" | "gpt4o" => Self::new(Backend::OpenAI, "gpt-4o-2024-08-06", "gpt-4o", false),
            "o1-mini" => Self::new(Backend::OpenAI, "o1-mini-2024-09-12", "o1-mini", true),
            "o1-preview" => Self::new(Backend::OpenAI, "o1-preview", "o1-preview", true),
            "o1" => Self::new(Backend::OpenAI, "o1-2024-12-17", "o1", true),
            "claude-3.5-sonnet" | "claude-3-5-sonnet" => Self::new(
                Backend::Anthropic,
                "claude-3-5-sonnet-latest",
                "claude-3-5-sonnet",
                false,
            ),
            "deepseek-chat" => Self::new(Backend::DeepSeek, "deepseek-chat", "deepseek-chat", false),
            other => return Err(DevflowError::UnsupportedModel(other.to_string())),
        };
        Ok(spec)
    }
}

/// Names accepted by [`ModelSpec::resolve`], for help text and errors.
pub fn supported_models() -> &'static [&'static str] {
    &[
        "gpt-4o-mini",
        "gpt-4o",
        "o1-mini",
        "o1-preview",
        "o1",
        "claude-3.5-sonnet",
        "deepseek-chat",
    ]
}
