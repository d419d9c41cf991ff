// src/infra/errors.rs — Error types for devflow

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DevflowError {
    // Provider errors (retriable depending on the flag)
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("Rate limited by '{provider}', retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    #[error("Max retries reached for '{provider}' after {attempts} attempt(s): {last_error}")]
    RetriesExhausted {
        provider: String,
        attempts: u32,
        last_error: String,
    },

    // User errors
    #[error(
        "Unsupported model: {0} (supported: {supported})",
        supported = crate::provider::catalog::supported_models().join(", ")
    )]
    UnsupportedModel(String),

    #[error("No API key configured for the {backend} backend")]
    MissingApiKey { backend: String },

    #[error("No API key provided. Pass --api-key or set OPENAI_API_KEY / ANTHROPIC_API_KEY.")]
    NoApiKey,

    // Tools
    #[error("[ERROR]: {tool} timed out after {secs}s")]
    ToolTimeout { tool: String, secs: u64 },

    #[error("[ERROR]: {tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    // Infra
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DevflowError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            DevflowError::Provider {
                retriable: true,
                ..
            } | DevflowError::RateLimited { .. }
        )
    }
}
