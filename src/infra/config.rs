// src/infra/config.rs — Configuration loading (TOML)

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::infra::errors::DevflowError;
use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub workflow: WorkflowConfig,

    #[serde(default)]
    pub refiner: RefinerConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

/// Model backbone per role. Unset roles fall back to `default`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub default: String,
    pub engineer: Option<String>,
    pub qa: Option<String>,
    pub devops: Option<String>,
    pub reviewer: Option<String>,
    pub solver: Option<String>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            default: "gpt-4o-mini".into(),
            engineer: None,
            qa: None,
            devops: None,
            reviewer: None,
            solver: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Total attempts per query, including the first one.
    pub tries: u32,
    pub retry_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_retry_delay_ms: u64,
    /// Default sampling temperature for backends that accept one.
    pub temperature: f32,
    /// Completion cap sent with every request. Unset leaves it to the backend.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Print the running cost estimate to stderr after every model call.
    pub print_cost: bool,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            tries: 5,
            retry_delay_ms: 5_000,
            backoff_factor: 2.0,
            max_retry_delay_ms: 30_000,
            temperature: 0.7,
            max_tokens: None,
            print_cost: true,
            request_timeout_secs: 300,
        }
    }
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub output_dir: String,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            output_dir: "project_repo".into(),
            notes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinerConfig {
    pub max_steps: u32,
    pub max_refine_attempts: u32,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            max_steps: 10,
            max_refine_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    pub interpreter: String,
    pub exec_timeout_secs: u64,
    pub max_output_len: usize,
    pub latex_dir: String,
    pub latex_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".into(),
            exec_timeout_secs: 60,
            max_output_len: 1000,
            latex_dir: "research_dir/tex".into(),
            latex_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub min_likes: u64,
    pub min_downloads: u64,
    pub top_n: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_likes: 3,
            min_downloads: 50,
            top_n: 10,
        }
    }
}

impl Config {
    /// Load config from the default location, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        match paths::config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Reject values that parse but cannot drive a run.
    pub fn validate(&self) -> Result<(), DevflowError> {
        if self.gateway.tries == 0 {
            return Err(DevflowError::Config("gateway.tries must be at least 1".into()));
        }
        if self.gateway.backoff_factor < 1.0 {
            return Err(DevflowError::Config(
                "gateway.backoff_factor must be at least 1.0".into(),
            ));
        }
        if self.gateway.max_tokens == Some(0) {
            return Err(DevflowError::Config("gateway.max_tokens must be positive".into()));
        }
        if self.tools.interpreter.trim().is_empty() {
            return Err(DevflowError::Config("tools.interpreter is empty".into()));
        }
        Ok(())
    }
}
