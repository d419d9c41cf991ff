// src/agents/mod.rs — Role agents behind one `perform_task` entry point

pub mod devops;
pub mod engineer;
pub mod qa;
pub mod reviewer;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::infra::errors::DevflowError;
use crate::provider::gateway::{ModelGateway, QueryOptions};
use crate::util::excerpt;

pub use devops::DevOpsAgent;
pub use engineer::EngineerAgent;
pub use qa::QaAgent;
pub use reviewer::{ReviewAgent, ReviewDecision};

/// Longest slice of an earlier artifact quoted back into a prompt.
const ARTIFACT_EXCERPT_BYTES: usize = 4_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Engineer,
    Qa,
    DevOps,
    Reviewer,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Engineer => "engineer",
            AgentRole::Qa => "qa",
            AgentRole::DevOps => "devops",
            AgentRole::Reviewer => "reviewer",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of dispatched work. `artifacts` maps earlier subtasks to their
/// saved output.
#[derive(Debug, Clone, Copy)]
pub struct AgentTask<'a> {
    pub project_name: &'a str,
    pub subtask: &'a str,
    pub artifacts: &'a BTreeMap<String, String>,
}

impl<'a> AgentTask<'a> {
    pub fn new(
        project_name: &'a str,
        subtask: &'a str,
        artifacts: &'a BTreeMap<String, String>,
    ) -> Self {
        Self {
            project_name,
            subtask,
            artifacts,
        }
    }

    pub fn artifact(&self, subtask: &str) -> Option<&'a str> {
        self.artifacts.get(subtask).map(String::as_str)
    }

    /// Earlier outputs as labelled excerpts, in subtask-name order.
    pub fn context(&self) -> String {
        self.artifacts
            .iter()
            .map(|(name, output)| format!("## {}\n{}", name, excerpt(output, ARTIFACT_EXCERPT_BYTES)))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[async_trait]
pub trait RoleAgent: Send + Sync {
    fn role(&self) -> AgentRole;

    /// Run the agent on a dispatched subtask and return the text to save.
    async fn perform_task(&self, task: &AgentTask<'_>) -> anyhow::Result<String>;
}

/// State every agent carries: model, shared gateway, notes.
#[derive(Clone)]
pub struct AgentContext {
    pub gateway: Arc<ModelGateway>,
    pub model: String,
    pub notes: Vec<String>,
}

impl AgentContext {
    pub fn new(gateway: Arc<ModelGateway>, model: impl Into<String>) -> Self {
        Self {
            gateway,
            model: model.into(),
            notes: Vec::new(),
        }
    }

    pub fn with_notes(mut self, notes: Vec<String>) -> Self {
        self.notes = notes;
        self
    }

    /// Base role prompt with the notes appended as a list.
    pub fn system_prompt(&self, base: &str) -> String {
        let base = base.trim();
        if self.notes.is_empty() {
            return base.to_string();
        }
        let notes = self
            .notes
            .iter()
            .map(|n| format!("- {}", n))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}\n\nNotes:\n{}", base, notes)
    }

    pub(crate) async fn ask(
        &self,
        role: AgentRole,
        base_system: &str,
        prompt: &str,
    ) -> Result<String, DevflowError> {
        let system = self.system_prompt(base_system);
        let options = QueryOptions {
            phase: Some(role.as_str()),
            ..Default::default()
        };
        self.gateway
            .query_with(&self.model, &system, prompt, options)
            .await
    }
}
