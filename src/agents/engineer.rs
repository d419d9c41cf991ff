// src/agents/engineer.rs — Software engineer agent

use async_trait::async_trait;

use super::{AgentContext, AgentRole, AgentTask, RoleAgent};
use crate::infra::errors::DevflowError;

const ENGINEER_PROMPT: &str = "\
You are a software engineer implementing features for an automated development pipeline.
Given the project requirements and a feature specification, produce high-quality Python code.
Keep the implementation modular, documented and efficient.";

pub struct EngineerAgent {
    ctx: AgentContext,
}

impl EngineerAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    pub async fn develop_feature(
        &self,
        requirements: &str,
        feature_spec: &str,
    ) -> Result<String, DevflowError> {
        let prompt = format!(
            "Project Requirements: {}\n\nFeature Specification: {}",
            requirements, feature_spec
        );
        let out = self
            .ctx
            .ask(AgentRole::Engineer, ENGINEER_PROMPT, &prompt)
            .await?;
        Ok(out.trim().to_string())
    }
}

#[async_trait]
impl RoleAgent for EngineerAgent {
    fn role(&self) -> AgentRole {
        AgentRole::Engineer
    }

    async fn perform_task(&self, task: &AgentTask<'_>) -> anyhow::Result<String> {
        let requirements = if task.artifacts.is_empty() {
            task.project_name.to_string()
        } else {
            format!("{}\n\nEarlier work:\n{}", task.project_name, task.context())
        };
        Ok(self.develop_feature(&requirements, task.subtask).await?)
    }
}
