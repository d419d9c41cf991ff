// src/agents/qa.rs — QA engineer agent

use async_trait::async_trait;

use super::{AgentContext, AgentRole, AgentTask, RoleAgent};
use crate::infra::errors::DevflowError;

const QA_PROMPT: &str = "\
You are a QA engineer writing unit and integration tests.
Given a feature implementation, produce a thorough test suite that covers edge cases.";

/// Artifact QA tests against when it exists.
const CODE_ARTIFACT: &str = "develop modules";

pub struct QaAgent {
    ctx: AgentContext,
}

impl QaAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    pub async fn generate_tests(&self, feature_code: &str) -> Result<String, DevflowError> {
        let prompt = format!("Feature Code:\n{}", feature_code);
        let out = self.ctx.ask(AgentRole::Qa, QA_PROMPT, &prompt).await?;
        Ok(out.trim().to_string())
    }
}

#[async_trait]
impl RoleAgent for QaAgent {
    fn role(&self) -> AgentRole {
        AgentRole::Qa
    }

    async fn perform_task(&self, task: &AgentTask<'_>) -> anyhow::Result<String> {
        let feature_code = match task.artifact(CODE_ARTIFACT) {
            Some(code) => code.to_string(),
            None => format!("Project: {}\nTask: {}", task.project_name, task.subtask),
        };
        Ok(self.generate_tests(&feature_code).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::{gateway_over, ScriptedProvider};
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_uses_code_artifact() {
        let provider = ScriptedProvider::fixed(" def test_add(): pass ");
        let agent = QaAgent::new(AgentContext::new(gateway_over(provider.clone()), "gpt-4o-mini"));
        let mut artifacts = BTreeMap::new();
        artifacts.insert("develop modules".to_string(), "def add(a, b): ...".to_string());

        let out = agent
            .perform_task(&AgentTask::new("calc", "run tests", &artifacts))
            .await
            .unwrap();
        assert_eq!(out, "def test_add(): pass");
        assert_eq!(
            provider.last_request().messages[0].content,
            "Feature Code:\ndef add(a, b): ..."
        );
    }

    #[tokio::test]
    async fn test_falls_back_to_task_description() {
        let provider = ScriptedProvider::fixed("tests");
        let agent = QaAgent::new(AgentContext::new(gateway_over(provider.clone()), "gpt-4o-mini"));
        let artifacts = BTreeMap::new();

        agent
            .perform_task(&AgentTask::new("calc", "integrate components", &artifacts))
            .await
            .unwrap();
        assert_eq!(
            provider.last_request().messages[0].content,
            "Feature Code:\nProject: calc\nTask: integrate components"
        );
    }
}
