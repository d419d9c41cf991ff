// src/agents/devops.rs — DevOps engineer agent

use async_trait::async_trait;

use super::{AgentContext, AgentRole, AgentTask, RoleAgent};
use crate::infra::errors::DevflowError;

const DEVOPS_PROMPT: &str = "\
You are a DevOps engineer automating deployment pipelines.
Given an infrastructure configuration and a deployment strategy, write a deployment script
suitable for CI/CD that keeps security and scalability in mind.";

pub struct DevOpsAgent {
    ctx: AgentContext,
}

impl DevOpsAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    pub async fn deploy_application(
        &self,
        infra_config: &str,
        strategy: &str,
    ) -> Result<String, DevflowError> {
        let prompt = format!(
            "Infrastructure Configuration: {}\n\nDeployment Strategy: {}",
            infra_config, strategy
        );
        let out = self.ctx.ask(AgentRole::DevOps, DEVOPS_PROMPT, &prompt).await?;
        Ok(out.trim().to_string())
    }
}

#[async_trait]
impl RoleAgent for DevOpsAgent {
    fn role(&self) -> AgentRole {
        AgentRole::DevOps
    }

    async fn perform_task(&self, task: &AgentTask<'_>) -> anyhow::Result<String> {
        let infra = match task.artifact("design components") {
            Some(design) => format!("{}\n\n{}", task.project_name, design),
            None => task.project_name.to_string(),
        };
        Ok(self.deploy_application(&infra, task.subtask).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::{gateway_over, ScriptedProvider};
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_deploy_prompt_shape() {
        let provider = ScriptedProvider::fixed("#!/bin/sh\ndocker compose up -d\n");
        let agent = DevOpsAgent::new(AgentContext::new(gateway_over(provider.clone()), "gpt-4o"));
        let artifacts = BTreeMap::new();

        let out = agent
            .perform_task(&AgentTask::new("web shop", "deploy application", &artifacts))
            .await
            .unwrap();
        assert_eq!(out, "#!/bin/sh\ndocker compose up -d");
        assert_eq!(
            provider.last_request().messages[0].content,
            "Infrastructure Configuration: web shop\n\nDeployment Strategy: deploy application"
        );
    }
}
