// src/agents/reviewer.rs — Development review agent

use async_trait::async_trait;
use serde::Serialize;

use super::{AgentContext, AgentRole, AgentTask, RoleAgent};
use crate::extract::extract_json_between_markers;
use crate::infra::errors::DevflowError;

const REVIEW_PROMPT: &str = r#"
You are a software engineering reviewer assessing an automated development pipeline.
Review the given project plan and the corresponding codebase.
Answer with a JSON object holding these keys:
- "Summary": short summary of the plan and codebase.
- "Strengths": key strengths of the codebase.
- "Weaknesses": weaknesses or areas for improvement.
- "Code Quality": 1 to 10.
- "Maintainability": 1 to 10.
- "Security": 1 to 10.
- "Scalability": 1 to 10.
- "Decision": either "Accept" or "Needs Improvement".
"#;

/// Subtasks whose output makes up the project plan, in plan order.
const PLAN_ARTIFACTS: &[&str] = &[
    "gather requirements",
    "define scope",
    "design components",
    "define data structures",
];

const CODE_ARTIFACT: &str = "develop modules";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReviewDecision {
    Accept,
    NeedsImprovement,
}

impl ReviewDecision {
    /// Read the `Decision` key of a parsed review.
    pub fn from_review(review: &serde_json::Value) -> Option<Self> {
        let decision = review.get("Decision")?.as_str()?.trim().to_lowercase();
        match decision.as_str() {
            "accept" => Some(ReviewDecision::Accept),
            "needs improvement" => Some(ReviewDecision::NeedsImprovement),
            _ => None,
        }
    }
}

pub struct ReviewAgent {
    ctx: AgentContext,
}

impl ReviewAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    /// Parsed JSON review, `None` when the answer held no JSON object.
    pub async fn review_code(
        &self,
        plan: &str,
        codebase: &str,
    ) -> Result<Option<serde_json::Value>, DevflowError> {
        let raw = self.request_review(plan, codebase).await?;
        Ok(extract_json_between_markers(&raw))
    }

    async fn request_review(&self, plan: &str, codebase: &str) -> Result<String, DevflowError> {
        let prompt = format!("Project Plan: {}\n\nCodebase: {}", plan, codebase);
        self.ctx.ask(AgentRole::Reviewer, REVIEW_PROMPT, &prompt).await
    }
}

#[async_trait]
impl RoleAgent for ReviewAgent {
    fn role(&self) -> AgentRole {
        AgentRole::Reviewer
    }

    async fn perform_task(&self, task: &AgentTask<'_>) -> anyhow::Result<String> {
        let plan_parts: Vec<&str> = PLAN_ARTIFACTS
            .iter()
            .filter_map(|name| task.artifact(name))
            .collect();
        let plan = if plan_parts.is_empty() {
            task.project_name.to_string()
        } else {
            plan_parts.join("\n\n")
        };
        let codebase = match task.artifact(CODE_ARTIFACT) {
            Some(code) => code.to_string(),
            None => task.context(),
        };

        let raw = self.request_review(&plan, &codebase).await?;
        match extract_json_between_markers(&raw) {
            Some(review) => {
                if let Some(decision) = ReviewDecision::from_review(&review) {
                    tracing::info!(?decision, "Review decision");
                }
                Ok(serde_json::to_string_pretty(&review)?)
            }
            None => {
                tracing::warn!("Review response held no JSON object; saving raw text");
                Ok(raw.trim().to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::{gateway_over, ScriptedProvider};
    use serde_json::json;
    use std::collections::BTreeMap;

    const REVIEW: &str = "```json\n{\"Summary\": \"ok\", \"Code Quality\": 7, \"Decision\": \"Needs Improvement\"}\n```";

    fn agent(provider: std::sync::Arc<ScriptedProvider>) -> ReviewAgent {
        ReviewAgent::new(AgentContext::new(gateway_over(provider), "gpt-4o-mini"))
    }

    #[tokio::test]
    async fn test_review_code_parses_json() {
        let review = agent(ScriptedProvider::fixed(REVIEW))
            .review_code("plan", "code")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(review["Code Quality"], 7);
        assert_eq!(
            ReviewDecision::from_review(&review),
            Some(ReviewDecision::NeedsImprovement)
        );
    }

    #[tokio::test]
    async fn test_review_code_without_json() {
        let review = agent(ScriptedProvider::fixed("Looks fine to me."))
            .review_code("plan", "code")
            .await
            .unwrap();
        assert!(review.is_none());
    }

    #[tokio::test]
    async fn test_perform_task_pretty_prints_and_builds_plan() {
        let provider = ScriptedProvider::fixed(REVIEW);
        let mut artifacts = BTreeMap::new();
        artifacts.insert("define scope".to_string(), "scope".to_string());
        artifacts.insert("gather requirements".to_string(), "reqs".to_string());
        artifacts.insert("develop modules".to_string(), "code".to_string());

        let out = agent(provider.clone())
            .perform_task(&AgentTask::new("app", "review codebase", &artifacts))
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["Summary"], "ok");
        assert!(out.contains('\n'));
        assert_eq!(
            provider.last_request().messages[0].content,
            "Project Plan: reqs\n\nscope\n\nCodebase: code"
        );
    }

    #[tokio::test]
    async fn test_perform_task_raw_fallback() {
        let artifacts = BTreeMap::new();
        let out = agent(ScriptedProvider::fixed("  no json here "))
            .perform_task(&AgentTask::new("app", "review codebase", &artifacts))
            .await
            .unwrap();
        assert_eq!(out, "no json here");
    }

    #[test]
    fn test_decision_parsing() {
        assert_eq!(
            ReviewDecision::from_review(&json!({"Decision": "Accept"})),
            Some(ReviewDecision::Accept)
        );
        assert_eq!(
            ReviewDecision::from_review(&json!({"Decision": " needs improvement "})),
            Some(ReviewDecision::NeedsImprovement)
        );
        assert!(ReviewDecision::from_review(&json!({"Decision": "Maybe"})).is_none());
        assert!(ReviewDecision::from_review(&json!({})).is_none());
    }
}
