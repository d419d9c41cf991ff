// src/cli/review.rs — `devflow review`: one-off review of a codebase

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::agents::{AgentContext, ReviewAgent, ReviewDecision};
use crate::infra::config::Config;
use crate::provider::gateway::ModelGateway;

pub async fn run_review(
    plan: &str,
    code_path: &Path,
    gateway: Arc<ModelGateway>,
    config: &Config,
) -> anyhow::Result<()> {
    let codebase = std::fs::read_to_string(code_path)
        .with_context(|| format!("Failed to read {}", code_path.display()))?;

    let model = config
        .models
        .reviewer
        .as_deref()
        .unwrap_or(&config.models.default);
    let agent = ReviewAgent::new(
        AgentContext::new(gateway, model).with_notes(config.workflow.notes.clone()),
    );

    let Some(review) = agent.review_code(plan, &codebase).await? else {
        anyhow::bail!("The reviewer's answer held no JSON review");
    };

    println!("{}", serde_json::to_string_pretty(&review)?);
    match ReviewDecision::from_review(&review) {
        Some(ReviewDecision::Accept) => eprintln!("Decision: Accept"),
        Some(ReviewDecision::NeedsImprovement) => eprintln!("Decision: Needs Improvement"),
        None => tracing::warn!("Review carried no recognised Decision"),
    }
    Ok(())
}
