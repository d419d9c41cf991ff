// src/solver/mod.rs — Refinement tasks for generated code and papers

pub mod code;
pub mod paper;

use std::sync::Arc;

use crate::extract::parse_score;
use crate::infra::errors::DevflowError;
use crate::provider::gateway::{ModelGateway, QueryOptions};
use crate::util::truncate_str;

pub use code::{CodeRefiner, CodeSolver};
pub use paper::PaperSolver;

/// Gateway + model pair every solver stage queries through.
#[derive(Clone)]
pub struct SolverModel {
    pub gateway: Arc<ModelGateway>,
    pub model: String,
}

impl SolverModel {
    pub fn new(gateway: Arc<ModelGateway>, model: impl Into<String>) -> Self {
        Self {
            gateway,
            model: model.into(),
        }
    }

    /// Query with the stage name as the cost phase.
    pub(crate) async fn ask(
        &self,
        stage: &str,
        system_prompt: &str,
        prompt: &str,
    ) -> Result<String, DevflowError> {
        let options = QueryOptions {
            phase: Some(stage),
            ..Default::default()
        };
        self.gateway
            .query_with(&self.model, system_prompt, prompt, options)
            .await
    }

    /// Ask for a bare 0-1 score; anything unparsable counts as 0.
    pub(crate) async fn score(&self, system_prompt: &str, prompt: &str) -> Result<f64, DevflowError> {
        let answer = self.ask("evaluate", system_prompt, prompt).await?;
        if answer.trim().parse::<f64>().is_err() {
            tracing::debug!(answer = %truncate_str(answer.trim(), 80), "Unparsable score, using 0");
        }
        Ok(parse_score(&answer))
    }
}
