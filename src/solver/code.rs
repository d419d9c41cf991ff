// src/solver/code.rs — Code generation solver and the code refinement agent

use async_trait::async_trait;

use super::SolverModel;
use crate::core::refiner::RefineTask;
use crate::core::types::Evaluation;
use crate::extract::extract_code;
use crate::infra::errors::DevflowError;
use crate::tools::executor::{is_error_output, CodeExecutor};

pub const DEFAULT_FEEDBACK: &str = "Improve performance and correctness.";

const GENERATE_PROMPT: &str = "\
You are a machine learning engineer.
Write a Python script that fulfils the project requirements correctly and efficiently.
Output the script wrapped in ```python.";

const EVALUATE_PROMPT: &str = "\
You are reviewing the quality of a machine learning script.
Score it from 0 to 1 for correctness, efficiency and fit with the project description.
Output only the numeric score.";

const REFINE_PROMPT: &str = "\
You are a code refinement agent.
Analyse the code and the error message, then write an improved version that resolves the issue
while staying correct, readable and maintainable.
Output the refined code wrapped in ```python.";

/// Asks for a fixed version of a snippet, retrying until a python block
/// comes back.
pub struct CodeRefiner {
    model: SolverModel,
    max_attempts: u32,
}

impl CodeRefiner {
    pub fn new(model: SolverModel, max_attempts: u32) -> Self {
        Self {
            model,
            max_attempts,
        }
    }

    /// `Ok(None)` when no attempt produced a python block.
    pub async fn refine_code(&self, code: &str, error: &str) -> Result<Option<String>, DevflowError> {
        let prompt = format!("Error: {}\n\nCode:\n{}", error, code);
        for attempt in 1..=self.max_attempts {
            let response = self.model.ask("refine", REFINE_PROMPT, &prompt).await?;
            if let Some(fixed) = extract_code(&response) {
                return Ok(Some(fixed));
            }
            tracing::debug!(attempt, max = self.max_attempts, "Refinement held no python block");
        }
        Ok(None)
    }
}

pub struct CodeSolver {
    model: SolverModel,
    description: String,
    refiner: CodeRefiner,
    executor: Option<CodeExecutor>,
}

impl CodeSolver {
    pub fn new(model: SolverModel, description: impl Into<String>, max_refine_attempts: u32) -> Self {
        Self {
            refiner: CodeRefiner::new(model.clone(), max_refine_attempts),
            model,
            description: description.into(),
            executor: None,
        }
    }

    /// Run every candidate before scoring it.
    pub fn with_executor(mut self, executor: CodeExecutor) -> Self {
        self.executor = Some(executor);
        self
    }
}

#[async_trait]
impl RefineTask for CodeSolver {
    fn label(&self) -> &str {
        "code"
    }

    async fn generate(&self) -> anyhow::Result<Option<String>> {
        let response = self
            .model
            .ask("generate", GENERATE_PROMPT, &self.description)
            .await?;
        Ok(extract_code(&response))
    }

    async fn evaluate(&self, candidate: &str) -> anyhow::Result<Evaluation> {
        let mut prompt = format!(
            "Code:\n{}\n\nProject Description:\n{}",
            candidate, self.description
        );

        let mut feedback = DEFAULT_FEEDBACK.to_string();
        if let Some(executor) = &self.executor {
            let output = executor.execute(candidate).await;
            prompt.push_str(&format!("\n\nExecution Output:\n{}", output));
            if is_error_output(&output) {
                feedback = output;
            }
        }

        let score = self.model.score(EVALUATE_PROMPT, &prompt).await?;
        Ok(Evaluation::new(score, feedback))
    }

    async fn refine(
        &self,
        candidate: &str,
        evaluation: &Evaluation,
    ) -> anyhow::Result<Option<String>> {
        Ok(self.refiner.refine_code(candidate, &evaluation.feedback).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::refiner::Refiner;
    use crate::core::types::RefineStatus;
    use crate::provider::testing::{gateway_over, ScriptedProvider};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn model(provider: Arc<ScriptedProvider>) -> SolverModel {
        SolverModel::new(gateway_over(provider), "gpt-4o-mini")
    }

    #[tokio::test]
    async fn test_refine_code_retries_until_block() {
        let n = Arc::new(AtomicU32::new(0));
        let counter = n.clone();
        let provider = ScriptedProvider::new(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                "no code, sorry".to_string()
            } else {
                "```python\nfixed()\n```".to_string()
            }
        });
        let refiner = CodeRefiner::new(model(provider.clone()), 3);
        let out = refiner.refine_code("broken()", "NameError").await.unwrap();
        assert_eq!(out.as_deref(), Some("fixed()"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            provider.last_request().messages[0].content,
            "Error: NameError\n\nCode:\nbroken()"
        );
    }

    #[tokio::test]
    async fn test_refine_code_gives_up() {
        let provider = ScriptedProvider::fixed("still nothing");
        let refiner = CodeRefiner::new(model(provider.clone()), 3);
        assert!(refiner.refine_code("x", "e").await.unwrap().is_none());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    /// Routes on the system prompt: generation, scoring, refinement.
    fn solver_provider() -> Arc<ScriptedProvider> {
        let refinements = Arc::new(AtomicU32::new(0));
        ScriptedProvider::new(move |req| {
            let system = req.system.clone().unwrap_or_default();
            let user = &req.messages[0].content;
            if system.contains("machine learning engineer") {
                "```python\nv = 0\n```".into()
            } else if system.contains("Score it") {
                // Later versions score higher until v = 2, which scores lowest.
                if user.contains("v = 2") {
                    "0.1".into()
                } else if user.contains("v = 1") {
                    "0.8".into()
                } else {
                    "0.4".into()
                }
            } else {
                let n = refinements.fetch_add(1, Ordering::SeqCst) + 1;
                format!("```python\nv = {}\n```", n)
            }
        })
    }

    #[tokio::test]
    async fn test_solver_keeps_best_version() {
        let provider = solver_provider();
        let solver = CodeSolver::new(model(provider.clone()), "predict house prices", 3);

        let out = Refiner::new(3).optimize(&solver).await.unwrap();
        assert_eq!(out.status, RefineStatus::Completed);
        assert_eq!(out.best.as_deref(), Some("v = 1"));
        assert_eq!(out.best_score, 0.8);
        // 1 generate + 3 scores + 3 refinements
        assert_eq!(provider.calls.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn test_solver_generation_failed() {
        let provider = ScriptedProvider::fixed("I cannot help with that.");
        let solver = CodeSolver::new(model(provider), "anything", 3);
        let out = Refiner::new(3).optimize(&solver).await.unwrap();
        assert_eq!(out.status, RefineStatus::GenerationFailed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execution_error_becomes_feedback() {
        let provider = ScriptedProvider::fixed("0.5");
        let executor =
            CodeExecutor::new("sh", std::time::Duration::from_secs(5), 1000);
        let solver = CodeSolver::new(model(provider.clone()), "desc", 3).with_executor(executor);

        let eval = solver.evaluate("echo out; exit 1").await.unwrap();
        assert_eq!(eval.score, 0.5);
        assert!(eval.feedback.starts_with("out\n[ERROR]: exit code 1"));
        assert!(provider
            .last_request()
            .messages[0]
            .content
            .contains("Execution Output:\nout\n"));

        let ok = solver.evaluate("echo fine").await.unwrap();
        assert_eq!(ok.feedback, DEFAULT_FEEDBACK);
    }
}
