// src/solver/paper.rs — Research paper generation solver

use async_trait::async_trait;

use super::SolverModel;
use crate::core::refiner::RefineTask;
use crate::core::types::Evaluation;
use crate::extract::extract_latex;
use crate::tools::latex::LatexCompiler;

pub const DEFAULT_FEEDBACK: &str = "Improve clarity and completeness.";

const GENERATE_PROMPT: &str = "\
You are a research assistant.
Write a well-structured research paper on the given topic, clear, accurate and complete.
Output the paper wrapped in ```latex.";

const EVALUATE_PROMPT: &str = "\
You are reviewing a generated research paper.
Score it from 0 to 1 for clarity, scientific merit and completeness.
Output only the numeric score.";

const REFINE_PROMPT: &str = "\
You are a research paper refinement assistant.
Improve the paper according to the feedback, keeping it readable, coherent and scientifically valid.
Output the improved paper wrapped in ```latex.";

pub struct PaperSolver {
    model: SolverModel,
    topic: String,
    compiler: Option<LatexCompiler>,
}

impl PaperSolver {
    pub fn new(model: SolverModel, topic: impl Into<String>) -> Self {
        Self {
            model,
            topic: topic.into(),
            compiler: None,
        }
    }

    /// Compile every candidate before scoring; compile errors become feedback.
    pub fn with_compiler(mut self, compiler: LatexCompiler) -> Self {
        self.compiler = Some(compiler);
        self
    }

    pub async fn refine_paper(
        &self,
        paper: &str,
        feedback: &str,
    ) -> anyhow::Result<Option<String>> {
        let prompt = format!("Feedback: {}\n\nPaper:\n{}", feedback, paper);
        let response = self.model.ask("refine", REFINE_PROMPT, &prompt).await?;
        Ok(extract_latex(&response))
    }
}

#[async_trait]
impl RefineTask for PaperSolver {
    fn label(&self) -> &str {
        "paper"
    }

    async fn generate(&self) -> anyhow::Result<Option<String>> {
        let response = self.model.ask("generate", GENERATE_PROMPT, &self.topic).await?;
        Ok(extract_latex(&response))
    }

    async fn evaluate(&self, candidate: &str) -> anyhow::Result<Evaluation> {
        let mut feedback = DEFAULT_FEEDBACK.to_string();
        if let Some(compiler) = &self.compiler {
            if let Err(e) = compiler.compile(candidate, true).await {
                tracing::debug!("LaTeX compile failed: {}", e);
                feedback = e.to_string();
            }
        }

        let prompt = format!("Paper Content:\n{}\n\nTopic:\n{}", candidate, self.topic);
        let score = self.model.score(EVALUATE_PROMPT, &prompt).await?;
        Ok(Evaluation::new(score, feedback))
    }

    async fn refine(
        &self,
        candidate: &str,
        evaluation: &Evaluation,
    ) -> anyhow::Result<Option<String>> {
        self.refine_paper(candidate, &evaluation.feedback).await
    }
}
