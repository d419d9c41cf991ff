// src/core/refiner.rs — Generate, score, refine, keep the best
//
// A fixed step budget is the only stopping rule. The candidate produced by
// the last refinement is never scored.

use async_trait::async_trait;

use super::types::{Evaluation, ProgressEvent, RefineOutcome, RefineStatus};
use crate::infra::config::RefinerConfig;

/// One optimization problem: how to produce, score and improve a candidate.
#[async_trait]
pub trait RefineTask: Send + Sync {
    /// Short name for logs and progress ("code", "paper").
    fn label(&self) -> &str;

    /// Initial candidate. `Ok(None)` means the response held nothing usable.
    async fn generate(&self) -> anyhow::Result<Option<String>>;

    async fn evaluate(&self, candidate: &str) -> anyhow::Result<Evaluation>;

    /// Improved candidate, or `Ok(None)` to keep the current one.
    async fn refine(
        &self,
        candidate: &str,
        evaluation: &Evaluation,
    ) -> anyhow::Result<Option<String>>;
}

pub struct Refiner {
    max_steps: u32,
    on_progress: Option<Box<dyn Fn(ProgressEvent) + Send + Sync>>,
}

impl Refiner {
    pub fn new(max_steps: u32) -> Self {
        Self {
            max_steps,
            on_progress: None,
        }
    }

    pub fn from_config(config: &RefinerConfig) -> Self {
        Self::new(config.max_steps)
    }

    pub fn with_progress(mut self, cb: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(cb));
        self
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref cb) = self.on_progress {
            cb(event);
        }
    }

    /// Run the loop. Gateway failures during generation propagate; scoring
    /// and refinement failures are logged and absorbed.
    pub async fn optimize(&self, task: &dyn RefineTask) -> anyhow::Result<RefineOutcome> {
        let label = task.label().to_string();

        let Some(mut current) = task.generate().await? else {
            tracing::warn!(task = %label, "Failed to generate initial {}", label);
            self.emit(ProgressEvent::RefineDone {
                label,
                steps: 0,
                best_score: 0.0,
                status: RefineStatus::GenerationFailed,
            });
            return Ok(RefineOutcome::generation_failed());
        };
        self.emit(ProgressEvent::Generated {
            label: label.clone(),
        });

        let mut best: Option<String> = None;
        let mut best_score = 0.0_f64;

        for step in 1..=self.max_steps {
            let evaluation = match task.evaluate(&current).await {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(task = %label, step, "Evaluation failed, scoring 0: {:#}", e);
                    Evaluation::failed(format!("Evaluation failed: {e}"))
                }
            };

            if evaluation.score > best_score {
                best_score = evaluation.score;
                best = Some(current.clone());
            }

            tracing::info!(task = %label, step, score = evaluation.score, "Step scored");
            self.emit(ProgressEvent::StepScored {
                label: label.clone(),
                step,
                max_steps: self.max_steps,
                score: evaluation.score,
                best_score,
            });

            let changed = match task.refine(&current, &evaluation).await {
                Ok(Some(next)) => {
                    current = next;
                    true
                }
                Ok(None) => false,
                Err(e) => {
                    tracing::warn!(task = %label, step, "Refinement failed, keeping candidate: {:#}", e);
                    false
                }
            };
            self.emit(ProgressEvent::Refined {
                label: label.clone(),
                step,
                changed,
            });
        }

        self.emit(ProgressEvent::RefineDone {
            label,
            steps: self.max_steps,
            best_score,
            status: RefineStatus::Completed,
        });

        Ok(RefineOutcome {
            best,
            best_score,
            steps: self.max_steps,
            status: RefineStatus::Completed,
        })
    }
}
