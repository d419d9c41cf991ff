// src/core/types.rs — Core domain types shared by the refiner and the workflow

use serde::{Deserialize, Serialize};

/// Score and feedback for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: f64,
    pub feedback: String,
}

impl Evaluation {
    pub fn new(score: f64, feedback: impl Into<String>) -> Self {
        Self {
            score,
            feedback: feedback.into(),
        }
    }

    /// Zero score, used when scoring itself failed.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::new(0.0, reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefineStatus {
    /// Ran the full step budget.
    Completed,
    /// The initial candidate could not be produced; no steps ran.
    GenerationFailed,
}

impl std::fmt::Display for RefineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefineStatus::Completed => write!(f, "completed"),
            RefineStatus::GenerationFailed => write!(f, "generation failed"),
        }
    }
}

/// Result of an optimization run.
#[derive(Debug, Clone, Serialize)]
pub struct RefineOutcome {
    /// Highest-scoring candidate, `None` if nothing scored above zero.
    pub best: Option<String>,
    pub best_score: f64,
    /// Steps actually evaluated.
    pub steps: u32,
    pub status: RefineStatus,
}

impl RefineOutcome {
    pub fn generation_failed() -> Self {
        Self {
            best: None,
            best_score: 0.0,
            steps: 0,
            status: RefineStatus::GenerationFailed,
        }
    }
}

/// Lifecycle events for the terminal renderer (see `cli::progress`).
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// The refiner produced its first candidate.
    Generated { label: String },
    StepScored {
        label: String,
        step: u32,
        max_steps: u32,
        score: f64,
        best_score: f64,
    },
    /// `changed` is false when the refinement was rejected or failed.
    Refined {
        label: String,
        step: u32,
        changed: bool,
    },
    RefineDone {
        label: String,
        steps: u32,
        best_score: f64,
        status: RefineStatus,
    },
    PhaseStart {
        phase: String,
        index: usize,
        total: usize,
    },
    SubtaskDone {
        subtask: String,
        role: String,
        elapsed_secs: f64,
        model_calls: u64,
    },
    SubtaskSkipped { subtask: String },
    WorkflowDone {
        completed: usize,
        total: usize,
        cost: f64,
    },
}
