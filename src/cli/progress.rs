// src/cli/progress.rs — Terminal progress renderer for workflow and refiner runs

use crate::core::types::ProgressEvent;

/// Build a progress callback that writes formatted lines to stderr.
///
/// All progress output goes to stderr so stdout stays clean for results.
/// Suitable for `DevWorkflow::with_progress()` and `Refiner::with_progress()`.
pub fn terminal_progress() -> impl Fn(ProgressEvent) + Send + Sync + 'static {
    move |event| eprintln!("{}", format_event(&event))
}

pub fn format_event(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::Generated { label } => format!("[{}] initial candidate ready", label),
        ProgressEvent::StepScored {
            label,
            step,
            max_steps,
            score,
            best_score,
        } => format!(
            "[{} {}/{}] score={:.2} best={:.2}",
            label, step, max_steps, score, best_score
        ),
        ProgressEvent::Refined {
            label,
            step,
            changed,
        } => {
            let what = if *changed { "refined" } else { "kept current" };
            format!("[{} {}]   {}", label, step, what)
        }
        ProgressEvent::RefineDone {
            label,
            steps,
            best_score,
            status,
        } => format!(
            "[{} done] {} after {} step(s), best={:.2}",
            label, status, steps, best_score
        ),
        ProgressEvent::PhaseStart {
            phase,
            index,
            total,
        } => format!("[phase {}/{}] {}", index, total, phase),
        ProgressEvent::SubtaskDone {
            subtask,
            role,
            elapsed_secs,
            model_calls,
        } => format!(
            "  -> {} ({}) {:.2}s, {} call(s)",
            subtask, role, elapsed_secs, model_calls
        ),
        ProgressEvent::SubtaskSkipped { subtask } => {
            format!("  -> {} skipped (no agent)", subtask)
        }
        ProgressEvent::WorkflowDone {
            completed,
            total,
            cost,
        } => format!(
            "[done] {}/{} subtasks completed, cost=${:.4}",
            completed, total, cost
        ),
    }
}

/// Running spend line printed after each model call.
pub fn format_cost(estimate: f64) -> String {
    format!("[cost] ${:.6} so far", estimate)
}
