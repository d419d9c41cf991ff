// src/cli/optimize.rs — `devflow code` / `devflow paper`: refine until the step budget runs out

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::core::refiner::{RefineTask, Refiner};
use crate::core::types::{RefineOutcome, RefineStatus};
use crate::infra::config::Config;
use crate::provider::gateway::ModelGateway;
use crate::solver::{CodeSolver, PaperSolver, SolverModel};
use crate::tools::{CodeExecutor, LatexCompiler};

use super::progress::terminal_progress;

pub struct CodeArgs {
    pub description: Option<String>,
    pub file: Option<PathBuf>,
    pub steps: Option<u32>,
    pub execute: bool,
    pub output: Option<PathBuf>,
}

pub async fn run_code(
    args: CodeArgs,
    gateway: Arc<ModelGateway>,
    config: &Config,
    quiet: bool,
) -> anyhow::Result<()> {
    let description = match (args.description, &args.file) {
        (Some(d), _) => d,
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => anyhow::bail!("Provide --description or --file"),
    };

    let mut solver = CodeSolver::new(
        solver_model(gateway, config),
        description,
        config.refiner.max_refine_attempts,
    );
    if args.execute {
        solver = solver.with_executor(CodeExecutor::from_config(&config.tools));
    }

    let outcome = optimize(&solver, args.steps, config, quiet).await?;
    emit_best(&outcome, "code", args.output.as_deref())
}

pub struct PaperArgs {
    pub topic: String,
    pub steps: Option<u32>,
    pub compile: bool,
    pub output: Option<PathBuf>,
}

pub async fn run_paper(
    args: PaperArgs,
    gateway: Arc<ModelGateway>,
    config: &Config,
    quiet: bool,
) -> anyhow::Result<()> {
    let mut solver = PaperSolver::new(solver_model(gateway, config), args.topic);
    if args.compile {
        solver = solver.with_compiler(LatexCompiler::from_config(&config.tools));
    }

    let outcome = optimize(&solver, args.steps, config, quiet).await?;
    emit_best(&outcome, "paper", args.output.as_deref())
}

fn solver_model(gateway: Arc<ModelGateway>, config: &Config) -> SolverModel {
    let model = config
        .models
        .solver
        .clone()
        .unwrap_or_else(|| config.models.default.clone());
    SolverModel::new(gateway, model)
}

async fn optimize(
    task: &dyn RefineTask,
    steps: Option<u32>,
    config: &Config,
    quiet: bool,
) -> anyhow::Result<RefineOutcome> {
    let mut refiner = step_budget(steps, config);
    if !quiet {
        refiner = refiner.with_progress(terminal_progress());
    }
    refiner.optimize(task).await
}

/// `--steps` wins over the configured budget.
fn step_budget(steps: Option<u32>, config: &Config) -> Refiner {
    match steps {
        Some(n) => Refiner::new(n),
        None => Refiner::from_config(&config.refiner),
    }
}

/// Print or save the best candidate. Generation failure and "nothing scored"
/// are reported as errors so the exit code reflects them.
fn emit_best(outcome: &RefineOutcome, what: &str, output: Option<&Path>) -> anyhow::Result<()> {
    if outcome.status == RefineStatus::GenerationFailed {
        anyhow::bail!("Failed to generate initial {}.", what);
    }
    let Some(best) = &outcome.best else {
        anyhow::bail!(
            "No {} scored above 0 in {} step(s).",
            what,
            outcome.steps
        );
    };

    match output {
        Some(path) => {
            std::fs::write(path, best)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "Best {} (score {:.2}) written to {}",
                what,
                outcome.best_score,
                path.display()
            );
        }
        None => println!("{}", best),
    }
    Ok(())
}
