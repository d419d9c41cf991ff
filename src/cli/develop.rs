// src/cli/develop.rs — `devflow develop`: run the phase workflow

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::workflow::DevWorkflow;
use crate::infra::config::Config;
use crate::provider::gateway::ModelGateway;

use super::progress::terminal_progress;

pub async fn run_develop(
    project_name: &str,
    output: Option<PathBuf>,
    gateway: Arc<ModelGateway>,
    config: &Config,
    quiet: bool,
) -> anyhow::Result<()> {
    let mut config = config.clone();
    if let Some(dir) = output {
        config.workflow.output_dir = dir.to_string_lossy().into_owned();
    }

    let mut workflow = DevWorkflow::from_config(project_name, gateway, &config)?;
    if !quiet {
        workflow = workflow.with_progress(terminal_progress());
    }

    let report = workflow.perform_development().await?;

    for path in &report.saved_files {
        println!("{}", path.display());
    }
    if !report.skipped.is_empty() {
        eprintln!("Skipped: {}", report.skipped.join(", "));
    }
    Ok(())
}
