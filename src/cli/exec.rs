// src/cli/exec.rs — `devflow exec` / `devflow latex`: run the local tools directly

use std::path::Path;

use anyhow::Context;

use crate::infra::config::Config;
use crate::tools::executor::is_error_output;
use crate::tools::{CodeExecutor, LatexCompiler};

/// Run a script and print its captured output. Exit status follows the
/// `[ERROR]` marker.
pub async fn run_exec(file: &Path, config: &Config) -> anyhow::Result<()> {
    let code = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let output = CodeExecutor::from_config(&config.tools).execute(&code).await;
    print!("{}", output);
    if is_error_output(&output) {
        anyhow::bail!("Execution of {} reported an error", file.display());
    }
    Ok(())
}

pub async fn run_latex(file: &Path, no_compile: bool, config: &Config) -> anyhow::Result<()> {
    let latex = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let compiler = LatexCompiler::from_config(&config.tools);
    let message = compiler.compile(&latex, !no_compile).await?;
    println!("{}", message);
    eprintln!("Source written to {}", compiler.tex_path().display());
    Ok(())
}
