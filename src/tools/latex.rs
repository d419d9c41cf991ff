// src/tools/latex.rs — Write LaTeX to disk and compile it with pdflatex

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::infra::config::ToolsConfig;
use crate::infra::errors::DevflowError;

const DOCUMENT_CLASS: &str = r"\documentclass{article}";
const PACKAGES: &str =
    r"\usepackage{amsmath, amssymb, graphicx, hyperref, xcolor, algorithm, algpseudocode}";
const TEX_FILE: &str = "temp.tex";
const COMPILER: &str = "pdflatex";

#[derive(Debug, Clone)]
pub struct LatexCompiler {
    dir: PathBuf,
    timeout: Duration,
    program: String,
}

impl LatexCompiler {
    pub fn new(dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            dir: dir.into(),
            timeout,
            program: COMPILER.to_string(),
        }
    }

    pub fn from_config(config: &ToolsConfig) -> Self {
        Self::new(&config.latex_dir, Duration::from_secs(config.latex_timeout_secs))
    }

    /// Use another TeX engine binary.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn tex_path(&self) -> PathBuf {
        self.dir.join(TEX_FILE)
    }

    /// Write the source (with the standard packages injected) to
    /// `<dir>/temp.tex` and, when `compile` is set, run the engine there.
    pub async fn compile(&self, latex: &str, compile: bool) -> Result<String, DevflowError> {
        let source = inject_packages(latex);
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.tex_path(), source).await?;

        if !compile {
            return Ok("Compilation successful".to_string());
        }

        let program = which::which(&self.program).map_err(|_| DevflowError::ToolFailed {
            tool: self.program.clone(),
            message: format!("{} not found on PATH", self.program),
        })?;

        self.run(&program).await
    }

    async fn run(&self, program: &Path) -> Result<String, DevflowError> {
        tracing::debug!(dir = %self.dir.display(), "Running {}", self.program);

        let child = Command::new(program)
            .args(["-interaction=nonstopmode", TEX_FILE])
            .current_dir(&self.dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| DevflowError::ToolTimeout {
                tool: self.program.clone(),
                secs: self.timeout.as_secs(),
            })??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if output.status.success() {
            return Ok(format!("Compilation successful: {}", stdout));
        }

        // pdflatex reports most errors on stdout.
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = if stderr.trim().is_empty() {
            stdout.into_owned()
        } else {
            stderr.into_owned()
        };
        Err(DevflowError::ToolFailed {
            tool: self.program.clone(),
            message,
        })
    }
}

/// Add the standard package line after every `\documentclass{article}`.
pub fn inject_packages(latex: &str) -> String {
    latex.replace(DOCUMENT_CLASS, &format!("{}\n{}", DOCUMENT_CLASS, PACKAGES))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "\\documentclass{article}\n\\begin{document}\nHi\n\\end{document}";

    #[test]
    fn test_inject_packages() {
        let out = inject_packages(DOC);
        assert!(out.starts_with("\\documentclass{article}\n\\usepackage{amsmath, amssymb"));
        assert!(out.ends_with("\\end{document}"));
    }

    #[test]
    fn test_inject_packages_other_class_untouched() {
        let src = "\\documentclass{report}\n";
        assert_eq!(inject_packages(src), src);
    }

    #[tokio::test]
    async fn test_write_without_compiling() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = LatexCompiler::new(dir.path().join("tex"), Duration::from_secs(30));

        let msg = compiler.compile(DOC, false).await.unwrap();
        assert_eq!(msg, "Compilation successful");

        let written = std::fs::read_to_string(compiler.tex_path()).unwrap();
        assert!(written.contains("\\usepackage{amsmath"));
    }

    #[tokio::test]
    async fn test_missing_engine() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = LatexCompiler::new(dir.path(), Duration::from_secs(30))
            .with_program("devflow-no-such-tex");

        let err = compiler.compile(DOC, true).await.unwrap_err();
        assert!(matches!(err, DevflowError::ToolFailed { .. }));
        assert!(err.to_string().starts_with("[ERROR]: devflow-no-such-tex failed"));
    }
}
