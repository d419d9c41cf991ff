// src/tools/executor.rs — Run generated code in a child interpreter
//
// Output is returned as text, failures included, so it can be fed back to the
// model. Nothing here returns an error to the caller.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::infra::config::ToolsConfig;

pub const TIMEOUT_MESSAGE: &str = "[ERROR]: Execution timed out. Reduce code complexity.";

#[derive(Debug, Clone)]
pub struct CodeExecutor {
    interpreter: String,
    timeout: Duration,
    max_output_len: usize,
}

impl Default for CodeExecutor {
    fn default() -> Self {
        Self::from_config(&ToolsConfig::default())
    }
}

impl CodeExecutor {
    pub fn new(interpreter: impl Into<String>, timeout: Duration, max_output_len: usize) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
            max_output_len,
        }
    }

    pub fn from_config(config: &ToolsConfig) -> Self {
        Self::new(
            config.interpreter.clone(),
            Duration::from_secs(config.exec_timeout_secs),
            config.max_output_len,
        )
    }

    /// Run `code` as `<interpreter> -c <code>`. Returns stdout, with
    /// `[ERROR]: ...` and stderr appended on a non-zero exit, cut to
    /// `max_output_len` characters.
    pub async fn execute(&self, code: &str) -> String {
        tracing::debug!(interpreter = %self.interpreter, bytes = code.len(), "Executing code");

        let child = Command::new(&self.interpreter)
            .arg("-c")
            .arg(code)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Err(_) => {
                tracing::warn!(timeout_secs = self.timeout.as_secs(), "Code execution timed out");
                return TIMEOUT_MESSAGE.to_string();
            }
            Ok(Err(e)) => {
                return self.clip(format!(
                    "[ERROR]: Failed to start {}: {}\n",
                    self.interpreter, e
                ));
            }
            Ok(Ok(output)) => output,
        };

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let status = output
                .status
                .code()
                .map(|c| format!("exit code {}", c))
                .unwrap_or_else(|| "terminated by signal".to_string());
            text.push_str(&format!("[ERROR]: {}\n{}", status, stderr));
        }
        self.clip(text)
    }

    fn clip(&self, text: String) -> String {
        if text.chars().count() <= self.max_output_len {
            text
        } else {
            text.chars().take(self.max_output_len).collect()
        }
    }
}

/// True when the executor output reports a failure.
pub fn is_error_output(output: &str) -> bool {
    output.contains("[ERROR]")
}
