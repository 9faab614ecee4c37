use std::{collections::BTreeMap, fmt, path::PathBuf};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{ExecError, subprocess::INPUT_PLACEHOLDER};

/// Checker output logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputLogConfig {
    /// Max line length before truncation.
    pub max_line_length: usize,
    /// Log each stdout line at DEBUG.
    pub log_stdout: bool,
    /// Lines of stderr kept in a failure message.
    pub stderr_tail_lines: usize,
}

impl Default for OutputLogConfig {
    fn default() -> Self {
        Self {
            max_line_length: 4096,
            log_stdout: false,
            stderr_tail_lines: 20,
        }
    }
}

/// How to invoke the model checker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubprocessVerifierConfig {
    /// Executable to run (e.g. `"verify"`, `"/opt/mcscm/bin/verify"`).
    pub program: String,
    /// Arguments; an argument equal to `{input}` switches input delivery to a temp file.
    pub args: Vec<String>,
    /// Extra environment for the checker, on top of the inherited one.
    pub env: BTreeMap<String, String>,
    /// Working directory; inherited when `None`.
    pub cwd: Option<PathBuf>,
    /// Stdout substring reporting that the invariant holds.
    pub safe_marker: String,
    /// Stdout substring reporting a counterexample. Checked before `safe_marker`.
    pub unsafe_marker: String,
    pub output: OutputLogConfig,
}

impl Default for SubprocessVerifierConfig {
    fn default() -> Self {
        Self {
            program: "verify".into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
            safe_marker: "Program is safe".into(),
            unsafe_marker: "Program is unsafe".into(),
            output: OutputLogConfig::default(),
        }
    }
}

impl SubprocessVerifierConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// `true` when the input is passed as a file path instead of stdin.
    pub fn uses_input_file(&self) -> bool {
        self.args.iter().any(|a| a == INPUT_PLACEHOLDER)
    }

    /// Rules:
    /// - `program` is not empty or whitespace-only;
    /// - both markers are non-empty and neither contains the other.
    pub fn validate(&self) -> Result<(), ExecError> {
        if self.program.trim().is_empty() {
            return Err(ExecError::InvalidConfig("verifier program is empty".into()));
        }
        if self.safe_marker.is_empty() || self.unsafe_marker.is_empty() {
            return Err(ExecError::InvalidConfig(
                "verdict markers cannot be empty".into(),
            ));
        }
        // Unsafe is matched first, so it must not occur inside the safe marker.
        if self.safe_marker.contains(&self.unsafe_marker) {
            return Err(ExecError::InvalidConfig(format!(
                "safe marker '{}' contains unsafe marker '{}'",
                self.safe_marker, self.unsafe_marker
            )));
        }
        if self.output.max_line_length == 0 {
            return Err(ExecError::InvalidConfig(
                "output.maxLineLength cannot be zero".into(),
            ));
        }
        Ok(())
    }

    pub fn trace_state(&self, run_id: &str) {
        trace!(
            run_id,
            program = %self.program,
            args = ?self.args,
            cwd = ?self.cwd,
            env_len = self.env.len(),
            input_file = self.uses_input_file(),
            "checker invocation resolved"
        );
    }
}

impl fmt::Display for SubprocessVerifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SubprocessVerifierConfig(program='{}', args={}, env={}, cwd={:?}, input={})",
            self.program,
            self.args.len(),
            self.env.len(),
            self.cwd,
            if self.uses_input_file() { "file" } else { "stdin" },
        )
    }
}
