use std::{
    io,
    path::{Path, PathBuf},
    process::{Output, Stdio},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{io::AsyncWriteExt, process::Command, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use mcx_core::{PreparedInput, Verifier, VerifyError};
use mcx_model::VerificationOutcome;

use crate::{
    ExecError, VERIFIER_SUBPROCESS, make_run_id,
    subprocess::{
        INPUT_PLACEHOLDER, SubprocessVerifierConfig,
        output::{tail, truncate_line},
        verdict::classify,
    },
};

/// Verifier that spawns the model checker as a child process per check.
///
/// The child is killed when the check times out, is cancelled or is dropped.
#[derive(Debug, Clone)]
pub struct SubprocessVerifier {
    cfg: SubprocessVerifierConfig,
}

impl SubprocessVerifier {
    pub fn new(cfg: SubprocessVerifierConfig) -> Result<Self, ExecError> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &SubprocessVerifierConfig {
        &self.cfg
    }

    fn command(&self, args: &[String], stdin: Stdio) -> Command {
        let mut cmd = Command::new(&self.cfg.program);
        cmd.args(args)
            .envs(&self.cfg.env)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cfg.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }

    /// Spawn the checker, feed it `input` and collect its output.
    async fn run(&self, run_id: &str, input: &PreparedInput) -> Result<Output, ExecError> {
        if self.cfg.uses_input_file() {
            let file = TempInput::write(run_id, input.text()).await?;
            let args = substitute(&self.cfg.args, file.path());
            let child = self.command(&args, Stdio::null()).spawn()?;
            let output = child.wait_with_output().await?;
            drop(file);
            return Ok(output);
        }

        let mut child = self.command(&self.cfg.args, Stdio::piped()).spawn()?;
        let stdin = child.stdin.take();
        let feed = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(input.text().as_bytes()).await {
                // The checker may exit before reading everything.
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                res => res,
            }
        };
        let (_, output) = tokio::try_join!(feed, child.wait_with_output())?;
        Ok(output)
    }
}

#[async_trait]
impl Verifier for SubprocessVerifier {
    fn name(&self) -> &'static str {
        VERIFIER_SUBPROCESS
    }

    async fn verify(
        &self,
        input: &PreparedInput,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<VerificationOutcome, VerifyError> {
        let run_id = make_run_id(VERIFIER_SUBPROCESS, input.name());
        self.cfg.trace_state(&run_id);
        let started = Instant::now();

        // Dropping `run` drops the child, which kills it.
        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(%run_id, "cancellation requested; killing checker");
                return Err(VerifyError::Interrupted);
            }
            res = tokio::time::timeout(timeout, self.run(&run_id, input)) => match res {
                Ok(output) => output?,
                Err(_) => {
                    debug!(%run_id, timeout_secs = timeout.as_secs(), "checker timed out; killing");
                    return Err(VerifyError::Timeout(timeout));
                }
            },
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if self.cfg.output.log_stdout {
            for line in stdout.lines() {
                debug!(%run_id, line = %truncate_line(line, self.cfg.output.max_line_length), "checker stdout");
            }
        }

        let verdict = classify(
            &stdout,
            output.status,
            &tail(&stderr, &self.cfg.output),
            &self.cfg.safe_marker,
            &self.cfg.unsafe_marker,
        )?;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        trace!(%run_id, ?verdict, elapsed_ms, status = %output.status, "checker finished");

        Ok(VerificationOutcome::new(verdict, stdout.into_owned(), elapsed_ms))
    }
}

fn substitute(args: &[String], path: &Path) -> Vec<String> {
    args.iter()
        .map(|a| {
            if a == INPUT_PLACEHOLDER {
                path.display().to_string()
            } else {
                a.clone()
            }
        })
        .collect()
}

/// Input file in the system temp dir, removed on drop.
struct TempInput {
    path: PathBuf,
}

impl TempInput {
    async fn write(run_id: &str, text: &str) -> io::Result<Self> {
        let path = std::env::temp_dir().join(file_name(run_id));
        tokio::fs::write(&path, text).await?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// `{run_id}.in` with everything but `[A-Za-z0-9._-]` replaced, so event names never
/// form a path.
fn file_name(run_id: &str) -> String {
    let safe: String = run_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{safe}.in")
}

impl Drop for TempInput {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!(path = %self.path.display(), error = %e, "failed to remove checker input");
        }
    }
}
