//! Worker execution via `tokio::process`.

use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{ProcessExecutor, WorkerCommand, SPAWN_FAILURE_CODE, TIMEOUT_CODE};
use crate::types::ProcessCompletion;

/// Spawns each worker as a child process and captures its output.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessExecutor {
    timeout: Option<Duration>,
    /// Prefix used to apply a CPU binding, e.g. `["taskset", "-c"]`. The
    /// comma-joined binding is appended after it.
    affinity_launcher: Vec<String>,
}

impl TokioProcessExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill workers that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_affinity_launcher<S: Into<String>>(
        mut self,
        launcher: impl IntoIterator<Item = S>,
    ) -> Self {
        self.affinity_launcher = launcher.into_iter().map(Into::into).collect();
        self
    }

    /// The argv actually executed, with the affinity launcher applied.
    fn effective_argv(&self, cmd: &WorkerCommand) -> Vec<String> {
        match &cmd.cpu_binding {
            Some(shard) if !self.affinity_launcher.is_empty() && !shard.is_empty() => {
                let mut argv = self.affinity_launcher.clone();
                argv.push(shard.to_string());
                argv.extend(cmd.argv.iter().cloned());
                argv
            }
            _ => cmd.argv.clone(),
        }
    }
}

#[async_trait]
impl ProcessExecutor for TokioProcessExecutor {
    async fn run(&self, cmd: &WorkerCommand) -> ProcessCompletion {
        let argv = self.effective_argv(cmd);
        let start = Instant::now();

        let completion = |return_code: i32, output: String| ProcessCompletion {
            argv: argv.clone(),
            return_code,
            elapsed: start.elapsed(),
            output,
        };

        let Some((program, args)) = argv.split_first() else {
            return completion(SPAWN_FAILURE_CODE, "empty command".to_string());
        };

        debug!(
            command = %cmd.display(),
            cwd = %cmd.cwd.display(),
            "spawning worker"
        );

        let child = Command::new(program)
            .args(args)
            .envs(&cmd.env)
            .current_dir(&cmd.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %program, error = %e, "failed to spawn worker");
                return completion(SPAWN_FAILURE_CODE, format!("failed to spawn {program}: {e}"));
            }
        };

        let waited = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    // Dropping the future drops the child, which kills it.
                    warn!(program = %program, timeout = ?limit, "worker timed out");
                    return completion(TIMEOUT_CODE, format!("timed out after {limit:?}"));
                }
            },
            None => child.wait_with_output().await,
        };

        match waited {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                let text = if stderr.is_empty() {
                    stdout.to_string()
                } else if stdout.is_empty() {
                    stderr.to_string()
                } else {
                    format!("{stdout}\n--- stderr ---\n{stderr}")
                };
                let code = exit_code(output.status);
                if code != 0 {
                    debug!(exit_code = code, "worker returned non-zero exit code");
                }
                completion(code, text)
            }
            Err(e) => completion(SPAWN_FAILURE_CODE, format!("failed to wait for worker: {e}")),
        }
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(SPAWN_FAILURE_CODE)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(SPAWN_FAILURE_CODE)
}
