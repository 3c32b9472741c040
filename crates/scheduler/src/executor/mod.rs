//! The process-execution seam.
//!
//! Stages describe each worker as a [`WorkerCommand`] and hand it to a
//! [`ProcessExecutor`]. The executor reports back a [`ProcessCompletion`]
//! and never fails: spawn errors, timeouts and signals all become return
//! codes.

mod process;

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::types::{ProcessCompletion, Shard};

pub use process::TokioProcessExecutor;

/// Return code recorded when a worker could not be started at all.
pub const SPAWN_FAILURE_CODE: i32 = -1;

/// Return code recorded when the executor kills a worker for running too long.
pub const TIMEOUT_CODE: i32 = 124;

/// Everything needed to launch one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub argv: Vec<String>,
    /// Merged over the inherited environment; empty values are set, not removed.
    pub env: BTreeMap<String, String>,
    pub cwd: PathBuf,
    /// Cores the worker should be bound to, when pinning is enabled.
    pub cpu_binding: Option<Shard>,
}

impl WorkerCommand {
    /// Shell-style rendering for logs and dry runs.
    pub fn display(&self) -> String {
        let mut parts: Vec<String> = self
            .env
            .iter()
            .map(|(k, v)| format!("{k}={}", quote(v)))
            .collect();
        parts.extend(self.argv.iter().map(|a| quote(a)));
        parts.join(" ")
    }
}

fn quote(s: &str) -> String {
    if s.is_empty() {
        "''".to_string()
    } else if s.chars().any(|c| c.is_whitespace() || c == '\'' || c == '"') {
        format!("'{}'", s.replace('\'', "'\\''"))
    } else {
        s.to_string()
    }
}

/// Runs a single worker to completion.
///
/// Calls are awaited concurrently by the stage driver; an implementation only
/// has to handle one command per call.
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    async fn run(&self, cmd: &WorkerCommand) -> ProcessCompletion;
}
