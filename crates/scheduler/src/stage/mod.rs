//! One execution unit per feature kind.
//!
//! Split into focused submodules:
//! - `kind`: per-variant core formulas, environment and shard arguments
//! - `execution`: worker fan-out and result collection

mod execution;
mod kind;

use std::collections::BTreeMap;

use shardrun_core::{ConfigError, FeatureKind, HardwareInventory, RunConfig};

use crate::executor::WorkerCommand;
use crate::planner::{self, chunk_files};
use crate::types::{Shard, StageSpec};

use kind::StageKind;
pub use kind::{EAGER_ENV, EAGER_MAX_WORKERS, UNPIN_ENV};

/// A feature kind bound to the [`StageSpec`] it computed for this run.
///
/// The worker layout is computed once in [`Stage::new`] and never recomputed.
#[derive(Debug, Clone)]
pub struct Stage {
    kind: FeatureKind,
    spec: StageSpec,
}

impl Stage {
    pub fn new(
        kind: FeatureKind,
        config: &RunConfig,
        inventory: &HardwareInventory,
    ) -> Result<Self, ConfigError> {
        let spec = Self::compute_spec(kind, config, inventory)?;
        Ok(Self { kind, spec })
    }

    /// Delegate to the planner with this kind's per-worker formula.
    pub fn compute_spec(
        kind: FeatureKind,
        config: &RunConfig,
        inventory: &HardwareInventory,
    ) -> Result<StageSpec, ConfigError> {
        planner::compute_spec(
            kind.name(),
            kind.capacity(inventory),
            kind.per_worker(config)?,
            config.requested_workers,
            kind.max_workers(),
        )
    }

    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn spec(&self) -> &StageSpec {
        &self.spec
    }

    pub fn env(&self, config: &RunConfig) -> BTreeMap<String, String> {
        self.kind.env(config)
    }

    pub fn shard_args(&self, shard: &Shard, config: &RunConfig) -> Vec<String> {
        self.kind.shard_args(shard, config)
    }

    /// One launch description per worker, in worker order.
    ///
    /// argv is `command ++ files ++ shard args ++ extra args`; the stage
    /// environment overrides the configured one.
    pub fn worker_commands(&self, config: &RunConfig) -> Vec<WorkerCommand> {
        let mut env = config.env.clone();
        env.extend(self.env(config));

        let binds = config.pin_mode.binds() && self.kind.binds_cores();
        let chunks = chunk_files(&config.test_files, self.spec.workers);

        self.spec
            .shards
            .iter()
            .zip(chunks)
            .map(|(shard, files)| {
                let mut argv = config.command.clone();
                argv.extend(files);
                argv.extend(self.shard_args(shard, config));
                argv.extend(config.extra_args.iter().cloned());
                WorkerCommand {
                    argv,
                    env: env.clone(),
                    cwd: config.root_dir.clone(),
                    cpu_binding: binds.then(|| shard.clone()),
                }
            })
            .collect()
    }
}
