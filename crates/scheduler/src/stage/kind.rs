use std::collections::BTreeMap;

use shardrun_core::{ConfigError, FeatureKind, HardwareInventory, RunConfig};

use crate::planner::Capacity;
use crate::types::Shard;

/// Environment that stops the OpenMP runtime from pinning threads itself.
pub const UNPIN_ENV: &[(&str, &str)] = &[("OMP_PROC_BIND", "false"), ("OMP_PLACES", "")];

/// Environment that forces eager (non-deferred) execution with large chunk
/// thresholds so nothing is offloaded.
pub const EAGER_ENV: &[(&str, &str)] = &[
    ("SHARDRUN_FORCE_EAGER", "1"),
    ("SHARDRUN_MIN_CPU_CHUNK", "2000000000"),
    ("SHARDRUN_MIN_OMP_CHUNK", "2000000000"),
];

/// Upper bound on eager workers regardless of core count.
pub const EAGER_MAX_WORKERS: usize = 60;

/// Per-variant scheduling behaviour of a [`FeatureKind`].
pub(crate) trait StageKind {
    /// Which resource the stage's shards are carved from.
    fn capacity<'a>(&self, inventory: &'a HardwareInventory) -> Capacity<'a>;

    /// Resource units (cores or devices) one worker occupies.
    fn per_worker(&self, config: &RunConfig) -> Result<usize, ConfigError>;

    /// Hard cap on parallelism, if the kind has one.
    fn max_workers(&self) -> Option<usize>;

    /// Environment for every worker of the stage. Depends on config only.
    fn env(&self, config: &RunConfig) -> BTreeMap<String, String>;

    /// CLI fragment reproducing `shard`'s resource assignment.
    fn shard_args(&self, shard: &Shard, config: &RunConfig) -> Vec<String>;

    /// Whether shards are core ids the executor may bind to.
    fn binds_cores(&self) -> bool;
}

impl StageKind for FeatureKind {
    fn capacity<'a>(&self, inventory: &'a HardwareInventory) -> Capacity<'a> {
        match self {
            FeatureKind::Gpu => Capacity::Devices(inventory.available_gpus()),
            FeatureKind::Cpu | FeatureKind::OpenMp | FeatureKind::Eager => {
                Capacity::Cores(&inventory.cpus)
            }
        }
    }

    fn per_worker(&self, config: &RunConfig) -> Result<usize, ConfigError> {
        let pin_overhead = usize::from(config.pin_mode.is_strict());
        let overflow = |field| ConfigError::ThreadBudgetOverflow {
            stage: self.name().to_string(),
            field,
        };
        let threads = match self {
            FeatureKind::Cpu => config.cpus,
            FeatureKind::OpenMp => config
                .omps
                .checked_mul(config.ompthreads)
                .ok_or_else(|| overflow("ompthreads"))?,
            FeatureKind::Gpu => return Ok(config.gpus),
            FeatureKind::Eager => return Ok(1),
        };
        threads
            .checked_add(config.utility)
            .and_then(|n| n.checked_add(pin_overhead))
            .ok_or_else(|| overflow("utility"))
    }

    fn max_workers(&self) -> Option<usize> {
        match self {
            FeatureKind::Eager => Some(EAGER_MAX_WORKERS),
            _ => None,
        }
    }

    fn env(&self, config: &RunConfig) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        if self.binds_cores() && !config.pin_mode.is_strict() {
            extend(&mut env, UNPIN_ENV);
        }
        if matches!(self, FeatureKind::Eager) {
            extend(&mut env, EAGER_ENV);
        }
        env
    }

    fn shard_args(&self, shard: &Shard, config: &RunConfig) -> Vec<String> {
        let mut args = match self {
            FeatureKind::Cpu => vec!["--cpus".to_string(), config.cpus.to_string()],
            FeatureKind::OpenMp => vec![
                "--omps".to_string(),
                config.omps.to_string(),
                "--ompthreads".to_string(),
                config.ompthreads.to_string(),
            ],
            FeatureKind::Eager => vec!["--cpus".to_string(), "1".to_string()],
            FeatureKind::Gpu => {
                return vec![
                    "--gpus".to_string(),
                    config.gpus.to_string(),
                    "--gpu-bind".to_string(),
                    shard.to_string(),
                ];
            }
        };
        if config.pin_mode.binds() {
            args.push("--cpu-bind".to_string());
            args.push(shard.to_string());
        }
        args
    }

    fn binds_cores(&self) -> bool {
        !matches!(self, FeatureKind::Gpu)
    }
}

fn extend(env: &mut BTreeMap<String, String>, pairs: &[(&str, &str)]) {
    env.extend(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())));
}
