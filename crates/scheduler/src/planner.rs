//! Hardware shard partitioning and worker-count policy.
//!
//! Shards are consecutive runs of the flattened, order-preserving id
//! sequence, so repeated runs are deterministic and neighbouring ids (as the
//! probe ordered them) stay together. Leftover units that do not fill a whole
//! shard are left unused.

use shardrun_core::{ConfigError, CoreId, CpuGroup};

use crate::types::{Shard, StageSpec};

/// The resource a stage's workers are carved out of.
#[derive(Debug, Clone, Copy)]
pub enum Capacity<'a> {
    /// Logical cores, in probe order.
    Cores(&'a [CpuGroup]),
    /// A plain device count (GPU ordinals `0..n`).
    Devices(usize),
}

impl Capacity<'_> {
    fn units(&self) -> Vec<CoreId> {
        match self {
            Capacity::Cores(groups) => groups
                .iter()
                .flat_map(|g| g.ids.iter().copied())
                .collect(),
            Capacity::Devices(n) => (0..*n as CoreId).collect(),
        }
    }
}

/// Fit a requested worker count to what the hardware can host.
///
/// `requested == 0` means auto and takes everything available. An explicit
/// request is clamped to `available`, and fails only when not even one
/// worker fits.
pub fn adjust_workers(available: usize, requested: usize) -> Result<usize, InsufficientHardware> {
    if requested == 0 {
        return Ok(available);
    }
    if available == 0 {
        return Err(InsufficientHardware { requested });
    }
    Ok(requested.min(available))
}

/// Raw form of [`ConfigError::InsufficientHardware`] before a stage name is
/// attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsufficientHardware {
    pub requested: usize,
}

impl InsufficientHardware {
    pub fn for_stage(self, stage: &str) -> ConfigError {
        ConfigError::InsufficientHardware {
            stage: stage.to_string(),
            requested: self.requested,
        }
    }
}

/// Compute worker count and shards for one stage.
///
/// `per_worker` is the number of units (cores or devices) each worker needs;
/// `max_workers` optionally caps the available parallelism before the
/// request is applied.
pub fn compute_spec(
    stage: &str,
    capacity: Capacity<'_>,
    per_worker: usize,
    requested: usize,
    max_workers: Option<usize>,
) -> Result<StageSpec, ConfigError> {
    if per_worker == 0 {
        return Err(ConfigError::ZeroResourcesPerWorker {
            stage: stage.to_string(),
        });
    }

    let units = capacity.units();
    let mut available = units.len() / per_worker;
    if let Some(cap) = max_workers {
        available = available.min(cap);
    }

    let workers = adjust_workers(available, requested).map_err(|e| e.for_stage(stage))?;

    let shards = units
        .chunks_exact(per_worker)
        .take(workers)
        .map(|ids| Shard::new(ids.to_vec()))
        .collect();

    tracing::debug!(
        stage,
        units = units.len(),
        per_worker,
        available,
        workers,
        "computed stage spec"
    );

    Ok(StageSpec { workers, shards })
}

/// Split `files` into `workers` contiguous, order-preserving chunks.
///
/// Sizes differ by at most one; the first `len % workers` chunks carry the
/// extra file. Zero workers yields no chunks.
pub fn chunk_files(files: &[String], workers: usize) -> Vec<Vec<String>> {
    if workers == 0 {
        return Vec::new();
    }
    let base = files.len() / workers;
    let extra = files.len() % workers;

    let mut chunks = Vec::with_capacity(workers);
    let mut start = 0;
    for i in 0..workers {
        let len = base + usize::from(i < extra);
        chunks.push(files[start..start + len].to_vec());
        start += len;
    }
    chunks
}
