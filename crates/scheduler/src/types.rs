use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shardrun_core::CoreId;

/// Resource ids assigned exclusively to one worker for a stage's lifetime.
///
/// Core ids for CPU-backed stages, GPU ordinals for the GPU stage. Always
/// sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shard(pub Vec<CoreId>);

impl Shard {
    pub fn new(mut ids: Vec<CoreId>) -> Self {
        ids.sort_unstable();
        Self(ids)
    }

    pub fn ids(&self) -> &[CoreId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Comma-joined ids, the format binding directives expect.
impl fmt::Display for Shard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

/// Worker count and per-worker shards for one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    pub workers: usize,
    pub shards: Vec<Shard>,
}

/// Outcome of one worker process, as reported by the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessCompletion {
    /// Full command line the worker was launched with.
    pub argv: Vec<String>,
    pub return_code: i32,
    pub elapsed: Duration,
    /// Captured stdout followed by stderr.
    pub output: String,
}

impl ProcessCompletion {
    pub fn passed(&self) -> bool {
        self.return_code == 0
    }
}

/// Every completion of one stage, in worker (launch) order.
#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    pub name: String,
    pub procs: Vec<ProcessCompletion>,
    /// Wall-clock span of the whole stage.
    pub elapsed: Duration,
    pub started_at: DateTime<Utc>,
}

impl StageResult {
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            procs: Vec::new(),
            elapsed: Duration::ZERO,
            started_at: Utc::now(),
        }
    }

    pub fn total(&self) -> usize {
        self.procs.len()
    }

    pub fn passed(&self) -> usize {
        self.procs.iter().filter(|p| p.passed()).count()
    }
}

/// Aggregate over every stage of a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub total: usize,
    pub passed: usize,
    pub elapsed: Duration,
}

impl PlanSummary {
    pub fn failed(&self) -> usize {
        self.total - self.passed
    }

    /// 0 when every completion passed (including none at all), 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        i32::from(self.total != self.passed)
    }
}

/// One failing worker, enough to find its shard without re-running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureEntry {
    pub stage: String,
    pub worker: usize,
    pub return_code: i32,
    pub elapsed: Duration,
    pub argv: Vec<String>,
    pub output: String,
}

/// Everything a finished plan produced.
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub stages: Vec<StageResult>,
    pub summary: PlanSummary,
    pub failures: Vec<FailureEntry>,
}

impl PlanReport {
    pub fn exit_code(&self) -> i32 {
        self.summary.exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_sorted_and_joined() {
        let shard = Shard::new(vec![7, 3, 5]);
        assert_eq!(shard.ids(), &[3, 5, 7]);
        assert_eq!(shard.to_string(), "3,5,7");
        assert_eq!(Shard::default().to_string(), "");
    }

    #[test]
    fn summary_exit_code() {
        let ok = PlanSummary { total: 3, passed: 3, elapsed: Duration::ZERO };
        assert_eq!(ok.exit_code(), 0);
        assert_eq!(ok.failed(), 0);

        let bad = PlanSummary { total: 3, passed: 2, elapsed: Duration::ZERO };
        assert_eq!(bad.exit_code(), 1);
        assert_eq!(bad.failed(), 1);

        assert_eq!(PlanSummary::default().exit_code(), 0);
    }

    #[test]
    fn stage_result_counts() {
        let proc = |code| ProcessCompletion {
            argv: vec!["t".into()],
            return_code: code,
            elapsed: Duration::from_millis(5),
            output: String::new(),
        };
        let mut result = StageResult::empty("cpus");
        assert_eq!(result.total(), 0);
        result.procs = vec![proc(0), proc(2), proc(0)];
        assert_eq!(result.total(), 3);
        assert_eq!(result.passed(), 2);
    }
}
