use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use shardrun_core::RunConfig;
use tracing::{debug, info};

use crate::events::{EventSink, PlanEvent};
use crate::executor::ProcessExecutor;
use crate::types::StageResult;

use super::Stage;

impl Stage {
    /// Run every worker of the stage concurrently and wait for all of them.
    ///
    /// Completions are kept in launch order regardless of which worker
    /// finishes first. Failing workers never cut the stage short.
    pub async fn run(
        &self,
        config: &RunConfig,
        executor: &dyn ProcessExecutor,
        sink: &dyn EventSink,
    ) -> StageResult {
        let name = self.name();
        let commands = self.worker_commands(config);

        sink.emit(&PlanEvent::StageStarted {
            name: name.to_string(),
            workers: commands.len(),
        });

        if commands.is_empty() {
            info!(stage = name, "no workers fit on this hardware, skipping");
            let result = StageResult::empty(name);
            sink.emit(&PlanEvent::StageFinished {
                name: name.to_string(),
                total: 0,
                passed: 0,
                elapsed: result.elapsed,
            });
            return result;
        }

        let started_at = Utc::now();
        let start = Instant::now();

        let futures = commands.iter().enumerate().map(|(worker, cmd)| async move {
            debug!(stage = name, worker, command = %cmd.display(), "launching worker");
            let done = executor.run(cmd).await;
            sink.emit(&PlanEvent::WorkerFinished {
                stage: name.to_string(),
                worker,
                return_code: done.return_code,
                elapsed: done.elapsed,
            });
            done
        });
        let procs = join_all(futures).await;

        let result = StageResult {
            name: name.to_string(),
            procs,
            elapsed: start.elapsed(),
            started_at,
        };

        info!(
            stage = name,
            passed = result.passed(),
            total = result.total(),
            "stage complete in {:.2}s",
            result.elapsed.as_secs_f64()
        );
        sink.emit(&PlanEvent::StageFinished {
            name: name.to_string(),
            total: result.total(),
            passed: result.passed(),
            elapsed: result.elapsed,
        });

        result
    }
}
