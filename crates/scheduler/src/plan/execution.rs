use tracing::{info, warn};

use crate::events::{EventSink, PlanEvent};
use crate::executor::ProcessExecutor;
use crate::types::PlanReport;

use super::aggregate::{failures, summarize};
use super::{Plan, PlanState};

impl Plan {
    /// Run the plan and return the process exit code: 0 when every worker
    /// of every stage passed, 1 otherwise.
    pub async fn execute(self, executor: &dyn ProcessExecutor, sink: &dyn EventSink) -> i32 {
        self.execute_report(executor, sink).await.exit_code()
    }

    /// Run every stage strictly in order, then aggregate.
    ///
    /// Consumes the plan: a plan reaches `Done` exactly once.
    pub async fn execute_report(
        mut self,
        executor: &dyn ProcessExecutor,
        sink: &dyn EventSink,
    ) -> PlanReport {
        sink.emit(&PlanEvent::PlanStarted {
            features: self.stages.iter().map(|s| s.name().to_string()).collect(),
            test_files: self.config.test_files.len(),
            cpus: self.inventory.total_cores(),
            gpus: self.inventory.available_gpus(),
        });

        let mut results = Vec::with_capacity(self.stages.len());
        for i in 0..self.stages.len() {
            self.advance(PlanState::RunningStage(i));
            let result = self.stages[i].run(&self.config, executor, sink).await;
            results.push(result);
        }

        self.advance(PlanState::Aggregating);
        let summary = summarize(&results);
        let failures = failures(&results);

        if failures.is_empty() {
            info!(total = summary.total, "all workers passed");
        } else {
            warn!(
                failed = summary.failed(),
                total = summary.total,
                "some workers failed"
            );
            for failure in &failures {
                sink.emit(&PlanEvent::Failure(failure.clone()));
            }
        }
        sink.emit(&PlanEvent::PlanFinished(summary));

        self.advance(PlanState::Done);
        PlanReport {
            stages: results,
            summary,
            failures,
        }
    }
}
