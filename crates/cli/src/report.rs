//! Plain-text rendering of plan progress and the final summary.

use std::fmt::Write as _;
use std::time::Duration;

use shardrun_scheduler::{EventSink, FailureEntry, Plan, PlanEvent, PlanReport};

const RULE_WIDTH: usize = 72;

fn rule(title: &str) -> String {
    if title.is_empty() {
        return "-".repeat(RULE_WIDTH);
    }
    let pad = RULE_WIDTH.saturating_sub(title.len() + 2);
    format!("{} {title} {}", "#".repeat(pad / 2), "#".repeat(pad - pad / 2))
}

fn secs(d: Duration) -> String {
    format!("{:.2}s", d.as_secs_f64())
}

/// Prints stage banners and one line per finished worker to stdout.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn emit(&self, event: &PlanEvent) {
        match event {
            PlanEvent::PlanStarted { features, test_files, cpus, gpus } => {
                println!("{}", rule("Test Suite Configuration"));
                println!("* Feature stages       : {}", features.join(", "));
                println!("* Test files per stage : {test_files}");
                println!("* System description   : {cpus} cpus / {gpus} gpus");
            }
            PlanEvent::StageStarted { name, workers } => {
                println!();
                println!("{}", rule(&format!("Entering stage: {name} (with {workers} workers)")));
            }
            PlanEvent::WorkerFinished { stage, worker, return_code, elapsed } => {
                let status = if *return_code == 0 {
                    "PASS".to_string()
                } else {
                    format!("FAIL ({return_code})")
                };
                println!("[{stage}] worker {worker}: {status} in {}", secs(*elapsed));
            }
            PlanEvent::StageFinished { name, total, passed, elapsed } => {
                println!("{}", rule(&format!(
                    "Exiting stage: {name} ({passed} / {total} passed in {})",
                    secs(*elapsed)
                )));
            }
            PlanEvent::Failure(_) | PlanEvent::PlanFinished(_) => {}
        }
    }
}

/// Stage layout for `--dry-run`.
pub fn dry_run(plan: &Plan) -> String {
    let mut out = String::new();
    let inventory = plan.inventory();
    let _ = writeln!(
        out,
        "System: {} cpus / {} gpus",
        inventory.total_cores(),
        inventory.available_gpus()
    );
    for stage in plan.stages() {
        let spec = stage.spec();
        let _ = writeln!(out, "{}", rule(&format!("{} ({} workers)", stage.name(), spec.workers)));
        for (i, (shard, cmd)) in spec
            .shards
            .iter()
            .zip(stage.worker_commands(plan.config()))
            .enumerate()
        {
            let _ = writeln!(out, "worker {i} [{shard}]: {}", cmd.display());
        }
    }
    out
}

fn failure_block(f: &FailureEntry, verbose: bool) -> String {
    let mut out = format!(
        "[{}] worker {}: FAIL ({}) in {}\n    {}\n",
        f.stage,
        f.worker,
        f.return_code,
        secs(f.elapsed),
        f.argv.join(" ")
    );
    if verbose && !f.output.is_empty() {
        for line in f.output.lines() {
            let _ = writeln!(out, "    | {line}");
        }
    }
    out
}

/// Failure listing (if any) followed by the overall summary.
pub fn render(report: &PlanReport, verbose: bool) -> String {
    let mut out = String::new();
    if !report.failures.is_empty() {
        let _ = writeln!(out, "\n{}", rule("FAILURES"));
        for f in &report.failures {
            out.push_str(&failure_block(f, verbose));
        }
    }

    let _ = writeln!(out, "\n{}", rule("Overall summary"));
    for stage in &report.stages {
        let _ = writeln!(
            out,
            "* {:<6}: {} / {} passed in {}",
            stage.name,
            stage.passed(),
            stage.total(),
            secs(stage.elapsed)
        );
    }
    let s = &report.summary;
    let status = if s.exit_code() == 0 { "PASSED" } else { "FAILED" };
    let _ = writeln!(
        out,
        "\nAll tests: {} / {} passed in {} ({status})",
        s.passed,
        s.total,
        secs(s.elapsed)
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardrun_scheduler::{PlanSummary, ProcessCompletion, StageResult};

    fn report() -> PlanReport {
        let proc = |code: i32| ProcessCompletion {
            argv: vec!["pytest".into(), "a.py".into()],
            return_code: code,
            elapsed: Duration::from_millis(1500),
            output: "assert 1 == 2".into(),
        };
        let mut cpus = StageResult::empty("cpus");
        cpus.procs = vec![proc(0), proc(1)];
        cpus.elapsed = Duration::from_secs(2);
        PlanReport {
            failures: shardrun_scheduler::plan::failures(std::slice::from_ref(&cpus)),
            stages: vec![cpus],
            summary: PlanSummary { total: 2, passed: 1, elapsed: Duration::from_secs(2) },
        }
    }

    #[test]
    fn rule_is_fixed_width() {
        assert_eq!(rule("FAILURES").len(), RULE_WIDTH);
        assert_eq!(rule("").len(), RULE_WIDTH);
    }

    #[test]
    fn render_lists_failures_and_totals() {
        let text = render(&report(), false);
        assert!(text.contains("[cpus] worker 1: FAIL (1) in 1.50s"));
        assert!(text.contains("* cpus  : 1 / 2 passed in 2.00s"));
        assert!(text.contains("All tests: 1 / 2 passed in 2.00s (FAILED)"));
        assert!(!text.contains("assert 1 == 2"));
    }

    #[test]
    fn verbose_includes_output() {
        let text = render(&report(), true);
        assert!(text.contains("    | assert 1 == 2"));
    }
}
