//! Integration tests running real worker processes through the plan.
//!
//! Workers are `sh -c` scripts; test files and shard arguments arrive as
//! positional parameters.

#![cfg(unix)]

use std::time::{Duration, Instant};

use shardrun_core::{FeatureKind, HardwareInventory, PinMode, RunConfig};
use shardrun_scheduler::{NullSink, Plan, TokioProcessExecutor, TracingSink};

/// Fails when any argument starts with `fail`.
const CHECK_SCRIPT: &str = r#"for a in "$@"; do case "$a" in fail*) exit 3;; esac; done; exit 0"#;

fn sh_config(script: &str) -> shardrun_core::RunConfigBuilder {
    RunConfig::builder().command(["sh", "-c", script, "worker"])
}

#[tokio::test]
async fn failing_file_fails_the_run() {
    let config = sh_config(CHECK_SCRIPT)
        .utility(0)
        .test_files(["ok_a.py", "fail_b.py", "ok_c.py", "ok_d.py"])
        .build()
        .unwrap();
    let plan = Plan::new(config, HardwareInventory::single_core_groups(2)).unwrap();

    let report = plan
        .execute_report(&TokioProcessExecutor::new(), &TracingSink)
        .await;

    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.passed, 1);
    assert_eq!(report.exit_code(), 1);

    let failure = &report.failures[0];
    assert_eq!(failure.stage, "cpus");
    assert_eq!(failure.worker, 0);
    assert_eq!(failure.return_code, 3);
    assert!(failure.argv.contains(&"fail_b.py".to_string()));
}

#[tokio::test]
async fn shard_arguments_reach_the_worker() {
    let config = sh_config(r#"echo "$@""#)
        .pin_mode(PinMode::Strict)
        .omps(1)
        .ompthreads(2)
        .utility(1)
        .features([FeatureKind::OpenMp])
        .build()
        .unwrap();
    let plan = Plan::new(config, HardwareInventory::single_core_groups(8)).unwrap();

    let report = plan
        .execute_report(&TokioProcessExecutor::new(), &NullSink)
        .await;

    assert_eq!(report.exit_code(), 0);
    let outputs: Vec<&str> = report.stages[0]
        .procs
        .iter()
        .map(|p| p.output.trim())
        .collect();
    assert_eq!(
        outputs,
        vec![
            "--omps 1 --ompthreads 2 --cpu-bind 0,1,2,3",
            "--omps 1 --ompthreads 2 --cpu-bind 4,5,6,7",
        ]
    );
}

#[tokio::test]
async fn workers_run_concurrently_within_a_stage() {
    let config = sh_config("sleep 0.5")
        .utility(0)
        .build()
        .unwrap();
    let plan = Plan::new(config, HardwareInventory::single_core_groups(4)).unwrap();

    let start = Instant::now();
    let report = plan
        .execute_report(&TokioProcessExecutor::new(), &NullSink)
        .await;

    assert_eq!(report.summary.total, 4);
    assert_eq!(report.exit_code(), 0);
    // four half-second workers, run side by side
    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(report.stages[0].elapsed >= Duration::from_millis(500));
}

#[tokio::test]
async fn unspawnable_worker_is_recorded_not_raised() {
    let config = RunConfig::builder()
        .command(["/no/such/test-runner"])
        .build()
        .unwrap();
    let plan = Plan::new(config, HardwareInventory::single_core_groups(2)).unwrap();

    let report = plan
        .execute_report(&TokioProcessExecutor::new(), &NullSink)
        .await;

    assert_eq!(report.summary.total, 1);
    assert_eq!(report.summary.passed, 0);
    assert_eq!(
        report.failures[0].return_code,
        shardrun_scheduler::SPAWN_FAILURE_CODE
    );
}
