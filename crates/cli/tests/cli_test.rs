//! End-to-end tests of the `shardrun` binary's exit contract.

#![cfg(unix)]

use std::process::{Command, Output};

fn shardrun(args: &[&str]) -> Output {
    let dir = tempfile::tempdir().unwrap();
    Command::new(env!("CARGO_BIN_EXE_shardrun"))
        .args(args)
        .current_dir(dir.path())
        .env_remove("SHARDRUN_CONFIG")
        .env_remove("SHARDRUN_FEATURES")
        .env_remove("SHARDRUN_WORKERS")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn passing_workers_exit_zero() {
    let out = shardrun(&["--runner", "true", "--utility", "0", "-j", "1"]);
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("All tests: 1 / 1 passed"));
}

#[test]
fn failing_worker_exits_one() {
    let out = shardrun(&["--runner", "false", "--utility", "0", "-j", "1"]);
    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("FAILURES"));
    assert!(stdout.contains("[cpus] worker 0: FAIL (1)"));
}

#[test]
fn insufficient_hardware_is_a_config_error() {
    let out = shardrun(&["--runner", "true", "--use", "cuda", "-j", "1", "--gpu-count", "0"]);
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("cannot host even one"));
}

#[test]
fn dry_run_spawns_nothing() {
    let out = shardrun(&[
        "--runner", "false", "--utility", "0", "-j", "1", "--dry-run", "a.py",
    ]);
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("System: "));
    assert!(stdout.contains("worker 0 [0]: "));
    assert!(stdout.contains("false a.py --cpus 1 --cpu-bind 0"));
}

#[test]
fn json_report() {
    let out = shardrun(&["--runner", "true", "--utility", "0", "-j", "1", "--json"]);
    assert_eq!(out.status.code(), Some(0));
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["summary"]["total"], 1);
    assert_eq!(report["summary"]["passed"], 1);
    assert_eq!(report["stages"][0]["name"], "cpus");
}
