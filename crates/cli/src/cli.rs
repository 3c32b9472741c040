use std::path::PathBuf;

use clap::Parser;
use shardrun_core::{FeatureKind, PinMode};

/// Resource-aware test runner.
///
/// Splits the machine into disjoint CPU/GPU shards, runs one stage per
/// feature with a worker per shard, and exits non-zero if any worker failed.
#[derive(Parser, Debug, Default)]
#[command(name = "shardrun", version, about)]
pub struct CliArgs {
    /// Test files to distribute across workers (overrides the config file list)
    pub files: Vec<String>,

    /// Path to config file (default: ./shardrun.toml if present)
    #[arg(long, env = "SHARDRUN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base worker command, split on whitespace (e.g. "python -m pytest")
    #[arg(long, env = "SHARDRUN_RUNNER")]
    pub runner: Option<String>,

    /// Comma-separated feature stages to run: cpus, openmp, cuda, eager
    #[arg(long = "use", value_delimiter = ',', env = "SHARDRUN_FEATURES")]
    pub features: Option<Vec<FeatureKind>>,

    /// Worker processes per stage (0 = as many as the hardware allows)
    #[arg(short = 'j', long, env = "SHARDRUN_WORKERS")]
    pub workers: Option<usize>,

    /// CPU pinning mode: none, partial or strict
    #[arg(long = "cpu-pin", env = "SHARDRUN_CPU_PIN")]
    pub cpu_pin: Option<PinMode>,

    /// CPU threads per worker for the cpus stage
    #[arg(long)]
    pub cpus: Option<usize>,

    /// GPUs per worker for the cuda stage
    #[arg(long)]
    pub gpus: Option<usize>,

    /// OpenMP workers per process
    #[arg(long)]
    pub omps: Option<usize>,

    /// Threads per OpenMP worker
    #[arg(long)]
    pub ompthreads: Option<usize>,

    /// Utility threads reserved per worker
    #[arg(long)]
    pub utility: Option<usize>,

    /// Working directory for every worker
    #[arg(long)]
    pub root_dir: Option<PathBuf>,

    /// Kill any worker running longer than this many seconds
    #[arg(long, env = "SHARDRUN_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Launcher prefix that applies CPU bindings, split on whitespace (e.g. "taskset -c")
    #[arg(long)]
    pub bind_with: Option<String>,

    /// Override the number of GPUs instead of probing
    #[arg(long, env = "SHARDRUN_GPU_COUNT")]
    pub gpu_count: Option<usize>,

    /// Print each stage's shards and worker commands without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Print the final report as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Increase output: -v shows failing worker output, -vv adds debug logs
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Arguments appended to every worker command
    #[arg(last = true)]
    pub extra: Vec<String>,
}
