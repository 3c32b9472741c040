use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shardrun_core::{FeatureKind, PinMode, RunConfig};
use tracing::debug;

use crate::cli::CliArgs;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "shardrun.toml";

/// Runner configuration loaded from a TOML file. Every field is optional;
/// command-line flags take precedence over it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Base worker argv, e.g. `["python", "-m", "pytest"]`
    pub runner: Vec<String>,
    pub features: Option<Vec<FeatureKind>>,
    pub workers: Option<usize>,
    pub cpu_pin: Option<PinMode>,
    pub cpus: Option<usize>,
    pub gpus: Option<usize>,
    pub omps: Option<usize>,
    pub ompthreads: Option<usize>,
    pub utility: Option<usize>,
    pub files: Vec<String>,
    pub extra_args: Vec<String>,
    pub root_dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    pub timeout_secs: Option<u64>,
    pub bind_with: Vec<String>,
}

impl FileConfig {
    /// Load config from the given path, or `./shardrun.toml` if it exists.
    /// An explicit path must exist; a missing default file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    debug!("No {DEFAULT_CONFIG_FILE} found, using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };

        debug!(?config_path, "Loading config");
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read config: {}", config_path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config: {}", config_path.display()))?;
        Ok(config)
    }
}

/// Executor settings that live outside the scheduling core.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecSettings {
    pub timeout: Option<Duration>,
    pub bind_with: Vec<String>,
}

/// Merge CLI flags over the file config into a validated [`RunConfig`].
pub fn resolve(args: &CliArgs, file: FileConfig) -> Result<(RunConfig, ExecSettings)> {
    let command = match &args.runner {
        Some(runner) => split_words(runner),
        None => file.runner,
    };
    let files = if args.files.is_empty() { file.files } else { args.files.clone() };
    let extra_args = if args.extra.is_empty() { file.extra_args } else { args.extra.clone() };

    let mut builder = RunConfig::builder()
        .command(command)
        .test_files(files)
        .extra_args(extra_args);

    if let Some(features) = args.features.clone().or(file.features) {
        builder = builder.features(features);
    }
    if let Some(n) = args.workers.or(file.workers) {
        builder = builder.requested_workers(n);
    }
    if let Some(mode) = args.cpu_pin.or(file.cpu_pin) {
        builder = builder.pin_mode(mode);
    }
    if let Some(n) = args.cpus.or(file.cpus) {
        builder = builder.cpus(n);
    }
    if let Some(n) = args.gpus.or(file.gpus) {
        builder = builder.gpus(n);
    }
    if let Some(n) = args.omps.or(file.omps) {
        builder = builder.omps(n);
    }
    if let Some(n) = args.ompthreads.or(file.ompthreads) {
        builder = builder.ompthreads(n);
    }
    if let Some(n) = args.utility.or(file.utility) {
        builder = builder.utility(n);
    }
    if let Some(dir) = args.root_dir.clone().or(file.root_dir) {
        builder = builder.root_dir(dir);
    }
    for (key, value) in file.env {
        builder = builder.env(key, value);
    }

    let config = builder.build().context("invalid run configuration")?;

    let exec = ExecSettings {
        timeout: args.timeout.or(file.timeout_secs).map(Duration::from_secs),
        bind_with: match &args.bind_with {
            Some(launcher) => split_words(launcher),
            None => file.bind_with,
        },
    };

    Ok((config, exec))
}

fn split_words(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}
