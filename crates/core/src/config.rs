use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ── Pin mode ──────────────────────────────────────────────────

/// How worker shards are handed to the executor as a CPU binding hint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinMode {
    /// No binding; shards are informational only.
    None,
    /// Bind workers to their shard.
    #[default]
    Partial,
    /// Bind workers and reserve one extra core per worker for pinning overhead.
    Strict,
}

impl PinMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PinMode::None => "none",
            PinMode::Partial => "partial",
            PinMode::Strict => "strict",
        }
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, PinMode::Strict)
    }

    /// Whether shard ids are passed on as a binding directive.
    pub fn binds(&self) -> bool {
        !matches!(self, PinMode::None)
    }
}

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PinMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(PinMode::None),
            "partial" => Ok(PinMode::Partial),
            "strict" => Ok(PinMode::Strict),
            other => Err(ConfigError::UnknownPinMode(other.to_string())),
        }
    }
}

// ── Feature kinds ─────────────────────────────────────────────

/// The closed set of hardware/feature configurations a suite can run under.
/// Each kind becomes exactly one stage of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    #[serde(rename = "cpus", alias = "cpu")]
    Cpu,
    #[serde(alias = "omp")]
    OpenMp,
    #[serde(rename = "cuda", alias = "gpu")]
    Gpu,
    Eager,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 4] = [
        FeatureKind::Cpu,
        FeatureKind::OpenMp,
        FeatureKind::Gpu,
        FeatureKind::Eager,
    ];

    /// Stage name used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            FeatureKind::Cpu => "cpus",
            FeatureKind::OpenMp => "openmp",
            FeatureKind::Gpu => "cuda",
            FeatureKind::Eager => "eager",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        if let Some(kind) = FeatureKind::ALL.into_iter().find(|k| k.name() == name) {
            return Ok(kind);
        }
        match name.as_str() {
            "cpu" => Ok(FeatureKind::Cpu),
            "omp" => Ok(FeatureKind::OpenMp),
            "gpu" => Ok(FeatureKind::Gpu),
            other => Err(ConfigError::UnknownFeature(other.to_string())),
        }
    }
}

// ── Run config ────────────────────────────────────────────────

/// Resolved, immutable configuration for one invocation.
///
/// Construct through [`RunConfig::builder`]; `build()` validates the thread
/// budgets and the base command and deduplicates the feature list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfig {
    /// Worker processes per stage. 0 = as many as the hardware allows.
    pub requested_workers: usize,
    pub pin_mode: PinMode,
    /// CPU threads per worker for the cpu stage.
    pub cpus: usize,
    /// GPUs per worker for the gpu stage.
    pub gpus: usize,
    /// OpenMP workers per process.
    pub omps: usize,
    /// Threads per OpenMP worker.
    pub ompthreads: usize,
    /// Utility threads reserved per worker.
    pub utility: usize,
    pub features: Vec<FeatureKind>,
    pub test_files: Vec<String>,
    /// Base argv every worker starts from.
    pub command: Vec<String>,
    /// Arguments appended after the shard arguments.
    pub extra_args: Vec<String>,
    /// Working directory for every worker.
    pub root_dir: PathBuf,
    /// Extra environment applied to every worker before stage overrides.
    pub env: BTreeMap<String, String>,
}

impl RunConfig {
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    /// Log a one-line-per-field summary at startup.
    pub fn log_summary(&self) {
        let features: Vec<&str> = self.features.iter().map(FeatureKind::name).collect();
        tracing::info!("Run config:");
        tracing::info!("  features:  {}", features.join(", "));
        tracing::info!("  workers:   {} (0 = auto)", self.requested_workers);
        tracing::info!("  pin mode:  {}", self.pin_mode);
        tracing::info!(
            "  threads:   cpus={} gpus={} omps={} ompthreads={} utility={}",
            self.cpus,
            self.gpus,
            self.omps,
            self.ompthreads,
            self.utility
        );
        tracing::info!("  files:     {}", self.test_files.len());
        tracing::info!("  root dir:  {}", self.root_dir.display());
    }
}

/// Builder for [`RunConfig`]. Every field starts at its documented default.
#[derive(Debug, Clone)]
pub struct RunConfigBuilder {
    requested_workers: usize,
    pin_mode: PinMode,
    cpus: usize,
    gpus: usize,
    omps: usize,
    ompthreads: usize,
    utility: usize,
    features: Vec<FeatureKind>,
    test_files: Vec<String>,
    command: Vec<String>,
    extra_args: Vec<String>,
    root_dir: PathBuf,
    env: BTreeMap<String, String>,
}

impl Default for RunConfigBuilder {
    fn default() -> Self {
        Self {
            requested_workers: 0,
            pin_mode: PinMode::default(),
            cpus: 1,
            gpus: 1,
            omps: 1,
            ompthreads: 4,
            utility: 1,
            features: vec![FeatureKind::Cpu],
            test_files: Vec::new(),
            command: Vec::new(),
            extra_args: Vec::new(),
            root_dir: PathBuf::from("."),
            env: BTreeMap::new(),
        }
    }
}

impl RunConfigBuilder {
    pub fn requested_workers(mut self, n: usize) -> Self {
        self.requested_workers = n;
        self
    }

    pub fn pin_mode(mut self, mode: PinMode) -> Self {
        self.pin_mode = mode;
        self
    }

    pub fn cpus(mut self, n: usize) -> Self {
        self.cpus = n;
        self
    }

    pub fn gpus(mut self, n: usize) -> Self {
        self.gpus = n;
        self
    }

    pub fn omps(mut self, n: usize) -> Self {
        self.omps = n;
        self
    }

    pub fn ompthreads(mut self, n: usize) -> Self {
        self.ompthreads = n;
        self
    }

    pub fn utility(mut self, n: usize) -> Self {
        self.utility = n;
        self
    }

    pub fn features(mut self, features: impl IntoIterator<Item = FeatureKind>) -> Self {
        self.features = features.into_iter().collect();
        self
    }

    pub fn test_files<S: Into<String>>(mut self, files: impl IntoIterator<Item = S>) -> Self {
        self.test_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn command<S: Into<String>>(mut self, argv: impl IntoIterator<Item = S>) -> Self {
        self.command = argv.into_iter().map(Into::into).collect();
        self
    }

    pub fn extra_args<S: Into<String>>(mut self, args: impl IntoIterator<Item = S>) -> Self {
        self.extra_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn root_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.root_dir = dir.into();
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Result<RunConfig, ConfigError> {
        if self.command.is_empty() || self.command[0].trim().is_empty() {
            return Err(ConfigError::EmptyCommand);
        }
        for (field, value) in [
            ("cpus", self.cpus),
            ("gpus", self.gpus),
            ("omps", self.omps),
            ("ompthreads", self.ompthreads),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroThreads { field });
            }
        }

        // Each feature runs at most once, in first-seen order.
        let mut features = Vec::with_capacity(self.features.len());
        for kind in self.features {
            if !features.contains(&kind) {
                features.push(kind);
            }
        }

        Ok(RunConfig {
            requested_workers: self.requested_workers,
            pin_mode: self.pin_mode,
            cpus: self.cpus,
            gpus: self.gpus,
            omps: self.omps,
            ompthreads: self.ompthreads,
            utility: self.utility,
            features,
            test_files: self.test_files,
            command: self.command,
            extra_args: self.extra_args,
            root_dir: self.root_dir,
            env: self.env,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> RunConfigBuilder {
        RunConfig::builder().command(["python", "-m", "pytest"])
    }

    #[test]
    fn builder_defaults() {
        let config = base().build().unwrap();
        assert_eq!(config.requested_workers, 0);
        assert_eq!(config.pin_mode, PinMode::Partial);
        assert_eq!(config.cpus, 1);
        assert_eq!(config.omps, 1);
        assert_eq!(config.ompthreads, 4);
        assert_eq!(config.utility, 1);
        assert_eq!(config.features, vec![FeatureKind::Cpu]);
    }

    #[test]
    fn features_deduplicated_in_order() {
        let config = base()
            .features([
                FeatureKind::OpenMp,
                FeatureKind::Cpu,
                FeatureKind::OpenMp,
                FeatureKind::Eager,
            ])
            .build()
            .unwrap();
        assert_eq!(
            config.features,
            vec![FeatureKind::OpenMp, FeatureKind::Cpu, FeatureKind::Eager]
        );
    }

    #[test]
    fn empty_command_rejected() {
        let err = RunConfig::builder().build().unwrap_err();
        assert_eq!(err, ConfigError::EmptyCommand);
    }

    #[test]
    fn zero_threads_rejected() {
        let err = base().ompthreads(0).build().unwrap_err();
        assert_eq!(err, ConfigError::ZeroThreads { field: "ompthreads" });
    }

    #[test]
    fn parse_pin_mode() {
        assert_eq!("strict".parse::<PinMode>().unwrap(), PinMode::Strict);
        assert_eq!(" None ".parse::<PinMode>().unwrap(), PinMode::None);
        assert!(matches!(
            "loose".parse::<PinMode>(),
            Err(ConfigError::UnknownPinMode(_))
        ));
    }

    #[test]
    fn parse_feature_aliases() {
        assert_eq!("cpus".parse::<FeatureKind>().unwrap(), FeatureKind::Cpu);
        assert_eq!("omp".parse::<FeatureKind>().unwrap(), FeatureKind::OpenMp);
        assert_eq!("gpu".parse::<FeatureKind>().unwrap(), FeatureKind::Gpu);
        assert_eq!("cuda".parse::<FeatureKind>().unwrap(), FeatureKind::Gpu);
        assert!("tpu".parse::<FeatureKind>().is_err());
    }

    #[test]
    fn canonical_names_parse_back() {
        for kind in FeatureKind::ALL {
            assert_eq!(kind.name().parse::<FeatureKind>().unwrap(), kind);
            assert_eq!(kind.to_string().to_uppercase().parse::<FeatureKind>().unwrap(), kind);
        }
    }

    #[test]
    fn feature_serde_names() {
        let json = serde_json::to_string(&FeatureKind::Gpu).unwrap();
        assert_eq!(json, "\"cuda\"");
        let kind: FeatureKind = serde_json::from_str("\"omp\"").unwrap();
        assert_eq!(kind, FeatureKind::OpenMp);
    }
}
