use thiserror::Error;

/// Fatal configuration problems. Any of these aborts a run before a single
/// worker process is spawned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("stage '{stage}': {requested} workers requested but the hardware cannot host even one")]
    InsufficientHardware { stage: String, requested: usize },

    #[error("stage '{stage}': a worker must need at least one resource unit")]
    ZeroResourcesPerWorker { stage: String },

    #[error("stage '{stage}': cores per worker overflow ({field} too large)")]
    ThreadBudgetOverflow { stage: String, field: &'static str },

    #[error("worker command must not be empty")]
    EmptyCommand,

    #[error("'{field}' must be greater than zero")]
    ZeroThreads { field: &'static str },

    #[error("unknown feature: {0}")]
    UnknownFeature(String),

    #[error("unknown pin mode: {0} (expected none, partial or strict)")]
    UnknownPinMode(String),
}
