//! Resource-aware test scheduling.
//!
//! A [`Plan`] turns a [`RunConfig`](shardrun_core::RunConfig) and a
//! [`HardwareInventory`](shardrun_core::HardwareInventory) into one [`Stage`]
//! per feature kind. Each stage partitions the hardware into disjoint
//! [`Shard`]s via the [`planner`], fans its workers out through a
//! [`ProcessExecutor`], and the plan folds every stage's completions into a
//! single exit code.

pub mod events;
pub mod executor;
pub mod plan;
pub mod planner;
pub mod stage;
pub mod types;

pub use events::{ChannelSink, EventSink, MultiSink, NullSink, PlanEvent, TracingSink};
pub use executor::{
    ProcessExecutor, TokioProcessExecutor, WorkerCommand, SPAWN_FAILURE_CODE, TIMEOUT_CODE,
};
pub use plan::{Plan, PlanState};
pub use planner::{adjust_workers, chunk_files, compute_spec, Capacity};
pub use stage::Stage;
pub use types::{
    FailureEntry, PlanReport, PlanSummary, ProcessCompletion, Shard, StageResult, StageSpec,
};
