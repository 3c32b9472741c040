//! Multi-stage test plan -- runs stages one at a time and aggregates.
//!
//! Split into focused submodules:
//! - `core`: Plan struct, construction (all configuration checks) and state
//! - `execution`: sequential stage driver
//! - `aggregate`: folding stage results into a summary and failure report

mod aggregate;
mod core;
mod execution;

pub use self::aggregate::{failures, summarize};
pub use self::core::{Plan, PlanState};
