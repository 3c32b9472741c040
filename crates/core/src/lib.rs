pub mod config;
pub mod error;
pub mod hardware;

pub use config::{FeatureKind, PinMode, RunConfig, RunConfigBuilder};
pub use error::*;
pub use hardware::{CoreId, CpuGroup, HardwareInventory};
