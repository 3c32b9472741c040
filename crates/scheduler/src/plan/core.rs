use shardrun_core::{ConfigError, HardwareInventory, RunConfig};
use tracing::{debug, info};

use crate::stage::Stage;

/// Where a plan is in its run. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanState {
    Init,
    RunningStage(usize),
    Aggregating,
    Done,
}

/// An ordered sequence of stages, one per configured feature.
///
/// Every stage computes its spec during [`Plan::new`], so configuration
/// errors surface before any worker is spawned.
pub struct Plan {
    pub(super) config: RunConfig,
    pub(super) inventory: HardwareInventory,
    pub(super) stages: Vec<Stage>,
    pub(super) state: PlanState,
}

impl Plan {
    pub fn new(config: RunConfig, inventory: HardwareInventory) -> Result<Self, ConfigError> {
        let stages = config
            .features
            .iter()
            .map(|kind| Stage::new(*kind, &config, &inventory))
            .collect::<Result<Vec<_>, _>>()?;

        for stage in &stages {
            info!(
                stage = stage.name(),
                workers = stage.spec().workers,
                "planned stage"
            );
        }

        Ok(Self {
            config,
            inventory,
            stages,
            state: PlanState::Init,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn inventory(&self) -> &HardwareInventory {
        &self.inventory
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn state(&self) -> PlanState {
        self.state
    }

    pub(super) fn advance(&mut self, next: PlanState) {
        debug_assert!(
            rank(next) > rank(self.state),
            "plan state moved backwards: {:?} -> {next:?}",
            self.state
        );
        debug!(from = ?self.state, to = ?next, "plan state");
        self.state = next;
    }
}

fn rank(state: PlanState) -> usize {
    match state {
        PlanState::Init => 0,
        PlanState::RunningStage(i) => 1 + i,
        PlanState::Aggregating => usize::MAX - 1,
        PlanState::Done => usize::MAX,
    }
}
