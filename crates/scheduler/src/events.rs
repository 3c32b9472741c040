//! Structured progress events emitted while a plan runs.
//!
//! The plan writes to whatever [`EventSink`] it is given. Nothing it computes
//! depends on the sink, so [`NullSink`] is always a valid choice.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::types::{FailureEntry, PlanSummary};

#[derive(Debug, Clone, Serialize)]
pub enum PlanEvent {
    PlanStarted {
        features: Vec<String>,
        test_files: usize,
        cpus: usize,
        gpus: usize,
    },
    StageStarted {
        name: String,
        workers: usize,
    },
    WorkerFinished {
        stage: String,
        worker: usize,
        return_code: i32,
        elapsed: Duration,
    },
    StageFinished {
        name: String,
        total: usize,
        passed: usize,
        elapsed: Duration,
    },
    Failure(FailureEntry),
    PlanFinished(PlanSummary),
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &PlanEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &PlanEvent) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &PlanEvent) {
        match event {
            PlanEvent::PlanStarted { features, test_files, cpus, gpus } => info!(
                features = %features.join(", "),
                test_files,
                cpus,
                gpus,
                "test plan starting"
            ),
            PlanEvent::StageStarted { name, workers } => {
                info!(stage = %name, workers, "stage starting")
            }
            PlanEvent::WorkerFinished { stage, worker, return_code, elapsed } => info!(
                stage = %stage,
                worker,
                return_code,
                elapsed_secs = elapsed.as_secs_f64(),
                "worker finished"
            ),
            PlanEvent::StageFinished { name, total, passed, elapsed } => info!(
                stage = %name,
                total,
                passed,
                elapsed_secs = elapsed.as_secs_f64(),
                "stage finished"
            ),
            PlanEvent::Failure(f) => warn!(
                stage = %f.stage,
                worker = f.worker,
                return_code = f.return_code,
                elapsed_secs = f.elapsed.as_secs_f64(),
                "worker failed"
            ),
            PlanEvent::PlanFinished(s) => info!(
                total = s.total,
                passed = s.passed,
                elapsed_secs = s.elapsed.as_secs_f64(),
                "test plan finished"
            ),
        }
    }
}

/// Sends a clone of every event down an unbounded channel. A closed
/// receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<PlanEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<PlanEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &PlanEvent) {
        let _ = self.tx.send(event.clone());
    }
}

/// Fans every event out to several sinks, in order.
pub struct MultiSink<'a> {
    sinks: Vec<&'a dyn EventSink>,
}

impl<'a> MultiSink<'a> {
    pub fn new(sinks: Vec<&'a dyn EventSink>) -> Self {
        Self { sinks }
    }
}

impl EventSink for MultiSink<'_> {
    fn emit(&self, event: &PlanEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_sink_forwards() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = ChannelSink::new(tx);
        sink.emit(&PlanEvent::StageStarted { name: "cpus".into(), workers: 2 });

        match rx.try_recv().unwrap() {
            PlanEvent::StageStarted { name, workers } => {
                assert_eq!(name, "cpus");
                assert_eq!(workers, 2);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn channel_sink_ignores_closed_receiver() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        ChannelSink::new(tx).emit(&PlanEvent::PlanFinished(PlanSummary::default()));
    }

    #[test]
    fn multi_sink_fans_out() {
        let (tx1, mut rx1) = tokio::sync::mpsc::unbounded_channel();
        let (tx2, mut rx2) = tokio::sync::mpsc::unbounded_channel();
        let a = ChannelSink::new(tx1);
        let b = ChannelSink::new(tx2);
        let multi = MultiSink::new(vec![&a, &NullSink, &b]);
        multi.emit(&PlanEvent::PlanFinished(PlanSummary::default()));

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }
}
