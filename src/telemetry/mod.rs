//! Per-run stage telemetry
//!
//! Each pipeline run owns its own recorder; nothing is shared between runs.
//! Every recorded event is mirrored to `tracing`.

use std::fmt::Display;
use std::time::Duration;

use crate::types::{Stage, StageTimings};

/// How a stage ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Completed,
    /// The stage failed and its documented fallback was used
    Fallback,
    Cancelled,
}

/// One finished stage
#[derive(Debug, Clone)]
pub struct StageEvent {
    pub stage: Stage,
    pub duration: Duration,
    pub outcome: StageOutcome,
}

/// Collects stage events for a single run
#[derive(Debug, Default)]
pub struct RunTelemetry {
    events: Vec<StageEvent>,
}

impl RunTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stage that finished normally, with the number of items it produced
    pub fn completed(&mut self, stage: Stage, duration: Duration, produced: usize) {
        tracing::debug!(
            stage = %stage,
            duration_ms = duration.as_millis() as u64,
            produced,
            "Stage completed"
        );
        self.push(stage, duration, StageOutcome::Completed);
    }

    /// Record a stage that fell back
    pub fn fallback(&mut self, stage: Stage, duration: Duration, reason: &dyn Display) {
        tracing::warn!(
            stage = %stage,
            duration_ms = duration.as_millis() as u64,
            reason = %reason,
            "Stage degraded to fallback"
        );
        self.push(stage, duration, StageOutcome::Fallback);
    }

    /// Record a stage interrupted by cancellation
    pub fn cancelled(&mut self, stage: Stage, duration: Duration) {
        tracing::info!(
            stage = %stage,
            duration_ms = duration.as_millis() as u64,
            "Stage cancelled"
        );
        self.push(stage, duration, StageOutcome::Cancelled);
    }

    fn push(&mut self, stage: Stage, duration: Duration, outcome: StageOutcome) {
        self.events.push(StageEvent {
            stage,
            duration,
            outcome,
        });
    }

    /// Recorded events in order
    pub fn events(&self) -> &[StageEvent] {
        &self.events
    }

    /// Stages that used their fallback, in order, without duplicates
    pub fn degraded(&self) -> Vec<Stage> {
        let mut stages = Vec::new();
        for event in &self.events {
            if event.outcome == StageOutcome::Fallback && !stages.contains(&event.stage) {
                stages.push(event.stage);
            }
        }
        stages
    }

    /// Seconds per stage; concurrent retrievals report the longer branch
    pub fn timings(&self) -> StageTimings {
        let mut timings = StageTimings::default();
        for event in &self.events {
            let secs = event.duration.as_secs_f64();
            let slot = match event.stage {
                Stage::Optimize => &mut timings.optimize,
                Stage::RetrieveSemantic | Stage::RetrieveKeyword => &mut timings.retrieve,
                Stage::Fuse => &mut timings.fuse,
                Stage::Assemble => &mut timings.assemble,
                Stage::Answer => &mut timings.answer,
            };
            *slot = slot.max(secs);
        }
        timings
    }
}
