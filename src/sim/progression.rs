//! Stage progression
//!
//! Each stage has the same distance budget, derived from the target run
//! length and an assumed average speed. Skilled players finish stages
//! sooner than the target time; that drift is accepted.

use serde::Serialize;

use super::difficulty::STAGE_COUNT;
use crate::consts::{PLAYER_BASE_SPEED, PLAYER_MAX_SPEED};
use crate::tuning::Tuning;

/// Speed assumed when converting playtime into distance
pub const ASSUMED_AVERAGE_SPEED: f32 = (PLAYER_BASE_SPEED + PLAYER_MAX_SPEED) / 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StagePhase {
    /// Racing through a 1-based stage
    Stage(u32),
    /// Terminal
    Won,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageTransition {
    Advanced { stage: u32 },
    Won,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageProgression {
    pub phase: StagePhase,
    pub stage_distance: f32,
    pub total_distance: f32,
    pub distance_per_stage: f32,
}

impl StageProgression {
    pub fn new(tuning: &Tuning) -> Self {
        Self::resume(tuning, 1, 0.0)
    }

    /// Pick up at a saved stage (clamped to the authored range)
    pub fn resume(tuning: &Tuning, stage: u32, total_distance: f32) -> Self {
        let total = ASSUMED_AVERAGE_SPEED * tuning.target_playtime_secs;
        Self {
            phase: StagePhase::Stage(stage.clamp(1, STAGE_COUNT)),
            stage_distance: 0.0,
            total_distance: total_distance.max(0.0),
            distance_per_stage: total / STAGE_COUNT as f32,
        }
    }

    /// Current stage, the final stage once won
    pub fn current_stage(&self) -> u32 {
        match self.phase {
            StagePhase::Stage(stage) => stage,
            StagePhase::Won => STAGE_COUNT,
        }
    }

    pub fn is_won(&self) -> bool {
        self.phase == StagePhase::Won
    }

    /// Fraction of the current stage's budget covered, 0..=1
    pub fn stage_progress(&self) -> f32 {
        if self.is_won() {
            return 1.0;
        }
        (self.stage_distance / self.distance_per_stage).clamp(0.0, 1.0)
    }

    /// Fraction of the whole run covered, 0..=1
    pub fn overall_progress(&self) -> f32 {
        let total = self.distance_per_stage * STAGE_COUNT as f32;
        (self.total_distance / total).clamp(0.0, 1.0)
    }

    pub fn record_distance(&mut self, distance: f32) {
        if self.is_won() {
            return;
        }
        self.stage_distance += distance;
        self.total_distance += distance;
    }

    /// Advance (or win) once the stage budget is spent
    pub fn check(&mut self) -> Option<StageTransition> {
        let StagePhase::Stage(stage) = self.phase else {
            return None;
        };
        if self.stage_distance < self.distance_per_stage {
            return None;
        }

        self.stage_distance = 0.0;
        if stage >= STAGE_COUNT {
            self.phase = StagePhase::Won;
            Some(StageTransition::Won)
        } else {
            self.phase = StagePhase::Stage(stage + 1);
            Some(StageTransition::Advanced { stage: stage + 1 })
        }
    }
}
