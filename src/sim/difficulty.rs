//! Stage difficulty tables
//!
//! Stages are 1-based. Anything past the last stage plays at the last stage's
//! values; within a stage, parameters drift toward the next stage but never
//! more than 30% of the way there.

use serde::Serialize;
use thiserror::Error;

use crate::lerp;

/// Fraction of the way toward the next stage reached at the end of a stage
pub const INTERPOLATION_CAP: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DifficultyError {
    #[error("stage index {index} is out of range (stages start at 1)")]
    OutOfRange { index: u32 },
}

/// Immutable per-stage difficulty parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageConfig {
    pub stage: u32,
    pub name: &'static str,
    pub rival_count: u32,
    pub aggression: f32,
    /// Multiplier on the base track width
    pub track_width: f32,
    /// Chance per segment that the track turns
    pub turn_frequency: f32,
    pub turn_sharpness: f32,
    pub obstacle_frequency: f32,
    pub current_frequency: f32,
    pub speed_multiplier: f32,
}

pub const STAGES: [StageConfig; 8] = [
    StageConfig {
        stage: 1,
        name: "Gentle Stream",
        rival_count: 3,
        aggression: 0.2,
        track_width: 1.0,
        turn_frequency: 0.1,
        turn_sharpness: 0.3,
        obstacle_frequency: 0.05,
        current_frequency: 0.0,
        speed_multiplier: 1.0,
    },
    StageConfig {
        stage: 2,
        name: "Bubbling Rapids",
        rival_count: 5,
        aggression: 0.3,
        track_width: 0.95,
        turn_frequency: 0.15,
        turn_sharpness: 0.4,
        obstacle_frequency: 0.1,
        current_frequency: 0.0,
        speed_multiplier: 1.1,
    },
    StageConfig {
        stage: 3,
        name: "Swirling Currents",
        rival_count: 6,
        aggression: 0.4,
        track_width: 0.9,
        turn_frequency: 0.2,
        turn_sharpness: 0.5,
        obstacle_frequency: 0.15,
        current_frequency: 0.15,
        speed_multiplier: 1.15,
    },
    StageConfig {
        stage: 4,
        name: "Crystal Caverns",
        rival_count: 8,
        aggression: 0.45,
        track_width: 0.85,
        turn_frequency: 0.3,
        turn_sharpness: 0.6,
        obstacle_frequency: 0.2,
        current_frequency: 0.2,
        speed_multiplier: 1.2,
    },
    StageConfig {
        stage: 5,
        name: "Neon Rush",
        rival_count: 10,
        aggression: 0.6,
        track_width: 0.75,
        turn_frequency: 0.35,
        turn_sharpness: 0.7,
        obstacle_frequency: 0.25,
        current_frequency: 0.25,
        speed_multiplier: 1.3,
    },
    StageConfig {
        stage: 6,
        name: "Cosmic Chaos",
        rival_count: 12,
        aggression: 0.7,
        track_width: 0.65,
        turn_frequency: 0.4,
        turn_sharpness: 0.75,
        obstacle_frequency: 0.35,
        current_frequency: 0.3,
        speed_multiplier: 1.4,
    },
    StageConfig {
        stage: 7,
        name: "Starlight Sprint",
        rival_count: 14,
        aggression: 0.8,
        track_width: 0.5,
        turn_frequency: 0.45,
        turn_sharpness: 0.85,
        obstacle_frequency: 0.4,
        current_frequency: 0.35,
        speed_multiplier: 1.55,
    },
    StageConfig {
        stage: 8,
        name: "The Core Awaits",
        rival_count: 16,
        aggression: 0.9,
        track_width: 0.45,
        turn_frequency: 0.5,
        turn_sharpness: 0.9,
        obstacle_frequency: 0.45,
        current_frequency: 0.4,
        speed_multiplier: 1.7,
    },
];

/// Number of authored stages
pub const STAGE_COUNT: u32 = STAGES.len() as u32;

/// Look up a stage by 1-based index, clamping past the final stage
pub fn stage_config(index: u32) -> Result<StageConfig, DifficultyError> {
    if index < 1 {
        return Err(DifficultyError::OutOfRange { index });
    }
    let clamped = index.min(STAGE_COUNT) as usize;
    Ok(STAGES[clamped - 1])
}

/// Stage config with the out-of-range case resolved to the first stage
pub fn stage_config_clamped(index: u32) -> StageConfig {
    stage_config(index).unwrap_or_else(|err| {
        log::warn!("{err}, using stage 1");
        STAGES[0]
    })
}

/// Difficulty partway through a stage
///
/// Blends every numeric field toward the next stage with factor
/// `progress * 0.3`. The rival count stays at the current stage's value;
/// the population only changes on an explicit stage advance.
pub fn interpolated_difficulty(
    index: u32,
    progress_within_stage: f32,
) -> Result<StageConfig, DifficultyError> {
    let current = stage_config(index)?;
    let next = stage_config(index.saturating_add(1))?;
    let t = progress_within_stage.clamp(0.0, 1.0) * INTERPOLATION_CAP;

    if t == 0.0 {
        return Ok(current);
    }

    Ok(StageConfig {
        aggression: lerp(current.aggression, next.aggression, t),
        track_width: lerp(current.track_width, next.track_width, t),
        turn_frequency: lerp(current.turn_frequency, next.turn_frequency, t),
        turn_sharpness: lerp(current.turn_sharpness, next.turn_sharpness, t),
        obstacle_frequency: lerp(current.obstacle_frequency, next.obstacle_frequency, t),
        current_frequency: lerp(current.current_frequency, next.current_frequency, t),
        speed_multiplier: lerp(current.speed_multiplier, next.speed_multiplier, t),
        ..current
    })
}

/// Widest track-width multiplier across all stages
pub fn max_track_width_multiplier() -> f32 {
    STAGES.iter().map(|s| s.track_width).fold(0.0, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_zero_is_out_of_range() {
        assert_eq!(stage_config(0), Err(DifficultyError::OutOfRange { index: 0 }));
    }

    #[test]
    fn test_stage_lookup_is_one_based() {
        assert_eq!(stage_config(1).map(|s| s.name), Ok("Gentle Stream"));
        assert_eq!(stage_config(8).map(|s| s.stage), Ok(8));
    }

    #[test]
    fn test_stage_past_end_clamps_to_last() {
        assert_eq!(stage_config(9), Ok(STAGES[7]));
        assert_eq!(stage_config(u32::MAX), Ok(STAGES[7]));
    }

    #[test]
    fn test_zero_progress_is_exact_stage() {
        for index in 1..=STAGE_COUNT {
            assert_eq!(interpolated_difficulty(index, 0.0), stage_config(index));
        }
    }

    #[test]
    fn test_full_progress_reaches_thirty_percent() {
        let blended = interpolated_difficulty(1, 1.0).unwrap();
        let expected = 1.0 + (1.1 - 1.0) * 0.3;
        assert!((blended.speed_multiplier - expected).abs() < 1e-6);
        assert_eq!(blended.rival_count, STAGES[0].rival_count);
        assert_eq!(blended.stage, 1);
    }

    #[test]
    fn test_progress_is_clamped() {
        assert_eq!(interpolated_difficulty(2, 5.0), interpolated_difficulty(2, 1.0));
        assert_eq!(interpolated_difficulty(2, -1.0), stage_config(2));
    }

    #[test]
    fn test_last_stage_interpolates_to_itself() {
        assert_eq!(interpolated_difficulty(8, 1.0), stage_config(8));
    }

    #[test]
    fn test_interpolation_rejects_stage_zero() {
        assert!(interpolated_difficulty(0, 0.5).is_err());
    }

    #[test]
    fn test_stages_get_harder() {
        for pair in STAGES.windows(2) {
            assert!(pair[1].aggression >= pair[0].aggression);
            assert!(pair[1].speed_multiplier >= pair[0].speed_multiplier);
            assert!(pair[1].rival_count >= pair[0].rival_count);
        }
    }
}
