//! Rival AI steering
//!
//! Each tick a rival in the normal state builds a target heading by blending
//! three goals in a fixed order: hold a lane, go for the player, dodge
//! obstacles. Later goals bend the result of earlier ones. The actual heading
//! then eases toward the target instead of snapping to it.

use glam::Vec2;
use rand::Rng;

use super::difficulty::StageConfig;
use super::entities::Obstacle;
use super::state::Rival;
use super::track::{TrackBounds, TrackGenerator};
use crate::consts::*;
use crate::tuning::RubberBand;
use crate::{lerp, lerp_angle, normalize_angle};

/// Lateral distance between lanes
pub const LANE_SPACING: f32 = 40.0;
/// Rivals closer than this to their lane don't bother steering
pub const LANE_DEADZONE: f32 = 10.0;
/// Heading nudge toward the lane (15 degrees)
pub const LANE_NUDGE: f32 = 15.0 * std::f32::consts::PI / 180.0;
/// Per-tick chance of wandering to another lane
pub const LANE_REROLL_CHANCE: f32 = 0.005;
pub const MAX_LANE: i32 = 2;

pub const PURSUIT_RANGE: f32 = 100.0;
/// Pursuit blend at the lowest aggression; full aggression pursues outright
pub const PURSUIT_BLEND_MIN: f32 = 0.5;
pub const BUMP_COOLDOWN: f32 = 1.0;

pub const AVOID_RANGE: f32 = 80.0;
pub const AVOID_BLEND: f32 = 0.3;

/// Fraction of the heading error closed per 60 Hz frame, per unit of turn speed
pub const TURN_EASE: f32 = 0.05;
/// Base turn speed in the same units as the player's (degrees per frame)
pub const BASE_TURN_SPEED: f32 = 4.0;

pub const RIVAL_ACCELERATION: f32 = PLAYER_ACCELERATION * 0.8;
/// Rivals shed speed at half the rate they gain it
pub const RIVAL_DECELERATION: f32 = RIVAL_ACCELERATION * 0.5;
pub const STUN_SPEED_FACTOR: f32 = 0.3;
pub const RIVAL_KNOCKBACK_DECAY: f32 = 0.92;

/// Whether a rival is making decisions this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteeringMode {
    Normal,
    /// No steering, reduced speed, until the stun runs out
    Stunned,
}

/// What a rival can see when deciding
#[derive(Debug, Clone, Copy)]
pub struct SteeringContext<'a> {
    pub player_pos: Vec2,
    /// Track bounds at the rival's position
    pub bounds: TrackBounds,
    pub obstacles: &'a [Obstacle],
    pub stage: &'a StageConfig,
}

pub fn steering_mode(rival: &Rival) -> SteeringMode {
    if rival.agent.is_stunned() {
        SteeringMode::Stunned
    } else {
        SteeringMode::Normal
    }
}

/// Blend lane-keeping, pursuit and avoidance into a target heading
pub fn decide_heading<R: Rng + ?Sized>(
    rival: &mut Rival,
    ctx: &SteeringContext,
    rng: &mut R,
) -> f32 {
    let pos = rival.agent.pos;
    let mut target = FORWARD_HEADING;

    // Lane keeping
    let lane_x = ctx.bounds.center + rival.target_lane as f32 * LANE_SPACING;
    let dx = lane_x - pos.x;
    if dx.abs() > LANE_DEADZONE {
        // Positive dx means steer toward +x, i.e. clockwise from forward
        target -= dx.signum() * LANE_NUDGE;
    }
    if rng.random::<f32>() < LANE_REROLL_CHANCE {
        rival.target_lane = rng.random_range(-MAX_LANE..=MAX_LANE);
    }

    // Pursuit
    if rival.bump_cooldown <= 0.0 {
        let to_player = ctx.player_pos - pos;
        let gate = (rival.traits.bump_probability * rival.aggression).clamp(0.0, 1.0);
        if to_player.length() < PURSUIT_RANGE && rng.random::<f32>() < gate {
            let bearing = to_player.y.atan2(to_player.x);
            target = lerp_angle(target, bearing, lerp(PURSUIT_BLEND_MIN, 1.0, gate));
            rival.bump_cooldown = BUMP_COOLDOWN;
        }
    }

    // Avoidance
    for obstacle in ctx.obstacles {
        let away = pos - obstacle.pos;
        if away.length() < AVOID_RANGE {
            let bearing = away.y.atan2(away.x);
            target = lerp_angle(target, bearing, AVOID_BLEND);
        }
    }

    normalize_angle(target)
}

/// Run one tick of AI and movement for a rival
pub fn update_rival<R: Rng + ?Sized>(
    rival: &mut Rival,
    ctx: &SteeringContext,
    dt: f32,
    rng: &mut R,
) {
    rival.agent.status.tick(dt);
    rival.bump_cooldown = (rival.bump_cooldown - dt).max(0.0);

    let mode = steering_mode(rival);
    if mode == SteeringMode::Normal {
        rival.target_heading = decide_heading(rival, ctx, rng);

        let turn_speed = BASE_TURN_SPEED * rival.traits.turn_reaction;
        let ease = (turn_speed * TURN_EASE * dt * 60.0).min(1.0);
        rival.agent.heading = lerp_angle(rival.agent.heading, rival.target_heading, ease);
    }

    let mut target_speed = PLAYER_BASE_SPEED
        * rival.traits.speed_variance
        * ctx.stage.speed_multiplier
        * rival.speed_variation;
    if mode == SteeringMode::Stunned {
        target_speed *= STUN_SPEED_FACTOR;
    }
    rival
        .agent
        .ease_speed(target_speed, RIVAL_ACCELERATION, RIVAL_DECELERATION, dt);

    rival.agent.integrate(dt, RIVAL_KNOCKBACK_DECAY);
    rival.agent.constrain(&ctx.bounds, 0.3, 0.9);
}

/// Keep a rival near the player
///
/// Rivals left far behind reappear ahead of the player inside the track;
/// rivals far ahead are slowed. Returns true if the rival was respawned.
pub fn apply_rubber_band<R: Rng + ?Sized>(
    rival: &mut Rival,
    player_pos: Vec2,
    track: &TrackGenerator,
    band: &RubberBand,
    rng: &mut R,
) -> bool {
    let ahead = rival.agent.pos.y - player_pos.y;

    if ahead < -band.respawn_behind {
        let y = player_pos.y + band.respawn_min_ahead + rng.random::<f32>() * band.respawn_spread;
        let bounds = track.bounds_at(y);
        let x = bounds.center + (rng.random::<f32>() - 0.5) * bounds.width * 0.6;

        rival.agent.pos = Vec2::new(x, y);
        rival.agent.knockback = Vec2::ZERO;
        rival.agent.status.stun = 0.0;
        log::debug!("Rival {} respawned at ({x:.0}, {y:.0})", rival.id);
        return true;
    }

    if ahead > band.throttle_ahead {
        rival.agent.speed *= band.throttle_factor;
    }
    false
}
