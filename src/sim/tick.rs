//! Fixed timestep simulation tick
//!
//! Core game loop that advances the race deterministically. Update order is
//! fixed: input, player, distance, rivals, track, collisions, progression.

use glam::Vec2;

use super::collision::resolve_collisions;
use super::difficulty::stage_config_clamped;
use super::progression::StageTransition;
use super::state::{GameEvent, GamePhase, GameState};
use super::steering::{SteeringContext, apply_rubber_band, update_rival};
use crate::consts::*;
use crate::shortest_angle;

/// How far ahead the autopilot aims along the track
const AUTOPILOT_LOOK_AHEAD: f32 = 120.0;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Lateral steering, -1 (left) to 1 (right)
    pub steer_x: f32,
    /// Forward input, 0 or 1 (any input keeps full speed)
    pub throttle: f32,
    /// Fire boost (edge-triggered by the caller)
    pub boost: bool,
    /// Pause toggle
    pub pause: bool,
    /// Demo mode - steer toward the track centre and boost when ready
    pub autopilot: bool,
}

/// Steering that points the player at the track centre a little way ahead
fn autopilot_input(state: &GameState) -> TickInput {
    let pos = state.player.agent.pos;
    let aim_y = pos.y + AUTOPILOT_LOOK_AHEAD;
    let aim = Vec2::new(state.track.bounds_at(aim_y).center, aim_y);
    let to_aim = aim - pos;

    let error = shortest_angle(state.player.agent.heading, to_aim.y.atan2(to_aim.x));
    TickInput {
        // Positive heading error means turning anticlockwise, i.e. steering left
        steer_x: (-error / PLAYER_TURN_SPEED).clamp(-1.0, 1.0),
        throttle: 1.0,
        boost: state.player.boost_ready,
        pause: false,
        autopilot: true,
    }
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    // Handle pause toggle
    if input.pause {
        match state.phase {
            GamePhase::Racing => {
                state.phase = GamePhase::Paused;
                log::info!("Paused");
                return;
            }
            GamePhase::Paused => {
                state.phase = GamePhase::Racing;
                log::info!("Resumed");
            }
            GamePhase::Won => {}
        }
    }

    // Don't tick if paused or finished
    if state.phase != GamePhase::Racing {
        return;
    }

    let input = if input.autopilot {
        autopilot_input(state)
    } else {
        input.clone()
    };

    state.time_ticks += 1;
    state.elapsed_ms += f64::from(dt) * 1000.0;

    let stage = state.difficulty();

    // Player
    if input.boost && state.player.boost() {
        log::debug!("Boost");
    }
    let bounds = state.track.bounds_at(state.player.agent.pos.y);
    let travelled = state.player.update(
        input.steer_x,
        input.throttle,
        &bounds,
        stage.speed_multiplier,
        dt,
    );
    state.progression.record_distance(travelled);

    // Rivals, in id order
    let player_pos = state.player.agent.pos;
    for rival in state.rivals.iter_mut() {
        let ctx = SteeringContext {
            player_pos,
            bounds: state.track.bounds_at(rival.agent.pos.y),
            obstacles: &state.track.obstacles,
            stage: &stage,
        };
        update_rival(rival, &ctx, dt, &mut state.rng);

        if apply_rubber_band(
            rival,
            player_pos,
            &state.track,
            &state.tuning.rubber_band,
            &mut state.rng,
        ) {
            state.events.push(GameEvent::RivalRespawned { rival_id: rival.id });
        }
    }

    // Track and entities
    state.track.update(player_pos.y, &stage, dt, &mut state.rng);
    for trap in &mut state.traps {
        trap.update(dt);
    }
    state.traps.retain(|t| !t.is_expired());

    resolve_collisions(state, dt);

    match state.progression.check() {
        Some(StageTransition::Advanced { stage }) => {
            let config = stage_config_clamped(stage);
            log::info!("Stage {} reached: {}", stage, config.name);
            state.top_up_rivals(&config);
            state.events.push(GameEvent::StageAdvanced { stage });
        }
        Some(StageTransition::Won) => {
            state.phase = GamePhase::Won;
            let elapsed_ms = state.elapsed_ms_rounded();
            log::info!("Race won in {:.1}s", elapsed_ms as f64 / 1000.0);
            state.events.push(GameEvent::Won { elapsed_ms });
        }
        None => {}
    }
}
