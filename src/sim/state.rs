//! Game state and core simulation types
//!
//! Everything one race needs lives in `GameState`, passed explicitly into the
//! update functions. The RNG is owned here so a seed replays a race exactly.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use super::difficulty::{StageConfig, interpolated_difficulty, stage_config_clamped};
use super::entities::{PowerupKind, Trap};
use super::progression::StageProgression;
use super::track::{TrackBounds, TrackGenerator};
use crate::consts::*;
use crate::tuning::Tuning;

/// Current phase of a race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GamePhase {
    Racing,
    /// Simulation frozen, no ticks delivered
    Paused,
    /// Final stage completed
    Won,
}

/// Things that happened during a tick, drained by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    StageAdvanced { stage: u32 },
    Won { elapsed_ms: u64 },
    PowerupCollected { kind: PowerupKind },
    PlayerBumped { rival_id: u32 },
    RivalTrapped { rival_id: u32 },
    RivalRespawned { rival_id: u32 },
}

/// Remaining seconds on each timed status
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatusTimers {
    pub stun: f32,
    pub shield: f32,
    pub boost: f32,
}

impl StatusTimers {
    pub fn tick(&mut self, dt: f32) {
        self.stun = (self.stun - dt).max(0.0);
        self.shield = (self.shield - dt).max(0.0);
        self.boost = (self.boost - dt).max(0.0);
    }
}

/// Kinematic body shared by the player and rivals
#[derive(Debug, Clone, Serialize)]
pub struct Agent {
    pub pos: Vec2,
    /// Radians, `FORWARD_HEADING` points down the track
    pub heading: f32,
    pub speed: f32,
    /// Transient impulse velocity, decays every tick
    pub knockback: Vec2,
    pub radius: f32,
    pub status: StatusTimers,
}

impl Agent {
    pub fn new(pos: Vec2, radius: f32) -> Self {
        Self {
            pos,
            heading: FORWARD_HEADING,
            speed: 0.0,
            knockback: Vec2::ZERO,
            radius,
            status: StatusTimers::default(),
        }
    }

    pub fn is_stunned(&self) -> bool {
        self.status.stun > 0.0
    }

    pub fn is_shielded(&self) -> bool {
        self.status.shield > 0.0
    }

    pub fn is_boosting(&self) -> bool {
        self.status.boost > 0.0
    }

    pub fn velocity(&self) -> Vec2 {
        Vec2::from_angle(self.heading) * self.speed
    }

    /// Add a knockback impulse and bleed speed
    ///
    /// Shielded agents ignore knockback entirely. Returns whether the
    /// impulse was applied.
    pub fn apply_knockback(&mut self, direction: Vec2, force: f32, speed_retained: f32) -> bool {
        if self.is_shielded() {
            return false;
        }
        self.knockback += direction * force;
        self.speed *= speed_retained;
        true
    }

    pub fn apply_slowdown(&mut self, factor: f32) {
        self.speed *= factor;
    }

    /// Extend the stun to at least `duration`
    pub fn stun(&mut self, duration: f32) {
        self.status.stun = self.status.stun.max(duration);
    }

    /// Move the speed toward `target` at asymmetric rates (units/s²)
    pub fn ease_speed(&mut self, target: f32, accel: f32, decel: f32, dt: f32) {
        if self.speed < target {
            self.speed = (self.speed + accel * dt).min(target);
        } else {
            self.speed = (self.speed - decel * dt).max(target);
        }
    }

    /// Euler step, then decay the knockback (`decay` is per 60 Hz frame)
    pub fn integrate(&mut self, dt: f32, decay: f32) {
        self.pos += (self.velocity() + self.knockback) * dt;
        self.knockback *= decay.powf(dt * 60.0);
    }

    /// Keep the agent inside the track walls, bouncing off on contact
    pub fn constrain(&mut self, bounds: &TrackBounds, bounce: f32, speed_retained: f32) -> bool {
        let clamped = bounds.clamp_x(self.pos.x, self.radius);
        if clamped == self.pos.x {
            return false;
        }
        self.pos.x = clamped;
        self.knockback.x = -self.velocity().x * bounce;
        self.speed *= speed_retained;
        true
    }
}

pub const PLAYER_KNOCKBACK_DECAY: f32 = 0.9;

/// The player-controlled racer
#[derive(Debug, Clone, Serialize)]
pub struct Player {
    pub agent: Agent,
    /// Boost can fire (off while boosting and during cooldown)
    pub boost_ready: bool,
    /// Seconds left before boost is ready again
    pub boost_cooldown: f32,
    pub distance_traveled: f32,
}

impl Player {
    pub fn new(pos: Vec2) -> Self {
        Self {
            agent: Agent::new(pos, PLAYER_RADIUS),
            boost_ready: true,
            boost_cooldown: 0.0,
            distance_traveled: 0.0,
        }
    }

    /// Start a boost if available
    pub fn boost(&mut self) -> bool {
        if self.boost_ready && !self.agent.is_boosting() {
            self.agent.status.boost = BOOST_DURATION;
            self.boost_ready = false;
            return true;
        }
        false
    }

    pub fn refill_boost(&mut self) {
        self.boost_cooldown = 0.0;
        if !self.agent.is_boosting() {
            self.boost_ready = true;
        }
    }

    pub fn activate_shield(&mut self, duration: f32) {
        self.agent.status.shield = self.agent.status.shield.max(duration);
    }

    /// Boost gauge for the HUD: drains while boosting, refills during cooldown
    pub fn boost_progress(&self) -> f32 {
        if self.agent.is_boosting() {
            self.agent.status.boost / BOOST_DURATION
        } else if !self.boost_ready {
            1.0 - self.boost_cooldown / BOOST_COOLDOWN
        } else {
            1.0
        }
    }

    fn tick_timers(&mut self, dt: f32) {
        let was_boosting = self.agent.is_boosting();
        self.agent.status.tick(dt);

        if was_boosting && !self.agent.is_boosting() {
            self.boost_cooldown = BOOST_COOLDOWN;
        } else if !self.boost_ready && !self.agent.is_boosting() {
            self.boost_cooldown -= dt;
            if self.boost_cooldown <= 0.0 {
                self.boost_cooldown = 0.0;
                self.boost_ready = true;
            }
        }
    }

    /// Steer, accelerate and move; returns the distance covered this tick
    pub fn update(
        &mut self,
        steer_x: f32,
        throttle: f32,
        bounds: &TrackBounds,
        speed_multiplier: f32,
        dt: f32,
    ) -> f32 {
        self.tick_timers(dt);

        let steer_x = steer_x.clamp(-1.0, 1.0);
        // Steering right (+x) swings the heading clockwise
        self.agent.heading =
            crate::normalize_angle(self.agent.heading - steer_x * PLAYER_TURN_SPEED * dt * 60.0);

        let mut target = PLAYER_BASE_SPEED * speed_multiplier;
        if self.agent.is_boosting() {
            target *= BOOST_MULTIPLIER;
        }
        let active = steer_x.abs() > 0.1 || throttle > 0.0;
        if !active {
            target *= PLAYER_IDLE_FACTOR;
        }

        self.agent.ease_speed(
            target,
            PLAYER_ACCELERATION,
            PLAYER_ACCELERATION * 0.3,
            dt,
        );
        self.agent.speed = self.agent.speed.min(PLAYER_MAX_SPEED * speed_multiplier);

        self.agent.integrate(dt, PLAYER_KNOCKBACK_DECAY);
        let travelled = self.agent.speed * dt;
        self.distance_traveled += travelled;

        self.agent.constrain(bounds, 0.4, 0.85);
        travelled
    }
}

/// Tuning bundle behind a rival personality
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArchetypeTraits {
    pub speed_variance: f32,
    /// Chance per tick (scaled by aggression) of going for the player
    pub bump_probability: f32,
    /// Bump strength, also resistance to being knocked back
    pub bump_force: f32,
    pub turn_reaction: f32,
}

/// Rival personalities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RivalArchetype {
    Swift,
    Steady,
    Bouncy,
    Floaty,
}

impl RivalArchetype {
    pub const ALL: [RivalArchetype; 4] = [
        RivalArchetype::Swift,
        RivalArchetype::Steady,
        RivalArchetype::Bouncy,
        RivalArchetype::Floaty,
    ];

    pub fn traits(self) -> ArchetypeTraits {
        match self {
            RivalArchetype::Swift => ArchetypeTraits {
                speed_variance: 1.15,
                bump_probability: 0.3,
                bump_force: 0.8,
                turn_reaction: 1.3,
            },
            RivalArchetype::Steady => ArchetypeTraits {
                speed_variance: 0.95,
                bump_probability: 0.2,
                bump_force: 1.0,
                turn_reaction: 1.1,
            },
            RivalArchetype::Bouncy => ArchetypeTraits {
                speed_variance: 1.0,
                bump_probability: 0.6,
                bump_force: 1.4,
                turn_reaction: 0.9,
            },
            RivalArchetype::Floaty => ArchetypeTraits {
                speed_variance: 0.9,
                bump_probability: 0.15,
                bump_force: 0.6,
                turn_reaction: 1.4,
            },
        }
    }
}

/// Stun applied to a rival on knockback
pub const RIVAL_KNOCKBACK_STUN: f32 = 0.3;

/// An AI-controlled competitor
#[derive(Debug, Clone, Serialize)]
pub struct Rival {
    pub id: u32,
    pub agent: Agent,
    pub archetype: RivalArchetype,
    pub traits: ArchetypeTraits,
    /// Lane offset from the track centre, in lanes (-2..=2)
    pub target_lane: i32,
    /// Heading the rival is easing toward
    pub target_heading: f32,
    pub aggression: f32,
    /// Seconds before another pursuit attempt
    pub bump_cooldown: f32,
    /// Per-rival speed jitter (0.9..1.1)
    pub speed_variation: f32,
}

impl Rival {
    pub fn new(id: u32, pos: Vec2, archetype: RivalArchetype, aggression: f32) -> Self {
        let traits = archetype.traits();
        let radius = PLAYER_RADIUS;
        Self {
            id,
            agent: Agent::new(pos, radius),
            archetype,
            traits,
            target_lane: 0,
            target_heading: FORWARD_HEADING,
            aggression,
            bump_cooldown: 0.0,
            speed_variation: 1.0,
        }
    }

    /// Knockback resisted by the archetype's bump force; stuns briefly
    pub fn apply_knockback(&mut self, direction: Vec2, force: f32) -> bool {
        let resistance = self.traits.bump_force.max(0.01);
        let applied = self.agent.apply_knockback(direction, force / resistance, 0.6);
        if applied {
            self.agent.stun(RIVAL_KNOCKBACK_STUN);
        }
        applied
    }

    pub fn apply_slowdown(&mut self, factor: f32, duration: f32) {
        self.agent.apply_slowdown(factor);
        self.agent.stun(duration);
    }
}

/// Complete state of one race
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub tuning: Tuning,
    pub phase: GamePhase,
    pub progression: StageProgression,
    pub player: Player,
    /// Sorted by id
    pub rivals: Vec<Rival>,
    pub track: TrackGenerator,
    pub traps: Vec<Trap>,
    /// Run time including earlier sessions (ms)
    pub elapsed_ms: f64,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Pending events for presentation
    pub events: Vec<GameEvent>,
    /// Next entity ID
    next_id: u32,
}

impl GameState {
    /// Start a fresh race at stage 1
    pub fn new(seed: u64, tuning: Tuning) -> Self {
        Self::resume(seed, tuning, 1, 0.0, 0.0)
    }

    /// Start a race from saved progress
    pub fn resume(seed: u64, tuning: Tuning, stage: u32, elapsed_ms: f64, total_distance: f32) -> Self {
        let tuning = tuning.sanitized();
        let progression = StageProgression::resume(&tuning, stage, total_distance);
        let mut rng = Pcg32::seed_from_u64(seed);

        let stage_config = stage_config_clamped(progression.current_stage());
        let mut track = TrackGenerator::new(tuning.track.clone());
        track.generate_initial(&stage_config, &mut rng);

        let start = Vec2::new(tuning.track.world_width / 2.0, 0.0);
        let mut state = Self {
            seed,
            rng,
            tuning,
            phase: GamePhase::Racing,
            progression,
            player: Player::new(start),
            rivals: Vec::new(),
            track,
            traps: Vec::new(),
            elapsed_ms,
            time_ticks: 0,
            events: Vec::new(),
            next_id: 1,
        };

        state.top_up_rivals(&stage_config);
        log::info!(
            "Race started at stage {} ({}) with seed {}",
            stage_config.stage,
            stage_config.name,
            seed
        );
        state
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Difficulty for the current point in the race
    pub fn difficulty(&self) -> StageConfig {
        let stage = self.progression.current_stage();
        interpolated_difficulty(stage, self.progression.stage_progress())
            .unwrap_or_else(|_| stage_config_clamped(stage))
    }

    /// Spawn rivals ahead of the player until the stage's count is reached,
    /// and bring every rival's aggression to the stage value
    pub fn top_up_rivals(&mut self, stage: &StageConfig) {
        let target = stage.rival_count as usize;
        while self.rivals.len() < target {
            let id = self.next_entity_id();
            let archetype = RivalArchetype::ALL[self.rng.random_range(0..RivalArchetype::ALL.len())];

            let y = self.player.agent.pos.y + 100.0 + self.rng.random::<f32>() * 400.0;
            let bounds = self.track.bounds_at(y);
            let x = bounds.center + (self.rng.random::<f32>() - 0.5) * bounds.width * 0.6;

            let mut rival = Rival::new(id, Vec2::new(x, y), archetype, stage.aggression);
            rival.speed_variation = 0.9 + self.rng.random::<f32>() * 0.2;
            self.rivals.push(rival);
        }

        for rival in &mut self.rivals {
            rival.aggression = stage.aggression;
        }
    }

    /// Take all pending events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn elapsed_ms_rounded(&self) -> u64 {
        self.elapsed_ms.max(0.0).round() as u64
    }
}
