//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod collision;
pub mod difficulty;
pub mod entities;
pub mod progression;
pub mod state;
pub mod steering;
pub mod tick;
pub mod track;

pub use collision::{CollisionResult, circle_collision, resolve_collisions};
pub use difficulty::{
    DifficultyError, STAGE_COUNT, STAGES, StageConfig, interpolated_difficulty, stage_config,
    stage_config_clamped,
};
pub use entities::{Current, Obstacle, ObstacleKind, Powerup, PowerupKind, Trap};
pub use progression::{StagePhase, StageProgression, StageTransition};
pub use state::{
    Agent, GameEvent, GamePhase, GameState, Player, Rival, RivalArchetype, StatusTimers,
};
pub use steering::{SteeringContext, SteeringMode, apply_rubber_band, update_rival};
pub use tick::{TickInput, tick};
pub use track::{Segment, TrackBounds, TrackGenerator, WidthProfile};
