//! Data-driven game balance
//!
//! Thresholds that have no authoritative value (rubber-banding, lookahead,
//! culling) live here instead of in `consts`. Read as JSON from LocalStorage
//! so balance can be tweaked without a rebuild.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::WALL_PADDING;
use crate::sim::track::max_track_width;

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("malformed tuning JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Track generation and culling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackTuning {
    /// Track is always generated at least this far ahead of the camera
    pub look_ahead: f32,
    /// Anything this far behind the camera is dropped
    pub cull_distance: f32,
    /// Lateral extent of the world; the track never leaves it
    pub world_width: f32,
    /// Every Nth segment is a checkpoint
    pub checkpoint_interval: u32,
    pub narrow_chance: f32,
    pub wide_chance: f32,
    pub powerup_chance: f32,
}

impl Default for TrackTuning {
    fn default() -> Self {
        Self {
            look_ahead: 1600.0,
            cull_distance: 800.0,
            world_width: 540.0,
            checkpoint_interval: 3,
            narrow_chance: 0.3,
            wide_chance: 0.2,
            powerup_chance: 0.1,
        }
    }
}

/// Keeps rivals near the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RubberBand {
    /// Rivals further behind than this are respawned ahead
    pub respawn_behind: f32,
    /// Respawned rivals land at least this far ahead of the player...
    pub respawn_min_ahead: f32,
    /// ...plus up to this much extra
    pub respawn_spread: f32,
    /// Rivals further ahead than this get throttled
    pub throttle_ahead: f32,
    /// Speed multiplier applied per tick while throttled
    pub throttle_factor: f32,
}

impl Default for RubberBand {
    fn default() -> Self {
        Self {
            respawn_behind: 800.0,
            respawn_min_ahead: 200.0,
            respawn_spread: 300.0,
            throttle_ahead: 600.0,
            throttle_factor: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub track: TrackTuning,
    pub rubber_band: RubberBand,
    /// Intended length of a full run; the per-stage distance budget derives from it
    pub target_playtime_secs: f32,
    pub autosave_interval_secs: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            track: TrackTuning::default(),
            rubber_band: RubberBand::default(),
            target_playtime_secs: 30.0 * 60.0,
            autosave_interval_secs: 30.0,
        }
    }
}

impl Tuning {
    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "stream_runner_tuning";

    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        Ok(tuning.sanitized())
    }

    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Clamp values the simulation cannot work with
    pub fn sanitized(mut self) -> Self {
        let defaults = Tuning::default();
        let min_world = max_track_width() + 2.0 * WALL_PADDING;

        let track = &mut self.track;
        if !(track.world_width >= min_world) {
            log::warn!("world_width {} too small, using {}", track.world_width, min_world);
            track.world_width = min_world;
        }
        if !(track.look_ahead > 0.0) {
            log::warn!("look_ahead must be positive, using default");
            track.look_ahead = defaults.track.look_ahead;
        }
        if !(track.cull_distance > 0.0) {
            log::warn!("cull_distance must be positive, using default");
            track.cull_distance = defaults.track.cull_distance;
        }
        track.checkpoint_interval = track.checkpoint_interval.max(1);
        track.narrow_chance = clamp_unit(track.narrow_chance);
        track.wide_chance = clamp_unit(track.wide_chance).min(1.0 - track.narrow_chance);
        track.powerup_chance = clamp_unit(track.powerup_chance);

        let band = &mut self.rubber_band;
        band.respawn_behind = band.respawn_behind.max(0.0);
        band.respawn_min_ahead = band.respawn_min_ahead.max(0.0);
        band.respawn_spread = band.respawn_spread.max(0.0);
        band.throttle_ahead = band.throttle_ahead.max(0.0);
        band.throttle_factor = clamp_unit(band.throttle_factor);

        if !(self.target_playtime_secs > 0.0) {
            log::warn!("target_playtime_secs must be positive, using default");
            self.target_playtime_secs = defaults.target_playtime_secs;
        }
        if !(self.autosave_interval_secs > 0.0) {
            self.autosave_interval_secs = defaults.autosave_interval_secs;
        }
        self
    }

    /// Load tuning from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(tuning) => {
                        log::info!("Loaded tuning from LocalStorage");
                        return tuning;
                    }
                    Err(err) => log::warn!("Ignoring stored tuning: {err}"),
                }
            }
        }

        log::info!("Using default tuning");
        Self::default()
    }

    /// Native stub
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}
