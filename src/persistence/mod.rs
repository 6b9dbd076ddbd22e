//! Progress save/load
//!
//! One JSON blob under one key. No versioning: anything that fails to parse
//! counts as no saved progress, and the race starts fresh.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::SaveStore;
use crate::sim::GameState;

/// Storage key for the save blob
pub const SAVE_KEY: &str = "stream_runner_save";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage unavailable")]
    Unavailable,
    #[error("corrupt save data: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("storage write failed: {0}")]
    Write(String),
}

/// Persisted progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveData {
    pub current_stage: u32,
    /// Run time so far (ms)
    pub elapsed_time: u64,
    /// Fastest completed run (ms)
    #[serde(default)]
    pub best_time: Option<u64>,
    pub total_distance: f32,
}

impl Default for SaveData {
    fn default() -> Self {
        Self {
            current_stage: 1,
            elapsed_time: 0,
            best_time: None,
            total_distance: 0.0,
        }
    }
}

impl SaveData {
    /// Snapshot a race in progress, carrying over the best time
    pub fn from_state(state: &GameState, best_time: Option<u64>) -> Self {
        Self {
            current_stage: state.progression.current_stage(),
            elapsed_time: state.elapsed_ms_rounded(),
            best_time,
            total_distance: state.progression.total_distance,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Read saved progress, treating anything unreadable as none
pub fn load_progress(store: &dyn SaveStore) -> Option<SaveData> {
    let json = match store.get(SAVE_KEY) {
        Ok(Some(json)) => json,
        Ok(None) => {
            log::info!("No saved progress found, starting fresh");
            return None;
        }
        Err(err) => {
            log::warn!("Could not read saved progress: {err}");
            return None;
        }
    };

    match SaveData::from_json(&json) {
        Ok(data) => {
            log::info!(
                "Loaded progress: stage {}, {:.0}s",
                data.current_stage,
                data.elapsed_time as f64 / 1000.0
            );
            Some(data)
        }
        Err(err) => {
            log::warn!("Ignoring saved progress: {err}");
            None
        }
    }
}

pub fn save_progress(store: &mut dyn SaveStore, data: &SaveData) -> Result<(), PersistenceError> {
    store.set(SAVE_KEY, &data.to_json()?)?;
    log::info!("Progress saved (stage {})", data.current_stage);
    Ok(())
}

/// Forget the run in progress so the next race starts at stage 1
pub fn clear_progress(store: &mut dyn SaveStore) -> Result<(), PersistenceError> {
    store.remove(SAVE_KEY)?;
    log::info!("Saved progress cleared");
    Ok(())
}

/// Store a finished run: keep the better time and start the next run over
pub fn record_win(
    store: &mut dyn SaveStore,
    elapsed_ms: u64,
) -> Result<SaveData, PersistenceError> {
    let previous = load_progress(&*store).and_then(|d| d.best_time);
    let best_time = Some(previous.map_or(elapsed_ms, |best| best.min(elapsed_ms)));

    let data = SaveData {
        best_time,
        ..SaveData::default()
    };
    save_progress(store, &data)?;
    Ok(data)
}

/// Signals a write every `interval` seconds of accumulated frame time
#[derive(Debug, Clone)]
pub struct Autosave {
    interval: f32,
    accumulated: f32,
}

impl Autosave {
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            accumulated: 0.0,
        }
    }

    /// Returns true when a save is due
    pub fn tick(&mut self, dt: f32) -> bool {
        self.accumulated += dt;
        if self.accumulated >= self.interval {
            self.accumulated = 0.0;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }
}
