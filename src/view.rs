//! Render snapshot
//!
//! The presentation layer polls a `RaceView` once per frame and never reads
//! `GameState` directly. Everything here is plain data and serializes to JSON
//! for a JS renderer.

use glam::Vec2;
use serde::Serialize;

use crate::sim::{
    Agent, Current, GamePhase, GameState, Obstacle, Powerup, RivalArchetype, Segment, Trap,
};

/// Position and status of one racer
#[derive(Debug, Clone, Serialize)]
pub struct AgentView {
    /// `None` for the player
    pub id: Option<u32>,
    pub archetype: Option<RivalArchetype>,
    pub pos: Vec2,
    pub heading: f32,
    pub radius: f32,
    pub stunned: bool,
    pub shielded: bool,
    pub boosting: bool,
}

impl AgentView {
    fn from_agent(agent: &Agent, id: Option<u32>, archetype: Option<RivalArchetype>) -> Self {
        Self {
            id,
            archetype,
            pos: agent.pos,
            heading: agent.heading,
            radius: agent.radius,
            stunned: agent.is_stunned(),
            shielded: agent.is_shielded(),
            boosting: agent.is_boosting(),
        }
    }
}

/// Numbers for the heads-up display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HudView {
    pub stage: u32,
    pub stage_name: &'static str,
    pub stage_progress: f32,
    pub overall_progress: f32,
    /// Boost gauge, 0..=1
    pub boost_progress: f32,
    pub can_boost: bool,
    /// 1-based, counting rivals ahead of the player
    pub race_position: usize,
    pub total_racers: usize,
    pub elapsed_ms: u64,
    pub phase: GamePhase,
}

impl HudView {
    pub fn capture(state: &GameState) -> Self {
        let player_y = state.player.agent.pos.y;
        let ahead = state
            .rivals
            .iter()
            .filter(|r| r.agent.pos.y > player_y)
            .count();
        let config = crate::sim::stage_config_clamped(state.progression.current_stage());

        Self {
            stage: config.stage,
            stage_name: config.name,
            stage_progress: state.progression.stage_progress(),
            overall_progress: state.progression.overall_progress(),
            boost_progress: state.player.boost_progress(),
            can_boost: state.player.boost_ready,
            race_position: ahead + 1,
            total_racers: state.rivals.len() + 1,
            elapsed_ms: state.elapsed_ms_rounded(),
            phase: state.phase,
        }
    }

    /// Elapsed time as `m:ss`
    pub fn elapsed_clock(&self) -> String {
        let secs = self.elapsed_ms / 1000;
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}

/// Everything needed to draw one frame
#[derive(Debug, Clone, Serialize)]
pub struct RaceView {
    /// Camera follows the player longitudinally
    pub camera_y: f32,
    pub player: AgentView,
    pub rivals: Vec<AgentView>,
    pub segments: Vec<Segment>,
    pub obstacles: Vec<Obstacle>,
    pub currents: Vec<Current>,
    pub powerups: Vec<Powerup>,
    pub traps: Vec<Trap>,
    pub hud: HudView,
}

impl RaceView {
    pub fn capture(state: &GameState) -> Self {
        Self {
            camera_y: state.player.agent.pos.y,
            player: AgentView::from_agent(&state.player.agent, None, None),
            rivals: state
                .rivals
                .iter()
                .map(|r| AgentView::from_agent(&r.agent, Some(r.id), Some(r.archetype)))
                .collect(),
            segments: state.track.segments().cloned().collect(),
            obstacles: state.track.obstacles.clone(),
            currents: state.track.currents.clone(),
            powerups: state.track.powerups.clone(),
            traps: state.traps.clone(),
            hud: HudView::capture(state),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Tuning;

    #[test]
    fn test_fresh_race_hud() {
        let state = GameState::new(3, Tuning::default());
        let hud = HudView::capture(&state);

        assert_eq!(hud.stage, 1);
        assert_eq!(hud.stage_name, "Gentle Stream");
        assert_eq!(hud.total_racers, 4);
        // All rivals spawn ahead
        assert_eq!(hud.race_position, 4);
        assert!(hud.can_boost);
        assert_eq!(hud.boost_progress, 1.0);
        assert_eq!(hud.phase, GamePhase::Racing);
    }

    #[test]
    fn test_race_position_counts_rivals_ahead() {
        let mut state = GameState::new(3, Tuning::default());
        let player_y = state.player.agent.pos.y;
        state.rivals[0].agent.pos.y = player_y - 50.0;
        state.rivals[1].agent.pos.y = player_y - 10.0;

        assert_eq!(HudView::capture(&state).race_position, 2);
    }

    #[test]
    fn test_elapsed_clock() {
        let mut state = GameState::new(3, Tuning::default());
        state.elapsed_ms = 125_400.0;
        assert_eq!(HudView::capture(&state).elapsed_clock(), "2:05");
    }

    #[test]
    fn test_snapshot_serializes() {
        let state = GameState::new(3, Tuning::default());
        let view = RaceView::capture(&state);
        assert_eq!(view.rivals.len(), state.rivals.len());
        assert_eq!(view.segments.len(), state.track.segment_count());

        let json = view.to_json().unwrap();
        assert!(json.contains("\"stage_name\":\"Gentle Stream\""));
    }

    #[test]
    fn test_snapshot_json_carries_every_layer() {
        let mut state = GameState::new(8, Tuning::default());
        state.rivals[0].agent.stun(1.0);

        let json = RaceView::capture(&state).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        for key in [
            "camera_y", "player", "rivals", "segments", "obstacles", "currents", "powerups",
            "traps", "hud",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["player"]["id"], serde_json::Value::Null);
        assert_eq!(value["rivals"][0]["stunned"], true);
        assert_eq!(value["hud"]["phase"], "Racing");
    }
}
