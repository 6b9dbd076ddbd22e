//! Collision detection and response
//!
//! Every body is a circle, so all contact tests reduce to centre distance
//! against summed radii. Responses mutate agents in place and queue events.

use glam::Vec2;

use super::entities::{Current, Obstacle, Powerup, PowerupKind, TRAP_DROP_OFFSET, Trap};
use super::state::{Agent, GameEvent, GameState, Player, Rival};
use crate::consts::COLLISION_KNOCKBACK;

/// Extra push on separation so touching circles don't re-collide next tick
pub const SEPARATION_SLOP: f32 = 0.01;
/// Share of the bump knockback the player takes
pub const PLAYER_BUMP_SHARE: f32 = 0.5;
/// Speed the player keeps after a knockback
pub const PLAYER_KNOCKBACK_RETAIN: f32 = 0.7;
/// Stun applied to rivals that hit an obstacle
pub const RIVAL_OBSTACLE_STUN: f32 = 0.5;
/// Speed factor applied to rivals caught in a trap
pub const TRAP_SLOWDOWN: f32 = 0.3;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Unit vector from the first circle's centre toward the second's
    pub normal: Vec2,
    /// Overlap depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Circle-circle overlap test
///
/// Coincident centres have no defined normal; they are pushed apart along +y.
pub fn circle_collision(a: Vec2, ra: f32, b: Vec2, rb: f32) -> CollisionResult {
    let delta = b - a;
    let dist = delta.length();
    let reach = ra + rb;
    if dist >= reach {
        return CollisionResult::miss();
    }

    let normal = if dist > f32::EPSILON { delta / dist } else { Vec2::Y };
    CollisionResult {
        hit: true,
        normal,
        penetration: reach - dist,
    }
}

/// Push two overlapping circles apart, half the penetration each
pub fn separate(a: &mut Vec2, b: &mut Vec2, hit: &CollisionResult) {
    let push = hit.normal * (hit.penetration + SEPARATION_SLOP) * 0.5;
    *a -= push;
    *b += push;
}

/// Bump between the player and one rival
///
/// Returns true if they were touching.
pub fn resolve_player_rival(player: &mut Player, rival: &mut Rival) -> bool {
    let hit = circle_collision(
        player.agent.pos,
        player.agent.radius,
        rival.agent.pos,
        rival.agent.radius,
    );
    if !hit.hit {
        return false;
    }

    player.agent.apply_knockback(
        -hit.normal,
        COLLISION_KNOCKBACK * PLAYER_BUMP_SHARE,
        PLAYER_KNOCKBACK_RETAIN,
    );
    rival.apply_knockback(hit.normal, COLLISION_KNOCKBACK);

    separate(&mut player.agent.pos, &mut rival.agent.pos, &hit);
    true
}

/// Contact with an obstacle; the obstacle doesn't move, the agent takes
/// the whole separation. Returns the push-out normal on contact.
fn obstacle_contact(agent: &mut Agent, obstacle: &Obstacle) -> Option<Vec2> {
    let hit = circle_collision(obstacle.pos, obstacle.radius(), agent.pos, agent.radius);
    if !hit.hit {
        return None;
    }
    agent.pos += hit.normal * (hit.penetration + SEPARATION_SLOP);
    Some(hit.normal)
}

pub fn resolve_player_obstacles(player: &mut Player, obstacles: &[Obstacle]) {
    for obstacle in obstacles {
        let Some(normal) = obstacle_contact(&mut player.agent, obstacle) else {
            continue;
        };
        player.agent.apply_slowdown(obstacle.kind.slowdown_factor());
        let force = obstacle.kind.knockback();
        if force > 0.0 {
            player
                .agent
                .apply_knockback(normal, force, PLAYER_KNOCKBACK_RETAIN);
        }
    }
}

pub fn resolve_rival_obstacles(rival: &mut Rival, obstacles: &[Obstacle]) {
    for obstacle in obstacles {
        let Some(normal) = obstacle_contact(&mut rival.agent, obstacle) else {
            continue;
        };
        rival.apply_slowdown(obstacle.kind.slowdown_factor(), RIVAL_OBSTACLE_STUN);
        let force = obstacle.kind.knockback();
        if force > 0.0 {
            rival.apply_knockback(normal, force);
        }
    }
}

/// Drift an agent by every current it sits in
pub fn apply_currents(agent: &mut Agent, currents: &[Current], dt: f32) {
    for current in currents {
        if current.contains(agent.pos) {
            agent.pos += current.displacement(dt);
        }
    }
}

/// Consume powerups under the player
///
/// Returns the positions of any traps the player dropped.
pub fn collect_powerups(
    player: &mut Player,
    powerups: &mut Vec<Powerup>,
    events: &mut Vec<GameEvent>,
) -> Vec<Vec2> {
    let mut drops = Vec::new();

    for powerup in powerups.iter_mut().filter(|p| p.active) {
        let hit = circle_collision(
            player.agent.pos,
            player.agent.radius,
            powerup.pos,
            powerup.radius(),
        );
        if !hit.hit {
            continue;
        }

        match powerup.kind {
            PowerupKind::BoostRefill => player.refill_boost(),
            PowerupKind::Shield { duration } => player.activate_shield(duration),
            PowerupKind::StickyTrap => {
                drops.push(player.agent.pos - Vec2::new(0.0, TRAP_DROP_OFFSET));
            }
        }
        powerup.active = false;
        events.push(GameEvent::PowerupCollected { kind: powerup.kind });
    }

    powerups.retain(|p| p.active);
    drops
}

/// Slow and stun a rival touching any trap; returns true if it was caught fresh
pub fn resolve_rival_traps(rival: &mut Rival, traps: &[Trap]) -> bool {
    let mut caught = false;
    for trap in traps {
        let hit = circle_collision(trap.pos, trap.radius(), rival.agent.pos, rival.agent.radius);
        if !hit.hit {
            continue;
        }
        if !rival.agent.is_stunned() {
            caught = true;
        }
        rival.apply_slowdown(TRAP_SLOWDOWN, trap.stun_duration);
    }
    caught
}

/// Run every collision pass for one tick
pub fn resolve_collisions(state: &mut GameState, dt: f32) {
    let GameState {
        player,
        rivals,
        track,
        traps,
        events,
        ..
    } = state;

    for rival in rivals.iter_mut() {
        if resolve_player_rival(player, rival) {
            events.push(GameEvent::PlayerBumped { rival_id: rival.id });
        }
    }

    resolve_player_obstacles(player, &track.obstacles);
    for rival in rivals.iter_mut() {
        resolve_rival_obstacles(rival, &track.obstacles);
    }

    apply_currents(&mut player.agent, &track.currents, dt);
    for rival in rivals.iter_mut() {
        apply_currents(&mut rival.agent, &track.currents, dt);
    }

    let drops = collect_powerups(player, &mut track.powerups, events);

    for rival in rivals.iter_mut() {
        if resolve_rival_traps(rival, traps.as_slice()) {
            events.push(GameEvent::RivalTrapped { rival_id: rival.id });
        }
    }

    for pos in drops {
        let id = state.next_entity_id();
        state.traps.push(Trap::new(id, pos));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::PLAYER_RADIUS;
    use crate::sim::entities::ObstacleKind;
    use crate::sim::state::RivalArchetype;
    use crate::tuning::Tuning;
    use proptest::prelude::*;

    fn empty_state() -> GameState {
        let mut state = GameState::new(7, Tuning::default());
        state.rivals.clear();
        state.track.obstacles.clear();
        state.track.currents.clear();
        state.track.powerups.clear();
        state.player.agent.pos = Vec2::new(270.0, 0.0);
        state
    }

    #[test]
    fn test_circle_collision_miss() {
        let result = circle_collision(Vec2::ZERO, 5.0, Vec2::new(10.0, 0.0), 5.0);
        assert!(!result.hit);
    }

    #[test]
    fn test_circle_collision_normal_points_at_second() {
        let result = circle_collision(Vec2::ZERO, 6.0, Vec2::new(0.0, -8.0), 6.0);
        assert!(result.hit);
        assert!((result.normal - Vec2::NEG_Y).length() < 1e-6);
        assert!((result.penetration - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_coincident_centres_still_separate() {
        let mut a = Vec2::new(5.0, 5.0);
        let mut b = a;
        let hit = circle_collision(a, 3.0, b, 3.0);
        separate(&mut a, &mut b, &hit);
        assert!(a.distance(b) >= 6.0);
    }

    #[test]
    fn test_player_rival_bump_is_asymmetric() {
        let mut player = Player::new(Vec2::ZERO);
        let mut rival = Rival::new(1, Vec2::new(20.0, 0.0), RivalArchetype::Steady, 0.5);

        assert!(resolve_player_rival(&mut player, &mut rival));
        assert!(player.agent.knockback.x < 0.0);
        assert!(rival.agent.knockback.x > 0.0);
        assert!(rival.agent.knockback.x > -player.agent.knockback.x);
        assert!(player.agent.pos.distance(rival.agent.pos) >= 24.0);
    }

    #[test]
    fn test_shielded_player_still_separates() {
        let mut player = Player::new(Vec2::ZERO);
        player.activate_shield(1.0);
        let mut rival = Rival::new(1, Vec2::new(10.0, 0.0), RivalArchetype::Bouncy, 0.5);

        assert!(resolve_player_rival(&mut player, &mut rival));
        assert_eq!(player.agent.knockback, Vec2::ZERO);
        assert!(player.agent.pos.distance(rival.agent.pos) >= 24.0);
    }

    #[test]
    fn test_obstacle_slows_and_pushes_player() {
        let mut player = Player::new(Vec2::new(0.0, -20.0));
        player.agent.speed = 200.0;
        let obstacles = [Obstacle::new(1, ObstacleKind::Crystal, Vec2::ZERO, 1.0)];

        resolve_player_obstacles(&mut player, &obstacles);
        // Slowdown then knockback speed retention
        assert!((player.agent.speed - 200.0 * 0.4 * PLAYER_KNOCKBACK_RETAIN).abs() < 1e-3);
        assert!(player.agent.knockback.y < 0.0);
        assert!(player.agent.pos.distance(Vec2::ZERO) >= obstacles[0].radius() + PLAYER_RADIUS);
    }

    #[test]
    fn test_obstacle_slows_shielded_player_without_knockback() {
        let mut player = Player::new(Vec2::new(0.0, -20.0));
        player.agent.speed = 200.0;
        player.activate_shield(2.0);
        let obstacles = [Obstacle::new(1, ObstacleKind::Bubble, Vec2::ZERO, 1.0)];

        resolve_player_obstacles(&mut player, &obstacles);
        assert!((player.agent.speed - 120.0).abs() < 1e-3);
        assert_eq!(player.agent.knockback, Vec2::ZERO);
    }

    #[test]
    fn test_obstacle_stuns_rival() {
        let mut rival = Rival::new(1, Vec2::new(5.0, 0.0), RivalArchetype::Swift, 0.5);
        rival.agent.speed = 200.0;
        let obstacles = [Obstacle::new(1, ObstacleKind::Floater, Vec2::ZERO, 1.0)];

        resolve_rival_obstacles(&mut rival, &obstacles);
        assert!(rival.agent.speed < 200.0 * 0.7);
        assert!(rival.agent.status.stun >= RIVAL_OBSTACLE_STUN);
    }

    #[test]
    fn test_current_pushes_mostly_sideways() {
        let mut agent = Agent::new(Vec2::ZERO, PLAYER_RADIUS);
        let currents = [Current {
            id: 1,
            center: Vec2::ZERO,
            size: Vec2::new(200.0, 200.0),
            direction: Vec2::new(1.0, 1.0),
            strength: 130.0,
        }];

        apply_currents(&mut agent, &currents, 1.0);
        assert!((agent.pos.x - 130.0).abs() < 1e-3);
        assert!((agent.pos.y - 39.0).abs() < 1e-3);

        // Now outside the zone
        apply_currents(&mut agent, &currents, 1.0);
        assert!((agent.pos.x - 130.0).abs() < 1e-3);
    }

    #[test]
    fn test_powerup_consumed_once() {
        let mut state = empty_state();
        state.player.boost();
        state.player.agent.status.boost = 0.0;
        state.player.boost_cooldown = 3.0;
        state.track.powerups.push(Powerup {
            id: 900,
            kind: PowerupKind::BoostRefill,
            pos: state.player.agent.pos,
            active: true,
        });

        resolve_collisions(&mut state, 1.0 / 60.0);
        assert!(state.player.boost_ready);
        assert!(state.track.powerups.is_empty());
        assert_eq!(
            state.drain_events(),
            vec![GameEvent::PowerupCollected {
                kind: PowerupKind::BoostRefill
            }]
        );

        resolve_collisions(&mut state, 1.0 / 60.0);
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_shield_powerup_grants_shield() {
        let mut state = empty_state();
        state.track.powerups.push(Powerup {
            id: 900,
            kind: PowerupKind::Shield { duration: 5.0 },
            pos: state.player.agent.pos + Vec2::new(5.0, 0.0),
            active: true,
        });

        resolve_collisions(&mut state, 1.0 / 60.0);
        assert!(state.player.agent.is_shielded());
    }

    #[test]
    fn test_sticky_trap_drops_behind_player_and_catches_rival() {
        let mut state = empty_state();
        let player_pos = state.player.agent.pos;
        state.track.powerups.push(Powerup {
            id: 900,
            kind: PowerupKind::StickyTrap,
            pos: player_pos,
            active: true,
        });

        resolve_collisions(&mut state, 1.0 / 60.0);
        assert_eq!(state.traps.len(), 1);
        assert_eq!(state.traps[0].pos, player_pos - Vec2::new(0.0, TRAP_DROP_OFFSET));
        state.drain_events();

        let mut rival = Rival::new(50, state.traps[0].pos, RivalArchetype::Floaty, 0.5);
        rival.agent.speed = 100.0;
        state.rivals.push(rival);

        resolve_collisions(&mut state, 1.0 / 60.0);
        let rival = &state.rivals[0];
        assert!((rival.agent.speed - 30.0).abs() < 1e-3);
        assert!(rival.agent.status.stun >= 2.0 - 1e-6);
        assert_eq!(state.drain_events(), vec![GameEvent::RivalTrapped { rival_id: 50 }]);

        // Already stunned: slowed again but no new event
        resolve_collisions(&mut state, 1.0 / 60.0);
        assert!(state.drain_events().is_empty());
    }

    proptest! {
        #[test]
        fn prop_separation_clears_overlap(
            ax in -500.0f32..500.0,
            ay in -500.0f32..500.0,
            ra in 1.0f32..40.0,
            rb in 1.0f32..40.0,
            angle in -3.14f32..3.14,
            frac in 0.001f32..0.999,
        ) {
            let mut a = Vec2::new(ax, ay);
            let mut b = a + Vec2::from_angle(angle) * (ra + rb) * frac;

            let hit = circle_collision(a, ra, b, rb);
            prop_assert!(hit.hit);
            separate(&mut a, &mut b, &hit);
            prop_assert!(a.distance(b) >= ra + rb - 1e-3);
        }
    }
}
