//! Track-side entities: obstacles, currents, powerups and traps

use glam::Vec2;
use serde::Serialize;

/// Obstacle types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ObstacleKind {
    Bubble,
    Crystal,
    /// Drifts side to side around its spawn point
    Floater,
}

impl ObstacleKind {
    pub const ALL: [ObstacleKind; 3] = [
        ObstacleKind::Bubble,
        ObstacleKind::Crystal,
        ObstacleKind::Floater,
    ];

    /// Multiplicative speed penalty on contact
    pub fn slowdown_factor(self) -> f32 {
        match self {
            ObstacleKind::Bubble => 0.6,
            ObstacleKind::Crystal => 0.4,
            ObstacleKind::Floater => 0.7,
        }
    }

    /// Knockback impulse magnitude (0 = none)
    pub fn knockback(self) -> f32 {
        match self {
            ObstacleKind::Bubble => 30.0,
            ObstacleKind::Crystal => 60.0,
            ObstacleKind::Floater => 40.0,
        }
    }

    pub fn radius(self) -> f32 {
        match self {
            ObstacleKind::Bubble => 17.5,
            ObstacleKind::Crystal => 14.0,
            ObstacleKind::Floater => 20.0,
        }
    }

    /// Lateral drift speed (units/s)
    pub fn drift_speed(self) -> f32 {
        match self {
            ObstacleKind::Floater => 60.0,
            _ => 0.0,
        }
    }
}

/// How far a drifting obstacle strays from its spawn point
pub const DRIFT_RANGE: f32 = 50.0;

#[derive(Debug, Clone, Serialize)]
pub struct Obstacle {
    pub id: u32,
    pub kind: ObstacleKind,
    pub pos: Vec2,
    /// Lateral spawn position, centre of the drift
    pub anchor_x: f32,
    /// +1 or -1
    pub drift_dir: f32,
}

impl Obstacle {
    pub fn new(id: u32, kind: ObstacleKind, pos: Vec2, drift_dir: f32) -> Self {
        Self {
            id,
            kind,
            pos,
            anchor_x: pos.x,
            drift_dir,
        }
    }

    pub fn radius(&self) -> f32 {
        self.kind.radius()
    }

    pub fn update(&mut self, dt: f32) {
        let speed = self.kind.drift_speed();
        if speed > 0.0 {
            self.pos.x += self.drift_dir * speed * dt;
            if (self.pos.x - self.anchor_x).abs() > DRIFT_RANGE {
                self.drift_dir = -self.drift_dir;
            }
        }
    }
}

/// Longitudinal push is damped so currents shove sideways without stalling the race
pub const CURRENT_LONGITUDINAL_DAMPING: f32 = 0.3;
pub const CURRENT_STRENGTH: f32 = 130.0;

/// A rectangular force field that drags agents along `direction`
#[derive(Debug, Clone, Serialize)]
pub struct Current {
    pub id: u32,
    pub center: Vec2,
    pub size: Vec2,
    pub direction: Vec2,
    pub strength: f32,
}

impl Current {
    pub fn contains(&self, point: Vec2) -> bool {
        let half = self.size / 2.0;
        let d = (point - self.center).abs();
        d.x < half.x && d.y < half.y
    }

    /// Displacement applied to an agent inside the zone over `dt`
    pub fn displacement(&self, dt: f32) -> Vec2 {
        let force = self.strength * dt;
        Vec2::new(
            self.direction.x * force,
            self.direction.y * force * CURRENT_LONGITUDINAL_DAMPING,
        )
    }
}

pub const SHIELD_DURATION: f32 = 5.0;
pub const POWERUP_RADIUS: f32 = 11.0;

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum PowerupKind {
    /// Ends any boost cooldown
    BoostRefill,
    Shield { duration: f32 },
    /// Drops a sticky trap behind the player
    StickyTrap,
}

impl PowerupKind {
    pub const ALL: [PowerupKind; 3] = [
        PowerupKind::BoostRefill,
        PowerupKind::Shield {
            duration: SHIELD_DURATION,
        },
        PowerupKind::StickyTrap,
    ];
}

#[derive(Debug, Clone, Serialize)]
pub struct Powerup {
    pub id: u32,
    pub kind: PowerupKind,
    pub pos: Vec2,
    /// Cleared on pickup; inactive powerups are culled on the next track update
    pub active: bool,
}

impl Powerup {
    pub fn radius(&self) -> f32 {
        POWERUP_RADIUS
    }
}

pub const TRAP_RADIUS: f32 = 17.5;
pub const TRAP_LIFETIME: f32 = 8.0;
pub const TRAP_STUN_DURATION: f32 = 2.0;
/// Traps land this far behind the player that drops them
pub const TRAP_DROP_OFFSET: f32 = 50.0;

/// A sticky trap left on the track, stuns rivals that touch it
#[derive(Debug, Clone, Serialize)]
pub struct Trap {
    pub id: u32,
    pub pos: Vec2,
    /// Seconds until the trap dissolves
    pub lifetime: f32,
    pub stun_duration: f32,
}

impl Trap {
    pub fn new(id: u32, pos: Vec2) -> Self {
        Self {
            id,
            pos,
            lifetime: TRAP_LIFETIME,
            stun_duration: TRAP_STUN_DURATION,
        }
    }

    pub fn radius(&self) -> f32 {
        TRAP_RADIUS
    }

    pub fn is_expired(&self) -> bool {
        self.lifetime <= 0.0
    }

    /// Count down the lifetime, whether or not anything touched the trap
    pub fn update(&mut self, dt: f32) {
        self.lifetime -= dt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floater_reverses_at_range() {
        let mut floater = Obstacle::new(1, ObstacleKind::Floater, Vec2::new(100.0, 0.0), 1.0);
        for _ in 0..120 {
            floater.update(1.0 / 60.0);
        }
        assert!((floater.pos.x - floater.anchor_x).abs() <= DRIFT_RANGE + 1.0);
        assert_eq!(floater.drift_dir, -1.0);
    }

    #[test]
    fn test_static_obstacles_stay_put() {
        let mut crystal = Obstacle::new(1, ObstacleKind::Crystal, Vec2::new(10.0, 20.0), 1.0);
        crystal.update(1.0);
        assert_eq!(crystal.pos, Vec2::new(10.0, 20.0));
    }

    #[test]
    fn test_current_damps_longitudinal_push() {
        let current = Current {
            id: 1,
            center: Vec2::ZERO,
            size: Vec2::new(200.0, 100.0),
            direction: Vec2::new(1.0, 1.0),
            strength: 100.0,
        };
        let push = current.displacement(1.0);
        assert!((push - Vec2::new(100.0, 30.0)).length() < 1e-4);
        assert!(current.contains(Vec2::new(99.0, 49.0)));
        assert!(!current.contains(Vec2::new(101.0, 0.0)));
    }

    #[test]
    fn test_trap_expires_untouched() {
        let mut trap = Trap::new(1, Vec2::ZERO);
        trap.update(TRAP_LIFETIME - 0.1);
        assert!(!trap.is_expired());
        trap.update(0.2);
        assert!(trap.is_expired());
    }
}
