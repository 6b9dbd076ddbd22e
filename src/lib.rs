//! Stream Runner - A procedural stream-racing arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (track generation, rival AI, collisions, stages)
//! - `view`: Render snapshot polled by the presentation layer
//! - `platform`: Browser/native platform abstraction
//! - `persistence`: Progress save/load
//! - `tuning`: Data-driven game balance

pub mod persistence;
pub mod platform;
pub mod sim;
pub mod tuning;
pub mod view;

pub use persistence::SaveData;
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, one pass per rendered frame)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Heading pointing straight down the track (+y is forward)
    pub const FORWARD_HEADING: f32 = std::f32::consts::FRAC_PI_2;

    /// Player defaults
    pub const PLAYER_BASE_SPEED: f32 = 200.0;
    pub const PLAYER_MAX_SPEED: f32 = 400.0;
    pub const PLAYER_ACCELERATION: f32 = 150.0;
    /// Heading change per 60 Hz frame at full steer (4 degrees)
    pub const PLAYER_TURN_SPEED: f32 = 4.0 * std::f32::consts::PI / 180.0;
    pub const PLAYER_RADIUS: f32 = 12.0;
    /// Speed factor when the player gives no input
    pub const PLAYER_IDLE_FACTOR: f32 = 0.85;

    /// Boost
    pub const BOOST_MULTIPLIER: f32 = 1.8;
    pub const BOOST_DURATION: f32 = 1.5;
    pub const BOOST_COOLDOWN: f32 = 5.0;

    /// Base knockback magnitude for player/rival bumps
    pub const COLLISION_KNOCKBACK: f32 = 150.0;

    /// Track geometry
    pub const TRACK_BASE_WIDTH: f32 = 300.0;
    pub const TRACK_MIN_WIDTH: f32 = 120.0;
    pub const SEGMENT_LENGTH: f32 = 600.0;
    /// Gap kept between the track edge and the world edge
    pub const WALL_PADDING: f32 = 20.0;
    pub const NARROW_MULTIPLIER: f32 = 0.7;
    pub const WIDE_MULTIPLIER: f32 = 1.3;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Signed smallest rotation taking `from` onto `to`, in [-π, π)
#[inline]
pub fn shortest_angle(from: f32, to: f32) -> f32 {
    normalize_angle(to - from)
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Blend two headings along the shorter arc
#[inline]
pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    normalize_angle(from + shortest_angle(from, to) * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_normalize_angle_wraps() {
        assert!((normalize_angle(3.0 * PI + 0.5) - (-PI + 0.5)).abs() < 1e-4);
        assert!((normalize_angle(-3.0 * PI - 0.5) - (PI - 0.5)).abs() < 1e-4);
        assert!((normalize_angle(-PI / 2.0) + PI / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_angle_odd_multiple_of_pi_stays_in_range() {
        // 3π lands a rounding error away from π, on either side
        let wrapped = normalize_angle(3.0 * PI);
        assert!((-PI..=PI).contains(&wrapped));
        assert!(wrapped.sin().abs() < 1e-5);
        assert!((wrapped.cos() + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_lerp_angle_takes_short_way() {
        // 170° to -170° should pass through 180°, not 0°
        let from = 170f32.to_radians();
        let to = -170f32.to_radians();
        let mid = lerp_angle(from, to, 0.5);
        assert!(mid.abs() > 3.1);
    }

    #[test]
    fn test_lerp_angle_full_weight_reaches_target() {
        let to = 0.3;
        assert!((lerp_angle(2.0, to, 1.0) - to).abs() < 1e-5);
    }
}
