//! Procedural track generation
//!
//! The track is a chain of trapezoidal segments running along +y. The
//! generator keeps the chain extended `look_ahead` past the camera and drops
//! segments and entities more than `cull_distance` behind it.

use std::collections::VecDeque;

use glam::Vec2;
use rand::Rng;
use serde::Serialize;

use super::difficulty::{StageConfig, max_track_width_multiplier};
use super::entities::{
    CURRENT_STRENGTH, Current, Obstacle, ObstacleKind, Powerup, PowerupKind,
};
use crate::consts::*;
use crate::lerp;
use crate::tuning::TrackTuning;

/// Segments generated when a race starts
pub const INITIAL_SEGMENTS: usize = 10;
/// Obstacle placement attempts per segment
pub const OBSTACLE_TRIALS: u32 = 3;
/// Obstacle chance multiplier inside choke points
pub const NARROW_OBSTACLE_BOOST: f32 = 1.5;
/// Inset of the fallback bounds from the world edges
pub const FALLBACK_MARGIN: f32 = 50.0;

/// Widest a segment can ever get. Wide sections only open up past nominal
/// on stages narrower than the widest one.
pub fn max_track_width() -> f32 {
    TRACK_BASE_WIDTH * max_track_width_multiplier()
}

/// Width treatment of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WidthProfile {
    Nominal,
    /// Choke point, more obstacles
    Narrow,
    Wide,
}

impl WidthProfile {
    pub fn multiplier(self) -> f32 {
        match self {
            WidthProfile::Nominal => 1.0,
            WidthProfile::Narrow => NARROW_MULTIPLIER,
            WidthProfile::Wide => WIDE_MULTIPLIER,
        }
    }
}

/// One trapezoidal slice of track
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub index: u32,
    /// Centre of the near edge (x lateral, y longitudinal)
    pub start: Vec2,
    /// Centre of the far edge
    pub end: Vec2,
    pub start_width: f32,
    pub end_width: f32,
    pub profile: WidthProfile,
    pub is_checkpoint: bool,
}

impl Segment {
    pub fn is_narrow(&self) -> bool {
        self.profile == WidthProfile::Narrow
    }

    pub fn is_wide(&self) -> bool {
        self.profile == WidthProfile::Wide
    }

    /// Centre point at fraction `t` from start to end
    pub fn center_at(&self, t: f32) -> Vec2 {
        self.start.lerp(self.end, t)
    }

    pub fn width_at(&self, t: f32) -> f32 {
        lerp(self.start_width, self.end_width, t)
    }

    pub fn contains_y(&self, y: f32) -> bool {
        y >= self.start.y && y <= self.end.y
    }
}

/// Lateral extent of the track at one longitudinal position
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackBounds {
    pub left: f32,
    pub right: f32,
    pub center: f32,
    pub width: f32,
}

impl TrackBounds {
    pub fn from_center(center: f32, width: f32) -> Self {
        Self {
            left: center - width / 2.0,
            right: center + width / 2.0,
            center,
            width,
        }
    }

    /// Bounds used when a query misses the generated track
    pub fn fallback(world_width: f32) -> Self {
        Self::from_center(world_width / 2.0, world_width - 2.0 * FALLBACK_MARGIN)
    }

    /// Clamp a lateral position so a circle of `radius` stays inside
    pub fn clamp_x(&self, x: f32, radius: f32) -> f32 {
        let lo = self.left + radius;
        let hi = self.right - radius;
        if lo > hi { self.center } else { x.clamp(lo, hi) }
    }
}

/// Where the first segment begins: world centre, one segment behind the start line
pub fn track_origin(tuning: &TrackTuning) -> Vec2 {
    Vec2::new(tuning.world_width / 2.0, -SEGMENT_LENGTH)
}

/// Build the segment following `previous` (or the first segment when `None`)
pub fn generate_segment<R: Rng + ?Sized>(
    previous: Option<&Segment>,
    stage: &StageConfig,
    tuning: &TrackTuning,
    rng: &mut R,
) -> Segment {
    let base_width = TRACK_BASE_WIDTH * stage.track_width;

    let profile_roll = rng.random::<f32>();
    let profile = if profile_roll < tuning.narrow_chance {
        WidthProfile::Narrow
    } else if profile_roll < tuning.narrow_chance + tuning.wide_chance {
        WidthProfile::Wide
    } else {
        WidthProfile::Nominal
    };
    let end_width = (base_width * profile.multiplier()).clamp(TRACK_MIN_WIDTH, max_track_width());

    let (index, start, start_width) = match previous {
        Some(prev) => (prev.index + 1, prev.end, prev.end_width),
        None => (0, track_origin(tuning), end_width),
    };

    let mut turn_offset = 0.0;
    if rng.random::<f32>() < stage.turn_frequency {
        turn_offset = (rng.random::<f32>() - 0.5) * base_width * stage.turn_sharpness;
    }

    // Keep both edges of the segment inside the world
    let margin = start_width.max(end_width) / 2.0 + WALL_PADDING;
    let lo = margin;
    let hi = tuning.world_width - margin;
    let end_x = if lo > hi {
        tuning.world_width / 2.0
    } else {
        (start.x + turn_offset).clamp(lo, hi)
    };

    Segment {
        index,
        start,
        end: Vec2::new(end_x, start.y + SEGMENT_LENGTH),
        start_width,
        end_width,
        profile,
        is_checkpoint: index % tuning.checkpoint_interval.max(1) == 0,
    }
}

/// Owns the segment chain and everything placed on it
#[derive(Debug, Clone)]
pub struct TrackGenerator {
    tuning: TrackTuning,
    /// Ordered by index, contiguous
    segments: VecDeque<Segment>,
    pub obstacles: Vec<Obstacle>,
    pub currents: Vec<Current>,
    pub powerups: Vec<Powerup>,
    next_id: u32,
}

impl TrackGenerator {
    pub fn new(tuning: TrackTuning) -> Self {
        Self {
            tuning,
            segments: VecDeque::new(),
            obstacles: Vec::new(),
            currents: Vec::new(),
            powerups: Vec::new(),
            next_id: 1,
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Longitudinal position of the far edge of the chain
    pub fn far_edge(&self) -> Option<f32> {
        self.segments.back().map(|s| s.end.y)
    }

    fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Lay down the opening stretch of track
    pub fn generate_initial<R: Rng + ?Sized>(&mut self, stage: &StageConfig, rng: &mut R) {
        for _ in 0..INITIAL_SEGMENTS {
            self.extend(stage, rng);
        }
    }

    /// Append one segment and populate it
    pub fn extend<R: Rng + ?Sized>(&mut self, stage: &StageConfig, rng: &mut R) {
        let segment = generate_segment(self.segments.back(), stage, &self.tuning, rng);
        self.populate_obstacles(&segment, stage, rng);
        if rng.random::<f32>() < stage.current_frequency {
            self.place_current(&segment, rng);
        }
        if rng.random::<f32>() < self.tuning.powerup_chance {
            self.place_powerup(&segment, rng);
        }
        self.segments.push_back(segment);
    }

    fn populate_obstacles<R: Rng + ?Sized>(
        &mut self,
        segment: &Segment,
        stage: &StageConfig,
        rng: &mut R,
    ) {
        let mut chance = stage.obstacle_frequency;
        if segment.is_narrow() {
            chance *= NARROW_OBSTACLE_BOOST;
        }

        for i in 0..OBSTACLE_TRIALS {
            if rng.random::<f32>() >= chance {
                continue;
            }
            let kind = ObstacleKind::ALL[rng.random_range(0..ObstacleKind::ALL.len())];
            let t = (i as f32 + 0.5) / OBSTACLE_TRIALS as f32;
            let center = segment.center_at(t);
            let jitter = (rng.random::<f32>() - 0.5) * segment.width_at(t) * 0.6;
            let drift_dir = if rng.random::<f32>() < 0.5 { 1.0 } else { -1.0 };

            let id = self.next_entity_id();
            self.obstacles.push(Obstacle::new(
                id,
                kind,
                Vec2::new(center.x + jitter, center.y),
                drift_dir,
            ));
        }
    }

    fn place_current<R: Rng + ?Sized>(&mut self, segment: &Segment, rng: &mut R) {
        // Mostly sideways, with a little fore/aft wobble
        let dir_x = if rng.random::<f32>() < 0.5 { 1.0 } else { -1.0 };
        let dir_y = (rng.random::<f32>() - 0.5) * 0.4;

        let id = self.next_entity_id();
        self.currents.push(Current {
            id,
            center: segment.center_at(0.5),
            size: Vec2::new(segment.width_at(0.5) * 0.7, SEGMENT_LENGTH * 0.35),
            direction: Vec2::new(dir_x, dir_y),
            strength: CURRENT_STRENGTH,
        });
    }

    fn place_powerup<R: Rng + ?Sized>(&mut self, segment: &Segment, rng: &mut R) {
        let kind = PowerupKind::ALL[rng.random_range(0..PowerupKind::ALL.len())];
        let center = segment.center_at(0.5);
        let jitter = (rng.random::<f32>() - 0.5) * segment.width_at(0.5) * 0.4;

        let id = self.next_entity_id();
        self.powerups.push(Powerup {
            id,
            kind,
            pos: Vec2::new(center.x + jitter, center.y),
            active: true,
        });
    }

    /// Generate ahead, animate entities, then cull behind
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        camera_y: f32,
        stage: &StageConfig,
        dt: f32,
        rng: &mut R,
    ) {
        let horizon = camera_y + self.tuning.look_ahead;
        while self.far_edge().is_none_or(|edge| edge < horizon) {
            self.extend(stage, rng);
        }

        for obstacle in &mut self.obstacles {
            obstacle.update(dt);
        }

        self.cull(camera_y);
    }

    /// Drop everything whose far edge is more than `cull_distance` behind
    pub fn cull(&mut self, camera_y: f32) {
        let limit = camera_y - self.tuning.cull_distance;
        let before = self.segments.len();

        self.segments.retain(|s| s.end.y >= limit);
        self.obstacles.retain(|o| o.pos.y + o.radius() >= limit);
        self.currents.retain(|c| c.center.y + c.size.y / 2.0 >= limit);
        self.powerups
            .retain(|p| p.active && p.pos.y + p.radius() >= limit);

        let dropped = before - self.segments.len();
        if dropped > 0 {
            log::trace!("Culled {dropped} segments behind y={limit}");
        }
    }

    /// Interpolated track bounds at `y`, or the fallback bounds off the generated track
    pub fn bounds_at(&self, y: f32) -> TrackBounds {
        let idx = self.segments.partition_point(|s| s.end.y < y);
        match self.segments.get(idx) {
            Some(segment) if segment.contains_y(y) => {
                let span = segment.end.y - segment.start.y;
                let t = if span > 0.0 { (y - segment.start.y) / span } else { 0.0 };
                TrackBounds::from_center(segment.center_at(t).x, segment.width_at(t))
            }
            _ => TrackBounds::fallback(self.tuning.world_width),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::difficulty::{STAGES, stage_config};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn straight_stage() -> StageConfig {
        StageConfig {
            turn_frequency: 0.0,
            turn_sharpness: 0.0,
            track_width: 1.0,
            ..STAGES[0]
        }
    }

    #[test]
    fn test_straight_chain_without_turns() {
        let mut rng = Pcg32::seed_from_u64(7);
        let tuning = TrackTuning::default();
        let stage = straight_stage();

        let mut previous: Option<Segment> = None;
        for _ in 0..10 {
            let segment = generate_segment(previous.as_ref(), &stage, &tuning, &mut rng);
            assert_eq!(segment.start.x, segment.end.x);
            previous = Some(segment);
        }
        assert_eq!(previous.map(|s| s.index), Some(9));
    }

    #[test]
    fn test_checkpoints_every_interval() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut track = TrackGenerator::new(TrackTuning::default());
        track.generate_initial(&STAGES[0], &mut rng);

        for segment in track.segments() {
            assert_eq!(segment.is_checkpoint, segment.index % 3 == 0);
        }
    }

    #[test]
    fn test_bounds_interpolate_inside_segment() {
        let mut track = TrackGenerator::new(TrackTuning::default());
        track.segments.push_back(Segment {
            index: 0,
            start: Vec2::new(200.0, 0.0),
            end: Vec2::new(300.0, 600.0),
            start_width: 200.0,
            end_width: 300.0,
            profile: WidthProfile::Nominal,
            is_checkpoint: true,
        });

        let bounds = track.bounds_at(300.0);
        assert!((bounds.center - 250.0).abs() < 1e-4);
        assert!((bounds.width - 250.0).abs() < 1e-4);
        assert!((bounds.left - 125.0).abs() < 1e-4);
        assert!((bounds.right - 375.0).abs() < 1e-4);
    }

    #[test]
    fn test_bounds_off_track_fall_back() {
        let tuning = TrackTuning::default();
        let track = TrackGenerator::new(tuning.clone());
        let bounds = track.bounds_at(12345.0);
        assert_eq!(bounds, TrackBounds::fallback(tuning.world_width));
        assert!(bounds.width > 0.0);
    }

    #[test]
    fn test_update_keeps_look_ahead() {
        let mut rng = Pcg32::seed_from_u64(3);
        let tuning = TrackTuning::default();
        let mut track = TrackGenerator::new(tuning.clone());
        track.generate_initial(&STAGES[0], &mut rng);

        let camera = 20_000.0;
        track.update(camera, &STAGES[0], 1.0 / 60.0, &mut rng);
        assert!(track.far_edge().unwrap() >= camera + tuning.look_ahead);
        assert!(track.bounds_at(camera).width > 0.0);
    }

    #[test]
    fn test_narrow_segments_get_more_obstacles() {
        let tuning = TrackTuning {
            narrow_chance: 1.0,
            wide_chance: 0.0,
            ..TrackTuning::default()
        };
        let stage = StageConfig {
            obstacle_frequency: 0.5,
            ..STAGES[0]
        };
        let mut rng = Pcg32::seed_from_u64(11);
        let mut narrow = TrackGenerator::new(tuning);
        for _ in 0..200 {
            narrow.extend(&stage, &mut rng);
        }

        let tuning = TrackTuning {
            narrow_chance: 0.0,
            wide_chance: 0.0,
            ..TrackTuning::default()
        };
        let mut rng = Pcg32::seed_from_u64(11);
        let mut nominal = TrackGenerator::new(tuning);
        for _ in 0..200 {
            nominal.extend(&stage, &mut rng);
        }

        assert!(narrow.obstacles.len() > nominal.obstacles.len());
    }

    #[test]
    fn test_wide_segments_never_exceed_base_width() {
        let tuning = TrackTuning {
            narrow_chance: 0.0,
            wide_chance: 1.0,
            ..TrackTuning::default()
        };
        let mut rng = Pcg32::seed_from_u64(9);
        let mut track = TrackGenerator::new(tuning);
        for _ in 0..50 {
            track.extend(&STAGES[0], &mut rng);
        }

        let widest = track.segments().map(|s| s.end_width).fold(0.0, f32::max);
        assert_eq!(widest, TRACK_BASE_WIDTH);

        // A narrower stage leaves room for wide sections to open up
        let stage = StageConfig {
            track_width: 0.7,
            ..STAGES[0]
        };
        let segment = generate_segment(None, &stage, &track.tuning, &mut rng);
        assert!((segment.end_width - TRACK_BASE_WIDTH * 0.7 * WIDE_MULTIPLIER).abs() < 1e-3);
    }

    #[test]
    fn test_picked_up_powerups_are_culled() {
        let tuning = TrackTuning {
            powerup_chance: 1.0,
            ..TrackTuning::default()
        };
        let mut rng = Pcg32::seed_from_u64(5);
        let mut track = TrackGenerator::new(tuning);
        track.generate_initial(&STAGES[0], &mut rng);
        assert_eq!(track.powerups.len(), INITIAL_SEGMENTS);

        track.powerups[0].active = false;
        track.cull(0.0);
        assert_eq!(track.powerups.len(), INITIAL_SEGMENTS - 1);
    }

    proptest! {
        #[test]
        fn prop_segments_are_continuous(seed in any::<u64>(), stage in 1u32..=8) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let stage = stage_config(stage).unwrap();
            let mut track = TrackGenerator::new(TrackTuning::default());
            for _ in 0..40 {
                track.extend(&stage, &mut rng);
            }

            let segments: Vec<_> = track.segments().collect();
            for pair in segments.windows(2) {
                prop_assert_eq!(pair[1].start, pair[0].end);
                prop_assert_eq!(pair[1].start_width, pair[0].end_width);
                prop_assert_eq!(pair[1].index, pair[0].index + 1);
            }
        }

        #[test]
        fn prop_bounds_width_in_range(seed in any::<u64>(), stage in 1u32..=8, t in 0.0f32..1.0) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let stage = stage_config(stage).unwrap();
            let tuning = TrackTuning::default();
            let mut track = TrackGenerator::new(tuning.clone());
            track.generate_initial(&stage, &mut rng);

            let start = track.segments().next().unwrap().start.y;
            let end = track.far_edge().unwrap();
            let bounds = track.bounds_at(start + (end - start) * t);
            prop_assert!(bounds.width > 0.0);
            prop_assert!(bounds.width >= TRACK_MIN_WIDTH - 1e-3);
            prop_assert!(bounds.width <= TRACK_BASE_WIDTH * max_track_width_multiplier() + 1e-3);
            prop_assert!(bounds.left >= 0.0);
            prop_assert!(bounds.right <= tuning.world_width);
        }

        #[test]
        fn prop_cull_leaves_nothing_far_behind(seed in any::<u64>(), camera in 0.0f32..50_000.0) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let stage = STAGES[5];
            let tuning = TrackTuning::default();
            let mut track = TrackGenerator::new(tuning.clone());
            track.generate_initial(&stage, &mut rng);

            // Walk the camera forward so entities exist on both sides of it
            let mut y = 0.0;
            while y < camera {
                y = (y + 500.0).min(camera);
                track.update(y, &stage, 1.0 / 60.0, &mut rng);
            }

            let limit = camera - tuning.cull_distance;
            prop_assert!(track.segments().all(|s| s.end.y >= limit));
            prop_assert!(track.obstacles.iter().all(|o| o.pos.y + o.radius() >= limit));
            prop_assert!(track.currents.iter().all(|c| c.center.y + c.size.y / 2.0 >= limit));
            prop_assert!(track.powerups.iter().all(|p| p.pos.y + p.radius() >= limit));
            prop_assert!(track.far_edge().unwrap() >= camera + tuning.look_ahead);
        }
    }
}
