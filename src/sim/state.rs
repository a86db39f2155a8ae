//! Game state and core simulation types
//!
//! Everything the frame update touches lives in one [`SimulationState`]; the
//! subsystems borrow disjoint fields of it.

use glam::{Affine3A, Quat, Vec3};
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::obb::Obb;
use super::table::Table;
use crate::consts::*;
use crate::history::ScoreHistory;
use crate::tuning::{Tuning, clamp_level};

/// Which flipper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlipperSide {
    Left,
    Right,
}

/// What the ball touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactKind {
    Plunger,
    Barrier,
    Flipper(FlipperSide),
    Bumper,
    Wall,
    Arc,
    SpeedBump,
    Ramp,
    Wormhole,
}

impl ContactKind {
    /// Position in the per-frame collision pass (lower runs first)
    pub fn stage(self) -> u8 {
        match self {
            ContactKind::Plunger | ContactKind::Barrier => 0,
            ContactKind::Flipper(_) => 1,
            ContactKind::Bumper => 2,
            ContactKind::Wall => 3,
            ContactKind::Arc => 4,
            ContactKind::SpeedBump => 5,
            ContactKind::Ramp => 6,
            ContactKind::Wormhole => 7,
        }
    }
}

/// Discrete notifications for the presentation layer (sound, flashes)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Ball touched something
    Collision { kind: ContactKind, point: Vec3 },
    /// Score went up
    Scored { delta: u64, total: u64 },
    /// Ball left the plunger
    Launched { power: f32 },
    /// Ball teleported between wormholes
    Teleported { from: Vec3, to: Vec3 },
    /// Ball fell back onto the plunger without clearing the lane
    FailedLaunch,
    /// Ball drained past the bottom edge
    BallLost { score: u64 },
    /// Difficulty increased
    LevelUp { level: u32 },
    /// Ball, launcher and score went back to their initial values
    Reset,
}

/// The ball
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub position: Vec3,
    pub velocity: Vec3,
    pub radius: f32,
}

impl Ball {
    pub fn new(position: Vec3, radius: f32) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            radius,
        }
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Broad-phase volume
    pub fn bounding_box(&self) -> Obb {
        Obb::axis_aligned(self.position, Vec3::splat(self.radius))
    }
}

/// A flipper rotating about a fixed pivot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flipper {
    pub side: FlipperSide,
    pub pivot: Vec3,
    /// Current angle about the table normal (radians)
    pub angle: f32,
    /// Resting angle, tilted down toward the drain
    pub rest_angle: f32,
    /// Fully engaged angle (flat)
    pub max_angle: f32,
    /// Button held
    pub is_active: bool,
    /// Angular velocity over the last advance (rad/s)
    pub angular_velocity: f32,
}

impl Flipper {
    pub fn new(side: FlipperSide) -> Self {
        let (pivot, rest_angle) = match side {
            FlipperSide::Left => (LEFT_FLIPPER_PIVOT, -FLIPPER_REST_ANGLE),
            FlipperSide::Right => (RIGHT_FLIPPER_PIVOT, FLIPPER_REST_ANGLE),
        };
        Self {
            side,
            pivot,
            angle: rest_angle,
            rest_angle,
            max_angle: 0.0,
            is_active: false,
            angular_velocity: 0.0,
        }
    }

    /// Local half extents of the blade
    pub fn half_extents() -> Vec3 {
        Vec3::new(FLIPPER_LENGTH / 2.0, FLIPPER_THICKNESS / 2.0, OBSTACLE_DEPTH / 2.0)
    }

    /// Allowed angle range (min, max)
    pub fn angle_bounds(&self) -> (f32, f32) {
        (self.rest_angle.min(self.max_angle), self.rest_angle.max(self.max_angle))
    }

    /// Advance toward max (active) or rest (inactive)
    ///
    /// Engaging runs at `speed`, returning at the slower `return_speed`.
    pub fn advance(&mut self, dt: f32, speed: f32, return_speed: f32) {
        let (target, rate) = if self.is_active {
            (self.max_angle, speed)
        } else {
            (self.rest_angle, return_speed)
        };

        let previous = self.angle;
        let step = (rate * dt).max(0.0);
        let delta = (target - self.angle).clamp(-step, step);
        let (lo, hi) = self.angle_bounds();
        self.angle = (self.angle + delta).clamp(lo, hi);

        self.angular_velocity = if dt > 0.0 {
            (self.angle - previous) / dt
        } else {
            0.0
        };
    }

    /// Still moving toward the engaged angle
    #[inline]
    pub fn is_swinging(&self) -> bool {
        self.is_active && self.angular_velocity != 0.0
    }

    /// World transform of the blade's center
    pub fn pose(&self) -> Affine3A {
        // Blade extends from the pivot toward the table center
        let reach = match self.side {
            FlipperSide::Left => FLIPPER_LENGTH / 2.0,
            FlipperSide::Right => -FLIPPER_LENGTH / 2.0,
        };
        Affine3A::from_rotation_translation(Quat::from_rotation_z(self.angle), self.pivot)
            * Affine3A::from_translation(Vec3::new(reach, 0.0, 0.0))
    }

    /// Bounding box at the current angle
    pub fn obb(&self) -> Obb {
        Obb::from_transform(Self::half_extents(), &self.pose())
    }

    /// Velocity of the blade surface at a world point
    pub fn surface_velocity(&self, point: Vec3) -> Vec3 {
        Vec3::Z.cross(point - self.pivot) * self.angular_velocity
    }
}

/// Phase of the launcher, derived from its flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LauncherPhase {
    /// Ball resting on the plunger
    Idle,
    /// Plunger being pulled back
    Charging,
    /// Ball in play
    Launched,
}

/// Spring plunger in the launch lane
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Launcher {
    /// Plunger head position along the lane
    pub plunger_y: f32,
    pub init_y: f32,
    pub stick_lowest: f32,
    pub is_held: bool,
    /// Held state of the previous frame (release edge detection)
    pub was_held: bool,
    /// Ball riding the plunger
    pub is_attached: bool,
    /// Ball has left the plunger
    pub is_launched: bool,
}

impl Launcher {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            plunger_y: tuning.plunger_init_y,
            init_y: tuning.plunger_init_y,
            stick_lowest: tuning.plunger_stick_lowest,
            is_held: false,
            was_held: false,
            is_attached: true,
            is_launched: false,
        }
    }

    pub fn phase(&self) -> LauncherPhase {
        if self.is_launched {
            LauncherPhase::Launched
        } else if self.is_held {
            LauncherPhase::Charging
        } else {
            LauncherPhase::Idle
        }
    }

    /// Advance the plunger one frame
    ///
    /// Returns the launch power on the frame the plunger is released with the
    /// ball still attached.
    pub fn advance(&mut self, held: bool, dt: f32, tuning: &Tuning) -> Option<f32> {
        self.is_held = held;
        let mut launch = None;

        if held && !self.is_launched {
            let pull = (tuning.plunger_holding_speed * dt).max(0.0);
            self.plunger_y = (self.plunger_y - pull).max(self.stick_lowest);
        } else if !held && self.was_held && !self.is_launched && self.is_attached {
            let travel = self.init_y - self.plunger_y;
            // A tap without pulling back does nothing
            if travel > 0.0 {
                launch = Some((travel * tuning.launch_scale).min(tuning.launch_max_power));
                self.is_launched = true;
                self.is_attached = false;
            }
        }

        // Spring back once released
        if !held && self.plunger_y < self.init_y {
            let spring = (tuning.plunger_releasing_speed * dt).max(0.0);
            self.plunger_y = (self.plunger_y + spring).min(self.init_y);
        }

        self.was_held = held;
        launch
    }

    /// Plunger head box
    pub fn plunger_obb(&self) -> Obb {
        Obb::axis_aligned(Vec3::new(LANE_CENTER_X, self.plunger_y, 0.0), PLUNGER_HALF_EXTENTS)
    }

    /// Where an attached ball sits
    pub fn ball_seat(&self, ball_radius: f32) -> Vec3 {
        Vec3::new(LANE_CENTER_X, self.plunger_y + PLUNGER_HALF_EXTENTS.y + ball_radius, 0.0)
    }
}

/// Score, difficulty and round flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub score: u64,
    /// Survives resets for the whole session
    pub history: ScoreHistory,
    /// 1..=MAX_LEVEL, never decreases until reset
    pub difficulty_level: u32,
    /// Derived from the level
    pub bounce_ratio: f32,
    /// Derived from the level
    pub gravity: f32,
    pub game_started: bool,
    pub reset_requested: bool,
}

impl GameState {
    pub fn new(tuning: &Tuning) -> Self {
        let mut game = Self {
            score: 0,
            history: ScoreHistory::new(),
            difficulty_level: 1,
            bounce_ratio: 1.0,
            gravity: 0.0,
            game_started: false,
            reset_requested: false,
        };
        game.set_level(1, tuning);
        game
    }

    /// Set the level (clamped) and derive gravity and bounce ratio from it
    pub fn set_level(&mut self, level: u32, tuning: &Tuning) {
        let level = clamp_level(level);
        let params = tuning.level(level);
        self.difficulty_level = level;
        self.gravity = params.gravity;
        self.bounce_ratio = params.bounce_ratio;
    }

    /// Gravity vector in playfield coordinates
    #[inline]
    pub fn gravity_vector(&self) -> Vec3 {
        Vec3::new(0.0, -self.gravity, 0.0)
    }
}

/// Validated tuning, or the defaults
fn checked(tuning: Tuning) -> Tuning {
    match tuning.validate() {
        Ok(()) => tuning,
        Err(e) => {
            log::warn!("Invalid tuning: {} - using defaults", e);
            Tuning::default()
        }
    }
}

/// The whole simulation, owned by the frame loop
#[derive(Debug, Clone)]
pub struct SimulationState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub tuning: Tuning,
    pub table: Table,
    pub ball: Ball,
    pub left_flipper: Flipper,
    pub right_flipper: Flipper,
    pub launcher: Launcher,
    pub game: GameState,
    /// Jitter and wormhole exit directions
    pub rng: Pcg32,
    /// Simulation clock (seconds)
    pub time: f64,
    pub time_ticks: u64,
    /// Wormholes are inert until this time
    pub wormhole_guard_until: f64,
    /// Events raised during the current frame
    pub events: Vec<GameEvent>,
}

impl SimulationState {
    /// Create a new simulation with default tuning
    pub fn new(seed: u64) -> Self {
        Self::with_tuning(seed, Tuning::default())
    }

    /// Create a new simulation on the standard table
    ///
    /// Tuning that fails validation is replaced by the defaults.
    pub fn with_tuning(seed: u64, tuning: Tuning) -> Self {
        let tuning = checked(tuning);
        let table = Table::standard(&tuning);
        Self::with_table(seed, tuning, table)
    }

    /// Create a new simulation on a custom table
    pub fn with_table(seed: u64, tuning: Tuning, table: Table) -> Self {
        let tuning = checked(tuning);
        let launcher = Launcher::new(&tuning);
        let ball = Ball::new(launcher.ball_seat(tuning.ball_radius), tuning.ball_radius);
        let game = GameState::new(&tuning);

        Self {
            seed,
            table,
            ball,
            left_flipper: Flipper::new(FlipperSide::Left),
            right_flipper: Flipper::new(FlipperSide::Right),
            launcher,
            game,
            rng: Pcg32::seed_from_u64(seed),
            time: 0.0,
            time_ticks: 0,
            wormhole_guard_until: 0.0,
            events: Vec::new(),
            tuning,
        }
    }

    pub fn flipper(&self, side: FlipperSide) -> &Flipper {
        match side {
            FlipperSide::Left => &self.left_flipper,
            FlipperSide::Right => &self.right_flipper,
        }
    }

    pub fn flipper_mut(&mut self, side: FlipperSide) -> &mut Flipper {
        match side {
            FlipperSide::Left => &mut self.left_flipper,
            FlipperSide::Right => &mut self.right_flipper,
        }
    }

    /// Add points and announce them
    pub fn award(&mut self, points: u64) {
        if points == 0 {
            return;
        }
        self.game.score += points;
        self.events.push(GameEvent::Scored {
            delta: points,
            total: self.game.score,
        });
    }

    /// Bounce ratio for a contact, given an optional per-obstacle override
    #[inline]
    pub fn bounce_ratio(&self, restitution: Option<f32>) -> f32 {
        restitution.unwrap_or(self.tuning.base_restitution) * self.game.bounce_ratio
    }

    /// End the current ball: record its score and ask for a reset
    pub fn lose_ball(&mut self) {
        if self.game.reset_requested {
            return;
        }
        let score = self.game.score;
        self.game.history.record(score);
        self.game.reset_requested = true;
        self.events.push(GameEvent::BallLost { score });
        log::info!("Ball lost with score {}", score);
    }

    /// Put ball, launcher, score and difficulty back to their initial values
    ///
    /// Pending cooldowns are cleared too, so nothing from the previous ball
    /// can fire afterwards. History is kept.
    pub fn reset(&mut self) {
        let held = self.launcher.is_held;
        self.launcher = Launcher::new(&self.tuning);
        // Keep the held state so a button held through the reset is not seen
        // as a fresh release
        self.launcher.is_held = held;
        self.launcher.was_held = held;

        self.ball = Ball::new(self.launcher.ball_seat(self.tuning.ball_radius), self.tuning.ball_radius);

        self.game.score = 0;
        self.game.game_started = false;
        self.game.reset_requested = false;
        self.game.set_level(1, &self.tuning);

        self.table.clear_cooldowns();
        self.wormhole_guard_until = 0.0;

        self.events.push(GameEvent::Reset);
        log::info!("Table reset");
    }

    /// State published to the presentation layer after a frame
    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            time: self.time,
            ball_position: self.ball.position,
            ball_velocity: self.ball.velocity,
            left_flipper_angle: self.left_flipper.angle,
            right_flipper_angle: self.right_flipper.angle,
            plunger_y: self.launcher.plunger_y,
            launcher_phase: self.launcher.phase(),
            score: self.game.score,
            top_scores: self.game.history.top.clone(),
            difficulty_level: self.game.difficulty_level,
            game_started: self.game.game_started,
            events: self.events.clone(),
        }
    }
}

/// Per-frame output for rendering and audio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub time: f64,
    pub ball_position: Vec3,
    pub ball_velocity: Vec3,
    pub left_flipper_angle: f32,
    pub right_flipper_angle: f32,
    pub plunger_y: f32,
    pub launcher_phase: LauncherPhase,
    pub score: u64,
    /// Best three finished scores, descending
    pub top_scores: Vec<u64>,
    pub difficulty_level: u32,
    pub game_started: bool,
    pub events: Vec<GameEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_state_ball_on_plunger() {
        let state = SimulationState::new(1);
        assert!(state.launcher.is_attached);
        assert!(!state.launcher.is_launched);
        assert_eq!(state.launcher.phase(), LauncherPhase::Idle);
        assert_eq!(state.ball.position, state.launcher.ball_seat(state.ball.radius));
        assert_eq!(state.ball.velocity, Vec3::ZERO);
        assert_eq!(state.game.difficulty_level, 1);
    }

    #[test]
    fn test_flipper_rest_angles_mirror() {
        let left = Flipper::new(FlipperSide::Left);
        let right = Flipper::new(FlipperSide::Right);
        assert_eq!(left.rest_angle, -right.rest_angle);
        assert!(left.rest_angle < 0.0);
    }

    #[test]
    fn test_flipper_blade_points_inward_and_down_at_rest() {
        let left = Flipper::new(FlipperSide::Left).obb();
        let right = Flipper::new(FlipperSide::Right).obb();
        assert!(left.center.x > LEFT_FLIPPER_PIVOT.x);
        assert!(left.center.y < LEFT_FLIPPER_PIVOT.y);
        assert!(right.center.x < RIGHT_FLIPPER_PIVOT.x);
        assert!(right.center.y < RIGHT_FLIPPER_PIVOT.y);
    }

    #[test]
    fn test_flipper_engage_is_faster_than_return() {
        let tuning = Tuning::default();
        let mut flipper = Flipper::new(FlipperSide::Left);
        flipper.is_active = true;
        flipper.advance(0.01, tuning.flipper_speed, tuning.flipper_return_speed);
        let engage = flipper.angular_velocity.abs();
        assert!(flipper.is_swinging());

        flipper.is_active = false;
        flipper.advance(0.01, tuning.flipper_speed, tuning.flipper_return_speed);
        let release = flipper.angular_velocity.abs();
        assert!(engage > release);
    }

    #[test]
    fn test_flipper_reaches_and_holds_max() {
        let tuning = Tuning::default();
        let mut flipper = Flipper::new(FlipperSide::Right);
        flipper.is_active = true;
        for _ in 0..60 {
            flipper.advance(SIM_DT, tuning.flipper_speed, tuning.flipper_return_speed);
        }
        assert_eq!(flipper.angle, flipper.max_angle);
        assert!(!flipper.is_swinging());
    }

    #[test]
    fn test_negative_flipper_speed_stays_in_bounds() {
        let mut flipper = Flipper::new(FlipperSide::Left);
        flipper.is_active = true;
        flipper.advance(SIM_DT, -10.0, -5.0);
        assert_eq!(flipper.angle, flipper.rest_angle);
        assert_eq!(flipper.angular_velocity, 0.0);

        flipper.is_active = false;
        flipper.advance(SIM_DT, -10.0, -5.0);
        let (lo, hi) = flipper.angle_bounds();
        assert!((lo..=hi).contains(&flipper.angle));
    }

    #[test]
    fn test_invalid_tuning_falls_back_to_defaults() {
        let tuning = Tuning {
            flipper_speed: -1.0,
            points_per_level: 0,
            ..Default::default()
        };
        let state = SimulationState::with_tuning(1, tuning.clone());
        assert_eq!(state.tuning, Tuning::default());

        let state = SimulationState::with_table(1, tuning, Table::default());
        assert_eq!(state.tuning, Tuning::default());
        assert!(state.table.obstacles.is_empty());
    }

    #[test]
    fn test_negative_plunger_speeds_do_not_move_it_backwards() {
        let tuning = Tuning {
            plunger_holding_speed: -2.0,
            plunger_releasing_speed: -2.0,
            ..Default::default()
        };
        let mut launcher = Launcher::new(&tuning);
        launcher.advance(true, 0.1, &tuning);
        assert_eq!(launcher.plunger_y, launcher.init_y);
        assert_eq!(launcher.advance(false, 0.1, &tuning), None);
        assert_eq!(launcher.plunger_y, launcher.init_y);
    }

    #[test]
    fn test_surface_velocity_lifts_left_blade() {
        let mut flipper = Flipper::new(FlipperSide::Left);
        flipper.angular_velocity = 3.0;
        let tip = flipper.pivot + Vec3::new(FLIPPER_LENGTH, 0.0, 0.0);
        let v = flipper.surface_velocity(tip);
        assert!(v.y > 0.0);
        assert!(v.x.abs() < 1e-5);
    }

    #[test]
    fn test_launcher_tap_does_not_launch() {
        let tuning = Tuning::default();
        let mut launcher = Launcher::new(&tuning);
        launcher.was_held = true;
        assert_eq!(launcher.advance(false, SIM_DT, &tuning), None);
        assert!(launcher.is_attached);
    }

    #[test]
    fn test_launcher_charge_and_release() {
        let tuning = Tuning::default();
        let mut launcher = Launcher::new(&tuning);
        for _ in 0..30 {
            assert_eq!(launcher.advance(true, 0.01, &tuning), None);
        }
        assert_eq!(launcher.phase(), LauncherPhase::Charging);
        assert!((launcher.plunger_y - (tuning.plunger_init_y - 0.6)).abs() < 1e-4);

        let power = launcher.advance(false, 0.01, &tuning).unwrap();
        assert!((power - 0.6 * tuning.launch_scale).abs() < 1e-3);
        assert_eq!(launcher.phase(), LauncherPhase::Launched);
        assert!(!launcher.is_attached);

        // Plunger springs back and stays there
        for _ in 0..100 {
            launcher.advance(false, 0.01, &tuning);
        }
        assert_eq!(launcher.plunger_y, launcher.init_y);
    }

    #[test]
    fn test_set_level_clamps() {
        let tuning = Tuning::default();
        let mut game = GameState::new(&tuning);
        game.set_level(0, &tuning);
        assert_eq!(game.difficulty_level, 1);
        game.set_level(12, &tuning);
        assert_eq!(game.difficulty_level, 5);
        assert_eq!(game.gravity, tuning.levels[4].gravity);
    }

    #[test]
    fn test_reset_restores_initial_values() {
        let mut state = SimulationState::new(3);
        state.ball.position = Vec3::new(1.0, 2.0, 0.0);
        state.ball.velocity = Vec3::new(4.0, 4.0, 0.0);
        state.launcher.is_attached = false;
        state.launcher.is_launched = true;
        state.game.score = 33;
        state.game.set_level(4, &state.tuning.clone());
        state.game.game_started = true;
        state.wormhole_guard_until = 50.0;

        state.reset();

        assert_eq!(state.ball.velocity, Vec3::ZERO);
        assert_eq!(state.ball.position, state.launcher.ball_seat(state.ball.radius));
        assert!(state.launcher.is_attached && !state.launcher.is_launched);
        assert_eq!(state.game.score, 0);
        assert_eq!(state.game.difficulty_level, 1);
        assert!(!state.game.game_started);
        assert_eq!(state.wormhole_guard_until, 0.0);
        assert_eq!(state.events.last(), Some(&GameEvent::Reset));
    }

    #[test]
    fn test_lose_ball_records_once() {
        let mut state = SimulationState::new(3);
        state.game.score = 12;
        state.lose_ball();
        state.lose_ball();
        assert_eq!(state.game.history.entries, vec![12]);
        assert!(state.game.reset_requested);
    }

    proptest! {
        #[test]
        fn prop_flipper_angle_stays_in_bounds(
            inputs in proptest::collection::vec((any::<bool>(), 0.0f32..0.2), 1..200),
            right in any::<bool>(),
        ) {
            let tuning = Tuning::default();
            let side = if right { FlipperSide::Right } else { FlipperSide::Left };
            let mut flipper = Flipper::new(side);
            let (lo, hi) = flipper.angle_bounds();
            for (active, dt) in inputs {
                flipper.is_active = active;
                flipper.advance(dt, tuning.flipper_speed, tuning.flipper_return_speed);
                prop_assert!(flipper.angle >= lo && flipper.angle <= hi);
            }
        }

        #[test]
        fn prop_plunger_stays_in_travel(
            inputs in proptest::collection::vec((any::<bool>(), 0.0f32..0.2), 1..200),
        ) {
            let tuning = Tuning::default();
            let mut launcher = Launcher::new(&tuning);
            for (held, dt) in inputs {
                launcher.advance(held, dt, &tuning);
                prop_assert!(launcher.plunger_y >= launcher.stick_lowest);
                prop_assert!(launcher.plunger_y <= launcher.init_y);
            }
        }
    }
}
