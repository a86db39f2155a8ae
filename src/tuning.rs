//! Physics tuning
//!
//! Every balance constant of the simulation lives here so a host can load a
//! JSON override without touching code. Missing fields fall back to defaults.

use serde::{Deserialize, Serialize};

use crate::consts::BALL_RADIUS;
use crate::error::{TuningError, TuningResult};

/// Highest difficulty level
pub const MAX_LEVEL: u32 = 5;

/// Per-level physics parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelParams {
    /// Gravity magnitude along -y (units/s²)
    pub gravity: f32,
    /// Multiplier on bounce energy (>= 1, grows with level)
    pub bounce_ratio: f32,
}

/// Physics balance table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Ball ===
    pub ball_radius: f32,
    /// Speed cap applied after integration
    pub max_ball_speed: f32,

    // === Reflective contacts ===
    /// Global restitution for walls and the launcher barrier
    pub base_restitution: f32,
    /// Restitution override for ramps
    pub ramp_restitution: f32,
    /// Extra separation added when pushing the ball out of a contact
    pub push_epsilon: f32,

    // === Flippers ===
    /// Engage speed (rad/s)
    pub flipper_speed: f32,
    /// Return speed (rad/s)
    pub flipper_return_speed: f32,
    /// Velocity multiplier when struck by a swinging flipper
    pub flipper_active_kick: f32,
    /// Velocity multiplier for a passive deflection
    pub flipper_passive_damping: f32,

    // === Launcher ===
    /// Plunger rest position (y)
    pub plunger_init_y: f32,
    /// Lowest plunger position (y)
    pub plunger_stick_lowest: f32,
    /// Pull-back speed while held (units/s)
    pub plunger_holding_speed: f32,
    /// Return speed after release (units/s)
    pub plunger_releasing_speed: f32,
    /// Launch power per unit of plunger travel
    pub launch_scale: f32,
    pub launch_max_power: f32,

    // === Bumpers ===
    /// Applied to the normal velocity component (negative inverts it)
    pub bumper_restitution: f32,
    /// Magnitude of the random kick added on each bumper hit
    pub bumper_jitter: f32,
    pub bumper_score: u64,

    // === Speed bumps ===
    pub speed_bump_multiplier: f32,
    /// Seconds before the same bump can fire again
    pub speed_bump_cooldown: f32,
    pub speed_bump_score: u64,

    // === Wormholes ===
    pub wormhole_score: u64,
    /// Seconds after a teleport during which wormholes are inert
    pub wormhole_guard: f32,

    // === Arc wall ===
    pub arc_damping: f32,
    /// Max normalized approach dot product that still reflects
    pub arc_tolerance: f32,

    // === Difficulty ===
    /// Score needed per difficulty level
    pub points_per_level: u64,
    /// Level 1..=MAX_LEVEL parameters
    pub levels: [LevelParams; MAX_LEVEL as usize],
}

impl Default for Tuning {
    fn default() -> Self {
        use std::f32::consts::PI;

        Self {
            ball_radius: BALL_RADIUS,
            max_ball_speed: 60.0,

            base_restitution: 0.8,
            ramp_restitution: 0.6,
            push_epsilon: 0.02,

            flipper_speed: PI * 3.0 / 2.0,
            flipper_return_speed: PI * 4.0 / 3.0,
            flipper_active_kick: 1.3,
            flipper_passive_damping: 0.8,

            plunger_init_y: -12.0,
            plunger_stick_lowest: -14.0,
            plunger_holding_speed: 2.0,
            plunger_releasing_speed: 10.0,
            launch_scale: 20.0,
            launch_max_power: 40.0,

            bumper_restitution: -0.88,
            bumper_jitter: 0.3,
            bumper_score: 1,

            speed_bump_multiplier: 1.3,
            speed_bump_cooldown: 1.0,
            speed_bump_score: 1,

            wormhole_score: 5,
            wormhole_guard: 0.5,

            arc_damping: 0.98,
            arc_tolerance: 0.05,

            points_per_level: 10,
            levels: [
                LevelParams { gravity: 6.0, bounce_ratio: 1.0 },
                LevelParams { gravity: 7.0, bounce_ratio: 1.05 },
                LevelParams { gravity: 8.0, bounce_ratio: 1.1 },
                LevelParams { gravity: 9.0, bounce_ratio: 1.15 },
                LevelParams { gravity: 10.0, bounce_ratio: 1.2 },
            ],
        }
    }
}

impl Tuning {
    /// Parse and validate a JSON tuning document
    pub fn from_json(json: &str) -> TuningResult<Self> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Serialize to pretty JSON (for writing a template file)
    pub fn to_json(&self) -> TuningResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values that would make the simulation meaningless
    pub fn validate(&self) -> TuningResult<()> {
        let positive = [
            ("ball_radius", self.ball_radius),
            ("max_ball_speed", self.max_ball_speed),
            ("flipper_speed", self.flipper_speed),
            ("flipper_return_speed", self.flipper_return_speed),
            ("plunger_holding_speed", self.plunger_holding_speed),
            ("plunger_releasing_speed", self.plunger_releasing_speed),
            ("launch_scale", self.launch_scale),
            ("launch_max_power", self.launch_max_power),
            ("speed_bump_multiplier", self.speed_bump_multiplier),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(TuningError::invalid(field, format!("must be positive, got {value}")));
            }
        }

        let restitution = [
            ("base_restitution", self.base_restitution),
            ("ramp_restitution", self.ramp_restitution),
            ("flipper_passive_damping", self.flipper_passive_damping),
            ("arc_damping", self.arc_damping),
        ];
        for (field, value) in restitution {
            if !(value > 0.0 && value <= 1.0) {
                return Err(TuningError::invalid(field, format!("must be in (0, 1], got {value}")));
            }
        }

        if !(self.bumper_restitution.abs() <= 1.0) {
            return Err(TuningError::invalid(
                "bumper_restitution",
                format!("magnitude must be <= 1, got {}", self.bumper_restitution),
            ));
        }
        if self.plunger_stick_lowest >= self.plunger_init_y {
            return Err(TuningError::invalid(
                "plunger_stick_lowest",
                "must be below plunger_init_y",
            ));
        }
        if self.points_per_level == 0 {
            return Err(TuningError::invalid("points_per_level", "must be non-zero"));
        }
        if self.speed_bump_cooldown < 0.0 || self.wormhole_guard < 0.0 || self.push_epsilon < 0.0 {
            return Err(TuningError::invalid("cooldowns", "durations must not be negative"));
        }
        for pair in self.levels.windows(2) {
            if pair[1].gravity < pair[0].gravity || pair[1].bounce_ratio < pair[0].bounce_ratio {
                return Err(TuningError::invalid("levels", "level table must be non-decreasing"));
            }
        }
        if self.levels[0].bounce_ratio < 1.0 {
            return Err(TuningError::invalid("levels", "bounce_ratio must be >= 1"));
        }

        Ok(())
    }

    /// Parameters for a level (clamped to 1..=MAX_LEVEL)
    pub fn level(&self, level: u32) -> LevelParams {
        self.levels[(clamp_level(level) - 1) as usize]
    }

    /// Level earned by a score (before the never-decrease rule)
    pub fn level_for_score(&self, score: u64) -> u32 {
        let earned = score / self.points_per_level.max(1) + 1;
        earned.min(MAX_LEVEL as u64) as u32
    }
}

/// Clamp any level value to the valid range
#[inline]
pub fn clamp_level(level: u32) -> u32 {
    level.clamp(1, MAX_LEVEL)
}
