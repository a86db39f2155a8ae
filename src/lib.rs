//! Tilt Pinball - a tilted-table pinball simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (geometry, collisions, game state)
//! - `tuning`: Data-driven physics balance
//! - `history`: Session score history
//! - `error`: Tuning load/validation errors
//!
//! Rendering, audio and input plumbing live in the host. The host feeds a
//! [`sim::TickInput`] and a time delta into [`sim::tick`] and reads back a
//! [`sim::FrameSnapshot`].

pub mod error;
pub mod history;
pub mod sim;
pub mod tuning;

pub use error::{TuningError, TuningResult};
pub use history::ScoreHistory;
pub use tuning::{LevelParams, Tuning};

use glam::Vec3;

/// Table configuration constants
///
/// Playfield-local coordinates: x runs across the table, y runs up the table
/// toward the top wall, z points out of the table plane.
pub mod consts {
    use glam::Vec3;

    /// Fixed simulation timestep (120 Hz for smooth physics)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Largest delta a single tick accepts
    pub const MAX_DT: f32 = 0.1;

    /// Table dimensions (table centered on the origin)
    pub const TABLE_WIDTH: f32 = 20.0;
    pub const TABLE_HEIGHT: f32 = 30.0;
    pub const TABLE_LEFT: f32 = -TABLE_WIDTH / 2.0;
    pub const TABLE_RIGHT: f32 = TABLE_WIDTH / 2.0;
    pub const TABLE_TOP: f32 = TABLE_HEIGHT / 2.0;
    /// Ball is lost once its center drops below this line
    pub const TABLE_BOTTOM: f32 = -TABLE_HEIGHT / 2.0;

    /// Walls straddle the table edge
    pub const WALL_THICKNESS: f32 = 1.0;
    /// Out-of-plane extent of every box obstacle
    pub const OBSTACLE_DEPTH: f32 = 2.0;

    /// Ball defaults
    pub const BALL_RADIUS: f32 = 0.5;

    /// Flippers: pivot at the outer end, blade points toward the drain
    pub const FLIPPER_LENGTH: f32 = 5.0;
    pub const FLIPPER_THICKNESS: f32 = 0.5;
    pub const FLIPPER_REST_ANGLE: f32 = std::f32::consts::PI / 6.0;
    pub const LEFT_FLIPPER_PIVOT: Vec3 = Vec3::new(-7.0, -10.0, 0.0);
    pub const RIGHT_FLIPPER_PIVOT: Vec3 = Vec3::new(5.0, -10.0, 0.0);

    /// Launch lane along the right wall
    pub const LANE_CENTER_X: f32 = 8.75;
    pub const BARRIER_X: f32 = 7.5;
    pub const BARRIER_THICKNESS: f32 = 0.5;
    /// Top of the lane divider; the ball escapes the lane above it
    pub const BARRIER_TOP: f32 = 8.0;
    /// Plunger head half extents (x, y, z)
    pub const PLUNGER_HALF_EXTENTS: Vec3 = Vec3::new(0.7, 0.25, 1.0);

    /// Bumpers (cylinders, treated as circles in the table plane)
    pub const BUMPER_RADIUS: f32 = 1.0;
    pub const BUMPER_POSITIONS: [Vec3; 3] = [
        Vec3::new(-1.0, 6.0, 0.0),
        Vec3::new(-4.0, 3.0, 0.0),
        Vec3::new(2.0, 3.0, 0.0),
    ];

    /// Speed bumps (flat panels the ball rolls over)
    pub const SPEED_BUMP_HALF_EXTENTS: Vec3 = Vec3::new(1.75, 0.25, 1.0);
    pub const SPEED_BUMP_ANGLE: f32 = std::f32::consts::PI / 9.0;

    /// Corner arc guiding the ball out of the launch lane
    pub const ARC_CENTER: Vec3 = Vec3::new(5.0, 10.0, 0.0);
    pub const ARC_RADIUS: f32 = 5.0;
    pub const ARC_SEGMENTS: usize = 8;

    /// Wormhole pair
    pub const WORMHOLE_RADIUS: f32 = 0.8;
    pub const WORMHOLE_POSITIONS: [Vec3; 2] = [Vec3::new(-7.0, 10.0, 0.0), Vec3::new(5.0, -5.0, 0.0)];
}

/// Convert polar (r, theta) to a point in the table plane
#[inline]
pub fn polar_to_planar(r: f32, theta: f32) -> Vec3 {
    Vec3::new(r * theta.cos(), r * theta.sin(), 0.0)
}

/// Drop the out-of-plane component
#[inline]
pub fn planar(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.y, 0.0)
}
