//! Obstacle registry
//!
//! Obstacles are built once at setup, sorted into collision order and then
//! left alone. The only thing that changes at runtime is a speed bump's
//! cooldown deadline.

use glam::{Affine3A, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::arc::ArcWall;
use super::obb::Obb;
use super::state::ContactKind;
use crate::Tuning;
use crate::consts::*;

/// A static box with its world-space bounding volume precomputed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxBody {
    pub transform: Affine3A,
    pub half_extents: Vec3,
    /// Cached world-space box
    pub obb: Obb,
    /// Replaces the base restitution for this body
    pub restitution: Option<f32>,
}

impl BoxBody {
    /// Box centered at `center`, rotated by `angle` about the table normal
    pub fn new(center: Vec3, half_extents: Vec3, angle: f32) -> Self {
        let transform = Affine3A::from_rotation_translation(Quat::from_rotation_z(angle), center);
        Self {
            transform,
            half_extents,
            obb: Obb::from_transform(half_extents, &transform),
            restitution: None,
        }
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = Some(restitution);
        self
    }
}

/// Round pop bumper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bumper {
    pub center: Vec3,
    pub radius: f32,
    /// Applied to the normal velocity component
    pub restitution: f32,
    /// Magnitude of the random kick
    pub jitter: f32,
    pub score: u64,
}

/// Flat panel that speeds the ball up once per cooldown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeedBump {
    pub body: BoxBody,
    pub multiplier: f32,
    pub score: u64,
    /// Seconds between triggers
    pub cooldown: f32,
    /// Simulation time before which the bump is inert
    pub cooldown_until: f64,
}

impl SpeedBump {
    #[inline]
    pub fn is_ready(&self, now: f64) -> bool {
        now >= self.cooldown_until
    }
}

/// One end of a wormhole pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wormhole {
    pub center: Vec3,
    pub radius: f32,
    /// Center of the paired wormhole
    pub exit: Vec3,
    pub score: u64,
    /// Seconds all wormholes stay inert after a teleport
    pub guard: f32,
}

/// Everything on the table the ball can touch, apart from the flippers and
/// the plunger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Obstacle {
    Wall(BoxBody),
    Ramp(BoxBody),
    /// Divider between the launch lane and the playfield
    Barrier(BoxBody),
    Bumper(Bumper),
    SpeedBump(SpeedBump),
    Arc(ArcWall),
    Wormhole(Wormhole),
}

impl Obstacle {
    pub fn kind(&self) -> ContactKind {
        match self {
            Obstacle::Wall(_) => ContactKind::Wall,
            Obstacle::Ramp(_) => ContactKind::Ramp,
            Obstacle::Barrier(_) => ContactKind::Barrier,
            Obstacle::Bumper(_) => ContactKind::Bumper,
            Obstacle::SpeedBump(_) => ContactKind::SpeedBump,
            Obstacle::Arc(_) => ContactKind::Arc,
            Obstacle::Wormhole(_) => ContactKind::Wormhole,
        }
    }

    /// Cached broad-phase box, for box-shaped obstacles
    pub fn obb(&self) -> Option<&Obb> {
        match self {
            Obstacle::Wall(body) | Obstacle::Ramp(body) | Obstacle::Barrier(body) => Some(&body.obb),
            Obstacle::SpeedBump(bump) => Some(&bump.body.obb),
            _ => None,
        }
    }
}

/// The static playfield
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    /// Sorted by collision stage
    pub obstacles: Vec<Obstacle>,
}

impl Table {
    /// Build a table; obstacles are stably sorted into collision order
    pub fn new(mut obstacles: Vec<Obstacle>) -> Self {
        obstacles.sort_by_key(|o| o.kind().stage());
        Self { obstacles }
    }

    /// The standard layout: walls, launch lane, three bumpers, two speed
    /// bumps, inlane ramps, the corner arc and one wormhole pair
    pub fn standard(tuning: &Tuning) -> Self {
        let depth = OBSTACLE_DEPTH / 2.0;
        let wall = WALL_THICKNESS / 2.0;
        let mut obstacles = Vec::new();

        // Side and top walls, long enough to close the corners
        obstacles.push(Obstacle::Wall(BoxBody::new(
            Vec3::new(TABLE_LEFT, 0.0, 0.0),
            Vec3::new(wall, TABLE_TOP + wall, depth),
            0.0,
        )));
        obstacles.push(Obstacle::Wall(BoxBody::new(
            Vec3::new(TABLE_RIGHT, 0.0, 0.0),
            Vec3::new(wall, TABLE_TOP + wall, depth),
            0.0,
        )));
        obstacles.push(Obstacle::Wall(BoxBody::new(
            Vec3::new(0.0, TABLE_TOP, 0.0),
            Vec3::new(TABLE_RIGHT + wall, wall, depth),
            0.0,
        )));

        // Lane divider from the drain up to the lane exit
        let barrier_half_height = (BARRIER_TOP - TABLE_BOTTOM) / 2.0;
        obstacles.push(Obstacle::Barrier(BoxBody::new(
            Vec3::new(BARRIER_X, TABLE_BOTTOM + barrier_half_height, 0.0),
            Vec3::new(BARRIER_THICKNESS / 2.0, barrier_half_height, depth),
            0.0,
        )));

        // Inlane ramps feeding the flippers
        let ramp_half = Vec3::new(1.6, 0.2, depth);
        let quarter = std::f32::consts::FRAC_PI_4;
        obstacles.push(Obstacle::Ramp(
            BoxBody::new(Vec3::new(-8.25, -8.5, 0.0), ramp_half, -quarter)
                .with_restitution(tuning.ramp_restitution),
        ));
        obstacles.push(Obstacle::Ramp(
            BoxBody::new(Vec3::new(6.25, -8.5, 0.0), ramp_half, quarter)
                .with_restitution(tuning.ramp_restitution),
        ));

        for center in BUMPER_POSITIONS {
            obstacles.push(Obstacle::Bumper(Bumper {
                center,
                radius: BUMPER_RADIUS,
                restitution: tuning.bumper_restitution,
                jitter: tuning.bumper_jitter,
                score: tuning.bumper_score,
            }));
        }

        let bump_half = Vec3::new(SPEED_BUMP_HALF_EXTENTS.x, SPEED_BUMP_HALF_EXTENTS.y, depth);
        for (center, angle) in [
            (Vec3::new(-5.0, -2.0, 0.0), -SPEED_BUMP_ANGLE),
            (Vec3::new(3.0, -2.0, 0.0), SPEED_BUMP_ANGLE),
        ] {
            obstacles.push(Obstacle::SpeedBump(SpeedBump {
                body: BoxBody::new(center, bump_half, angle),
                multiplier: tuning.speed_bump_multiplier,
                score: tuning.speed_bump_score,
                cooldown: tuning.speed_bump_cooldown,
                cooldown_until: 0.0,
            }));
        }

        obstacles.push(Obstacle::Arc(ArcWall::new(
            ARC_CENTER,
            ARC_RADIUS,
            0.0,
            std::f32::consts::FRAC_PI_2,
            ARC_SEGMENTS,
        )));

        let [a, b] = WORMHOLE_POSITIONS;
        for (center, exit) in [(a, b), (b, a)] {
            obstacles.push(Obstacle::Wormhole(Wormhole {
                center,
                radius: WORMHOLE_RADIUS,
                exit,
                score: tuning.wormhole_score,
                guard: tuning.wormhole_guard,
            }));
        }

        Self::new(obstacles)
    }

    /// Forget every pending cooldown
    pub fn clear_cooldowns(&mut self) {
        for obstacle in &mut self.obstacles {
            if let Obstacle::SpeedBump(bump) = obstacle {
                bump.cooldown_until = 0.0;
            }
        }
    }
}
