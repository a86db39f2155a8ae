//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Host-supplied delta only (the binary drives it at a fixed step)
//! - Seeded RNG only
//! - Stable collision order (by obstacle stage)
//! - No rendering or platform dependencies

pub mod arc;
pub mod collision;
pub mod obb;
pub mod response;
pub mod state;
pub mod table;
pub mod tick;

pub use arc::ArcWall;
pub use collision::{Contact, reflect_velocity, sphere_box_contact, sphere_circle_contact};
pub use obb::Obb;
pub use response::{collision_pass, respond};
pub use state::{
    Ball, ContactKind, Flipper, FlipperSide, FrameSnapshot, GameEvent, GameState, Launcher, LauncherPhase,
    SimulationState,
};
pub use table::{BoxBody, Bumper, Obstacle, SpeedBump, Table, Wormhole};
pub use tick::{TickInput, tick};
