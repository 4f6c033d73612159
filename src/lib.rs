//! Ram Arena - vehicle combat simulation core
//!
//! Core modules:
//! - `sim`: Simulation (geometry, obstacles, targets, health, vehicle controller)
//! - `tuning`: Data-driven vehicle and creature balance

pub mod sim;
pub mod tuning;

pub use tuning::{Tuning, TuningError};

use glam::{Vec2, Vec3};

/// Simulation configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Smallest radius or half extent a shape may have
    pub const MIN_EXTENT: f32 = 1.0e-4;
    /// Squared length below which a direction counts as degenerate
    pub const DEGENERATE_SQ: f32 = 0.001;

    /// Objects falling below this height are considered gone
    pub const KILL_PLANE_Y: f32 = -10.0;
}

/// Normalized angle to [-π, π]
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    if !angle.is_finite() {
        return 0.0;
    }
    (angle + PI).rem_euclid(TAU) - PI
}

/// Drop the vertical component of a vector
#[inline]
pub fn ground(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Yaw (radians around +Y, 0 faces +Z) of a ground-plane direction
#[inline]
pub fn yaw_of(dir: Vec2) -> f32 {
    dir.x.atan2(dir.y)
}

/// Forward (+Z local) axis for a yaw angle
#[inline]
pub fn forward_from_yaw(yaw: f32) -> Vec3 {
    Vec3::new(yaw.sin(), 0.0, yaw.cos())
}

/// Right (+X local) axis for a yaw angle
#[inline]
pub fn right_from_yaw(yaw: f32) -> Vec3 {
    Vec3::new(yaw.cos(), 0.0, -yaw.sin())
}
