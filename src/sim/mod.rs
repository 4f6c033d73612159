//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Stable iteration order (registration order)
//! - No rendering, input or platform dependencies

pub mod damage;
pub mod feedback;
pub mod geometry;
pub mod health;
pub mod obstacles;
pub mod registry;
pub mod schedule;
pub mod state;
pub mod targets;
pub mod tick;
pub mod vehicle;

pub use damage::{Binding, DamageRouter, HealthEvent};
pub use feedback::{CollisionFeedback, Spring, smooth_damp};
pub use geometry::{
    OrientedRect, QueryShape, circle_rect_overlap, circles_overlap, closest_point_in_rect,
    push_out_direction, rects_overlap,
};
pub use health::{DamageModifier, Health, HealthChange, Regeneration};
pub use obstacles::{Obstacle, ObstacleKind, ObstacleRegistry, ObstacleShape};
pub use registry::{EntityId, Keyed, OrderedRegistry};
pub use schedule::{DamageSchedule, ScheduledDamage};
pub use state::{Arena, ArenaEvent};
pub use targets::{FollowPoint, Hittable, Idle, Pursuit, Target, TargetBody, TargetDetector};
pub use tick::{TickReport, tick};
pub use vehicle::{Contact, DriveInput, DriveReport, Vehicle, VehicleState};
