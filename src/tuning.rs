//! Data-driven balance values
//!
//! Loaded from JSON; every field has a default so partial files work. Angles
//! are in degrees, everything else in metres and seconds.

use std::path::Path;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::MIN_EXTENT;

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse tuning file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Player vehicle handling, combat and body motion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleTuning {
    // === Drive ===
    pub acceleration: f32,
    /// Deceleration while braking, and coast-down rate with no input
    pub brake_force: f32,
    pub max_speed: f32,
    pub max_reverse_speed: f32,
    /// Degrees per second at full speed
    pub max_turn_rate: f32,
    pub turn_rate_factor: f32,
    /// Below this |speed| the vehicle cannot turn
    pub min_turn_speed: f32,
    /// Distance from body center back to the rear axle pivot
    pub rear_axle_offset: f32,

    // === Footprint ===
    /// Full box size (x = width, y = length along forward)
    pub collision_size: Vec2,
    pub collision_center_offset: Vec3,

    // === Combat ===
    pub max_health: f32,
    pub base_ram_damage: f32,
    pub ram_multiplier: f32,
    /// Below this |speed| creatures and props are not rammed
    pub min_ram_speed: f32,
    /// Speed lost per rammed target
    pub hit_speed_loss: f32,
    /// Damage dealt to destructible obstacles at full speed
    pub obstacle_damage: f32,
    /// Fraction of obstacle damage the vehicle takes itself
    pub self_damage_fraction: f32,
    /// Nudge speed used to escape an overlap
    pub separation_speed: f32,
    /// Flat fraction of incoming damage ignored
    pub damage_reduction: f32,
    /// Armor points (100 = immune)
    pub armor: f32,
    /// Health restored every second
    pub regeneration: f32,

    // === Body motion (degrees) ===
    pub max_lean_angle: f32,
    pub lean_spring: f32,
    pub lean_damping: f32,
    pub pitch_spring: f32,
    pub pitch_damping: f32,
    pub base_pitch_angle: f32,
    pub acceleration_pitch_factor: f32,
    pub max_pitch_angle: f32,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            acceleration: 5.0,
            brake_force: 8.0,
            max_speed: 10.0,
            max_reverse_speed: 5.0,
            max_turn_rate: 180.0,
            turn_rate_factor: 1.0,
            min_turn_speed: 0.5,
            rear_axle_offset: 1.2,

            collision_size: Vec2::new(2.0, 4.0),
            collision_center_offset: Vec3::ZERO,

            max_health: 100.0,
            base_ram_damage: 50.0,
            ram_multiplier: 1.0,
            min_ram_speed: 1.0,
            hit_speed_loss: 2.0,
            obstacle_damage: 25.0,
            self_damage_fraction: 0.2,
            separation_speed: 2.0,
            damage_reduction: 0.0,
            armor: 0.0,
            regeneration: 0.0,

            max_lean_angle: 10.0,
            lean_spring: 6.0,
            lean_damping: 4.0,
            pitch_spring: 3.0,
            pitch_damping: 2.0,
            base_pitch_angle: 2.0,
            acceleration_pitch_factor: 8.0,
            max_pitch_angle: 10.0,
        }
    }
}

/// Impact pitch kick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackTuning {
    /// Degrees of pitch at full-speed impact
    pub collision_pitch_intensity: f32,
    /// Seconds the kick lasts at full speed
    pub collision_duration: f32,
}

impl Default for FeedbackTuning {
    fn default() -> Self {
        Self {
            collision_pitch_intensity: 15.0,
            collision_duration: 0.5,
        }
    }
}

/// Enemy foot soldiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatureTuning {
    pub max_health: f32,
    pub radius: f32,
    pub center_offset: Vec3,
    pub move_speed: f32,
    pub attack_damage: f32,
    pub attack_range: f32,
    pub attack_cooldown: f32,
    /// Projectile travel time before damage lands
    pub projectile_delay: f32,
    pub hit_force: f32,
    pub knockback_duration: f32,
    pub stun_duration: f32,
    /// Death animation plus sinking, after which the body is removed
    pub death_duration: f32,
    /// Seconds between pursuit recomputations
    pub repath_interval: f32,
}

impl Default for CreatureTuning {
    fn default() -> Self {
        Self {
            max_health: 30.0,
            radius: 0.5,
            center_offset: Vec3::ZERO,
            move_speed: 3.0,
            attack_damage: 5.0,
            attack_range: 1.5,
            attack_cooldown: 1.5,
            projectile_delay: 0.3,
            hit_force: 10.0,
            knockback_duration: 1.0,
            stun_duration: 2.0,
            death_duration: 3.0,
            repath_interval: 0.1,
        }
    }
}

/// Loose props that go flying when rammed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropTuning {
    pub radius: f32,
    pub max_health: f32,
    pub hit_force: f32,
    pub up_force: f32,
    pub gravity: f32,
    pub flight_duration: f32,
}

impl Default for PropTuning {
    fn default() -> Self {
        Self {
            radius: 0.6,
            max_health: 20.0,
            hit_force: 10.0,
            up_force: 5.0,
            gravity: -9.81,
            flight_duration: 5.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub vehicle: VehicleTuning,
    pub feedback: FeedbackTuning,
    pub creature: CreatureTuning,
    pub prop: PropTuning,
}

impl Tuning {
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        Ok(serde_json::from_str::<Tuning>(json)?.sanitized())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load, falling back to defaults (with a warning) on any failure
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(tuning) => {
                log::info!("Loaded tuning from {}", path.display());
                tuning
            }
            Err(e) => {
                log::warn!("Using default tuning ({}): {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Clamp nonsensical values instead of rejecting the file
    pub fn sanitized(mut self) -> Self {
        let v = &mut self.vehicle;
        for value in [
            &mut v.acceleration,
            &mut v.brake_force,
            &mut v.max_reverse_speed,
            &mut v.max_turn_rate,
            &mut v.turn_rate_factor,
            &mut v.min_turn_speed,
            &mut v.rear_axle_offset,
            &mut v.max_health,
            &mut v.base_ram_damage,
            &mut v.ram_multiplier,
            &mut v.min_ram_speed,
            &mut v.hit_speed_loss,
            &mut v.obstacle_damage,
            &mut v.self_damage_fraction,
            &mut v.separation_speed,
            &mut v.damage_reduction,
            &mut v.armor,
            &mut v.regeneration,
            &mut v.max_lean_angle,
            &mut v.max_pitch_angle,
        ] {
            *value = non_negative(*value);
        }
        v.max_speed = non_negative(v.max_speed).max(MIN_EXTENT);
        v.collision_size = v.collision_size.max(Vec2::splat(MIN_EXTENT));

        let c = &mut self.creature;
        c.radius = non_negative(c.radius).max(MIN_EXTENT);
        c.max_health = non_negative(c.max_health);
        c.repath_interval = non_negative(c.repath_interval);
        c.attack_range = non_negative(c.attack_range);

        let p = &mut self.prop;
        p.radius = non_negative(p.radius).max(MIN_EXTENT);
        p.max_health = non_negative(p.max_health);

        let f = &mut self.feedback;
        f.collision_duration = non_negative(f.collision_duration).max(MIN_EXTENT);

        self
    }
}

fn non_negative(value: f32) -> f32 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let tuning = Tuning::from_json(r#"{ "vehicle": { "max_speed": 20.0 } }"#)
            .expect("valid json");
        assert_eq!(tuning.vehicle.max_speed, 20.0);
        assert_eq!(tuning.vehicle.acceleration, 5.0);
        assert_eq!(tuning.creature, CreatureTuning::default());
    }

    #[test]
    fn test_invalid_values_are_clamped() {
        let tuning = Tuning::from_json(
            r#"{ "vehicle": { "max_speed": -3.0, "collision_size": [0.0, -1.0], "armor": -50 },
                 "prop": { "radius": 0.0 } }"#,
        )
        .expect("valid json");
        assert!(tuning.vehicle.max_speed > 0.0);
        assert!(tuning.vehicle.collision_size.min_element() > 0.0);
        assert_eq!(tuning.vehicle.armor, 0.0);
        assert!(tuning.prop.radius > 0.0);
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        let err = Tuning::from_json("{ not json").unwrap_err();
        assert!(matches!(err, TuningError::Parse(_)));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let tuning = Tuning::load_or_default("/definitely/not/here.json");
        assert_eq!(tuning, Tuning::default());
    }
}
