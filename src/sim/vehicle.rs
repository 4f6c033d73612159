//! Vehicle kinematic controller
//!
//! Integrates steering and throttle into heading and position, then resolves
//! what the swept footprint runs into. Contacts are handled in priority order:
//! creatures, then hittable props, then anything solid.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::feedback::{CollisionFeedback, Spring};
use super::geometry::{OrientedRect, QueryShape, ground_direction};
use super::health::Regeneration;
use super::obstacles::ObstacleKind;
use super::registry::EntityId;
use super::state::Arena;
use super::targets::Hittable;
use crate::tuning::{FeedbackTuning, VehicleTuning};
use crate::{forward_from_yaw, normalize_angle, right_from_yaw, yaw_of};

/// Driver input for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveInput {
    /// Desired travel direction on the ground (x -> +X, y -> +Z)
    pub steering: Vec2,
    pub throttle: bool,
    pub brake: bool,
}

impl DriveInput {
    pub fn toward(steering: Vec2) -> Self {
        Self {
            steering,
            throttle: true,
            brake: false,
        }
    }
}

/// What the vehicle touched this tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum Contact {
    #[default]
    None,
    Creature {
        target: EntityId,
        damage: f32,
    },
    Prop {
        target: EntityId,
        obstacle: EntityId,
        damage: f32,
    },
    Obstacle {
        obstacle: EntityId,
        /// Damage dealt to the obstacle (zero unless destructible)
        damage: f32,
        self_damage: f32,
    },
}

/// Result of one controller tick, for read-only consumers
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveReport {
    pub contact: Contact,
    pub speed: f32,
    pub position: Vec3,
    pub yaw: f32,
    /// Pushed out of an overlap before moving
    pub separated: bool,
}

/// Kinematic state of the vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub position: Vec3,
    /// Radians around +Y, 0 faces +Z
    pub yaw: f32,
    /// Signed, negative is reverse
    pub speed: f32,
    /// Body roll in degrees
    pub lean: Spring,
    /// Body pitch in degrees
    pub pitch: Spring,
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    id: EntityId,
    pub state: VehicleState,
    pub tuning: VehicleTuning,
    pub feedback: CollisionFeedback,
    pub regeneration: Option<Regeneration>,
}

impl Vehicle {
    pub fn new(
        id: EntityId,
        position: Vec3,
        yaw: f32,
        tuning: VehicleTuning,
        feedback: FeedbackTuning,
    ) -> Self {
        Self {
            id,
            state: VehicleState {
                position,
                yaw: normalize_angle(yaw),
                speed: 0.0,
                lean: Spring::default(),
                pitch: Spring::default(),
            },
            tuning,
            feedback: CollisionFeedback::new(feedback),
            regeneration: None,
        }
    }

    /// Identity of the vehicle's health in the damage router
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn forward(&self) -> Vec3 {
        forward_from_yaw(self.state.yaw)
    }

    pub fn right(&self) -> Vec3 {
        right_from_yaw(self.state.yaw)
    }

    /// Box footprint with the vehicle body at `position`
    pub fn footprint_at(&self, position: Vec3) -> OrientedRect {
        let offset =
            glam::Quat::from_rotation_y(self.state.yaw) * self.tuning.collision_center_offset;
        OrientedRect::from_size(position + offset, self.tuning.collision_size, self.state.yaw)
    }

    pub fn collision_center(&self) -> Vec3 {
        self.footprint_at(self.state.position).center
    }

    /// Advance one tick against the arena
    ///
    /// Damage goes through the arena's router; health events are left queued
    /// for the caller.
    pub fn drive(&mut self, input: &DriveInput, arena: &mut Arena, dt: f32) -> DriveReport {
        if !(dt > 0.0) || !dt.is_finite() {
            return self.report(Contact::None, false);
        }

        // A wrecked vehicle only coasts
        let input = if arena.router.health(self.id).is_none_or(|h| h.is_alive()) {
            *input
        } else {
            DriveInput::default()
        };

        let turn_rate = self.steer(input.steering, dt);
        let previous_speed = self.state.speed;
        self.update_speed(&input, dt);

        let separated = self.separate(arena, dt);

        let candidate = self.state.position + self.forward() * self.state.speed * dt;
        let contact = self.resolve(candidate, arena);

        self.update_body_motion(turn_rate, previous_speed, dt);
        self.report(contact, separated)
    }

    /// Rotate toward the steering direction; returns the turn rate in degrees per second
    fn steer(&mut self, steering: Vec2, dt: f32) -> f32 {
        let t = &self.tuning;
        if !steering.is_finite() || steering.length_squared() <= 0.0 {
            return 0.0;
        }
        let speed = self.state.speed.abs();
        if speed < t.min_turn_speed {
            return 0.0;
        }

        let rate = (t.max_turn_rate * (speed / t.max_speed).min(1.0) * t.turn_rate_factor)
            .min(t.max_turn_rate);
        let max_step = rate.to_radians() * dt;
        let delta = normalize_angle(yaw_of(steering) - self.state.yaw).clamp(-max_step, max_step);
        if delta == 0.0 {
            return 0.0;
        }

        // Pivot around the rear axle rather than the body center
        let old_forward = self.forward();
        self.state.yaw = normalize_angle(self.state.yaw + delta);
        let pivot_shift = (self.forward() - old_forward) * t.rear_axle_offset;
        self.state.position += pivot_shift;

        delta.to_degrees() / dt
    }

    fn update_speed(&mut self, input: &DriveInput, dt: f32) {
        let t = &self.tuning;
        let speed = self.state.speed;

        let speed = if input.throttle {
            speed + t.acceleration * dt
        } else if input.brake {
            speed - t.brake_force * dt
        } else {
            // Coast toward standstill without crossing it
            speed.signum() * (speed.abs() - t.brake_force * dt).max(0.0)
        };
        self.state.speed = speed.clamp(-t.max_reverse_speed, t.max_speed);
    }

    /// Nudge out of any current overlap; returns true if moved
    fn separate(&mut self, arena: &Arena, dt: f32) -> bool {
        let here = QueryShape::Rect(self.footprint_at(self.state.position));
        let push = arena.obstacles.push_out_direction(&here);
        if push == Vec3::ZERO {
            return false;
        }
        self.state.position += push * self.tuning.separation_speed * dt;
        log::trace!("Vehicle {} separating along {push}", self.id);
        true
    }

    fn speed_factor(&self) -> f32 {
        (self.state.speed.abs() / self.tuning.max_speed).clamp(0.0, 1.0)
    }

    /// Direction from the vehicle toward something it hit
    fn hit_direction(&self, toward: Vec3) -> Vec3 {
        let dir = ground_direction(toward - self.state.position);
        if dir == Vec3::ZERO { self.forward() } else { dir }
    }

    fn lose_speed_on_hit(&mut self) {
        let speed = self.state.speed;
        self.state.speed = speed.signum() * (speed.abs() - self.tuning.hit_speed_loss).max(0.0);
    }

    fn resolve(&mut self, candidate: Vec3, arena: &mut Arena) -> Contact {
        let footprint = self.footprint_at(candidate);
        let query = QueryShape::Rect(footprint);
        let speed = self.state.speed.abs();
        let speed_factor = self.speed_factor();

        let ramming = speed >= self.tuning.min_ram_speed;

        // Creatures first: ram them and keep going
        let creature = arena
            .targets
            .colliding_creature(footprint.center, footprint.bounding_radius())
            .filter(|_| ramming);
        if let Some(target) = creature {
            let damage = speed_factor * self.tuning.base_ram_damage * self.tuning.ram_multiplier;
            if let Some(creature) = arena.targets.get_mut(target) {
                let dir = self.hit_direction(creature.collision_center());
                creature.on_hit(dir, speed);
            }
            arena.router.damage_entity(target, damage);
            log::trace!("Vehicle {} rammed creature {target} for {damage:.1}", self.id);

            self.lose_speed_on_hit();
            self.state.position = candidate;
            return Contact::Creature { target, damage };
        }

        // Props go flying; the wrapper is removed once the query is done
        let prop = arena
            .obstacles
            .first_hittable(&query, &arena.targets)
            .filter(|_| ramming);
        if let Some((obstacle, target)) = prop {
            let damage = speed_factor * self.tuning.base_ram_damage;
            if let Some(prop) = arena.targets.get_mut(target) {
                let dir = self.hit_direction(prop.collision_center());
                prop.on_hit(dir, speed);
            }
            arena.router.damage_entity(target, damage);
            arena.detach_prop_obstacle(target);
            log::trace!("Vehicle {} launched prop {target}", self.id);

            self.lose_speed_on_hit();
            self.state.position = candidate;
            return Contact::Prop {
                target,
                obstacle,
                damage,
            };
        }

        let blocking = arena
            .obstacles
            .first_blocking(&query)
            .map(|o| (o.id, o.kind, o.normal_toward(candidate)));
        if let Some((obstacle, kind, normal)) = blocking {
            self.feedback.impact(
                self.forward(),
                self.right(),
                normal,
                self.state.speed,
                self.tuning.max_speed,
            );

            // Only obstacles that can take damage hurt the vehicle back
            let (damage, self_damage) = match kind {
                ObstacleKind::Destructible {
                    can_take_damage: true,
                } => {
                    let impact = speed_factor * self.tuning.obstacle_damage;
                    arena.router.damage_entity(obstacle, impact);
                    let self_damage = impact * self.tuning.self_damage_fraction;
                    if self_damage > 0.0 {
                        arena.router.damage_entity(self.id, self_damage);
                    }
                    (impact, self_damage)
                }
                _ => (0.0, 0.0),
            };
            log::trace!("Vehicle {} blocked by {obstacle}", self.id);

            self.state.speed = 0.0;
            return Contact::Obstacle {
                obstacle,
                damage,
                self_damage,
            };
        }

        self.state.position = candidate;
        Contact::None
    }

    fn update_body_motion(&mut self, turn_rate: f32, previous_speed: f32, dt: f32) {
        let t = &self.tuning;
        let collision_pitch = self.feedback.update(dt);

        let turn = if t.max_turn_rate > 0.0 {
            (turn_rate / t.max_turn_rate).clamp(-1.0, 1.0)
        } else {
            0.0
        };
        // Body rolls away from the turn
        let lean_target = -turn * t.max_lean_angle;
        self.state
            .lean
            .step(lean_target, t.lean_spring, t.lean_damping, t.max_lean_angle, dt);

        let accel = (self.state.speed - previous_speed) / dt;
        let accel = if t.acceleration > 0.0 {
            (accel / t.acceleration).clamp(-1.0, 1.0)
        } else {
            0.0
        };
        // Nose lifts under acceleration and dips under braking
        let pitch_target =
            t.base_pitch_angle - accel * t.acceleration_pitch_factor + collision_pitch;
        self.state
            .pitch
            .step(pitch_target, t.pitch_spring, t.pitch_damping, t.max_pitch_angle, dt);
    }

    fn report(&self, contact: Contact, separated: bool) -> DriveReport {
        DriveReport {
            contact,
            speed: self.state.speed,
            position: self.state.position,
            yaw: self.state.yaw,
            separated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::damage::HealthEvent;
    use crate::sim::health::Health;
    use crate::tuning::Tuning;
    use std::f32::consts::FRAC_PI_2;

    const DT: f32 = 1.0 / 60.0;

    fn arena_with(edit: impl FnOnce(&mut Tuning)) -> Arena {
        let mut tuning = Tuning::default();
        edit(&mut tuning);
        Arena::new(tuning)
    }

    fn throttle() -> DriveInput {
        DriveInput {
            steering: Vec2::ZERO,
            throttle: true,
            brake: false,
        }
    }

    #[test]
    fn test_one_second_of_throttle() {
        let mut arena = arena_with(|_| {});
        let mut vehicle = arena.spawn_vehicle(Vec3::ZERO, 0.0);

        for _ in 0..60 {
            vehicle.drive(&throttle(), &mut arena, DT);
        }

        // v = a * t; x is the integral of the per-step speeds
        assert!((vehicle.state.speed - 5.0).abs() < 1e-3);
        let expected_z = (1..=60).map(|i| 5.0 * i as f32 / 60.0 * DT).sum::<f32>();
        assert!((vehicle.state.position.z - expected_z).abs() < 1e-3);
        assert!((vehicle.state.position.z - 2.54).abs() < 0.01);
        assert!(vehicle.state.position.x.abs() < 1e-6);
    }

    #[test]
    fn test_blocked_by_pillar_stops_in_place() {
        let mut arena = arena_with(|t| {
            t.vehicle.collision_size = Vec2::new(2.0, 2.0);
            t.vehicle.max_speed = 5.0;
        });
        arena.spawn_pillar(Vec3::new(5.0, 0.0, 0.0), 1.0);
        let mut vehicle = arena.spawn_vehicle(Vec3::ZERO, FRAC_PI_2);
        vehicle.state.speed = 5.0;

        let report = vehicle.drive(&throttle(), &mut arena, 1.0);

        assert!(matches!(report.contact, Contact::Obstacle { .. }));
        assert_eq!(report.speed, 0.0);
        assert_eq!(vehicle.state.position, Vec3::ZERO);
    }

    #[test]
    fn test_zero_dt_changes_nothing() {
        let mut arena = Arena::default();
        let mut vehicle = arena.spawn_vehicle(Vec3::new(1.0, 0.0, 2.0), 0.3);
        vehicle.state.speed = 4.0;
        let before = vehicle.state.clone();

        let report = vehicle.drive(&throttle(), &mut arena, 0.0);
        assert_eq!(report.contact, Contact::None);
        assert_eq!(vehicle.state, before);
        vehicle.drive(&throttle(), &mut arena, f32::NAN);
        assert_eq!(vehicle.state, before);
    }

    #[test]
    fn test_zero_steering_keeps_heading() {
        let mut arena = Arena::default();
        let mut vehicle = arena.spawn_vehicle(Vec3::ZERO, 0.7);
        vehicle.state.speed = 8.0;
        for _ in 0..30 {
            vehicle.drive(&throttle(), &mut arena, DT);
        }
        assert!((vehicle.state.yaw - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_no_turning_when_stationary() {
        let mut arena = Arena::default();
        let mut vehicle = arena.spawn_vehicle(Vec3::ZERO, 0.0);
        let input = DriveInput {
            steering: Vec2::new(1.0, 0.0),
            ..DriveInput::default()
        };
        vehicle.drive(&input, &mut arena, DT);
        assert_eq!(vehicle.state.yaw, 0.0);
    }

    #[test]
    fn test_steering_turns_toward_input_at_capped_rate() {
        let mut arena = Arena::default();
        let mut vehicle = arena.spawn_vehicle(Vec3::ZERO, 0.0);
        vehicle.state.speed = 10.0;

        vehicle.drive(&DriveInput::toward(Vec2::new(1.0, 0.0)), &mut arena, 0.1);
        // Full speed: 180 deg/s for 0.1 s
        assert!((vehicle.state.yaw - 18f32.to_radians()).abs() < 1e-4);

        for _ in 0..20 {
            vehicle.drive(&DriveInput::toward(Vec2::new(1.0, 0.0)), &mut arena, 0.1);
        }
        assert!((vehicle.state.yaw - FRAC_PI_2).abs() < 1e-4);
    }

    #[test]
    fn test_coasting_decays_without_reversing() {
        let mut arena = Arena::default();
        let mut vehicle = arena.spawn_vehicle(Vec3::ZERO, 0.0);
        vehicle.state.speed = 1.0;
        for _ in 0..60 {
            vehicle.drive(&DriveInput::default(), &mut arena, DT);
        }
        assert_eq!(vehicle.state.speed, 0.0);
    }

    #[test]
    fn test_brake_reverses_to_limit() {
        let mut arena = Arena::default();
        let mut vehicle = arena.spawn_vehicle(Vec3::ZERO, 0.0);
        let input = DriveInput {
            brake: true,
            ..DriveInput::default()
        };
        for _ in 0..120 {
            vehicle.drive(&input, &mut arena, DT);
        }
        assert_eq!(vehicle.state.speed, -5.0);
        assert!(vehicle.state.position.z < 0.0);
    }

    #[test]
    fn test_creature_takes_priority_over_wall() {
        let mut arena = Arena::default();
        let mut vehicle = arena.spawn_vehicle(Vec3::ZERO, 0.0);
        let creature = arena.spawn_creature(Vec3::new(0.0, 0.0, 2.5));
        // Spans z 2.1..3.1: clear of the start pose, inside the swept one
        arena.spawn_wall(Vec3::new(0.0, 0.0, 2.6), Vec2::new(6.0, 1.0), 0.0);
        vehicle.state.speed = 10.0;

        let report = vehicle.drive(&throttle(), &mut arena, DT);

        let Contact::Creature { target, damage } = report.contact else {
            panic!("expected creature contact, got {:?}", report.contact);
        };
        assert_eq!(target, creature);
        assert!((damage - 50.0).abs() < 1e-3);
        assert_eq!(report.speed, 8.0);
        assert!(report.position.z > 0.0);
        assert_eq!(arena.router.health(creature).map(Health::current), Some(0.0));
        assert!(!arena.targets.get(creature).is_some_and(|t| t.can_be_hit()));
    }

    #[test]
    fn test_prop_is_launched_and_unwrapped() {
        let mut arena = Arena::default();
        let mut vehicle = arena.spawn_vehicle(Vec3::ZERO, 0.0);
        let prop = arena.spawn_prop(Vec3::new(0.0, 0.0, 2.5));
        vehicle.state.speed = 5.0;

        let report = vehicle.drive(&throttle(), &mut arena, DT);

        assert!(matches!(report.contact, Contact::Prop { target, .. } if target == prop));
        assert!(arena.obstacles.is_empty());
        assert!(arena.targets.get(prop).and_then(|t| t.as_prop()).is_some_and(|p| p.is_flying()));

        // Next tick passes straight through
        let report = vehicle.drive(&throttle(), &mut arena, DT);
        assert_eq!(report.contact, Contact::None);
    }

    #[test]
    fn test_destructible_wall_takes_damage_and_hurts_vehicle() {
        let mut arena = Arena::default();
        let mut vehicle = arena.spawn_vehicle(Vec3::ZERO, 0.0);
        let wall = arena.spawn_destructible(
            Vec3::new(0.0, 0.0, 2.6),
            Vec2::new(4.0, 1.0),
            0.0,
            100.0,
            true,
        );
        vehicle.state.speed = 10.0;

        let report = vehicle.drive(&throttle(), &mut arena, DT);

        let Contact::Obstacle {
            obstacle,
            damage,
            self_damage,
        } = report.contact
        else {
            panic!("expected obstacle contact, got {:?}", report.contact);
        };
        assert_eq!(obstacle, wall);
        assert!((damage - 25.0).abs() < 1e-3);
        assert!((self_damage - 5.0).abs() < 1e-3);
        assert_eq!(arena.router.health(wall).map(Health::current), Some(75.0));
        assert_eq!(arena.router.health(vehicle.id()).map(Health::current), Some(95.0));
        assert_eq!(vehicle.state.position, Vec3::ZERO);
        assert!(vehicle.feedback.is_active());
    }

    #[test]
    fn test_protected_destructible_is_not_damaged() {
        let mut arena = Arena::default();
        let mut vehicle = arena.spawn_vehicle(Vec3::ZERO, 0.0);
        let wall = arena.spawn_destructible(
            Vec3::new(0.0, 0.0, 2.6),
            Vec2::new(4.0, 1.0),
            0.0,
            100.0,
            false,
        );
        vehicle.state.speed = 10.0;

        vehicle.drive(&throttle(), &mut arena, DT);
        assert_eq!(arena.router.health(wall).map(Health::current), Some(100.0));
        assert_eq!(arena.router.health(vehicle.id()).map(Health::current), Some(100.0));
    }

    #[test]
    fn test_solid_wall_never_hurts_vehicle() {
        let mut arena = Arena::default();
        let mut vehicle = arena.spawn_vehicle(Vec3::ZERO, 0.0);
        let wall = arena.spawn_wall(Vec3::new(0.0, 0.0, 2.6), Vec2::new(4.0, 1.0), 0.0);
        vehicle.state.speed = 10.0;

        let report = vehicle.drive(&throttle(), &mut arena, DT);
        assert_eq!(
            report.contact,
            Contact::Obstacle {
                obstacle: wall,
                damage: 0.0,
                self_damage: 0.0,
            }
        );

        // Holding throttle against the wall keeps bumping into it
        for _ in 0..600 {
            vehicle.drive(&throttle(), &mut arena, DT);
        }
        assert_eq!(arena.router.health(vehicle.id()).map(Health::current), Some(100.0));
    }

    #[test]
    fn test_overlap_is_separated_before_moving() {
        let mut arena = Arena::default();
        arena.spawn_pillar(Vec3::new(-1.5, 0.0, 0.0), 1.0);
        let mut vehicle = arena.spawn_vehicle(Vec3::ZERO, 0.0);

        let report = vehicle.drive(&DriveInput::default(), &mut arena, 0.5);
        assert!(report.separated);
        assert!(vehicle.state.position.x > 0.0);
    }

    #[test]
    fn test_vehicle_death_is_reported_once() {
        let mut arena = arena_with(|t| t.vehicle.max_health = 4.0);
        let mut vehicle = arena.spawn_vehicle(Vec3::ZERO, 0.0);
        arena.spawn_destructible(
            Vec3::new(0.0, 0.0, 2.6),
            Vec2::new(4.0, 1.0),
            0.0,
            1000.0,
            true,
        );

        for _ in 0..3 {
            vehicle.state.speed = 10.0;
            vehicle.drive(&throttle(), &mut arena, DT);
        }

        let deaths = arena
            .router
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, HealthEvent::Died { id, .. } if *id == vehicle.id()))
            .count();
        assert_eq!(deaths, 1);

        // Wrecked: throttle is ignored
        vehicle.state.speed = 0.0;
        vehicle.drive(&throttle(), &mut arena, DT);
        assert_eq!(vehicle.state.speed, 0.0);
    }

    #[test]
    fn test_lean_and_pitch_stay_within_limits() {
        let mut arena = Arena::default();
        let mut vehicle = arena.spawn_vehicle(Vec3::ZERO, 0.0);
        for i in 0..600 {
            let steering = if (i / 60) % 2 == 0 { Vec2::X } else { -Vec2::X };
            vehicle.drive(&DriveInput::toward(steering), &mut arena, DT);
            assert!(vehicle.state.lean.value.abs() <= 10.0);
            assert!(vehicle.state.pitch.value.abs() <= 10.0);
        }
        assert!(vehicle.state.lean.value != 0.0);
    }
}
