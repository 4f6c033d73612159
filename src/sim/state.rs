//! Arena state: everything the vehicle drives through
//!
//! The arena is the explicit context passed into every tick. It owns the
//! registries, the damage router and the simulation clock.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::damage::DamageRouter;
use super::health::{DamageModifier, Health, Regeneration};
use super::obstacles::{Obstacle, ObstacleKind, ObstacleRegistry};
use super::registry::EntityId;
use super::schedule::DamageSchedule;
use super::targets::{Target, TargetBody, TargetDetector};
use super::vehicle::Vehicle;
use crate::tuning::Tuning;

/// Things that happened during a tick that outer layers may care about
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ArenaEvent {
    /// The vehicle's health reached zero
    VehicleDestroyed { id: EntityId },
    /// A creature died and started its death sequence
    CreatureKilled { id: EntityId },
    /// A destructible obstacle ran out of health and was removed
    ObstacleDestroyed { id: EntityId },
    /// A prop was rammed and launched
    PropLaunched { id: EntityId },
    /// An entity left the arena for good
    Despawned { id: EntityId },
}

#[derive(Debug)]
pub struct Arena {
    pub tuning: Tuning,
    pub obstacles: ObstacleRegistry,
    pub targets: TargetDetector,
    pub router: DamageRouter,
    pub schedule: DamageSchedule,
    /// Simulation time in seconds
    time: f64,
    /// Simulation tick counter
    ticks: u64,
    next_id: u32,
}

impl Arena {
    pub fn new(tuning: Tuning) -> Self {
        Self {
            tuning: tuning.sanitized(),
            obstacles: ObstacleRegistry::new(),
            targets: TargetDetector::new(),
            router: DamageRouter::new(),
            schedule: DamageSchedule::new(),
            time: 0.0,
            ticks: 0,
            next_id: 1,
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub(crate) fn advance_clock(&mut self, dt: f32) {
        self.time += f64::from(dt);
        self.ticks += 1;
    }

    /// Allocate a new entity ID (never reused)
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Spawn the player vehicle with its health bound in the router
    pub fn spawn_vehicle(&mut self, position: Vec3, yaw: f32) -> Vehicle {
        let id = self.next_entity_id();
        let tuning = &self.tuning.vehicle;

        let mut health = Health::new(tuning.max_health);
        if tuning.damage_reduction > 0.0 || tuning.armor > 0.0 {
            health.set_damage_modifier(Some(DamageModifier::armor(
                tuning.damage_reduction,
                tuning.armor,
            )));
        }
        self.router.register_entity(id, health);

        let mut vehicle = Vehicle::new(
            id,
            position,
            yaw,
            tuning.clone(),
            self.tuning.feedback.clone(),
        );
        if tuning.regeneration > 0.0 {
            vehicle.regeneration = Some(Regeneration::new(tuning.regeneration));
        }
        log::info!("Vehicle {id} spawned at {position}");
        vehicle
    }

    /// Solid round obstacle (pillar, tree)
    pub fn spawn_pillar(&mut self, center: Vec3, radius: f32) -> EntityId {
        let id = self.next_entity_id();
        self.obstacles.register(Obstacle::circle(id, center, radius));
        id
    }

    /// Solid box obstacle (wall, building) of full `size` rotated by `yaw`
    pub fn spawn_wall(&mut self, center: Vec3, size: Vec2, yaw: f32) -> EntityId {
        let id = self.next_entity_id();
        self.obstacles.register(Obstacle::rect(id, center, size, yaw));
        id
    }

    /// Box obstacle with its own health
    pub fn spawn_destructible(
        &mut self,
        center: Vec3,
        size: Vec2,
        yaw: f32,
        max_health: f32,
        can_take_damage: bool,
    ) -> EntityId {
        let id = self.next_entity_id();
        self.obstacles.register(
            Obstacle::rect(id, center, size, yaw)
                .with_kind(ObstacleKind::Destructible { can_take_damage }),
        );
        self.router.register_entity(id, Health::new(max_health));
        id
    }

    pub fn spawn_creature(&mut self, position: Vec3) -> EntityId {
        let id = self.next_entity_id();
        let tuning = self.tuning.creature.clone();
        self.router.register_entity(id, Health::new(tuning.max_health));
        self.targets.register(Target::creature(id, position, tuning));
        log::debug!("Creature {id} spawned at {position}");
        id
    }

    /// Spawn a prop plus the obstacle that lets the vehicle bump into it
    ///
    /// Returns the prop's target id.
    pub fn spawn_prop(&mut self, position: Vec3) -> EntityId {
        let id = self.next_entity_id();
        let obstacle_id = self.next_entity_id();
        let tuning = self.tuning.prop.clone();

        self.obstacles.register(
            Obstacle::circle(obstacle_id, position, tuning.radius)
                .with_kind(ObstacleKind::Hittable { target: id }),
        );
        self.router.register_entity(id, Health::new(tuning.max_health));

        let mut target = Target::prop(id, position, tuning);
        if let TargetBody::Prop(prop) = &mut target.body {
            prop.obstacle = Some(obstacle_id);
        }
        self.targets.register(target);
        id
    }

    /// Remove the wrapper obstacle of a launched prop
    pub fn detach_prop_obstacle(&mut self, target: EntityId) {
        let obstacle = match self.targets.get_mut(target).map(|t| &mut t.body) {
            Some(TargetBody::Prop(prop)) => prop.obstacle.take(),
            _ => None,
        };
        if let Some(obstacle) = obstacle {
            self.obstacles.unregister(obstacle);
        }
    }

    /// Remove an entity from every registry; unknown ids are a no-op
    pub fn despawn(&mut self, id: EntityId) -> bool {
        let mut found = false;
        if let Some(target) = self.targets.unregister(id) {
            found = true;
            if let TargetBody::Prop(prop) = &target.body {
                if let Some(obstacle) = prop.obstacle {
                    self.obstacles.unregister(obstacle);
                }
            }
        }
        found |= self.obstacles.unregister(id).is_some();
        found |= self.router.unregister_entity(id).is_some();
        let cancelled = self.schedule.cancel_for(id);
        if found {
            log::debug!("Despawned {id} ({cancelled} pending hits cancelled)");
        }
        found
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new(Tuning::default())
    }
}
