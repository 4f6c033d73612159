//! Fixed timestep simulation tick
//!
//! One step across every component, in a fixed order:
//! scheduled damage, regeneration, targets, vehicle, health events, despawns.

use super::damage::HealthEvent;
use super::registry::EntityId;
use super::state::{Arena, ArenaEvent};
use super::targets::{Pursuit, TargetBody};
use super::vehicle::{Contact, DriveInput, DriveReport, Vehicle};

/// Everything a tick produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub drive: DriveReport,
    pub events: Vec<ArenaEvent>,
}

/// Advance the arena and the vehicle by one timestep
pub fn tick(
    arena: &mut Arena,
    vehicle: &mut Vehicle,
    input: &DriveInput,
    pursuit: &mut dyn Pursuit,
    dt: f32,
) -> TickReport {
    if !(dt > 0.0) || !dt.is_finite() {
        return TickReport {
            drive: vehicle.drive(input, arena, 0.0),
            events: Vec::new(),
        };
    }

    arena.advance_clock(dt);
    let mut events = Vec::new();
    let mut despawns: Vec<EntityId> = Vec::new();

    // Projectiles that land this tick
    for hit in arena.schedule.drain_due(arena.time()) {
        arena.router.damage_entity(hit.target, hit.amount);
    }

    if let Some(regeneration) = vehicle.regeneration.as_mut() {
        let amount = regeneration.advance(dt);
        if amount > 0.0 && arena.router.is_alive(vehicle.id()) {
            arena.router.heal_entity(vehicle.id(), amount);
        }
    }

    // Creatures hunt the vehicle only while it is still in one piece
    let quarry = arena
        .router
        .is_alive(vehicle.id())
        .then(|| (vehicle.id(), vehicle.collision_center()));
    for (id, update) in arena.targets.update(dt, pursuit, quarry) {
        if let Some(attack) = update.attack {
            let lands_at = arena.time() + f64::from(attack.delay);
            arena.schedule.schedule(lands_at, attack.target, attack.damage, Some(id));
        }
        if update.despawn {
            despawns.push(id);
        }
    }

    let drive = vehicle.drive(input, arena, dt);
    if let Contact::Prop { target, .. } = drive.contact {
        events.push(ArenaEvent::PropLaunched { id: target });
    }

    for event in arena.router.drain_events() {
        handle_health_event(arena, vehicle, event, &mut events, &mut despawns);
    }

    despawns.sort_unstable();
    despawns.dedup();
    for id in despawns {
        if arena.despawn(id) {
            events.push(ArenaEvent::Despawned { id });
        }
    }

    TickReport { drive, events }
}

fn handle_health_event(
    arena: &mut Arena,
    vehicle: &Vehicle,
    event: HealthEvent,
    events: &mut Vec<ArenaEvent>,
    despawns: &mut Vec<EntityId>,
) {
    let HealthEvent::Died { id, binding } = event else {
        log::trace!("{event:?}");
        return;
    };
    // Events from a binding that has since been replaced are stale
    if arena.router.binding(id) != Some(binding) {
        log::debug!("Stale death event for {id} ignored");
        return;
    }

    if id == vehicle.id() {
        log::info!("Vehicle {id} destroyed at t={:.2}", arena.time());
        events.push(ArenaEvent::VehicleDestroyed { id });
        return;
    }

    if let Some(target) = arena.targets.get_mut(id) {
        match &mut target.body {
            TargetBody::Creature(creature) => {
                creature.begin_dying();
                log::info!("Creature {id} killed");
                events.push(ArenaEvent::CreatureKilled { id });
            }
            // Props leave on their own once their flight ends
            TargetBody::Prop(_) => {}
        }
        return;
    }

    if arena.obstacles.contains(id) {
        log::info!("Obstacle {id} destroyed");
        events.push(ArenaEvent::ObstacleDestroyed { id });
        despawns.push(id);
    }
}
