//! Damage router: identity -> health binding
//!
//! All damage and healing by reference goes through here. Events are queued
//! synchronously and drained by the tick once per step.

use std::collections::HashMap;

use super::health::{DamageModifier, Health, HealthChange};
use super::registry::EntityId;

/// Handle for one registration of an identity
///
/// Re-registering an id issues a new binding, so events from the old Health
/// can never be mistaken for the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Binding(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HealthEvent {
    Changed {
        id: EntityId,
        binding: Binding,
        current: f32,
        max: f32,
    },
    Died {
        id: EntityId,
        binding: Binding,
    },
}

impl HealthEvent {
    pub fn id(&self) -> EntityId {
        match self {
            HealthEvent::Changed { id, .. } | HealthEvent::Died { id, .. } => *id,
        }
    }
}

#[derive(Debug)]
struct Entry {
    health: Health,
    binding: Binding,
}

#[derive(Debug, Default)]
pub struct DamageRouter {
    entries: HashMap<EntityId, Entry>,
    events: Vec<HealthEvent>,
    next_binding: u64,
}

impl DamageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a Health to an identity, replacing any previous binding
    pub fn register_entity(&mut self, id: EntityId, health: Health) -> Binding {
        let binding = Binding(self.next_binding);
        self.next_binding += 1;
        if self.entries.insert(id, Entry { health, binding }).is_some() {
            log::debug!("Health for {id} re-registered, previous binding dropped");
        }
        binding
    }

    /// Drop the binding; returns the Health that was bound
    pub fn unregister_entity(&mut self, id: EntityId) -> Option<Health> {
        self.entries.remove(&id).map(|entry| entry.health)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn health(&self, id: EntityId) -> Option<&Health> {
        self.entries.get(&id).map(|entry| &entry.health)
    }

    pub fn binding(&self, id: EntityId) -> Option<Binding> {
        self.entries.get(&id).map(|entry| entry.binding)
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.health(id).is_some_and(Health::is_alive)
    }

    pub fn damage_entity(&mut self, id: EntityId, amount: f32) -> Option<HealthChange> {
        self.mutate(id, |health| health.take_damage(amount))
    }

    pub fn heal_entity(&mut self, id: EntityId, amount: f32) -> Option<HealthChange> {
        self.mutate(id, |health| health.heal(amount))
    }

    pub fn set_max_health(&mut self, id: EntityId, max: f32) -> Option<HealthChange> {
        self.mutate(id, |health| health.set_max_health(max))
    }

    pub fn revive_entity(&mut self, id: EntityId) -> Option<HealthChange> {
        self.mutate(id, Health::revive)
    }

    pub fn set_damage_modifier(&mut self, id: EntityId, modifier: Option<DamageModifier>) {
        match self.entries.get_mut(&id) {
            Some(entry) => entry.health.set_damage_modifier(modifier),
            None => log::debug!("Modifier for unknown entity {id} ignored"),
        }
    }

    /// Take all events queued since the last drain
    pub fn drain_events(&mut self) -> Vec<HealthEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn mutate(
        &mut self,
        id: EntityId,
        op: impl FnOnce(&mut Health) -> HealthChange,
    ) -> Option<HealthChange> {
        let Some(entry) = self.entries.get_mut(&id) else {
            log::debug!("Health change for unknown entity {id} ignored");
            return None;
        };

        let change = op(&mut entry.health);
        if change.applied {
            self.events.push(HealthEvent::Changed {
                id,
                binding: entry.binding,
                current: change.current,
                max: entry.health.max(),
            });
        }
        if change.died {
            self.events.push(HealthEvent::Died {
                id,
                binding: entry.binding,
            });
        }
        Some(change)
    }
}
