//! Identity-keyed storage with stable registration order
//!
//! Removal leaves a tombstone so that iteration order never shifts; the slot
//! vector is compacted once tombstones outnumber live entries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Opaque handle for anything that lives in the arena
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct EntityId(pub u32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Items that know their own identity
pub trait Keyed {
    fn id(&self) -> EntityId;
}

#[derive(Debug, Clone)]
pub struct OrderedRegistry<T> {
    slots: Vec<Option<T>>,
    index: HashMap<EntityId, usize>,
    tombstones: usize,
}

impl<T> Default for OrderedRegistry<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            tombstones: 0,
        }
    }
}

impl<T: Keyed> OrderedRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item; returns false (and drops nothing) if its id is already present
    pub fn insert(&mut self, item: T) -> bool {
        let id = item.id();
        if self.index.contains_key(&id) {
            return false;
        }
        self.index.insert(id, self.slots.len());
        self.slots.push(Some(item));
        true
    }

    /// Remove an item by id; unknown ids are ignored
    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        let slot = self.index.remove(&id)?;
        let item = self.slots.get_mut(slot).and_then(Option::take);
        self.tombstones += 1;
        if self.tombstones * 2 > self.slots.len() {
            self.compact();
        }
        item
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        let slot = *self.index.get(&id)?;
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        let slot = *self.index.get(&id)?;
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    /// Live items in registration order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn compact(&mut self) {
        self.slots.retain(Option::is_some);
        self.index.clear();
        for (slot, item) in self.slots.iter().enumerate() {
            if let Some(item) = item {
                self.index.insert(item.id(), slot);
            }
        }
        self.tombstones = 0;
    }
}
