//! Delayed one-shot damage keyed by simulation time
//!
//! Used for projectiles that land after a travel time. Entries are drained
//! once per tick in (time, insertion) order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::registry::EntityId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledDamage {
    pub at: f64,
    pub target: EntityId,
    pub amount: f32,
    /// Who fired it, if anyone
    pub source: Option<EntityId>,
    seq: u64,
}

impl Eq for ScheduledDamage {}

impl Ord for ScheduledDamage {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap pops the earliest entry first
        other
            .at
            .total_cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ScheduledDamage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
pub struct DamageSchedule {
    queue: BinaryHeap<ScheduledDamage>,
    next_seq: u64,
}

impl DamageSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at: f64, target: EntityId, amount: f32, source: Option<EntityId>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(ScheduledDamage {
            at,
            target,
            amount,
            source,
            seq,
        });
    }

    /// Pop everything due at or before `now`, earliest first
    pub fn drain_due(&mut self, now: f64) -> Vec<ScheduledDamage> {
        let mut due = Vec::new();
        while self.queue.peek().is_some_and(|next| next.at <= now) {
            if let Some(entry) = self.queue.pop() {
                due.push(entry);
            }
        }
        due
    }

    /// Drop every pending entry aimed at `target`
    pub fn cancel_for(&mut self, target: EntityId) -> usize {
        let before = self.queue.len();
        self.queue.retain(|entry| entry.target != target);
        before - self.queue.len()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
