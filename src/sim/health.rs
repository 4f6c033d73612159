//! Hit points, damage modifiers and regeneration

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Transform applied to incoming damage before it is subtracted
///
/// Cheap to clone; composition is explicit via [`DamageModifier::then`].
#[derive(Clone)]
pub struct DamageModifier(Rc<dyn Fn(f32) -> f32>);

impl DamageModifier {
    pub fn new(f: impl Fn(f32) -> f32 + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Multiply damage by a constant factor
    pub fn scale(factor: f32) -> Self {
        Self::new(move |damage| damage * factor)
    }

    /// Reduce damage by a fraction in [0, 1]
    pub fn percent_reduction(fraction: f32) -> Self {
        let fraction = fraction.clamp(0.0, 1.0);
        Self::new(move |damage| damage * (1.0 - fraction))
    }

    /// General reduction plus armor points, where 100 armor blocks everything
    pub fn armor(reduction: f32, armor_points: f32) -> Self {
        let total = (reduction + armor_points / 100.0).clamp(0.0, 1.0);
        Self::new(move |damage| damage * (1.0 - total))
    }

    /// Apply `self`, then `next`
    pub fn then(self, next: DamageModifier) -> Self {
        Self::new(move |damage| (next.0)((self.0)(damage)))
    }

    #[inline]
    pub fn apply(&self, damage: f32) -> f32 {
        (self.0)(damage)
    }
}

impl fmt::Debug for DamageModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DamageModifier(..)")
    }
}

/// What a health mutation did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthChange {
    /// Whether anything was mutated at all (false for dead no-ops)
    pub applied: bool,
    pub previous: f32,
    pub current: f32,
    /// True only on the alive -> dead edge
    pub died: bool,
}

impl HealthChange {
    fn unchanged(current: f32) -> Self {
        Self {
            applied: false,
            previous: current,
            current,
            died: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Health {
    max: f32,
    current: f32,
    #[serde(skip)]
    modifier: Option<DamageModifier>,
}

impl Health {
    pub fn new(max: f32) -> Self {
        let max = sanitize_amount(max);
        Self {
            max,
            current: max,
            modifier: None,
        }
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    /// Fraction of max health remaining (0 when max is 0)
    pub fn percent(&self) -> f32 {
        if self.max > 0.0 {
            self.current / self.max
        } else {
            0.0
        }
    }

    pub fn has_modifier(&self) -> bool {
        self.modifier.is_some()
    }

    pub fn take_damage(&mut self, amount: f32) -> HealthChange {
        if !self.is_alive() {
            return HealthChange::unchanged(self.current);
        }

        let amount = match &self.modifier {
            Some(modifier) => modifier.apply(amount),
            None => amount,
        };
        let amount = sanitize_amount(amount);

        let previous = self.current;
        self.current = (self.current - amount).max(0.0);
        HealthChange {
            applied: true,
            previous,
            current: self.current,
            died: !self.is_alive(),
        }
    }

    /// Heal up to max; dead entities stay dead
    pub fn heal(&mut self, amount: f32) -> HealthChange {
        if !self.is_alive() {
            return HealthChange::unchanged(self.current);
        }

        let previous = self.current;
        self.current = (self.current + sanitize_amount(amount)).min(self.max);
        HealthChange {
            applied: true,
            previous,
            current: self.current,
            died: false,
        }
    }

    /// Change the cap; current is pulled down if needed. Never reports a death.
    pub fn set_max_health(&mut self, max: f32) -> HealthChange {
        let previous = self.current;
        self.max = sanitize_amount(max);
        self.current = self.current.min(self.max);
        HealthChange {
            applied: true,
            previous,
            current: self.current,
            died: false,
        }
    }

    /// Replace the damage modifier; `None` clears it
    pub fn set_damage_modifier(&mut self, modifier: Option<DamageModifier>) {
        self.modifier = modifier;
    }

    /// Back to full health (respawn)
    pub fn revive(&mut self) -> HealthChange {
        let previous = self.current;
        self.current = self.max;
        HealthChange {
            applied: true,
            previous,
            current: self.current,
            died: false,
        }
    }
}

fn sanitize_amount(value: f32) -> f32 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

/// Periodic healing in fixed chunks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Regeneration {
    /// Amount healed each time the interval elapses
    pub per_interval: f32,
    /// Seconds between heals
    pub interval: f32,
    #[serde(default)]
    timer: f32,
}

impl Regeneration {
    pub const DEFAULT_INTERVAL: f32 = 1.0;

    pub fn new(per_interval: f32) -> Self {
        Self {
            per_interval,
            interval: Self::DEFAULT_INTERVAL,
            timer: 0.0,
        }
    }

    /// Advance the timer; returns the amount to heal this tick (0 most ticks)
    pub fn advance(&mut self, dt: f32) -> f32 {
        if self.per_interval <= 0.0 || self.interval <= 0.0 || !(dt > 0.0) {
            return 0.0;
        }
        self.timer += dt;
        if self.timer >= self.interval {
            self.timer = 0.0;
            self.per_interval
        } else {
            0.0
        }
    }
}
