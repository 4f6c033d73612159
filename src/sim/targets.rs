//! Living, hittable things: enemies on foot and loose props
//!
//! Targets live apart from the obstacle registry. A prop is additionally
//! wrapped by an obstacle so the vehicle can bump into it.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::geometry::{circles_overlap, ground_direction, sanitize_extent};
use super::registry::{EntityId, Keyed, OrderedRegistry};
use crate::consts::KILL_PLANE_Y;
use crate::ground;
use crate::tuning::{CreatureTuning, PropTuning};

/// Anything the vehicle (or a projectile) can make contact with
pub trait Hittable {
    fn can_be_hit(&self) -> bool;
    fn can_act(&self) -> bool;
    /// Whether the owning object currently exists in the world
    fn is_active(&self) -> bool;
    fn collision_radius(&self) -> f32;
    fn collision_center_offset(&self) -> Vec3;
    fn position(&self) -> Vec3;
    fn on_hit(&mut self, direction: Vec3, speed: f32);

    fn collision_center(&self) -> Vec3 {
        self.position() + self.collision_center_offset()
    }
}

/// Source of desired positions for enemies (navigation is a black box)
pub trait Pursuit {
    fn pursuit_point(&mut self, id: EntityId, position: Vec3) -> Option<Vec3>;
}

/// Everyone chases one fixed point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowPoint(pub Vec3);

impl Pursuit for FollowPoint {
    fn pursuit_point(&mut self, _id: EntityId, _position: Vec3) -> Option<Vec3> {
        Some(self.0)
    }
}

/// Nobody moves
#[derive(Debug, Clone, Copy, Default)]
pub struct Idle;

impl Pursuit for Idle {
    fn pursuit_point(&mut self, _id: EntityId, _position: Vec3) -> Option<Vec3> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Knockback {
    from: Vec3,
    to: Vec3,
    elapsed: f32,
    duration: f32,
}

impl Knockback {
    /// Eased position; returns true once finished
    fn advance(&mut self, dt: f32) -> (Vec3, bool) {
        self.elapsed += dt;
        if self.duration <= 0.0 || self.elapsed >= self.duration {
            return (self.to, true);
        }
        let t = self.elapsed / self.duration;
        let remaining = 1.0 - t;
        (self.from.lerp(self.to, 1.0 - remaining * remaining), false)
    }
}

/// Enemy on foot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creature {
    pub tuning: CreatureTuning,
    alive: bool,
    knockback: Option<Knockback>,
    stun_timer: f32,
    dying_timer: Option<f32>,
    pursuit_point: Option<Vec3>,
    repath_timer: f32,
    since_attack: f32,
}

impl Creature {
    pub fn new(tuning: CreatureTuning) -> Self {
        Self {
            alive: true,
            knockback: None,
            stun_timer: 0.0,
            dying_timer: None,
            pursuit_point: None,
            // Due immediately so a fresh spawn picks a destination on its first tick
            repath_timer: tuning.repath_interval,
            since_attack: 0.0,
            tuning,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_dying(&self) -> bool {
        self.dying_timer.is_some()
    }

    pub fn is_stunned(&self) -> bool {
        self.stun_timer > 0.0
    }

    pub fn is_knocked_back(&self) -> bool {
        self.knockback.is_some()
    }

    pub fn pursuit_point(&self) -> Option<Vec3> {
        self.pursuit_point
    }

    fn is_free(&self) -> bool {
        self.alive
            && self.knockback.is_none()
            && self.stun_timer <= 0.0
            && self.dying_timer.is_none()
    }

    /// Start the death sequence; no-op if already dying
    pub fn begin_dying(&mut self) {
        if self.dying_timer.is_none() {
            self.alive = false;
            self.knockback = None;
            self.dying_timer = Some(self.tuning.death_duration);
        }
    }
}

/// Loose object that flies off when rammed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prop {
    pub tuning: PropTuning,
    /// Obstacle wrapping this prop in the obstacle registry
    pub obstacle: Option<EntityId>,
    hit: bool,
    velocity: Vec3,
    flight_timer: f32,
}

impl Prop {
    pub fn new(tuning: PropTuning) -> Self {
        Self {
            tuning,
            obstacle: None,
            hit: false,
            velocity: Vec3::ZERO,
            flight_timer: 0.0,
        }
    }

    pub fn is_flying(&self) -> bool {
        self.hit
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TargetBody {
    Creature(Creature),
    Prop(Prop),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub id: EntityId,
    pub position: Vec3,
    pub active: bool,
    radius: f32,
    center_offset: Vec3,
    pub body: TargetBody,
}

impl Keyed for Target {
    fn id(&self) -> EntityId {
        self.id
    }
}

/// What a target wants the arena to do after its update
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TargetUpdate {
    /// Remove the target (and everything bound to it)
    pub despawn: bool,
    /// Damage to schedule against the quarry
    pub attack: Option<Attack>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attack {
    pub target: EntityId,
    pub damage: f32,
    pub delay: f32,
}

impl Target {
    pub fn creature(id: EntityId, position: Vec3, tuning: CreatureTuning) -> Self {
        Self {
            id,
            position,
            active: true,
            radius: sanitize_extent(tuning.radius),
            center_offset: tuning.center_offset,
            body: TargetBody::Creature(Creature::new(tuning)),
        }
    }

    pub fn prop(id: EntityId, position: Vec3, tuning: PropTuning) -> Self {
        Self {
            id,
            position,
            active: true,
            radius: sanitize_extent(tuning.radius),
            center_offset: Vec3::ZERO,
            body: TargetBody::Prop(Prop::new(tuning)),
        }
    }

    pub fn as_creature(&self) -> Option<&Creature> {
        match &self.body {
            TargetBody::Creature(creature) => Some(creature),
            TargetBody::Prop(_) => None,
        }
    }

    pub fn as_creature_mut(&mut self) -> Option<&mut Creature> {
        match &mut self.body {
            TargetBody::Creature(creature) => Some(creature),
            TargetBody::Prop(_) => None,
        }
    }

    pub fn as_prop(&self) -> Option<&Prop> {
        match &self.body {
            TargetBody::Prop(prop) => Some(prop),
            TargetBody::Creature(_) => None,
        }
    }

    pub fn is_creature(&self) -> bool {
        matches!(self.body, TargetBody::Creature(_))
    }

    /// Advance timers, motion and intent
    ///
    /// `quarry` is the identity and collision center the creature attacks.
    pub fn update(
        &mut self,
        dt: f32,
        pursuit: &mut dyn Pursuit,
        quarry: Option<(EntityId, Vec3)>,
    ) -> TargetUpdate {
        if !(dt > 0.0) {
            return TargetUpdate::default();
        }
        let id = self.id;
        match &mut self.body {
            TargetBody::Creature(creature) => {
                update_creature(id, &mut self.position, creature, dt, pursuit, quarry)
            }
            TargetBody::Prop(prop) => update_prop(&mut self.position, prop, dt),
        }
    }
}

fn update_creature(
    id: EntityId,
    position: &mut Vec3,
    creature: &mut Creature,
    dt: f32,
    pursuit: &mut dyn Pursuit,
    quarry: Option<(EntityId, Vec3)>,
) -> TargetUpdate {
    if let Some(timer) = creature.dying_timer.as_mut() {
        *timer -= dt;
        // Sink into the ground during the last second
        if *timer < 1.0 {
            position.y -= 2.0 * dt;
        }
        return TargetUpdate {
            despawn: *timer <= 0.0,
            attack: None,
        };
    }

    if let Some(knockback) = creature.knockback.as_mut() {
        let (pos, done) = knockback.advance(dt);
        *position = pos;
        if done {
            creature.knockback = None;
        }
    }
    creature.stun_timer = (creature.stun_timer - dt).max(0.0);
    creature.since_attack += dt;

    if !creature.is_free() {
        return TargetUpdate::default();
    }

    // Destination is refreshed on a throttle; stale points in between are fine
    creature.repath_timer += dt;
    if creature.repath_timer >= creature.tuning.repath_interval {
        creature.repath_timer = 0.0;
        creature.pursuit_point = pursuit.pursuit_point(id, *position);
    }

    if let Some(goal) = creature.pursuit_point {
        let to_goal = ground(goal - *position);
        let distance = to_goal.length();
        let step = creature.tuning.move_speed * dt;
        let room = distance - creature.tuning.attack_range;
        if room > 0.0 {
            *position += ground_direction(to_goal) * step.min(room);
        }
    }

    let mut update = TargetUpdate::default();
    if let Some((quarry_id, quarry_pos)) = quarry {
        let in_range = ground(quarry_pos - *position).length_squared()
            <= creature.tuning.attack_range * creature.tuning.attack_range + 0.09;
        if in_range && creature.since_attack >= creature.tuning.attack_cooldown {
            creature.since_attack = 0.0;
            update.attack = Some(Attack {
                target: quarry_id,
                damage: creature.tuning.attack_damage,
                delay: creature.tuning.projectile_delay,
            });
        }
    }
    update
}

fn update_prop(position: &mut Vec3, prop: &mut Prop, dt: f32) -> TargetUpdate {
    if !prop.hit {
        return TargetUpdate::default();
    }
    prop.flight_timer += dt;
    prop.velocity.y += prop.tuning.gravity * dt;
    *position += prop.velocity * dt;
    TargetUpdate {
        despawn: prop.flight_timer >= prop.tuning.flight_duration || position.y < KILL_PLANE_Y,
        attack: None,
    }
}

impl Hittable for Target {
    fn can_be_hit(&self) -> bool {
        if !self.active {
            return false;
        }
        match &self.body {
            TargetBody::Creature(creature) => creature.is_free(),
            TargetBody::Prop(prop) => !prop.hit,
        }
    }

    fn can_act(&self) -> bool {
        self.can_be_hit()
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn collision_radius(&self) -> f32 {
        self.radius
    }

    fn collision_center_offset(&self) -> Vec3 {
        self.center_offset
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn on_hit(&mut self, direction: Vec3, speed: f32) {
        let direction = ground_direction(direction);
        match &mut self.body {
            TargetBody::Creature(creature) => {
                if creature.knockback.is_some() || !creature.alive {
                    return;
                }
                let distance = creature.tuning.hit_force * speed * 0.1;
                creature.knockback = Some(Knockback {
                    from: self.position,
                    to: self.position + direction * distance,
                    elapsed: 0.0,
                    duration: creature.tuning.knockback_duration,
                });
                // Stun outlasts the animation by half a second
                creature.stun_timer = creature.tuning.stun_duration + 0.5;
                creature.pursuit_point = None;
            }
            TargetBody::Prop(prop) => {
                if prop.hit {
                    return;
                }
                prop.hit = true;
                prop.velocity = direction * prop.tuning.hit_force * speed * 0.1
                    + Vec3::Y * prop.tuning.up_force;
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct TargetDetector {
    targets: OrderedRegistry<Target>,
}

impl TargetDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target; an id that is already registered is left untouched
    pub fn register(&mut self, target: Target) -> bool {
        self.targets.insert(target)
    }

    pub fn unregister(&mut self, id: EntityId) -> Option<Target> {
        self.targets.remove(id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.targets.contains(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Target> {
        self.targets.get(id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Target> {
        self.targets.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Target> {
        self.targets.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Closest hittable, active target; the earliest registered wins ties
    pub fn nearest_hittable(&self, position: Vec3) -> Option<EntityId> {
        let mut best: Option<(EntityId, f32)> = None;
        for target in self.iter().filter(|t| t.can_be_hit() && t.is_active()) {
            let dist_sq = ground(target.collision_center() - position).length_squared();
            if best.is_none_or(|(_, d)| dist_sq < d) {
                best = Some((target.id, dist_sq));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Advance every target; returns the ones that asked for something
    pub fn update(
        &mut self,
        dt: f32,
        pursuit: &mut dyn Pursuit,
        quarry: Option<(EntityId, Vec3)>,
    ) -> Vec<(EntityId, TargetUpdate)> {
        self.iter_mut()
            .filter_map(|target| {
                let update = target.update(dt, pursuit, quarry);
                (update != TargetUpdate::default()).then_some((target.id, update))
            })
            .collect()
    }

    /// First creature that can be hit and overlaps the given circle
    pub fn colliding_creature(&self, position: Vec3, radius: f32) -> Option<EntityId> {
        self.iter()
            .filter(|t| t.is_creature() && t.is_active() && t.can_be_hit())
            .find(|t| circles_overlap(position, radius, t.collision_center(), t.collision_radius()))
            .map(|t| t.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creature_at(id: u32, x: f32, z: f32) -> Target {
        Target::creature(EntityId(id), Vec3::new(x, 0.0, z), CreatureTuning::default())
    }

    #[test]
    fn test_nearest_skips_unhittable_and_inactive() {
        let mut detector = TargetDetector::new();
        detector.register(creature_at(1, 1.0, 0.0));
        detector.register(creature_at(2, 5.0, 0.0));
        detector.register(creature_at(3, 0.5, 0.0));

        if let Some(t) = detector.get_mut(EntityId(3)) {
            t.active = false;
        }
        if let Some(t) = detector.get_mut(EntityId(1)) {
            t.on_hit(Vec3::X, 5.0);
        }
        assert_eq!(detector.nearest_hittable(Vec3::ZERO), Some(EntityId(2)));
    }

    #[test]
    fn test_nearest_tie_goes_to_first_registered() {
        let mut detector = TargetDetector::new();
        detector.register(creature_at(7, 2.0, 0.0));
        detector.register(creature_at(3, -2.0, 0.0));
        assert_eq!(detector.nearest_hittable(Vec3::ZERO), Some(EntityId(7)));
    }

    #[test]
    fn test_nearest_empty_and_after_unregister() {
        let mut detector = TargetDetector::new();
        assert_eq!(detector.nearest_hittable(Vec3::ZERO), None);
        detector.register(creature_at(1, 1.0, 0.0));
        detector.unregister(EntityId(1));
        assert_eq!(detector.nearest_hittable(Vec3::ZERO), None);
        assert!(detector.unregister(EntityId(1)).is_none());
    }

    #[test]
    fn test_colliding_creature_respects_radius_and_offset() {
        let mut detector = TargetDetector::new();
        let tuning = CreatureTuning {
            radius: 0.5,
            center_offset: Vec3::new(1.0, 0.0, 0.0),
            ..CreatureTuning::default()
        };
        detector.register(Target::creature(EntityId(1), Vec3::new(2.0, 0.0, 0.0), tuning));

        // Center sits at x = 3 thanks to the offset
        assert_eq!(detector.colliding_creature(Vec3::ZERO, 2.0), None);
        assert_eq!(detector.colliding_creature(Vec3::ZERO, 2.5), Some(EntityId(1)));
    }

    #[test]
    fn test_props_are_not_creatures() {
        let mut detector = TargetDetector::new();
        detector.register(Target::prop(EntityId(1), Vec3::ZERO, PropTuning::default()));
        assert_eq!(detector.colliding_creature(Vec3::ZERO, 1.0), None);
        assert_eq!(detector.nearest_hittable(Vec3::ZERO), Some(EntityId(1)));
    }

    #[test]
    fn test_knockback_moves_and_stuns() {
        let mut target = creature_at(1, 0.0, 0.0);
        target.on_hit(Vec3::new(1.0, 0.0, 0.0), 10.0);
        assert!(!target.can_be_hit());

        // hit_force 10 * speed 10 * 0.1 = 10 units over 1 second
        let mut pursuit = Idle;
        for _ in 0..60 {
            target.update(1.0 / 60.0, &mut pursuit, None);
        }
        target.update(0.1, &mut pursuit, None);
        assert!((target.position.x - 10.0).abs() < 1e-3);
        let creature = target.as_creature().expect("creature");
        assert!(!creature.is_knocked_back());
        assert!(creature.is_stunned());

        // Stun is 2.5 s in total
        for _ in 0..30 {
            target.update(0.1, &mut pursuit, None);
        }
        assert!(target.can_be_hit());
    }

    #[test]
    fn test_second_hit_during_knockback_is_ignored() {
        let mut target = creature_at(1, 0.0, 0.0);
        target.on_hit(Vec3::X, 10.0);
        target.on_hit(Vec3::Z, 50.0);
        let mut pursuit = Idle;
        target.update(2.0, &mut pursuit, None);
        assert!((target.position - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_creature_pursues_and_attacks() {
        let mut target = creature_at(1, 0.0, 0.0);
        let quarry = Vec3::new(10.0, 0.0, 0.0);
        let mut pursuit = FollowPoint(quarry);

        let mut attacks = Vec::new();
        for _ in 0..600 {
            let update = target.update(1.0 / 60.0, &mut pursuit, Some((EntityId(99), quarry)));
            attacks.extend(update.attack);
        }

        // Stops at attack range instead of walking into the quarry
        assert!((target.position.x - 8.5).abs() < 0.05);
        assert!(!attacks.is_empty());
        assert!(attacks.iter().all(|a| a.target == EntityId(99) && a.damage == 5.0));
    }

    #[test]
    fn test_dying_creature_despawns_after_duration() {
        let mut target = creature_at(1, 0.0, 0.0);
        if let Some(creature) = target.as_creature_mut() {
            creature.begin_dying();
        }
        assert!(!target.can_be_hit());

        let mut pursuit = Idle;
        let update = target.update(1.5, &mut pursuit, None);
        assert!(!update.despawn);
        let update = target.update(1.6, &mut pursuit, None);
        assert!(update.despawn);
        assert!(target.position.y < 0.0);
    }

    #[test]
    fn test_prop_flies_off_when_hit() {
        let mut target = Target::prop(EntityId(1), Vec3::ZERO, PropTuning::default());
        assert!(target.can_be_hit());
        target.on_hit(Vec3::new(0.0, 0.0, 1.0), 10.0);
        assert!(!target.can_be_hit());

        let mut pursuit = Idle;
        target.update(0.1, &mut pursuit, None);
        assert!(target.position.z > 0.0);
        assert!(target.position.y > 0.0);

        let mut despawned = false;
        for _ in 0..100 {
            if target.update(0.1, &mut pursuit, None).despawn {
                despawned = true;
                break;
            }
        }
        assert!(despawned);
    }
}
