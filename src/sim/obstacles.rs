//! Static and dynamic obstacles plus the registry that answers overlap queries

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::geometry::{
    OrientedRect, QueryShape, circle_rect_overlap, circles_overlap, ground_direction,
    push_out_direction, rects_overlap, sanitize_extent,
};
use super::registry::{EntityId, Keyed, OrderedRegistry};
use super::targets::{Hittable, TargetDetector};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ObstacleShape {
    Circle { radius: f32 },
    Rect { half_extents: Vec2, yaw: f32 },
}

/// How the vehicle should treat contact with an obstacle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Walls, buildings: stop the vehicle
    #[default]
    Solid,
    /// Stops the vehicle and takes damage when allowed
    Destructible { can_take_damage: bool },
    /// Wraps a target in the detector; hit eligibility is delegated to it
    Hittable { target: EntityId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: EntityId,
    pub center: Vec3,
    pub kind: ObstacleKind,
    shape: ObstacleShape,
}

impl Keyed for Obstacle {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl Obstacle {
    pub fn circle(id: EntityId, center: Vec3, radius: f32) -> Self {
        Self {
            id,
            center,
            kind: ObstacleKind::Solid,
            shape: ObstacleShape::Circle {
                radius: sanitize_extent(radius),
            },
        }
    }

    /// Box of full `size` (x, z) rotated by `yaw` around +Y
    pub fn rect(id: EntityId, center: Vec3, size: Vec2, yaw: f32) -> Self {
        let rect = OrientedRect::from_size(center, size, yaw);
        Self {
            id,
            center,
            kind: ObstacleKind::Solid,
            shape: ObstacleShape::Rect {
                half_extents: rect.half_extents,
                yaw: rect.yaw,
            },
        }
    }

    pub fn with_kind(mut self, kind: ObstacleKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn shape(&self) -> ObstacleShape {
        self.shape
    }

    /// The box form, if this is a rect obstacle
    pub fn as_rect(&self) -> Option<OrientedRect> {
        match self.shape {
            ObstacleShape::Rect { half_extents, yaw } => Some(OrientedRect {
                center: self.center,
                half_extents,
                yaw,
            }),
            ObstacleShape::Circle { .. } => None,
        }
    }

    pub fn overlaps(&self, query: &QueryShape) -> bool {
        match (self.shape, query) {
            (ObstacleShape::Circle { radius }, QueryShape::Circle { center, radius: r }) => {
                circles_overlap(self.center, radius, *center, *r)
            }
            // A box query against a round obstacle uses the box's bounding circle
            (ObstacleShape::Circle { radius }, QueryShape::Rect(rect)) => {
                circles_overlap(self.center, radius, rect.center, rect.bounding_radius())
            }
            (ObstacleShape::Rect { .. }, QueryShape::Circle { center, radius }) => self
                .as_rect()
                .is_some_and(|own| circle_rect_overlap(*center, *radius, &own)),
            (ObstacleShape::Rect { .. }, QueryShape::Rect(rect)) => {
                self.as_rect().is_some_and(|own| rects_overlap(&own, rect))
            }
        }
    }

    /// Ground direction from this obstacle toward `point`
    pub fn normal_toward(&self, point: Vec3) -> Vec3 {
        ground_direction(point - self.center)
    }

    pub fn is_hittable(&self) -> bool {
        matches!(self.kind, ObstacleKind::Hittable { .. })
    }
}

#[derive(Debug, Default)]
pub struct ObstacleRegistry {
    obstacles: OrderedRegistry<Obstacle>,
}

impl ObstacleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an obstacle; an id that is already registered is left untouched
    pub fn register(&mut self, obstacle: Obstacle) -> bool {
        let id = obstacle.id;
        let added = self.obstacles.insert(obstacle);
        if !added {
            log::debug!("Obstacle {id} already registered");
        }
        added
    }

    pub fn unregister(&mut self, id: EntityId) -> Option<Obstacle> {
        self.obstacles.remove(id)
    }

    /// Move a dynamic obstacle; unknown ids are ignored
    pub fn reposition(&mut self, id: EntityId, center: Vec3) -> bool {
        match self.obstacles.get_mut(id) {
            Some(obstacle) => {
                obstacle.center = center;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&Obstacle> {
        self.obstacles.get(id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.obstacles.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter()
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn any_overlap(&self, query: &QueryShape) -> bool {
        self.iter().any(|o| o.overlaps(query))
    }

    /// Obstacles overlapping `query`, in registration order
    pub fn overlapping(&self, query: &QueryShape) -> impl Iterator<Item = &Obstacle> + use<'_> {
        let query = *query;
        self.iter().filter(move |o| o.overlaps(&query))
    }

    /// First overlapping obstacle in registration order
    pub fn first_overlapping(&self, query: &QueryShape) -> Option<&Obstacle> {
        self.overlapping(query).next()
    }

    /// First overlapping obstacle that is not a hittable wrapper
    pub fn first_blocking(&self, query: &QueryShape) -> Option<&Obstacle> {
        self.overlapping(query).find(|o| !o.is_hittable())
    }

    /// First overlapping hittable wrapper whose target can currently be hit
    ///
    /// Wrappers whose target has already been unregistered count as nothing.
    pub fn first_hittable(
        &self,
        query: &QueryShape,
        detector: &TargetDetector,
    ) -> Option<(EntityId, EntityId)> {
        self.iter().find_map(|obstacle| {
            let ObstacleKind::Hittable { target } = obstacle.kind else {
                return None;
            };
            let eligible = detector
                .get(target)
                .is_some_and(|t| t.can_be_hit() && t.is_active());
            (eligible && obstacle.overlaps(query)).then_some((obstacle.id, target))
        })
    }

    /// Normalized direction out of every overlapping obstacle
    pub fn push_out_direction(&self, query: &QueryShape) -> Vec3 {
        push_out_direction(query.center(), self.overlapping(query).map(|o| o.center))
    }
}
