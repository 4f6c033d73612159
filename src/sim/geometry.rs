//! Ground-plane collision geometry
//!
//! Everything here works on the XZ plane. Y is carried along for positions
//! but never separates two shapes.

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::consts::{DEGENERATE_SQ, MIN_EXTENT};
use crate::{forward_from_yaw, ground, right_from_yaw};

/// Clamp a radius or half extent to something usable
#[inline]
pub fn sanitize_extent(value: f32) -> f32 {
    if value.is_finite() {
        value.max(MIN_EXTENT)
    } else {
        MIN_EXTENT
    }
}

/// Normalize a ground-projected vector, zero if it is too short to trust
#[inline]
pub fn ground_direction(v: Vec3) -> Vec3 {
    let g = ground(v);
    if g.length_squared() <= DEGENERATE_SQ {
        Vec3::ZERO
    } else {
        g.normalize_or_zero()
    }
}

/// A box on the ground plane, rotated around +Y
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientedRect {
    pub center: Vec3,
    /// Half size along local X and local Z
    pub half_extents: Vec2,
    /// Rotation around +Y (radians, 0 = axis aligned)
    pub yaw: f32,
}

impl OrientedRect {
    pub fn new(center: Vec3, half_extents: Vec2, yaw: f32) -> Self {
        Self {
            center,
            half_extents: Vec2::new(
                sanitize_extent(half_extents.x),
                sanitize_extent(half_extents.y),
            ),
            yaw: if yaw.is_finite() { yaw } else { 0.0 },
        }
    }

    /// Build from a full size (x, z) instead of half extents
    pub fn from_size(center: Vec3, size: Vec2, yaw: f32) -> Self {
        Self::new(center, size * 0.5, yaw)
    }

    #[inline]
    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw)
    }

    /// Local X and local Z axes in world space
    #[inline]
    pub fn axes(&self) -> [Vec3; 2] {
        [right_from_yaw(self.yaw), forward_from_yaw(self.yaw)]
    }

    /// The four ground corners, counter-clockwise starting at (-x, -z)
    pub fn corners(&self) -> [Vec3; 4] {
        let rot = self.rotation();
        let h = self.half_extents;
        [
            self.center + rot * Vec3::new(-h.x, 0.0, -h.y),
            self.center + rot * Vec3::new(h.x, 0.0, -h.y),
            self.center + rot * Vec3::new(h.x, 0.0, h.y),
            self.center + rot * Vec3::new(-h.x, 0.0, h.y),
        ]
    }

    /// World point into this rect's local frame
    #[inline]
    pub fn to_local(&self, point: Vec3) -> Vec3 {
        self.rotation().inverse() * (point - self.center)
    }

    /// Radius of the circle enclosing the larger half extent
    #[inline]
    pub fn bounding_radius(&self) -> f32 {
        self.half_extents.x.max(self.half_extents.y)
    }

    /// Project all corners onto an axis, returning (min, max)
    fn project(&self, axis: Vec3) -> (f32, f32) {
        let corners = self.corners();
        let first = corners[0].dot(axis);
        corners[1..]
            .iter()
            .map(|c| c.dot(axis))
            .fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)))
    }
}

/// Shape used to ask "what do I hit here?"
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryShape {
    Circle { center: Vec3, radius: f32 },
    Rect(OrientedRect),
}

impl QueryShape {
    pub fn circle(center: Vec3, radius: f32) -> Self {
        QueryShape::Circle {
            center,
            radius: sanitize_extent(radius),
        }
    }

    pub fn center(&self) -> Vec3 {
        match self {
            QueryShape::Circle { center, .. } => *center,
            QueryShape::Rect(rect) => rect.center,
        }
    }

    /// Radius used when the other side is a circle and we are a box
    pub fn bounding_radius(&self) -> f32 {
        match self {
            QueryShape::Circle { radius, .. } => *radius,
            QueryShape::Rect(rect) => rect.bounding_radius(),
        }
    }
}

/// Circle vs circle on the ground plane (no square root)
#[inline]
pub fn circles_overlap(a: Vec3, radius_a: f32, b: Vec3, radius_b: f32) -> bool {
    let total = radius_a + radius_b;
    ground(a - b).length_squared() <= total * total
}

/// Closest point inside a rect, in the rect's local frame
#[inline]
pub fn closest_point_in_rect(local: Vec3, half_extents: Vec2) -> Vec3 {
    Vec3::new(
        local.x.clamp(-half_extents.x, half_extents.x),
        local.y,
        local.z.clamp(-half_extents.y, half_extents.y),
    )
}

/// Circle vs oriented rect on the ground plane
pub fn circle_rect_overlap(center: Vec3, radius: f32, rect: &OrientedRect) -> bool {
    let local = rect.to_local(center);
    let closest = closest_point_in_rect(local, rect.half_extents);
    ground(local - closest).length_squared() <= radius * radius
}

/// Separating axis test between two oriented rects
///
/// Only the four face normals (two per box) are candidate axes, which is
/// sufficient for rectangles.
pub fn rects_overlap(a: &OrientedRect, b: &OrientedRect) -> bool {
    let [ax, az] = a.axes();
    let [bx, bz] = b.axes();

    for axis in [ax, az, bx, bz] {
        let axis = ground(axis).normalize_or_zero();
        if axis == Vec3::ZERO {
            continue;
        }
        let (min1, max1) = a.project(axis);
        let (min2, max2) = b.project(axis);
        if max1 < min2 || max2 < min1 {
            return false;
        }
    }

    true
}

/// Accumulated direction that moves `query_center` away from every overlapping center
///
/// Each contribution is normalized first so a deep overlap does not outvote a
/// shallow one.
pub fn push_out_direction<I>(query_center: Vec3, overlapping_centers: I) -> Vec3
where
    I: IntoIterator<Item = Vec3>,
{
    let total = overlapping_centers
        .into_iter()
        .map(|center| ground(query_center - center))
        .filter(|push| push.length_squared() > DEGENERATE_SQ)
        .fold(Vec3::ZERO, |acc, push| acc + push.normalize_or_zero());

    ground_direction(total)
}
