//! Bounding volumes in f64 world space.

use glam::DVec3;

use crate::culling_volume::{Intersection, Plane};

/// World-aligned box in double precision, used for tile culling and distance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Corner with the smallest coordinate on every axis.
    pub min: DVec3,
    /// Corner with the largest coordinate on every axis.
    pub max: DVec3,
}

impl Aabb {
    /// Box spanning `min` to `max`. The corners are not reordered.
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Smallest AABB enclosing an oriented box given by its center and
    /// three half-axis vectors.
    pub fn from_oriented(center: DVec3, half_axes: [DVec3; 3]) -> Self {
        let extents = half_axes[0].abs() + half_axes[1].abs() + half_axes[2].abs();
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Midpoint of the two corners.
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Half the box size per axis; the projected radius is built from this.
    pub fn extents(&self) -> DVec3 {
        (self.max - self.min) * 0.5
    }

    /// Distance from `point` to the closest point of the box; 0 inside.
    pub fn distance_to(&self, point: DVec3) -> f64 {
        let closest = point.clamp(self.min, self.max);
        point.distance(closest)
    }

    /// Classify the box against a plane using its projected radius.
    pub fn intersect_plane(&self, plane: &Plane) -> Intersection {
        let center = self.center();
        let extents = self.extents();
        let radius = extents.dot(plane.normal.abs());
        classify(plane.signed_distance(center), radius)
    }
}

/// A bounding sphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingSphere {
    /// Sphere center.
    pub center: DVec3,
    /// Sphere radius (non-negative).
    pub radius: f64,
}

impl BoundingSphere {
    /// Create a new bounding sphere.
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Distance from `point` to the sphere surface; 0 inside.
    pub fn distance_to(&self, point: DVec3) -> f64 {
        (point.distance(self.center) - self.radius).max(0.0)
    }

    /// Classify the sphere against a plane.
    pub fn intersect_plane(&self, plane: &Plane) -> Intersection {
        classify(plane.signed_distance(self.center), self.radius)
    }
}

fn classify(signed_distance: f64, radius: f64) -> Intersection {
    if signed_distance < -radius {
        Intersection::Outside
    } else if signed_distance < radius {
        Intersection::Intersecting
    } else {
        Intersection::Inside
    }
}

/// Culling primitive attached to a tile or to its content.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BoundingVolume {
    /// Axis-aligned box.
    Aabb(Aabb),
    /// Sphere.
    Sphere(BoundingSphere),
}

impl BoundingVolume {
    /// Distance from `point` to the volume; 0 when the point is inside.
    pub fn distance_to(&self, point: DVec3) -> f64 {
        match self {
            Self::Aabb(aabb) => aabb.distance_to(point),
            Self::Sphere(sphere) => sphere.distance_to(point),
        }
    }

    /// Classify the volume against a single plane.
    pub fn intersect_plane(&self, plane: &Plane) -> Intersection {
        match self {
            Self::Aabb(aabb) => aabb.intersect_plane(plane),
            Self::Sphere(sphere) => sphere.intersect_plane(plane),
        }
    }

    /// Center of the volume.
    pub fn center(&self) -> DVec3 {
        match self {
            Self::Aabb(aabb) => aabb.center(),
            Self::Sphere(sphere) => sphere.center,
        }
    }
}

impl From<Aabb> for BoundingVolume {
    fn from(aabb: Aabb) -> Self {
        Self::Aabb(aabb)
    }
}

impl From<BoundingSphere> for BoundingVolume {
    fn from(sphere: BoundingSphere) -> Self {
        Self::Sphere(sphere)
    }
}
