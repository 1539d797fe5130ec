//! Plane-set culling volume with hierarchical plane masks.
//!
//! A [`PlaneMask`] records which planes a volume still straddles. When a
//! parent is fully inside some planes, its children skip those planes; a
//! parent fully inside every plane lets its whole subtree skip the test.

use glam::DVec3;

use crate::bounds::BoundingVolume;

/// Result of testing a volume against a plane or a culling volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intersection {
    /// The volume is entirely inside.
    Inside,
    /// The volume is entirely outside.
    Outside,
    /// The volume straddles one or more planes.
    Intersecting,
}

/// A plane: `normal.dot(point) + distance >= 0` is the inside half-space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal pointing toward the inside.
    pub normal: DVec3,
    /// Signed distance term.
    pub distance: f64,
}

impl Plane {
    /// Create a plane from a normal and a distance term.
    pub fn new(normal: DVec3, distance: f64) -> Self {
        Self { normal, distance }
    }

    /// Plane through `point` with the given inward `normal`.
    pub fn from_point_normal(point: DVec3, normal: DVec3) -> Self {
        let normal = normal.normalize();
        Self {
            normal,
            distance: -normal.dot(point),
        }
    }

    /// Signed distance of `point`; positive inside.
    pub fn signed_distance(&self, point: DVec3) -> f64 {
        self.normal.dot(point) + self.distance
    }
}

/// Bit set of planes a volume straddles.
///
/// Bit `k` set means plane `k` must still be tested. Only the first 31
/// planes get a bit; later planes are always tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaneMask(pub u32);

impl PlaneMask {
    /// Fully inside every plane.
    pub const INSIDE: Self = Self(0);
    /// Fully outside at least one plane.
    pub const OUTSIDE: Self = Self(0xffff_ffff);
    /// Unknown; every plane must be tested.
    pub const INDETERMINATE: Self = Self(0x7fff_ffff);

    /// Bit for plane `index`, or 0 when the plane has no bit.
    pub fn bit(index: usize) -> u32 {
        if index < 31 { 1 << index } else { 0 }
    }

    /// Collapse the mask into an [`Intersection`].
    pub fn intersection(self) -> Intersection {
        match self {
            Self::INSIDE => Intersection::Inside,
            Self::OUTSIDE => Intersection::Outside,
            _ => Intersection::Intersecting,
        }
    }
}

impl Default for PlaneMask {
    fn default() -> Self {
        Self::INDETERMINATE
    }
}

/// A convex volume bounded by inward-facing planes, typically a view frustum.
#[derive(Debug, Clone, Default)]
pub struct CullingVolume {
    planes: Vec<Plane>,
}

impl CullingVolume {
    /// Create a culling volume from a set of planes.
    pub fn new(planes: Vec<Plane>) -> Self {
        Self { planes }
    }

    /// The planes bounding this volume.
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// Test a volume against every plane.
    pub fn visibility(&self, volume: &BoundingVolume) -> Intersection {
        let mut intersecting = false;
        for plane in &self.planes {
            match volume.intersect_plane(plane) {
                Intersection::Outside => return Intersection::Outside,
                Intersection::Intersecting => intersecting = true,
                Intersection::Inside => {}
            }
        }
        if intersecting {
            Intersection::Intersecting
        } else {
            Intersection::Inside
        }
    }

    /// Test a volume, skipping planes the parent was already fully inside.
    ///
    /// A parent mask of [`PlaneMask::INSIDE`] or [`PlaneMask::OUTSIDE`] is
    /// returned unchanged.
    pub fn visibility_with_plane_mask(
        &self,
        volume: &BoundingVolume,
        parent_mask: PlaneMask,
    ) -> PlaneMask {
        if parent_mask == PlaneMask::INSIDE || parent_mask == PlaneMask::OUTSIDE {
            return parent_mask;
        }

        let mut mask = PlaneMask::INSIDE.0;
        for (index, plane) in self.planes.iter().enumerate() {
            let bit = PlaneMask::bit(index);
            if index < 31 && parent_mask.0 & bit == 0 {
                continue;
            }
            match volume.intersect_plane(plane) {
                Intersection::Outside => return PlaneMask::OUTSIDE,
                Intersection::Intersecting => mask |= bit,
                Intersection::Inside => {}
            }
        }
        PlaneMask(mask)
    }
}
