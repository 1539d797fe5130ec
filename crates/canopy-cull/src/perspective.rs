//! Perspective frustum: culling planes and the screen-space-error denominator.

use glam::DVec3;

use crate::culling_volume::{CullingVolume, Plane};

/// Symmetric perspective frustum parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perspective {
    /// Vertical field of view in radians.
    pub fov_y: f64,
    /// Width / height.
    pub aspect_ratio: f64,
    /// Near clip plane distance (positive).
    pub near: f64,
    /// Far clip plane distance (positive, > near).
    pub far: f64,
}

impl Perspective {
    /// Create a new perspective frustum.
    pub fn new(fov_y: f64, aspect_ratio: f64, near: f64, far: f64) -> Self {
        Self {
            fov_y,
            aspect_ratio,
            near,
            far,
        }
    }

    /// Denominator turning a world-space error at unit distance into pixels:
    /// `2 * tan(fov_y / 2)`.
    pub fn sse_denominator(&self) -> f64 {
        2.0 * (self.fov_y * 0.5).tan()
    }

    /// Build the six inward-facing frustum planes for a camera at `position`
    /// looking along `direction` with the given `up` hint.
    ///
    /// Planes are ordered left, right, bottom, top, near, far.
    pub fn culling_volume(&self, position: DVec3, direction: DVec3, up: DVec3) -> CullingVolume {
        let direction = direction.normalize();
        let right = direction.cross(up).normalize();
        let up = right.cross(direction);

        let top = (self.fov_y * 0.5).tan() * self.near;
        let side = self.aspect_ratio * top;

        let to_left = direction * self.near - right * side;
        let to_right = direction * self.near + right * side;
        let to_bottom = direction * self.near - up * top;
        let to_top = direction * self.near + up * top;

        let near_point = position + direction * self.near;
        let far_point = position + direction * self.far;

        CullingVolume::new(vec![
            Plane::from_point_normal(position, to_left.cross(up)),
            Plane::from_point_normal(position, up.cross(to_right)),
            Plane::from_point_normal(position, right.cross(to_bottom)),
            Plane::from_point_normal(position, to_top.cross(right)),
            Plane::from_point_normal(near_point, direction),
            Plane::from_point_normal(far_point, -direction),
        ])
    }
}
