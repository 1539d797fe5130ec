//! Culling primitives for hierarchical tile traversal.
//!
//! Bounding volumes, a plane-set culling volume with inheritable plane masks,
//! and a perspective frustum that produces both the culling volume and the
//! screen-space-error denominator consumed by the tile selector.

mod bounds;
mod culling_volume;
mod perspective;

pub use bounds::{Aabb, BoundingSphere, BoundingVolume};
pub use culling_volume::{CullingVolume, Intersection, Plane, PlaneMask};
pub use perspective::Perspective;
