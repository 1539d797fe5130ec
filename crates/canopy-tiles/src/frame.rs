//! Per-frame view state supplied by the rendering collaborator.

use canopy_cull::{CullingVolume, Perspective};
use glam::DVec3;

/// Kind of pass the frame is rendered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pass {
    /// Normal color pass. Streaming work is allowed.
    Render,
    /// Hit-test pass with a narrowed frustum. No requests, hierarchy loads or
    /// processing happen during a pick.
    Pick,
}

/// Everything the selector needs to know about the current view.
#[derive(Clone, Debug)]
pub struct FrameState {
    /// Viewpoint in world space.
    pub camera_position: DVec3,
    /// Volume tiles are culled against.
    pub culling_volume: CullingVolume,
    /// Drawing buffer height in pixels.
    pub viewport_height: f64,
    /// Frustum-derived error denominator, see [`Perspective::sse_denominator`].
    pub sse_denominator: f64,
    /// Pass classification.
    pub pass: Pass,
}

impl FrameState {
    /// Build a frame for a perspective camera.
    pub fn from_perspective(
        perspective: &Perspective,
        position: DVec3,
        direction: DVec3,
        up: DVec3,
        viewport_height: f64,
        pass: Pass,
    ) -> Self {
        Self {
            camera_position: position,
            culling_volume: perspective.culling_volume(position, direction, up),
            viewport_height,
            sse_denominator: perspective.sse_denominator(),
            pass,
        }
    }

    /// Whether out-of-core operations (requests, hierarchy loads, processing)
    /// may run this frame.
    pub fn allows_out_of_core(&self) -> bool {
        self.pass == Pass::Render
    }
}
