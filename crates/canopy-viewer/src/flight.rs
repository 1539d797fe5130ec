//! Scripted camera approach toward a tileset.

use glam::DVec3;

/// Closest start distance used when the tileset reports no geometric error.
const MIN_START_DISTANCE: f64 = 100.0;

/// How many times closer the camera ends up than where it starts.
const APPROACH_RATIO: f64 = 256.0;

/// Straight-line flight along +Z toward a target, looking down -Z.
///
/// Distance shrinks geometrically so every frame covers a similar change in
/// projected error.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlightPath {
    pub target: DVec3,
    pub start_distance: f64,
    pub end_distance: f64,
    pub frames: u32,
}

impl FlightPath {
    /// Start where the tileset-wide error projects to a quarter of the budget.
    pub fn toward(
        target: DVec3,
        geometric_error: f64,
        viewport_height: f64,
        sse_denominator: f64,
        maximum_screen_space_error: f64,
        near: f64,
        frames: u32,
    ) -> Self {
        let budget_distance =
            geometric_error * viewport_height / (sse_denominator * maximum_screen_space_error);
        let start_distance = (budget_distance * 4.0).max(MIN_START_DISTANCE);
        let end_distance = (start_distance / APPROACH_RATIO).max(near * 2.0);
        Self {
            target,
            start_distance,
            end_distance,
            frames,
        }
    }

    pub fn direction(&self) -> DVec3 {
        DVec3::NEG_Z
    }

    pub fn up(&self) -> DVec3 {
        DVec3::Y
    }

    /// Distance from the target at `frame`, clamped to the last frame.
    pub fn distance_at(&self, frame: u32) -> f64 {
        let last = self.frames.saturating_sub(1).max(1);
        let t = f64::from(frame.min(last)) / f64::from(last);
        self.start_distance * (self.end_distance / self.start_distance).powf(t)
    }

    pub fn position_at(&self, frame: u32) -> DVec3 {
        self.target + DVec3::Z * self.distance_at(frame)
    }
}
