//! Screen-space error: geometric error projected into viewport pixels.

/// Smallest distance used when the viewpoint is inside a tile's volume.
pub const MIN_DISTANCE: f64 = 1e-7;

/// Project `geometric_error` at `distance` into pixels.
///
/// Exact tiles (`geometric_error == 0`) never need refinement and return 0
/// regardless of distance.
#[must_use]
pub fn screen_space_error(
    geometric_error: f64,
    distance: f64,
    viewport_height: f64,
    sse_denominator: f64,
) -> f64 {
    if geometric_error == 0.0 {
        return 0.0;
    }

    let distance = distance.max(MIN_DISTANCE);
    (geometric_error * viewport_height) / (distance * sse_denominator)
}
