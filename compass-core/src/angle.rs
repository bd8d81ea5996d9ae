//! Angle helpers shared by the governor, the interpolator and the decoders.
//!
//! All angles are in degrees unless the function name says otherwise.

/// Full turn in degrees
pub const FULL_TURN: f64 = 360.0;

/// Wrap an angle into `[0, 360)`.
///
/// Values already inside the range are returned unchanged (bit for bit).
pub fn normalize(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(FULL_TURN);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= FULL_TURN {
        0.0
    } else {
        wrapped
    }
}

/// Signed shortest rotation from `from` to `to`, in `(-180, 180]`.
///
/// `from + shortest_delta(from, to)` points in the same direction as `to`.
pub fn shortest_delta(from: f64, to: f64) -> f64 {
    let delta = (to - from).rem_euclid(FULL_TURN);
    if delta > FULL_TURN / 2.0 {
        delta - FULL_TURN
    } else {
        delta
    }
}

/// Absolute angular distance between two headings, in `[0, 180]`.
pub fn distance(a: f64, b: f64) -> f64 {
    shortest_delta(a, b).abs()
}

/// Convert an azimuth in radians (any range) to a heading in `[0, 360)`.
pub fn heading_from_radians(azimuth: f64) -> f64 {
    normalize(azimuth.to_degrees())
}

/// True for a finite heading inside `[0, 360)`.
pub fn is_valid_heading(heading: f64) -> bool {
    heading.is_finite() && (0.0..FULL_TURN).contains(&heading)
}
