//! Great-circle distance.
//!
//! # Invariants
//! - Output is non-negative and symmetric in its two points.
//! - Never panics; non-finite input yields a non-finite output.

/// Earth radius used by the haversine formula, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two points given in degrees.
///
/// Invalid input is not rejected here: a `NaN` coordinate produces `NaN`,
/// which every threshold comparison in this crate treats as "not near".
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    // Rounding can push this just past 1.0 for near-antipodal points.
    let half_chord = ((delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2))
    .clamp(0.0, 1.0);
    let angle = 2.0 * half_chord.sqrt().atan2((1.0 - half_chord).sqrt());

    EARTH_RADIUS_M * angle
}

/// Returns whether `distance_m` is a usable measurement within `limit_m`.
///
/// Non-finite distances always compare as outside the limit.
pub fn is_within(distance_m: f64, limit_m: f64) -> bool {
    distance_m.is_finite() && distance_m <= limit_m
}
