//! Location update filter.

use crate::geo::distance::haversine_distance;
use crate::model::location::LocationFix;

/// Returns whether `current` should trigger a new proximity evaluation.
///
/// # Contract
/// - `last_checked == None` (first fix): `true`.
/// - Otherwise: `distance(last_checked, current) >= min_movement_m`.
/// - Pure; the caller owns and updates the last-checked fix.
pub fn is_significant_move(
    last_checked: Option<&LocationFix>,
    current: &LocationFix,
    min_movement_m: f64,
) -> bool {
    let Some(last) = last_checked else {
        return true;
    };
    let moved = haversine_distance(
        last.latitude,
        last.longitude,
        current.latitude,
        current.longitude,
    );
    moved.is_finite() && moved >= min_movement_m
}
