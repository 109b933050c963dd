use geomark_core::{
    markers_within, LocationFix, ManualClock, Marker, NotificationDeduplicator,
    ProximityEvaluator, EARTH_RADIUS_M,
};
use std::sync::Arc;

const FIX_LAT: f64 = 58.0105;
const FIX_LON: f64 = 56.2502;

/// Latitude `meters` north of `lat` along a meridian.
fn north_of(lat: f64, meters: f64) -> f64 {
    lat + (meters / EARTH_RADIUS_M).to_degrees()
}

fn evaluator(threshold_m: f64) -> ProximityEvaluator {
    let clock = Arc::new(ManualClock::new(0));
    let dedup = Arc::new(NotificationDeduplicator::with_clock(30_000, clock));
    ProximityEvaluator::new(threshold_m, dedup)
}

#[test]
fn includes_marker_just_inside_and_excludes_just_outside() {
    let fix = LocationFix::new(FIX_LAT, FIX_LON);
    let markers = vec![
        Marker::new(1, north_of(FIX_LAT, 19.9), FIX_LON),
        Marker::new(2, north_of(FIX_LAT, 20.1), FIX_LON),
    ];

    let nearby = evaluator(20.0).evaluate(&fix, &markers);
    assert_eq!(nearby.len(), 1);
    assert_eq!(nearby[0].marker.id, 1);
    assert!((nearby[0].distance_m - 19.9).abs() < 1e-6);
}

#[test]
fn threshold_is_configurable() {
    let fix = LocationFix::new(FIX_LAT, FIX_LON);
    let markers = vec![Marker::new(1, north_of(FIX_LAT, 35.0), FIX_LON)];

    assert!(evaluator(20.0).evaluate(&fix, &markers).is_empty());
    assert_eq!(evaluator(50.0).evaluate(&fix, &markers).len(), 1);
}

#[test]
fn result_order_follows_input_order() {
    let fix = LocationFix::new(FIX_LAT, FIX_LON);
    let markers = vec![
        Marker::new(30, north_of(FIX_LAT, 15.0), FIX_LON),
        Marker::new(10, north_of(FIX_LAT, 500.0), FIX_LON),
        Marker::new(20, north_of(FIX_LAT, 1.0), FIX_LON),
        Marker::new(40, north_of(FIX_LAT, 5.0), FIX_LON),
    ];

    let ids = markers_within(&fix, &markers, 20.0)
        .into_iter()
        .map(|(marker, _)| marker.id)
        .collect::<Vec<_>>();
    assert_eq!(ids, vec![30, 20, 40]);
}

#[test]
fn non_finite_marker_is_never_near() {
    let fix = LocationFix::new(FIX_LAT, FIX_LON);
    let markers = vec![
        Marker::new(1, f64::NAN, FIX_LON),
        Marker::new(2, FIX_LAT, FIX_LON),
    ];

    let nearby = markers_within(&fix, &markers, f64::INFINITY);
    assert_eq!(nearby.len(), 1);
    assert_eq!(nearby[0].0.id, 2);
}

#[test]
fn empty_marker_list_yields_nothing() {
    let fix = LocationFix::new(FIX_LAT, FIX_LON);
    assert!(evaluator(20.0).evaluate(&fix, &[]).is_empty());
}

#[test]
fn every_nearby_marker_consults_the_deduplicator() {
    let fix = LocationFix::new(FIX_LAT, FIX_LON);
    let markers = vec![
        Marker::new(1, FIX_LAT, FIX_LON),
        Marker::new(2, north_of(FIX_LAT, 3.0), FIX_LON),
    ];
    let evaluator = evaluator(20.0);

    let first = evaluator.evaluate(&fix, &markers);
    assert!(first.iter().all(|hit| hit.alert));
    assert!(evaluator.deduplicator().last_notified_at(1).is_some());
    assert!(evaluator.deduplicator().last_notified_at(2).is_some());

    let second = evaluator.evaluate(&fix, &markers);
    assert_eq!(second.len(), 2);
    assert!(second.iter().all(|hit| !hit.alert));
}
