use geomark_core::{
    AlertDispatcher, AlertError, AlertQueue, AlertSink, DeliveryPath, FixOutcome, LocationError,
    LocationFix, ManualClock, Marker, NotificationDeduplicator, ProximityAlert, ProximityConfig,
    ProximityTracker, TrackingStatus, EARTH_RADIUS_M,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const MARKER_LAT: f64 = 58.0105;
const MARKER_LON: f64 = 56.2502;

struct FailingSink {
    attempts: AtomicUsize,
}

impl FailingSink {
    fn new() -> Self {
        Self {
            attempts: AtomicUsize::new(0),
        }
    }
}

impl AlertSink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    fn deliver(&self, _alert: &ProximityAlert) -> Result<(), AlertError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AlertError::PermissionDenied)
    }
}

struct Harness {
    clock: Arc<ManualClock>,
    queue: Arc<AlertQueue>,
    tracker: ProximityTracker,
}

fn harness(dispatcher_for: impl FnOnce(Arc<AlertQueue>) -> AlertDispatcher) -> Harness {
    let config = ProximityConfig::default();
    let clock = Arc::new(ManualClock::new(0));
    let dedup = Arc::new(NotificationDeduplicator::with_clock(
        config.cooldown_ms,
        clock.clone(),
    ));
    let queue = Arc::new(AlertQueue::new());
    let dispatcher = dispatcher_for(Arc::clone(&queue));
    Harness {
        clock,
        queue,
        tracker: ProximityTracker::with_deduplicator(config, dedup, dispatcher),
    }
}

fn queue_harness() -> Harness {
    harness(|queue| AlertDispatcher::new(queue))
}

fn marker() -> Marker {
    Marker::new(1, MARKER_LAT, MARKER_LON).with_title("Bakery")
}

fn north_of(fix: &LocationFix, meters: f64) -> LocationFix {
    LocationFix::new(
        fix.latitude + (meters / EARTH_RADIUS_M).to_degrees(),
        fix.longitude,
    )
}

fn alerted(outcome: &FixOutcome) -> Vec<i64> {
    match outcome {
        FixOutcome::Evaluated { alerted, .. } => alerted.clone(),
        other => panic!("expected evaluation, got {other:?}"),
    }
}

#[test]
fn nearby_fix_alerts_once_and_repeat_fix_is_suppressed() {
    let mut h = queue_harness();
    let markers = vec![marker()];
    let fix = LocationFix::new(58.01051, 56.25021);

    let first = h.tracker.handle_fix(fix, &markers);
    assert_eq!(alerted(&first), vec![1]);
    let delivered = h.queue.drain();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].marker_id, 1);
    assert_eq!(delivered[0].body, "You approached \"Bakery\"");

    h.clock.advance(1_000);
    let second = h.tracker.handle_fix(fix, &markers);
    assert!(matches!(second, FixOutcome::Skipped { .. }));
    assert!(h.queue.is_empty());

    let forced = h.tracker.force_check(&markers).expect("fix is known");
    match forced {
        FixOutcome::Evaluated { nearby, alerted } => {
            assert_eq!(nearby.len(), 1);
            assert!(!nearby[0].alert);
            assert!(alerted.is_empty());
        }
        other => panic!("expected evaluation, got {other:?}"),
    }
    assert!(h.queue.is_empty());
}

#[test]
fn staying_in_range_realerts_after_cooldown() {
    let mut h = queue_harness();
    let markers = vec![marker()];
    let start = LocationFix::new(MARKER_LAT, MARKER_LON);

    assert_eq!(alerted(&h.tracker.handle_fix(start, &markers)), vec![1]);

    h.clock.set(10_000);
    let moved = north_of(&start, 5.0);
    assert!(alerted(&h.tracker.handle_fix(moved, &markers)).is_empty());

    h.clock.set(31_000);
    let moved_again = north_of(&start, 10.0);
    assert_eq!(alerted(&h.tracker.handle_fix(moved_again, &markers)), vec![1]);
    assert_eq!(h.queue.drain().len(), 2);
}

#[test]
fn skipped_fix_does_not_advance_last_checked() {
    let mut h = queue_harness();
    let start = LocationFix::new(MARKER_LAT, MARKER_LON);
    h.tracker.handle_fix(start, &[]);

    let small = north_of(&start, 1.2);
    match h.tracker.handle_fix(small, &[]) {
        FixOutcome::Skipped { moved_m } => assert!((moved_m - 1.2).abs() < 1e-6),
        other => panic!("expected skip, got {other:?}"),
    }
    assert_eq!(h.tracker.last_checked(), Some(&start));
    assert_eq!(h.tracker.last_known(), Some(&small));

    // Two small steps add up past the minimum relative to the last checked fix.
    let second_small = north_of(&start, 2.4);
    assert!(matches!(
        h.tracker.handle_fix(second_small, &[]),
        FixOutcome::Evaluated { .. }
    ));
}

#[test]
fn invalid_fix_is_rejected_without_side_effects() {
    let mut h = queue_harness();
    let outcome = h
        .tracker
        .handle_fix(LocationFix::new(f64::NAN, 56.0), &[marker()]);
    assert_eq!(outcome, FixOutcome::Rejected);
    assert_eq!(h.tracker.last_known(), None);
    assert_eq!(h.tracker.status(), &TrackingStatus::Starting);

    let outcome = h.tracker.handle_fix(LocationFix::new(91.0, 0.0), &[marker()]);
    assert_eq!(outcome, FixOutcome::Rejected);
}

#[test]
fn location_errors_are_recoverable() {
    let mut h = queue_harness();
    assert!(h.tracker.force_check(&[marker()]).is_err());

    h.tracker.handle_location_error(LocationError::PermissionDenied);
    assert_eq!(
        h.tracker.status(),
        &TrackingStatus::Unavailable(LocationError::PermissionDenied)
    );

    h.tracker
        .handle_fix(LocationFix::new(MARKER_LAT, MARKER_LON), &[marker()]);
    assert_eq!(h.tracker.status(), &TrackingStatus::Active);
}

#[test]
fn fallback_sink_delivers_and_keeps_record() {
    let failing = Arc::new(FailingSink::new());
    let primary = Arc::clone(&failing);
    let mut h = harness(move |queue| AlertDispatcher::new(primary).with_fallback(queue));
    let markers = vec![marker()];

    let outcome = h
        .tracker
        .handle_fix(LocationFix::new(MARKER_LAT, MARKER_LON), &markers);
    assert_eq!(alerted(&outcome), vec![1]);
    assert_eq!(failing.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(h.queue.len(), 1);
    assert_eq!(h.tracker.deduplicator().last_notified_at(1), Some(0));
}

#[test]
fn undelivered_alert_clears_record_for_retry() {
    let failing = Arc::new(FailingSink::new());
    let primary = Arc::clone(&failing);
    let mut h = harness(move |_queue| AlertDispatcher::new(primary));
    let markers = vec![marker()];

    let outcome = h
        .tracker
        .handle_fix(LocationFix::new(MARKER_LAT, MARKER_LON), &markers);
    assert!(alerted(&outcome).is_empty());
    assert_eq!(h.tracker.deduplicator().last_notified_at(1), None);

    h.tracker.force_check(&markers).expect("fix is known");
    assert_eq!(failing.attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn removing_marker_clears_its_cooldown() {
    let mut h = queue_harness();
    let markers = vec![marker()];
    h.tracker
        .handle_fix(LocationFix::new(MARKER_LAT, MARKER_LON), &markers);

    h.tracker.on_marker_removed(1);
    let outcome = h.tracker.force_check(&markers).expect("fix is known");
    assert_eq!(alerted(&outcome), vec![1]);

    h.tracker.clear_all_notifications();
    assert!(h.tracker.deduplicator().is_empty());
}

#[test]
fn test_alert_follows_cooldown() {
    let h = queue_harness();
    assert_eq!(h.tracker.send_test_alert(), Ok(Some(DeliveryPath::Primary)));

    h.clock.set(10_000);
    assert_eq!(h.tracker.send_test_alert(), Ok(None));

    let delivered = h.queue.drain();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].marker_id, 999);
    assert_eq!(delivered[0].body, "You approached \"Test marker\"");

    h.clock.set(31_000);
    assert_eq!(h.tracker.send_test_alert(), Ok(Some(DeliveryPath::Primary)));
}

#[test]
fn undelivered_test_alert_can_be_retried() {
    let failing = Arc::new(FailingSink::new());
    let primary = Arc::clone(&failing);
    let h = harness(move |_queue| AlertDispatcher::new(primary));

    assert_eq!(
        h.tracker.send_test_alert(),
        Err(AlertError::PermissionDenied)
    );
    assert_eq!(h.tracker.deduplicator().last_notified_at(999), None);
    assert!(h.tracker.send_test_alert().is_err());
    assert_eq!(failing.attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn reconfigure_keeps_last_known_fix_and_status() {
    let mut h = queue_harness();
    let fix = LocationFix::new(MARKER_LAT, MARKER_LON);
    let markers = vec![Marker::new(2, north_of(&fix, 300.0).latitude, MARKER_LON)];
    h.tracker.handle_fix(fix, &markers);

    let wide = ProximityConfig {
        threshold_m: 500.0,
        ..ProximityConfig::default()
    };
    h.tracker.reconfigure(wide).expect("valid config");
    assert_eq!(h.tracker.status(), &TrackingStatus::Active);
    assert_eq!(h.tracker.last_known(), Some(&fix));
    assert_eq!(h.tracker.last_checked(), None);
    assert_eq!(h.tracker.config().threshold_m, 500.0);

    let outcome = h
        .tracker
        .force_check(&markers)
        .expect("fix survives reconfigure");
    assert_eq!(alerted(&outcome), vec![2]);

    // Same fix again: last checked was reset, so the filter lets it through.
    h.tracker.reconfigure(wide).expect("valid config");
    assert!(matches!(
        h.tracker.handle_fix(fix, &markers),
        FixOutcome::Evaluated { .. }
    ));
}

#[test]
fn reconfigure_resets_cooldowns_on_the_injected_clock() {
    let mut h = queue_harness();
    let markers = vec![marker()];
    h.tracker
        .handle_fix(LocationFix::new(MARKER_LAT, MARKER_LON), &markers);

    let slow = ProximityConfig {
        cooldown_ms: 60_000,
        ..ProximityConfig::default()
    };
    h.tracker.reconfigure(slow).expect("valid config");
    assert!(h.tracker.deduplicator().is_empty());
    assert_eq!(h.tracker.deduplicator().cooldown_ms(), 60_000);

    h.clock.set(5_000);
    assert_eq!(alerted(&h.tracker.force_check(&markers).unwrap()), vec![1]);
    assert_eq!(h.tracker.deduplicator().last_notified_at(1), Some(5_000));
}

#[test]
fn reconfigure_rejects_invalid_config_without_changes() {
    let mut h = queue_harness();
    let bad = ProximityConfig {
        min_movement_m: f64::NAN,
        ..ProximityConfig::default()
    };
    assert!(h.tracker.reconfigure(bad).is_err());
    assert_eq!(h.tracker.config(), &ProximityConfig::default());
}

#[test]
fn evaluate_reports_alert_flags_without_dispatching() {
    let h = queue_harness();
    let markers = vec![marker()];
    let fix = LocationFix::new(MARKER_LAT, MARKER_LON);

    let first = h.tracker.evaluate(&fix, &markers);
    assert_eq!(first.len(), 1);
    assert!(first[0].alert);
    assert!(h.queue.is_empty());

    let second = h.tracker.evaluate(&fix, &markers);
    assert!(!second[0].alert);
}
