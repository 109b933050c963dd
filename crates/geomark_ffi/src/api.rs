//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level proximity calls to Dart via FRB.
//! - Own the single tracker session for the host process.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Fixes are handled one at a time; the session lock is the single-flight
//!   guard for overlapping platform callbacks.
//! - Alerts are returned to the host in the response that produced them.

use geomark_core::{
    core_version as core_version_inner, haversine_distance, init_logging as init_logging_inner,
    is_significant_move as is_significant_move_inner, markers_within, ping as ping_inner,
    AlertDispatcher, AlertQueue, FixOutcome, LocationError, LocationFix, LocationUpdatePolicy,
    Marker, NearbyMarker, ProximityAlert, ProximityConfig, ProximityTracker, TrackingStatus,
};
use log::{info, warn};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

static SESSION: OnceLock<Mutex<TrackerSession>> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Marker snapshot row sent by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerInput {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub title: Option<String>,
    /// Epoch milliseconds.
    pub created_at: Option<i64>,
}

/// One marker within the proximity threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyItem {
    pub marker_id: i64,
    pub title: String,
    pub distance_m: f64,
    /// True when this evaluation passed the cool-down gate for the marker.
    pub alert: bool,
}

/// Alert the host should present (native first, in-app on failure).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertItem {
    pub marker_id: i64,
    pub title: String,
    pub body: String,
}

/// Response envelope for fix handling.
#[derive(Debug, Clone, PartialEq)]
pub struct FixResponse {
    /// `rejected|skipped|evaluated|unavailable`.
    pub outcome: String,
    pub nearby: Vec<NearbyItem>,
    pub alerts: Vec<AlertItem>,
    /// Human-readable message for diagnostics/UI.
    pub message: String,
}

/// Subscription hints for the platform location source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationPolicyItem {
    pub time_interval_ms: u64,
    pub distance_interval_m: f64,
}

/// Replaces tracker thresholds; `None` keeps the current value.
///
/// # FFI contract
/// - Resets cool-down records and the last checked fix.
/// - Keeps markers, the last known fix and the tracking status, so
///   `force_check` still works right after a change.
/// - Returns empty string on success and error message on invalid input.
#[flutter_rust_bridge::frb(sync)]
pub fn configure_tracker(
    threshold_m: Option<f64>,
    min_movement_m: Option<f64>,
    cooldown_ms: Option<u64>,
) -> String {
    let mut session = session();
    let mut config = *session.tracker.config();
    if let Some(value) = threshold_m {
        config.threshold_m = value;
    }
    if let Some(value) = min_movement_m {
        config.min_movement_m = value;
    }
    if let Some(value) = cooldown_ms {
        config.cooldown_ms = value;
    }
    match session.reconfigure(config) {
        Ok(()) => String::new(),
        Err(err) => format!("configure_tracker failed: {err}"),
    }
}

/// Replaces the marker snapshot used by later evaluations.
///
/// # FFI contract
/// - All-or-nothing: one invalid marker rejects the whole snapshot.
/// - Cool-down records of markers missing from the new snapshot are cleared.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn sync_markers(markers: Vec<MarkerInput>) -> String {
    match session().replace_markers(markers) {
        Ok(()) => String::new(),
        Err(err) => format!("sync_markers failed: {err}"),
    }
}

/// Handles one platform location fix.
///
/// # FFI contract
/// - Sync call, CPU-only.
/// - Never panics.
/// - Returned `alerts` must be presented by the host.
#[flutter_rust_bridge::frb(sync)]
pub fn on_location_fix(
    latitude: f64,
    longitude: f64,
    accuracy: Option<f64>,
    timestamp: Option<i64>,
) -> FixResponse {
    let fix = LocationFix {
        latitude,
        longitude,
        accuracy,
        timestamp,
    };
    session().handle_fix(fix)
}

/// Re-evaluates the last known fix, ignoring the movement filter.
#[flutter_rust_bridge::frb(sync)]
pub fn force_check() -> FixResponse {
    session().force_check()
}

/// Reports a location failure (`permission_denied` or any other kind).
///
/// Returns the resulting tracking status label.
#[flutter_rust_bridge::frb(sync)]
pub fn report_location_error(kind: String, message: String) -> String {
    let mut session = session();
    session
        .tracker
        .handle_location_error(parse_location_error(kind.as_str(), message));
    status_label(session.tracker.status()).to_string()
}

/// Returns `starting|active|unavailable`.
#[flutter_rust_bridge::frb(sync)]
pub fn tracking_status() -> String {
    status_label(session().tracker.status()).to_string()
}

/// Lists synced markers within the threshold of a point, without alerting.
#[flutter_rust_bridge::frb(sync)]
pub fn nearby_markers(latitude: f64, longitude: f64) -> Vec<NearbyItem> {
    session().nearby(&LocationFix::new(latitude, longitude))
}

/// Evaluates synced markers around a point and reports which ones would alert.
///
/// # FFI contract
/// - Consults the cool-down gate: a flagged marker is stamped as alerted.
/// - Dispatches nothing; the host presents flagged markers itself.
#[flutter_rust_bridge::frb(sync)]
pub fn evaluate_proximity(latitude: f64, longitude: f64) -> Vec<NearbyItem> {
    session().evaluate(&LocationFix::new(latitude, longitude))
}

/// Movement filter over an optional previous point.
///
/// # FFI contract
/// - Both previous coordinates absent means no previous fix (always true).
/// - Only one of them present is malformed input and returns false.
#[flutter_rust_bridge::frb(sync)]
pub fn is_significant_move(
    last_latitude: Option<f64>,
    last_longitude: Option<f64>,
    latitude: f64,
    longitude: f64,
) -> bool {
    let last = match (last_latitude, last_longitude) {
        (Some(lat), Some(lon)) => Some(LocationFix::new(lat, lon)),
        (None, None) => None,
        _ => {
            warn!("event=movement_check module=ffi status=rejected reason=partial_last_point");
            return false;
        }
    };
    let min_movement_m = session().tracker.config().min_movement_m;
    is_significant_move_inner(
        last.as_ref(),
        &LocationFix::new(latitude, longitude),
        min_movement_m,
    )
}

/// Great-circle distance in meters.
#[flutter_rust_bridge::frb(sync)]
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    haversine_distance(lat1, lon1, lat2, lon2)
}

/// Atomic cool-down check-and-record for one marker.
#[flutter_rust_bridge::frb(sync)]
pub fn should_notify(marker_id: i64) -> bool {
    session().tracker.deduplicator().should_notify(marker_id)
}

/// Stamps one marker as alerted now.
#[flutter_rust_bridge::frb(sync)]
pub fn record_notified(marker_id: i64) {
    session().tracker.deduplicator().record_notified(marker_id);
}

#[flutter_rust_bridge::frb(sync)]
pub fn clear_notification(marker_id: i64) {
    session().tracker.clear_notification(marker_id);
}

#[flutter_rust_bridge::frb(sync)]
pub fn clear_all_notifications() {
    session().tracker.clear_all_notifications();
}

#[flutter_rust_bridge::frb(sync)]
pub fn location_update_policy() -> LocationPolicyItem {
    let policy = LocationUpdatePolicy::default();
    LocationPolicyItem {
        time_interval_ms: policy.time_interval_ms,
        distance_interval_m: policy.distance_interval_m,
    }
}

/// Produces the diagnostic alert for the fixed test marker.
///
/// # FFI contract
/// - Shares the cool-down gate: returns `None` while the test marker is
///   inside its window or when no sink delivered.
#[flutter_rust_bridge::frb(sync)]
pub fn test_alert() -> Option<AlertItem> {
    session().test_alert()
}

struct TrackerSession {
    tracker: ProximityTracker,
    alerts: Arc<AlertQueue>,
    markers: Vec<Marker>,
}

impl TrackerSession {
    fn new(config: ProximityConfig) -> Self {
        let alerts = Arc::new(AlertQueue::new());
        let dispatcher = AlertDispatcher::new(alerts.clone());
        Self {
            tracker: ProximityTracker::new(config, dispatcher),
            alerts,
            markers: Vec::new(),
        }
    }

    fn from_env() -> Self {
        let config = ProximityConfig::from_env().unwrap_or_else(|err| {
            warn!("event=session_init module=ffi status=fallback error={err}");
            ProximityConfig::default()
        });
        Self::new(config)
    }

    fn reconfigure(&mut self, config: ProximityConfig) -> Result<(), String> {
        self.tracker
            .reconfigure(config)
            .map_err(|err| err.to_string())?;
        info!(
            "event=session_configure module=ffi status=ok threshold_m={} min_movement_m={} cooldown_ms={}",
            config.threshold_m, config.min_movement_m, config.cooldown_ms
        );
        Ok(())
    }

    fn replace_markers(&mut self, inputs: Vec<MarkerInput>) -> Result<(), String> {
        let markers = inputs.into_iter().map(to_marker).collect::<Vec<_>>();
        for marker in &markers {
            marker.validate().map_err(|err| err.to_string())?;
        }

        let kept = markers.iter().map(|marker| marker.id).collect::<HashSet<_>>();
        for removed in self.markers.iter().filter(|marker| !kept.contains(&marker.id)) {
            self.tracker.on_marker_removed(removed.id);
        }
        self.markers = markers;
        Ok(())
    }

    fn handle_fix(&mut self, fix: LocationFix) -> FixResponse {
        let outcome = self.tracker.handle_fix(fix, &self.markers);
        self.respond(outcome)
    }

    fn force_check(&mut self) -> FixResponse {
        match self.tracker.force_check(&self.markers) {
            Ok(outcome) => self.respond(outcome),
            Err(err) => FixResponse {
                outcome: "unavailable".to_string(),
                nearby: Vec::new(),
                alerts: Vec::new(),
                message: format!("force_check failed: {err}"),
            },
        }
    }

    fn nearby(&self, fix: &LocationFix) -> Vec<NearbyItem> {
        markers_within(fix, &self.markers, self.tracker.config().threshold_m)
            .into_iter()
            .map(|(marker, distance_m)| NearbyItem {
                marker_id: marker.id,
                title: marker.display_title().to_string(),
                distance_m,
                alert: false,
            })
            .collect()
    }

    fn evaluate(&self, fix: &LocationFix) -> Vec<NearbyItem> {
        self.tracker
            .evaluate(fix, &self.markers)
            .into_iter()
            .map(to_nearby_item)
            .collect()
    }

    fn test_alert(&mut self) -> Option<AlertItem> {
        match self.tracker.send_test_alert() {
            Ok(Some(_)) => self.alerts.drain().into_iter().map(to_alert_item).last(),
            Ok(None) => {
                info!("event=test_alert module=ffi status=suppressed");
                None
            }
            Err(err) => {
                warn!("event=test_alert module=ffi status=error error={err}");
                None
            }
        }
    }

    fn respond(&mut self, outcome: FixOutcome) -> FixResponse {
        let alerts = self
            .alerts
            .drain()
            .into_iter()
            .map(to_alert_item)
            .collect::<Vec<_>>();
        match outcome {
            FixOutcome::Rejected => FixResponse {
                outcome: "rejected".to_string(),
                nearby: Vec::new(),
                alerts,
                message: "Fix has invalid coordinates.".to_string(),
            },
            FixOutcome::Skipped { moved_m } => FixResponse {
                outcome: "skipped".to_string(),
                nearby: Vec::new(),
                alerts,
                message: format!("Moved {moved_m:.1} m; below minimum movement."),
            },
            FixOutcome::Evaluated { nearby, .. } => {
                let message = if nearby.is_empty() {
                    "No markers nearby.".to_string()
                } else {
                    format!("{} marker(s) nearby.", nearby.len())
                };
                FixResponse {
                    outcome: "evaluated".to_string(),
                    nearby: nearby.into_iter().map(to_nearby_item).collect(),
                    alerts,
                    message,
                }
            }
        }
    }
}

fn session() -> MutexGuard<'static, TrackerSession> {
    SESSION
        .get_or_init(|| Mutex::new(TrackerSession::from_env()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

fn parse_location_error(kind: &str, message: String) -> LocationError {
    match kind.trim().to_ascii_lowercase().as_str() {
        "permission_denied" | "denied" => LocationError::PermissionDenied,
        _ => LocationError::Unavailable(message),
    }
}

fn status_label(status: &TrackingStatus) -> &'static str {
    match status {
        TrackingStatus::Starting => "starting",
        TrackingStatus::Active => "active",
        TrackingStatus::Unavailable(_) => "unavailable",
    }
}

fn to_marker(input: MarkerInput) -> Marker {
    Marker {
        id: input.id,
        latitude: input.latitude,
        longitude: input.longitude,
        title: input.title,
        created_at: input.created_at,
    }
}

fn to_nearby_item(hit: NearbyMarker) -> NearbyItem {
    NearbyItem {
        marker_id: hit.marker.id,
        title: hit.marker.display_title().to_string(),
        distance_m: hit.distance_m,
        alert: hit.alert,
    }
}

fn to_alert_item(alert: ProximityAlert) -> AlertItem {
    AlertItem {
        marker_id: alert.marker_id,
        title: alert.title,
        body: alert.body,
    }
}
