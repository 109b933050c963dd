//! Proximity tracking use-case service.
//!
//! # Responsibility
//! - Accept location fixes and location failures from the host.
//! - Apply the movement filter, evaluate markers and dispatch alerts.
//! - Report tracking status as a recoverable condition.
//!
//! # Invariants
//! - Evaluations never overlap: every entry point takes `&mut self`.
//! - A fix that fails validation never reaches the evaluator.
//! - The last-checked fix only advances when the filter lets a fix through.
//! - When no delivery path presents an alert, its cool-down record is
//!   cleared so a later evaluation can retry.

use crate::config::{ConfigError, ProximityConfig};
use crate::model::location::LocationFix;
use crate::model::marker::{Marker, MarkerId};
use crate::notify::alert::{
    test_marker, AlertDispatcher, AlertError, DeliveryPath, ProximityAlert,
};
use crate::notify::dedup::NotificationDeduplicator;
use crate::proximity::evaluator::{NearbyMarker, ProximityEvaluator};
use crate::proximity::movement::is_significant_move;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Recoverable location failures reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    /// Location permission was not granted.
    PermissionDenied,
    /// No fix could be obtained.
    Unavailable(String),
}

impl Display for LocationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "location permission denied"),
            Self::Unavailable(reason) => write!(f, "location unavailable: {reason}"),
        }
    }
}

impl Error for LocationError {}

/// Tracking state surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingStatus {
    /// No fix received yet.
    Starting,
    /// At least one valid fix received since the last failure.
    Active,
    /// Last report from the host was a failure.
    Unavailable(LocationError),
}

/// Result of handing one fix to the tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum FixOutcome {
    /// Coordinates were non-finite or out of range.
    Rejected,
    /// Movement since the last checked fix was below the minimum.
    Skipped { moved_m: f64 },
    /// Markers were evaluated.
    Evaluated {
        nearby: Vec<NearbyMarker>,
        /// Markers whose alert reached a delivery path.
        alerted: Vec<MarkerId>,
    },
}

/// Explicitly owned orchestration loop for one device.
pub struct ProximityTracker {
    config: ProximityConfig,
    evaluator: ProximityEvaluator,
    dispatcher: AlertDispatcher,
    last_known: Option<LocationFix>,
    last_checked: Option<LocationFix>,
    status: TrackingStatus,
}

impl ProximityTracker {
    /// Creates a tracker with its own de-duplicator.
    pub fn new(config: ProximityConfig, dispatcher: AlertDispatcher) -> Self {
        let dedup = Arc::new(NotificationDeduplicator::new(config.cooldown_ms));
        Self::with_deduplicator(config, dedup, dispatcher)
    }

    /// Creates a tracker sharing a caller-owned de-duplicator.
    ///
    /// The de-duplicator's own cool-down wins over `config.cooldown_ms`.
    pub fn with_deduplicator(
        config: ProximityConfig,
        dedup: Arc<NotificationDeduplicator>,
        dispatcher: AlertDispatcher,
    ) -> Self {
        Self {
            evaluator: ProximityEvaluator::new(config.threshold_m, dedup),
            config,
            dispatcher,
            last_known: None,
            last_checked: None,
            status: TrackingStatus::Starting,
        }
    }

    pub fn config(&self) -> &ProximityConfig {
        &self.config
    }

    pub fn status(&self) -> &TrackingStatus {
        &self.status
    }

    /// Most recent valid fix, filtered or not.
    pub fn last_known(&self) -> Option<&LocationFix> {
        self.last_known.as_ref()
    }

    /// Fix used by the most recent evaluation.
    pub fn last_checked(&self) -> Option<&LocationFix> {
        self.last_checked.as_ref()
    }

    pub fn deduplicator(&self) -> &Arc<NotificationDeduplicator> {
        self.evaluator.deduplicator()
    }

    /// Handles one fix from the platform location source.
    pub fn handle_fix(&mut self, fix: LocationFix, markers: &[Marker]) -> FixOutcome {
        if !fix.is_valid() {
            warn!(
                "event=location_fix module=tracker status=rejected lat={} lon={}",
                fix.latitude, fix.longitude
            );
            return FixOutcome::Rejected;
        }

        if self.status != TrackingStatus::Active {
            info!("event=tracking_status module=tracker status=active");
            self.status = TrackingStatus::Active;
        }
        self.last_known = Some(fix);

        if !is_significant_move(self.last_checked.as_ref(), &fix, self.config.min_movement_m) {
            let moved_m = self
                .last_checked
                .as_ref()
                .map(|last| last.distance_to(&fix))
                .unwrap_or(0.0);
            return FixOutcome::Skipped { moved_m };
        }

        self.last_checked = Some(fix);
        self.evaluate_and_alert(&fix, markers)
    }

    /// Re-evaluates the last known fix without the movement filter.
    ///
    /// Used after the marker set changes or on a manual request.
    ///
    /// # Errors
    /// - `LocationError::Unavailable` when no fix has been received.
    pub fn force_check(&mut self, markers: &[Marker]) -> Result<FixOutcome, LocationError> {
        let fix = self
            .last_known
            .ok_or_else(|| LocationError::Unavailable("no fix received yet".to_string()))?;
        self.last_checked = Some(fix);
        Ok(self.evaluate_and_alert(&fix, markers))
    }

    /// Records a location failure reported by the host.
    pub fn handle_location_error(&mut self, err: LocationError) {
        warn!(
            "event=tracking_status module=tracker status=unavailable error={}",
            err
        );
        self.status = TrackingStatus::Unavailable(err);
    }

    /// Dispatches the diagnostic alert for the fixed test marker.
    ///
    /// The test marker shares the cool-down rules of real markers:
    /// `Ok(None)` means the alert was suppressed.
    pub fn send_test_alert(&self) -> Result<Option<DeliveryPath>, AlertError> {
        let marker = test_marker();
        if !self.deduplicator().should_notify(marker.id) {
            return Ok(None);
        }
        match self.dispatcher.dispatch(&ProximityAlert::for_marker(&marker)) {
            Ok(path) => Ok(Some(path)),
            Err(err) => {
                self.deduplicator().clear(marker.id);
                Err(err)
            }
        }
    }

    /// Evaluates a fix against markers without dispatching alerts.
    ///
    /// The de-duplicator is still consulted, so `alert == true` rows are
    /// recorded and the caller is expected to present them.
    pub fn evaluate(&self, fix: &LocationFix, markers: &[Marker]) -> Vec<NearbyMarker> {
        self.evaluator.evaluate(fix, markers)
    }

    /// Applies new thresholds.
    ///
    /// Cool-down records and the last checked fix are reset; the last known
    /// fix and tracking status are kept. The de-duplicator clock is reused.
    ///
    /// # Errors
    /// - `ConfigError` when `config` fails validation; nothing changes.
    pub fn reconfigure(&mut self, config: ProximityConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let dedup = Arc::new(self.deduplicator().with_cooldown(config.cooldown_ms));
        self.evaluator = ProximityEvaluator::new(config.threshold_m, dedup);
        self.config = config;
        self.reset_last_checked();
        info!(
            "event=tracker_configure module=tracker status=ok threshold_m={} min_movement_m={} cooldown_ms={}",
            config.threshold_m, config.min_movement_m, config.cooldown_ms
        );
        Ok(())
    }

    /// Forgets cool-down state for a deleted marker.
    pub fn on_marker_removed(&self, marker_id: MarkerId) {
        self.clear_notification(marker_id);
    }

    pub fn clear_notification(&self, marker_id: MarkerId) {
        self.deduplicator().clear(marker_id);
    }

    pub fn clear_all_notifications(&self) {
        self.deduplicator().clear_all();
    }

    /// Forgets the last checked fix so the next fix is always evaluated.
    pub fn reset_last_checked(&mut self) {
        self.last_checked = None;
    }

    fn evaluate_and_alert(&self, fix: &LocationFix, markers: &[Marker]) -> FixOutcome {
        let nearby = self.evaluator.evaluate(fix, markers);
        let mut alerted = Vec::new();

        for hit in nearby.iter().filter(|hit| hit.alert) {
            let alert = ProximityAlert::for_marker(&hit.marker);
            match self.dispatcher.dispatch(&alert) {
                Ok(_) => alerted.push(hit.marker.id),
                Err(err) => {
                    error!(
                        "event=proximity_alert module=tracker status=error marker_id={} error={}",
                        hit.marker.id, err
                    );
                    self.deduplicator().clear(hit.marker.id);
                }
            }
        }

        if !alerted.is_empty() {
            info!(
                "event=proximity_alert module=tracker status=ok nearby={} alerted={}",
                nearby.len(),
                alerted.len()
            );
        }
        FixOutcome::Evaluated { nearby, alerted }
    }
}
