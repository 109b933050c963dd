//! Proximity evaluator.
//!
//! # Responsibility
//! - Report every marker within `threshold_m` of a fix.
//! - Ask the de-duplicator, once per nearby marker, whether it may alert.
//!
//! # Invariants
//! - A marker is reported iff its distance is finite and `<= threshold_m`.
//! - The de-duplicator is consulted for every reported marker (at least once
//!   per evaluation); suppressing repeats is its job, not the evaluator's.

use crate::geo::distance::is_within;
use crate::model::location::LocationFix;
use crate::model::marker::Marker;
use crate::notify::dedup::NotificationDeduplicator;
use log::{debug, trace};
use std::sync::Arc;

/// One marker found within the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyMarker {
    pub marker: Marker,
    pub distance_m: f64,
    /// Whether the de-duplicator let this marker alert for this evaluation.
    pub alert: bool,
}

/// Returns `(marker, distance)` for markers within `threshold_m`, in input order.
///
/// Pure: no de-duplication, no logging.
pub fn markers_within<'a>(
    fix: &LocationFix,
    markers: &'a [Marker],
    threshold_m: f64,
) -> Vec<(&'a Marker, f64)> {
    markers
        .iter()
        .map(|marker| (marker, fix.distance_to_marker(marker)))
        .filter(|(_, distance)| is_within(*distance, threshold_m))
        .collect()
}

/// Threshold check wired to a shared de-duplicator.
pub struct ProximityEvaluator {
    threshold_m: f64,
    dedup: Arc<NotificationDeduplicator>,
}

impl ProximityEvaluator {
    pub fn new(threshold_m: f64, dedup: Arc<NotificationDeduplicator>) -> Self {
        Self { threshold_m, dedup }
    }

    pub fn threshold_m(&self) -> f64 {
        self.threshold_m
    }

    pub fn deduplicator(&self) -> &Arc<NotificationDeduplicator> {
        &self.dedup
    }

    /// Evaluates one fix against a marker snapshot.
    pub fn evaluate(&self, fix: &LocationFix, markers: &[Marker]) -> Vec<NearbyMarker> {
        if markers.is_empty() {
            debug!("event=proximity_check module=evaluator status=skipped reason=no_markers");
            return Vec::new();
        }

        let nearby = markers_within(fix, markers, self.threshold_m)
            .into_iter()
            .map(|(marker, distance_m)| {
                trace!(
                    "event=marker_near module=evaluator marker_id={} distance_m={:.1}",
                    marker.id,
                    distance_m
                );
                NearbyMarker {
                    marker: marker.clone(),
                    distance_m,
                    alert: self.dedup.should_notify(marker.id),
                }
            })
            .collect::<Vec<_>>();

        debug!(
            "event=proximity_check module=evaluator status=ok markers={} nearby={} threshold_m={}",
            markers.len(),
            nearby.len(),
            self.threshold_m
        );
        nearby
    }
}
