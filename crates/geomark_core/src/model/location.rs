//! Location fix model.
//!
//! A fix is produced by the platform location collaborator and is never
//! persisted by core.

use crate::geo::distance::haversine_distance;
use crate::model::marker::{is_valid_latitude, is_valid_longitude, Marker};
use serde::{Deserialize, Serialize};

/// One reported geographic position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in meters, when the platform reports one.
    #[serde(default)]
    pub accuracy: Option<f64>,
    /// Unix epoch milliseconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: None,
            timestamp: None,
        }
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Returns whether the coordinates are finite and in WGS-84 range.
    pub fn is_valid(&self) -> bool {
        is_valid_latitude(self.latitude) && is_valid_longitude(self.longitude)
    }

    /// Great-circle distance to another fix, in meters.
    pub fn distance_to(&self, other: &LocationFix) -> f64 {
        haversine_distance(self.latitude, self.longitude, other.latitude, other.longitude)
    }

    /// Great-circle distance to a marker, in meters.
    pub fn distance_to_marker(&self, marker: &Marker) -> f64 {
        haversine_distance(
            self.latitude,
            self.longitude,
            marker.latitude,
            marker.longitude,
        )
    }
}
