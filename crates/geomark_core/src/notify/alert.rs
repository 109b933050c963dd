//! Alert payloads and delivery sinks.
//!
//! # Responsibility
//! - Build the user-facing alert text for a nearby marker.
//! - Deliver through a primary sink and fall back when it fails.
//!
//! # Invariants
//! - Delivery never panics; failures surface as `AlertError`.
//! - The fallback is only attempted after the primary sink failed.

use crate::model::marker::{Marker, MarkerId};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, PoisonError};

pub const ALERT_TITLE: &str = "You are near a marker!";
pub const TEST_MARKER_ID: MarkerId = 999;
const TEST_MARKER_LATITUDE: f64 = 58.0105;
const TEST_MARKER_LONGITUDE: f64 = 56.2502;
const TEST_MARKER_TITLE: &str = "Test marker";

/// Alert presented to the user when a marker is nearby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProximityAlert {
    pub marker_id: MarkerId,
    pub title: String,
    pub body: String,
}

impl ProximityAlert {
    pub fn for_marker(marker: &Marker) -> Self {
        Self {
            marker_id: marker.id,
            title: ALERT_TITLE.to_string(),
            body: format!("You approached \"{}\"", marker.display_title()),
        }
    }
}

/// Marker used by the manual delivery check.
pub fn test_marker() -> Marker {
    Marker::new(TEST_MARKER_ID, TEST_MARKER_LATITUDE, TEST_MARKER_LONGITUDE)
        .with_title(TEST_MARKER_TITLE)
}

/// Delivery failures reported by sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertError {
    /// The user denied notification permission.
    PermissionDenied,
    /// The delivery mechanism is missing or failed.
    Unavailable(String),
}

impl Display for AlertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "notification permission denied"),
            Self::Unavailable(reason) => write!(f, "alert delivery unavailable: {reason}"),
        }
    }
}

impl Error for AlertError {}

/// Fire-and-forget alert presentation.
pub trait AlertSink: Send + Sync {
    /// Stable sink name used in diagnostics.
    fn name(&self) -> &str;
    fn deliver(&self, alert: &ProximityAlert) -> Result<(), AlertError>;
}

/// Which path ended up presenting an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryPath {
    Primary,
    Fallback,
}

/// Primary sink plus optional in-app fallback.
#[derive(Clone)]
pub struct AlertDispatcher {
    primary: Arc<dyn AlertSink>,
    fallback: Option<Arc<dyn AlertSink>>,
}

impl AlertDispatcher {
    pub fn new(primary: Arc<dyn AlertSink>) -> Self {
        Self {
            primary,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn AlertSink>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Delivers one alert.
    ///
    /// # Errors
    /// - Returns the last sink error when no path delivered.
    pub fn dispatch(&self, alert: &ProximityAlert) -> Result<DeliveryPath, AlertError> {
        let primary_err = match self.primary.deliver(alert) {
            Ok(()) => {
                info!(
                    "event=alert_delivered module=alert status=ok marker_id={} sink={}",
                    alert.marker_id,
                    self.primary.name()
                );
                return Ok(DeliveryPath::Primary);
            }
            Err(err) => err,
        };

        warn!(
            "event=alert_delivered module=alert status=fallback marker_id={} sink={} error={}",
            alert.marker_id,
            self.primary.name(),
            primary_err
        );
        let Some(fallback) = self.fallback.as_ref() else {
            return Err(primary_err);
        };
        fallback.deliver(alert)?;
        info!(
            "event=alert_delivered module=alert status=ok marker_id={} sink={}",
            alert.marker_id,
            fallback.name()
        );
        Ok(DeliveryPath::Fallback)
    }
}

/// Buffers alerts until a host drains and presents them.
#[derive(Debug, Default)]
pub struct AlertQueue {
    pending: Mutex<Vec<ProximityAlert>>,
}

impl AlertQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes every buffered alert in delivery order.
    pub fn drain(&self) -> Vec<ProximityAlert> {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *pending)
    }

    pub fn len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AlertSink for AlertQueue {
    fn name(&self) -> &str {
        "queue"
    }

    fn deliver(&self, alert: &ProximityAlert) -> Result<(), AlertError> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(alert.clone());
        Ok(())
    }
}

/// Writes alerts to the diagnostics log. Always succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn name(&self) -> &str {
        "log"
    }

    fn deliver(&self, alert: &ProximityAlert) -> Result<(), AlertError> {
        info!(
            "event=alert_presented module=alert marker_id={} title={:?} body={:?}",
            alert.marker_id, alert.title, alert.body
        );
        Ok(())
    }
}
