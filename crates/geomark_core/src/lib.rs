//! Proximity core for geo-tagged markers.
//! Decides when the user is near a saved marker and whether to alert again.

pub mod config;
pub mod geo;
pub mod logging;
pub mod model;
pub mod notify;
pub mod proximity;
pub mod service;

pub use config::{ConfigError, EnvValueError, LocationUpdatePolicy, ProximityConfig};
pub use geo::distance::{haversine_distance, EARTH_RADIUS_M};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::location::LocationFix;
pub use model::marker::{Marker, MarkerId, MarkerValidationError};
pub use notify::alert::{
    AlertDispatcher, AlertError, AlertQueue, AlertSink, DeliveryPath, LogAlertSink,
    ProximityAlert,
};
pub use notify::clock::{Clock, ManualClock, SystemClock};
pub use notify::dedup::NotificationDeduplicator;
pub use proximity::evaluator::{markers_within, NearbyMarker, ProximityEvaluator};
pub use proximity::movement::is_significant_move;
pub use service::tracker_service::{FixOutcome, LocationError, ProximityTracker, TrackingStatus};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
