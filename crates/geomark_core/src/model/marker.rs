//! Marker domain model.
//!
//! # Responsibility
//! - Define the marker snapshot shared between host persistence and core.
//! - Provide coordinate validation and display helpers.
//!
//! # Invariants
//! - `id` is unique and never changes after creation.
//! - The core never mutates markers; it only reads snapshots.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier assigned by the persistence collaborator.
pub type MarkerId = i64;

const DEFAULT_MARKER_TITLE: &str = "Marker";

/// Geo-tagged point placed by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: MarkerId,
    /// Degrees, `[-90, 90]`.
    pub latitude: f64,
    /// Degrees, `[-180, 180]`.
    pub longitude: f64,
    #[serde(default)]
    pub title: Option<String>,
    /// Unix epoch milliseconds.
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// Validation errors for marker snapshots.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerValidationError {
    InvalidLatitude { id: MarkerId, value: f64 },
    InvalidLongitude { id: MarkerId, value: f64 },
}

impl Display for MarkerValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLatitude { id, value } => {
                write!(f, "marker {id} has invalid latitude {value}")
            }
            Self::InvalidLongitude { id, value } => {
                write!(f, "marker {id} has invalid longitude {value}")
            }
        }
    }
}

impl Error for MarkerValidationError {}

impl Marker {
    /// Creates an untitled marker without creation metadata.
    pub fn new(id: MarkerId, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            latitude,
            longitude,
            title: None,
            created_at: None,
        }
    }

    /// Builder-style title setter.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Checks that both coordinates are finite and in range.
    pub fn validate(&self) -> Result<(), MarkerValidationError> {
        if !is_valid_latitude(self.latitude) {
            return Err(MarkerValidationError::InvalidLatitude {
                id: self.id,
                value: self.latitude,
            });
        }
        if !is_valid_longitude(self.longitude) {
            return Err(MarkerValidationError::InvalidLongitude {
                id: self.id,
                value: self.longitude,
            });
        }
        Ok(())
    }

    /// Title used in user-facing text; blank titles fall back to `"Marker"`.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title,
            _ => DEFAULT_MARKER_TITLE,
        }
    }
}

pub(crate) fn is_valid_latitude(value: f64) -> bool {
    value.is_finite() && (-90.0..=90.0).contains(&value)
}

pub(crate) fn is_valid_longitude(value: f64) -> bool {
    value.is_finite() && (-180.0..=180.0).contains(&value)
}
