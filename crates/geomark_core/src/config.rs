//! Proximity configuration.
//!
//! # Responsibility
//! - Hold the externally overridable thresholds used by the core.
//! - Load overrides from environment variables or serialized documents.
//!
//! # Invariants
//! - A validated config has finite, non-negative distances.
//! - Missing fields fall back to defaults during deserialization.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::num::{ParseFloatError, ParseIntError};

/// Default proximity radius in meters.
pub const DEFAULT_THRESHOLD_M: f64 = 20.0;
/// Default minimum movement that re-triggers evaluation, in meters.
pub const DEFAULT_MIN_MOVEMENT_M: f64 = 2.0;
/// Default minimum time between repeated alerts for one marker.
pub const DEFAULT_COOLDOWN_MS: u64 = 30_000;

pub const ENV_THRESHOLD_M: &str = "GEOMARK_PROXIMITY_THRESHOLD_M";
pub const ENV_MIN_MOVEMENT_M: &str = "GEOMARK_MIN_MOVEMENT_M";
pub const ENV_COOLDOWN_MS: &str = "GEOMARK_NOTIFY_COOLDOWN_MS";

/// Configuration errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A field holds a value outside its domain.
    InvalidValue { field: &'static str, value: f64 },
    /// An environment override could not be parsed.
    InvalidEnv {
        var: &'static str,
        raw: String,
        cause: EnvValueError,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { field, value } => {
                write!(f, "{field} must be finite and >= 0, got {value}")
            }
            Self::InvalidEnv { var, raw, .. } => {
                write!(f, "environment variable {var} has unparsable value `{raw}`")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidValue { .. } => None,
            Self::InvalidEnv { cause, .. } => Some(cause),
        }
    }
}

/// Parse failure behind [`ConfigError::InvalidEnv`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvValueError {
    Float(ParseFloatError),
    Int(ParseIntError),
}

impl Display for EnvValueError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Float(err) => write!(f, "not a decimal number: {err}"),
            Self::Int(err) => write!(f, "not a whole number: {err}"),
        }
    }
}

impl Error for EnvValueError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Float(err) => Some(err),
            Self::Int(err) => Some(err),
        }
    }
}

impl From<ParseFloatError> for EnvValueError {
    fn from(err: ParseFloatError) -> Self {
        Self::Float(err)
    }
}

impl From<ParseIntError> for EnvValueError {
    fn from(err: ParseIntError) -> Self {
        Self::Int(err)
    }
}

/// Thresholds driving evaluation, movement filtering and alert cool-down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    /// Markers at or under this distance are "nearby".
    pub threshold_m: f64,
    /// Fixes closer than this to the last checked fix are ignored.
    pub min_movement_m: f64,
    /// Minimum time between alerts for the same marker.
    pub cooldown_ms: u64,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            threshold_m: DEFAULT_THRESHOLD_M,
            min_movement_m: DEFAULT_MIN_MOVEMENT_M,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
        }
    }
}

impl ProximityConfig {
    /// Validates distance fields.
    ///
    /// # Errors
    /// - `InvalidValue` when a distance is negative, `NaN` or infinite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_distance("threshold_m", self.threshold_m)?;
        validate_distance("min_movement_m", self.min_movement_m)?;
        Ok(())
    }

    /// Builds a config from defaults plus process environment overrides.
    ///
    /// Blank variables are ignored. The result is validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`ProximityConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = parse_override::<f64>(&lookup, ENV_THRESHOLD_M)? {
            config.threshold_m = value;
        }
        if let Some(value) = parse_override::<f64>(&lookup, ENV_MIN_MOVEMENT_M)? {
            config.min_movement_m = value;
        }
        if let Some(value) = parse_override::<u64>(&lookup, ENV_COOLDOWN_MS)? {
            config.cooldown_ms = value;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Subscription hints for the platform location collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationUpdatePolicy {
    /// Minimum interval between delivered fixes.
    pub time_interval_ms: u64,
    /// Minimum platform-side displacement between delivered fixes.
    pub distance_interval_m: f64,
}

impl Default for LocationUpdatePolicy {
    fn default() -> Self {
        Self {
            time_interval_ms: 3_000,
            distance_interval_m: DEFAULT_MIN_MOVEMENT_M,
        }
    }
}

fn validate_distance(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { field, value })
    }
}

fn parse_override<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: Into<EnvValueError>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|err| ConfigError::InvalidEnv {
            var,
            raw: trimmed.to_string(),
            cause: err.into(),
        })
}
