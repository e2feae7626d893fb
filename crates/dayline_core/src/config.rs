//! Timeline axis configuration.
//!
//! # Responsibility
//! - Carry the axis length and minimum segment duration into every engine call.
//! - Reject configurations under which no valid timeline can exist.
//!
//! # Invariants
//! - `axis_length > 0`.
//! - `1 <= min_duration <= axis_length`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Minutes in one day, the conventional axis length.
pub const DEFAULT_AXIS_LENGTH: u32 = 1440;
/// Smallest duration the engine itself allows.
pub const DEFAULT_MIN_DURATION: u32 = 1;
/// Practical minimum used by the day-planner UI.
pub const UI_MIN_DURATION: u32 = 15;

/// Axis configuration shared by all engine operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Total minutes that must be covered.
    pub axis_length: u32,
    /// No segment may be shorter than this, in minutes.
    pub min_duration: u32,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            axis_length: DEFAULT_AXIS_LENGTH,
            min_duration: DEFAULT_MIN_DURATION,
        }
    }
}

impl TimelineConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    /// - `ConfigError::ZeroAxisLength` when `axis_length == 0`.
    /// - `ConfigError::InvalidMinDuration` when `min_duration` is zero or
    ///   larger than the axis.
    pub fn new(axis_length: u32, min_duration: u32) -> Result<Self, ConfigError> {
        let config = Self {
            axis_length,
            min_duration,
        };
        config.validate()?;
        Ok(config)
    }

    /// Default axis with the 15 minute UI minimum.
    pub fn ui_default() -> Self {
        Self {
            axis_length: DEFAULT_AXIS_LENGTH,
            min_duration: UI_MIN_DURATION,
        }
    }

    /// Checks configuration invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.axis_length == 0 {
            return Err(ConfigError::ZeroAxisLength);
        }
        if self.min_duration == 0 || self.min_duration > self.axis_length {
            return Err(ConfigError::InvalidMinDuration {
                min_duration: self.min_duration,
                axis_length: self.axis_length,
            });
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroAxisLength,
    InvalidMinDuration { min_duration: u32, axis_length: u32 },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroAxisLength => write!(f, "axis length must be greater than zero"),
            Self::InvalidMinDuration {
                min_duration,
                axis_length,
            } => write!(
                f,
                "min duration {min_duration} must be within 1..={axis_length}"
            ),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::{ConfigError, TimelineConfig, DEFAULT_AXIS_LENGTH, UI_MIN_DURATION};

    #[test]
    fn default_covers_one_day_with_minute_granularity() {
        let config = TimelineConfig::default();
        assert_eq!(config.axis_length, DEFAULT_AXIS_LENGTH);
        assert_eq!(config.min_duration, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn ui_default_uses_quarter_hour_minimum() {
        assert_eq!(TimelineConfig::ui_default().min_duration, UI_MIN_DURATION);
    }

    #[test]
    fn new_rejects_degenerate_values() {
        assert_eq!(
            TimelineConfig::new(0, 1).unwrap_err(),
            ConfigError::ZeroAxisLength
        );
        assert!(matches!(
            TimelineConfig::new(60, 0).unwrap_err(),
            ConfigError::InvalidMinDuration { .. }
        ));
        assert!(matches!(
            TimelineConfig::new(60, 61).unwrap_err(),
            ConfigError::InvalidMinDuration { .. }
        ));
    }
}
