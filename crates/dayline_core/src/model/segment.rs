//! Timeline segment domain model.
//!
//! # Responsibility
//! - Define the block of time the engine arranges on the axis.
//! - Validate construction against the active `TimelineConfig`.
//!
//! # Invariants
//! - `duration >= config.min_duration`.
//! - `start < axis_length` and `start + duration <= axis_length`.
//! - `original_duration` is present only after the engine expanded the segment.
//! - Equality ignores `metadata`; the engine never inspects it.

use crate::config::TimelineConfig;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque segment identifier.
///
/// Callers may bring their own ids (template seeding, sync import); the engine
/// only generates ids for split halves and ad-hoc inserts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(String);

impl SegmentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for SegmentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SegmentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SegmentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Display-only attributes carried through every edit untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentMetadata {
    pub title: String,
    pub color: Option<String>,
    pub category: Option<String>,
}

impl SegmentMetadata {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// One contiguous block of minutes on the timeline axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    /// Minutes from axis origin.
    pub start: u32,
    /// Length in minutes.
    pub duration: u32,
    /// Reflow never moves or resizes a locked segment.
    pub locked: bool,
    /// Eligible to absorb gaps or be compressed by overlaps.
    pub flexible: bool,
    /// Pre-expansion duration, recorded on first expansion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_duration: Option<u32>,
    #[serde(default)]
    pub metadata: SegmentMetadata,
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.start == other.start
            && self.duration == other.duration
            && self.locked == other.locked
            && self.flexible == other.flexible
            && self.original_duration == other.original_duration
    }
}

impl Eq for Segment {}

impl Segment {
    /// Creates an unlocked, non-flexible segment.
    ///
    /// # Errors
    /// - `DurationBelowMinimum` when `duration < config.min_duration`.
    /// - `OutsideAxis` when the range does not fit `[0, axis_length)`.
    pub fn new(
        id: impl Into<SegmentId>,
        start: u32,
        duration: u32,
        config: &TimelineConfig,
    ) -> Result<Self, SegmentValidationError> {
        let segment = Self {
            id: id.into(),
            start,
            duration,
            locked: false,
            flexible: false,
            original_duration: None,
            metadata: SegmentMetadata::default(),
        };
        segment.validate(config)?;
        Ok(segment)
    }

    /// Marks the segment as locked.
    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    /// Marks the segment as flexible.
    pub fn flexible(mut self) -> Self {
        self.flexible = true;
        self
    }

    pub fn with_metadata(mut self, metadata: SegmentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Exclusive end minute.
    pub fn end(&self) -> u32 {
        self.start.saturating_add(self.duration)
    }

    /// Whether reflow may shrink or grow this segment.
    pub fn is_elastic(&self) -> bool {
        self.flexible && !self.locked
    }

    /// Validates this segment against axis configuration.
    pub fn validate(&self, config: &TimelineConfig) -> Result<(), SegmentValidationError> {
        if self.duration < config.min_duration {
            return Err(SegmentValidationError::DurationBelowMinimum {
                duration: self.duration,
                min_duration: config.min_duration,
            });
        }
        if self.start >= config.axis_length || self.end() > config.axis_length {
            return Err(SegmentValidationError::OutsideAxis {
                start: self.start,
                end: self.end(),
                axis_length: config.axis_length,
            });
        }
        Ok(())
    }
}

/// Construction-time segment violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentValidationError {
    DurationBelowMinimum { duration: u32, min_duration: u32 },
    OutsideAxis { start: u32, end: u32, axis_length: u32 },
}

impl Display for SegmentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DurationBelowMinimum {
                duration,
                min_duration,
            } => write!(
                f,
                "segment duration {duration} is below minimum {min_duration}"
            ),
            Self::OutsideAxis {
                start,
                end,
                axis_length,
            } => write!(
                f,
                "segment range [{start}, {end}) does not fit axis [0, {axis_length})"
            ),
        }
    }
}

impl Error for SegmentValidationError {}
