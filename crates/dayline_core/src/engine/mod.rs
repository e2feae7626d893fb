//! Gap-free timeline engine.
//!
//! # Responsibility
//! - Keep a fixed-length axis exactly covered by non-overlapping segments.
//! - Apply interactive edits and renegotiate neighbors through reflow.
//!
//! # Invariants
//! - Every public operation is a pure function of its inputs.
//! - Locked segments are never altered unless an edit targets them directly.
//! - Capacity shortfalls are reported as `Diagnostic`s, never as errors.

use crate::config::ConfigError;
use crate::model::segment::{Segment, SegmentId, SegmentValidationError};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod coverage;
pub mod edit;
pub mod gaps;
pub mod overlap;
pub mod reflow;

pub type TimelineResult<T> = Result<T, TimelineError>;

/// Structural failures that abort an edit before anything is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineError {
    SegmentNotFound(SegmentId),
    /// Split point not strictly inside the target segment.
    InvalidOffset {
        id: SegmentId,
        at: u32,
        start: u32,
        end: u32,
    },
    DuplicateSegmentId(SegmentId),
    /// Segment construction rule violated (`DurationBelowMinimum`, `OutsideAxis`).
    Validation(SegmentValidationError),
    Config(ConfigError),
}

impl Display for TimelineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SegmentNotFound(id) => write!(f, "segment not found: {id}"),
            Self::InvalidOffset { id, at, start, end } => write!(
                f,
                "split point {at} must be strictly inside segment {id} [{start}, {end})"
            ),
            Self::DuplicateSegmentId(id) => write!(f, "segment id already exists: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TimelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SegmentValidationError> for TimelineError {
    fn from(value: SegmentValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ConfigError> for TimelineError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

/// Machine-readable reason why coverage could not be fully restored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Uncovered range `[start, end)` that no eligible segment can absorb.
    NoFlexibleCapacity { start: u32, end: u32 },
    /// Overlap `[start, end)` between two segments that may not shrink.
    AllSegmentsLocked {
        first: SegmentId,
        second: SegmentId,
        start: u32,
        end: u32,
    },
}

impl Diagnostic {
    /// Stable reason code for telemetry and FFI consumers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoFlexibleCapacity { .. } => "no_flexible_capacity",
            Self::AllSegmentsLocked { .. } => "all_segments_locked",
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoFlexibleCapacity { start, end } => {
                write!(f, "no flexible capacity for [{start}, {end})")
            }
            Self::AllSegmentsLocked {
                first,
                second,
                start,
                end,
            } => write!(
                f,
                "segments {first} and {second} overlap on [{start}, {end}) and cannot shrink"
            ),
        }
    }
}

/// Result of a reflow or an edit operation.
///
/// `segments` is always ordered by start. When `coverage_ok` is false the
/// arrangement is a displayable partial state and `diagnostics` says why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflowOutcome {
    pub segments: Vec<Segment>,
    pub coverage_ok: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl ReflowOutcome {
    /// Sum of all segment durations.
    pub fn total_duration(&self) -> u64 {
        self.segments
            .iter()
            .map(|segment| u64::from(segment.duration))
            .sum()
    }

    /// Looks up one segment by id.
    pub fn segment(&self, id: &SegmentId) -> Option<&Segment> {
        self.segments.iter().find(|segment| &segment.id == id)
    }
}
