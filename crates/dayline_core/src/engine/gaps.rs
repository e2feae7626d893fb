//! Uncovered range detection.

use crate::model::segment::Segment;
use serde::{Deserialize, Serialize};

/// Half-open uncovered range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub start: u32,
    pub end: u32,
}

impl Gap {
    pub fn duration(&self) -> u32 {
        self.end - self.start
    }
}

/// Finds every uncovered range of `[0, axis_length)`.
///
/// Input order does not matter; segments are sorted by start first. The
/// result is ordered left to right and contains leading, inter-segment and
/// trailing gaps. Overlapping input is tolerated but should be resolved
/// beforehand for meaningful results.
pub fn find_gaps(segments: &[Segment], axis_length: u32) -> Vec<Gap> {
    let mut ordered: Vec<&Segment> = segments.iter().collect();
    ordered.sort_by_key(|segment| segment.start);
    scan(ordered.into_iter(), axis_length)
}

/// Same as [`find_gaps`] for input already sorted by start.
pub(crate) fn find_gaps_sorted(segments: &[Segment], axis_length: u32) -> Vec<Gap> {
    scan(segments.iter(), axis_length)
}

fn scan<'a>(segments: impl Iterator<Item = &'a Segment>, axis_length: u32) -> Vec<Gap> {
    let mut gaps = Vec::new();
    let mut cursor = 0u32;

    for segment in segments {
        if cursor >= axis_length {
            break;
        }
        if segment.start > cursor {
            gaps.push(Gap {
                start: cursor,
                end: segment.start.min(axis_length),
            });
        }
        cursor = cursor.max(segment.end());
    }

    if cursor < axis_length {
        gaps.push(Gap {
            start: cursor,
            end: axis_length,
        });
    }

    gaps
}
