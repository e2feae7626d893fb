//! Full-coverage invariant check.

use crate::model::segment::Segment;

/// Returns whether `segments` exactly and contiguously span `[0, axis_length)`.
///
/// Requires the input in start order; an unsorted slice is reported as not
/// covering. An empty slice never covers.
pub fn validate_full_coverage(segments: &[Segment], axis_length: u32) -> bool {
    let Some(first) = segments.first() else {
        return false;
    };
    if first.start != 0 {
        return false;
    }

    let mut cursor = 0u32;
    for segment in segments {
        if segment.start != cursor || segment.duration == 0 {
            return false;
        }
        cursor = match cursor.checked_add(segment.duration) {
            Some(next) => next,
            None => return false,
        };
    }

    cursor == axis_length
}
