//! Interactive edit operations.
//!
//! # Responsibility
//! - Validate one edit, apply it to a copy of the arrangement, then reflow.
//!
//! # Invariants
//! - Structural errors return before anything is applied.
//! - Every successful edit ends with a reflow, including no-op edits on
//!   locked targets.
//! - The edited segment is pinned during its own reflow: moved and inserted
//!   segments keep position and size, resized and restored ones keep size.
//!   The pin is released only when keeping it would strand a gap.
//! - A resize or restore never grows a segment into a locked one.

use super::reflow::{reflow_after_edit, ReflowPins};
use super::{ReflowOutcome, TimelineError, TimelineResult};
use crate::config::TimelineConfig;
use crate::model::segment::{Segment, SegmentId, SegmentValidationError};
use log::debug;

/// Moves a segment to `new_start` without changing its duration.
///
/// `new_start` is clamped to `[0, axis_length - duration]`. Moving a locked
/// segment is a no-op.
///
/// # Errors
/// - `SegmentNotFound` when `id` is absent.
pub fn move_segment(
    segments: &[Segment],
    id: &SegmentId,
    new_start: u32,
    config: &TimelineConfig,
) -> TimelineResult<ReflowOutcome> {
    config.validate()?;
    let mut working = segments.to_vec();
    let index = position_of(&working, id)?;

    let target = &mut working[index];
    if target.locked {
        debug!("event=timeline_move module=engine status=noop reason=locked segment_id={id}");
        return Ok(reflow_after_edit(working, config, &ReflowPins::none()));
    }

    let max_start = config.axis_length.saturating_sub(target.duration);
    target.start = new_start.min(max_start);
    debug!(
        "event=timeline_move module=engine status=applied segment_id={id} start={}",
        target.start
    );

    Ok(reflow_after_edit(
        working,
        config,
        &ReflowPins::anchored(id.clone()),
    ))
}

/// Changes a segment's duration.
///
/// `new_duration` is clamped to at least `min_duration` and to at most what
/// fits between the segment start and the next locked segment (or the axis
/// end). Resizing a locked segment is a no-op.
///
/// # Errors
/// - `SegmentNotFound` when `id` is absent.
pub fn resize_segment(
    segments: &[Segment],
    id: &SegmentId,
    new_duration: u32,
    config: &TimelineConfig,
) -> TimelineResult<ReflowOutcome> {
    config.validate()?;
    let mut working = segments.to_vec();
    let index = position_of(&working, id)?;

    if working[index].locked {
        debug!("event=timeline_resize module=engine status=noop reason=locked segment_id={id}");
        return Ok(reflow_after_edit(working, config, &ReflowPins::none()));
    }

    let room = room_before_next_locked(&working, index, config);
    let target = &mut working[index];
    target.duration = new_duration.min(room).max(config.min_duration);
    debug!(
        "event=timeline_resize module=engine status=applied segment_id={id} duration={}",
        target.duration
    );

    Ok(reflow_after_edit(
        working,
        config,
        &ReflowPins::size_pinned(id.clone()),
    ))
}

/// Splits a segment into two at absolute minute `at`.
///
/// The first half keeps the original id; the second half gets a generated
/// id. Both halves inherit flags and metadata; neither carries an
/// `original_duration`.
///
/// # Errors
/// - `SegmentNotFound` when `id` is absent.
/// - `InvalidOffset` unless `start < at < start + duration`.
/// - `Validation(DurationBelowMinimum)` when a half would be too short.
pub fn split_segment(
    segments: &[Segment],
    id: &SegmentId,
    at: u32,
    config: &TimelineConfig,
) -> TimelineResult<ReflowOutcome> {
    config.validate()?;
    let mut working = segments.to_vec();
    let index = position_of(&working, id)?;
    let original = &working[index];

    if at <= original.start || at >= original.end() {
        return Err(TimelineError::InvalidOffset {
            id: id.clone(),
            at,
            start: original.start,
            end: original.end(),
        });
    }

    let mut head = original.clone();
    head.duration = at - original.start;
    head.original_duration = None;

    let mut tail = original.clone();
    tail.id = SegmentId::generate();
    tail.start = at;
    tail.duration = original.end() - at;
    tail.original_duration = None;

    for half in [&head, &tail] {
        if half.duration < config.min_duration {
            return Err(SegmentValidationError::DurationBelowMinimum {
                duration: half.duration,
                min_duration: config.min_duration,
            }
            .into());
        }
    }

    debug!(
        "event=timeline_split module=engine status=applied segment_id={id} at={at} new_segment_id={}",
        tail.id
    );
    working.splice(index..=index, [head, tail]);

    Ok(reflow_after_edit(working, config, &ReflowPins::none()))
}

/// Places `segment` at `target_start` and lets reflow make room for it.
///
/// `target_start` is clamped like [`move_segment`]. Displaced neighbors are
/// compressed according to the overlap rules.
///
/// # Errors
/// - `DuplicateSegmentId` when the id is already on the timeline.
/// - `Validation` when the segment violates the configured minimum or does
///   not fit the axis.
pub fn insert_at_position(
    segments: &[Segment],
    mut segment: Segment,
    target_start: u32,
    config: &TimelineConfig,
) -> TimelineResult<ReflowOutcome> {
    config.validate()?;
    if segments.iter().any(|existing| existing.id == segment.id) {
        return Err(TimelineError::DuplicateSegmentId(segment.id));
    }

    segment.start = target_start.min(config.axis_length.saturating_sub(segment.duration));
    segment.validate(config)?;

    let id = segment.id.clone();
    debug!(
        "event=timeline_insert module=engine status=applied segment_id={id} start={} duration={}",
        segment.start, segment.duration
    );

    let mut working = segments.to_vec();
    working.push(segment);

    Ok(reflow_after_edit(working, config, &ReflowPins::anchored(id)))
}

/// Removes a segment and redistributes its range.
///
/// # Errors
/// - `SegmentNotFound` when `id` is absent.
pub fn delete_segment(
    segments: &[Segment],
    id: &SegmentId,
    config: &TimelineConfig,
) -> TimelineResult<ReflowOutcome> {
    config.validate()?;
    let mut working = segments.to_vec();
    let index = position_of(&working, id)?;

    let removed = working.remove(index);
    debug!(
        "event=timeline_delete module=engine status=applied segment_id={id} start={} duration={}",
        removed.start, removed.duration
    );

    Ok(reflow_after_edit(working, config, &ReflowPins::none()))
}

/// Shrinks an expanded segment back to its recorded `original_duration`.
///
/// The restored size is clamped like [`resize_segment`]. Segments that were
/// never expanded, and locked segments, are left as they are (the
/// arrangement is still reflowed).
///
/// # Errors
/// - `SegmentNotFound` when `id` is absent.
pub fn restore_segment(
    segments: &[Segment],
    id: &SegmentId,
    config: &TimelineConfig,
) -> TimelineResult<ReflowOutcome> {
    config.validate()?;
    let mut working = segments.to_vec();
    let index = position_of(&working, id)?;

    let original = match working[index].original_duration {
        Some(original) if !working[index].locked => original,
        _ => {
            debug!("event=timeline_restore module=engine status=noop segment_id={id}");
            return Ok(reflow_after_edit(working, config, &ReflowPins::none()));
        }
    };

    let room = room_before_next_locked(&working, index, config);
    let target = &mut working[index];
    target.duration = original.min(room).max(config.min_duration);
    target.original_duration = None;
    debug!(
        "event=timeline_restore module=engine status=applied segment_id={id} duration={}",
        target.duration
    );

    Ok(reflow_after_edit(
        working,
        config,
        &ReflowPins::size_pinned(id.clone()),
    ))
}

/// Minutes from the segment's start to the next locked segment, or to the
/// axis end when none follows.
fn room_before_next_locked(segments: &[Segment], index: usize, config: &TimelineConfig) -> u32 {
    let start = segments[index].start;
    let limit = segments
        .iter()
        .enumerate()
        .filter(|&(other, segment)| other != index && segment.locked && segment.start >= start)
        .map(|(_, segment)| segment.start)
        .min()
        .unwrap_or(config.axis_length);
    limit.min(config.axis_length).saturating_sub(start)
}

fn position_of(segments: &[Segment], id: &SegmentId) -> TimelineResult<usize> {
    segments
        .iter()
        .position(|segment| &segment.id == id)
        .ok_or_else(|| TimelineError::SegmentNotFound(id.clone()))
}

#[cfg(test)]
mod tests {
    use super::{delete_segment, move_segment, resize_segment, restore_segment, split_segment};
    use crate::config::TimelineConfig;
    use crate::engine::TimelineError;
    use crate::model::segment::{Segment, SegmentId};

    fn config() -> TimelineConfig {
        TimelineConfig::default()
    }

    fn three_flexible_blocks() -> Vec<Segment> {
        vec![
            Segment::new("a", 0, 480, &config()).unwrap().flexible(),
            Segment::new("b", 480, 480, &config()).unwrap().flexible(),
            Segment::new("c", 960, 480, &config()).unwrap().flexible(),
        ]
    }

    fn day_with_short_morning() -> Vec<Segment> {
        vec![
            Segment::new("a", 0, 300, &config()).unwrap().flexible(),
            Segment::new("lunch", 300, 60, &config()).unwrap().locked(),
            Segment::new("b", 360, 500, &config()).unwrap().flexible(),
            Segment::new("c", 860, 580, &config()).unwrap().flexible(),
        ]
    }

    fn bounds(segments: &[Segment]) -> Vec<(&str, u32, u32)> {
        segments
            .iter()
            .map(|segment| (segment.id.as_str(), segment.start, segment.end()))
            .collect()
    }

    #[test]
    fn move_keeps_target_in_place_and_renegotiates_neighbors() {
        let outcome =
            move_segment(&three_flexible_blocks(), &"b".into(), 600, &config()).unwrap();

        assert!(outcome.coverage_ok);
        assert_eq!(
            bounds(&outcome.segments),
            vec![("a", 0, 600), ("b", 600, 1080), ("c", 1080, 1440)]
        );
    }

    #[test]
    fn move_past_axis_end_is_clamped_and_swaps_with_last_block() {
        let outcome =
            move_segment(&three_flexible_blocks(), &"b".into(), 5000, &config()).unwrap();

        assert!(outcome.coverage_ok);
        assert_eq!(
            bounds(&outcome.segments),
            vec![("a", 0, 480), ("c", 480, 960), ("b", 960, 1440)]
        );
    }

    #[test]
    fn resize_growth_compresses_following_block() {
        let outcome =
            resize_segment(&three_flexible_blocks(), &"a".into(), 600, &config()).unwrap();

        assert!(outcome.coverage_ok);
        assert_eq!(
            bounds(&outcome.segments),
            vec![("a", 0, 600), ("b", 600, 960), ("c", 960, 1440)]
        );
    }

    #[test]
    fn resize_growth_stops_at_locked_neighbor() {
        let outcome =
            resize_segment(&day_with_short_morning(), &"a".into(), 679, &config()).unwrap();

        assert!(outcome.coverage_ok);
        assert!(outcome.diagnostics.is_empty());
        assert_eq!(
            bounds(&outcome.segments),
            vec![("a", 0, 300), ("lunch", 300, 360), ("b", 360, 860), ("c", 860, 1440)]
        );
    }

    #[test]
    fn shrink_before_locked_neighbor_lets_target_refill_its_gap() {
        let outcome =
            resize_segment(&day_with_short_morning(), &"a".into(), 106, &config()).unwrap();

        assert!(outcome.coverage_ok);
        assert!(outcome.diagnostics.is_empty());
        let a = outcome.segment(&"a".into()).unwrap();
        assert_eq!((a.start, a.end(), a.original_duration), (0, 300, Some(106)));
        assert_eq!(
            outcome.segment(&"lunch".into()),
            Some(&day_with_short_morning()[1])
        );
    }

    #[test]
    fn restore_never_grows_into_locked_neighbor() {
        let mut day = day_with_short_morning();
        day[0].original_duration = Some(600);

        let outcome = restore_segment(&day, &"a".into(), &config()).unwrap();

        assert!(outcome.coverage_ok);
        let a = outcome.segment(&"a".into()).unwrap();
        assert_eq!((a.start, a.end(), a.original_duration), (0, 300, None));
    }

    #[test]
    fn split_rejects_boundary_offsets() {
        let segments = three_flexible_blocks();

        for at in [480, 960, 1000] {
            let err = split_segment(&segments, &"b".into(), at, &config()).unwrap_err();
            assert!(matches!(err, TimelineError::InvalidOffset { .. }), "at={at}");
        }
    }

    #[test]
    fn split_rejects_halves_below_minimum() {
        let config = TimelineConfig::new(1440, 15).unwrap();
        let segments = vec![Segment::new("day", 0, 1440, &config).unwrap().flexible()];

        let err = split_segment(&segments, &"day".into(), 10, &config).unwrap_err();
        assert!(matches!(err, TimelineError::Validation(_)));
    }

    #[test]
    fn delete_missing_segment_is_not_found() {
        let err = delete_segment(&three_flexible_blocks(), &SegmentId::new("zzz"), &config())
            .unwrap_err();
        assert_eq!(err, TimelineError::SegmentNotFound("zzz".into()));
    }

    #[test]
    fn restore_returns_expanded_segment_to_original_size() {
        let deleted = delete_segment(&three_flexible_blocks(), &"b".into(), &config()).unwrap();
        assert_eq!(deleted.segment(&"a".into()).unwrap().original_duration, Some(480));

        let restored = restore_segment(&deleted.segments, &"a".into(), &config()).unwrap();

        assert!(restored.coverage_ok);
        let a = restored.segment(&"a".into()).unwrap();
        assert_eq!((a.start, a.duration, a.original_duration), (0, 480, None));
        let c = restored.segment(&"c".into()).unwrap();
        assert_eq!((c.start, c.end()), (480, 1440));
    }

    #[test]
    fn invalid_config_is_rejected_before_editing() {
        let config = TimelineConfig {
            axis_length: 0,
            min_duration: 1,
        };
        let err = delete_segment(&three_flexible_blocks(), &"a".into(), &config).unwrap_err();
        assert!(matches!(err, TimelineError::Config(_)));
    }
}
