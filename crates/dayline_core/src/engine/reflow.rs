//! Reflow: restores full coverage after an edit.
//!
//! # Responsibility
//! - Run the overlap pass, then close gaps by shifting, then by expanding.
//! - Report partial coverage with diagnostics instead of failing.
//!
//! # Invariants
//! - Input already fully covering the axis is returned unchanged.
//! - Locked segments keep their exact start and duration. An edit's pinned
//!   target does too, unless only releasing the pin restores coverage.
//! - Gap time is split equally by count, never proportionally by size; the
//!   remainder goes one minute at a time to the earliest recipients.
//! - `original_duration` is recorded once, before the first expansion.

use super::coverage::validate_full_coverage;
use super::gaps::find_gaps_sorted;
use super::overlap::resolve_with_pins;
use super::{Diagnostic, ReflowOutcome};
use crate::config::TimelineConfig;
use crate::model::segment::{Segment, SegmentId};
use log::{debug, warn};

/// Edit-scoped protection for the segment an edit just placed.
///
/// An anchored segment keeps position and size for the duration of one
/// reflow; a size-pinned segment may slide but is never shrunk or expanded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ReflowPins {
    anchored: Option<SegmentId>,
    size_pinned: Option<SegmentId>,
}

impl ReflowPins {
    pub(crate) fn none() -> Self {
        Self::default()
    }

    pub(crate) fn anchored(id: SegmentId) -> Self {
        Self {
            anchored: Some(id),
            size_pinned: None,
        }
    }

    pub(crate) fn size_pinned(id: SegmentId) -> Self {
        Self {
            anchored: None,
            size_pinned: Some(id),
        }
    }

    fn is_anchored(&self, segment: &Segment) -> bool {
        self.anchored.as_ref() == Some(&segment.id)
    }

    fn is_size_pinned(&self, segment: &Segment) -> bool {
        self.size_pinned.as_ref() == Some(&segment.id)
    }

    /// Locked or anchored: reflow must not touch it at all.
    pub(crate) fn is_immovable(&self, segment: &Segment) -> bool {
        segment.locked || self.is_anchored(segment)
    }

    /// May be shrunk, expanded or displaced by reflow.
    pub(crate) fn is_elastic(&self, segment: &Segment) -> bool {
        segment.is_elastic() && !self.is_anchored(segment) && !self.is_size_pinned(segment)
    }

    /// Downgrades an anchor to a size pin so the segment may slide.
    fn relaxed(&self) -> Option<Self> {
        self.anchored.as_ref().map(|id| Self::size_pinned(id.clone()))
    }

    fn rank(&self, segment: &Segment) -> u8 {
        if self.is_immovable(segment) {
            0
        } else if self.is_size_pinned(segment) {
            1
        } else {
            2
        }
    }
}

/// Orders by start; on equal starts immovable segments come first, then the
/// size-pinned one, so an ordinary segment is the one that yields.
pub(crate) fn sort_for_reflow(segments: &mut [Segment], pins: &ReflowPins) {
    segments.sort_by_key(|segment| (segment.start, pins.rank(segment)));
}

/// Reflow after an edit.
///
/// When the pinned target strands a gap or an overlap nothing else can
/// resolve (the first block dragged right, a block shrunk before a locked
/// one), the pin is released step by step: an anchor becomes a size pin,
/// then the target is treated like any other segment. The first
/// arrangement that covers the axis wins; otherwise the pinned one is
/// kept unless only a released one is free of overlaps.
pub(crate) fn reflow_after_edit(
    segments: Vec<Segment>,
    config: &TimelineConfig,
    pins: &ReflowPins,
) -> ReflowOutcome {
    let pinned = reflow_with_pins(segments.clone(), config, pins);
    if pinned.coverage_ok || *pins == ReflowPins::none() {
        return pinned;
    }

    let mut best = pinned;
    for released in pins.relaxed().into_iter().chain([ReflowPins::none()]) {
        let outcome = reflow_with_pins(segments.clone(), config, &released);
        if outcome.coverage_ok {
            debug!("event=timeline_reflow module=engine status=ok pin=released");
            return outcome;
        }
        if has_overlap(&best.segments) && !has_overlap(&outcome.segments) {
            best = outcome;
        }
    }
    best
}

/// True when any segment starts before an earlier one has ended.
fn has_overlap(segments: &[Segment]) -> bool {
    let mut reach = 0u32;
    for segment in segments {
        if segment.start < reach {
            return true;
        }
        reach = reach.max(segment.end());
    }
    false
}

/// Restores full coverage where possible.
///
/// Always runs overlap resolution, gap detection, the shift phase and the
/// expand phase in that order. When gaps survive (no flexible segment can
/// reach them) the outcome carries `coverage_ok = false` and one
/// `NoFlexibleCapacity` per stranded range.
pub fn apply_reflow(segments: Vec<Segment>, config: &TimelineConfig) -> ReflowOutcome {
    reflow_with_pins(segments, config, &ReflowPins::none())
}

pub(crate) fn reflow_with_pins(
    mut segments: Vec<Segment>,
    config: &TimelineConfig,
    pins: &ReflowPins,
) -> ReflowOutcome {
    sort_for_reflow(&mut segments, pins);
    if validate_full_coverage(&segments, config.axis_length) {
        debug!(
            "event=timeline_reflow module=engine status=ok segments={} changed=false",
            segments.len()
        );
        return ReflowOutcome {
            segments,
            coverage_ok: true,
            diagnostics: Vec::new(),
        };
    }

    let resolution = resolve_with_pins(segments, config, pins);
    let mut segments = resolution.segments;
    let mut diagnostics = resolution.diagnostics;

    let gaps = find_gaps_sorted(&segments, config.axis_length);
    if !gaps.is_empty() {
        shift_left(&mut segments, pins);
        diagnostics.extend(expand_into_gaps(&mut segments, config, pins));
    }

    let coverage_ok = validate_full_coverage(&segments, config.axis_length);
    if coverage_ok {
        debug!(
            "event=timeline_reflow module=engine status=ok segments={} gaps_closed={} changed=true",
            segments.len(),
            gaps.len()
        );
    } else {
        warn!(
            "event=timeline_reflow module=engine status=partial segments={} diagnostics={}",
            segments.len(),
            diagnostics
                .iter()
                .map(Diagnostic::code)
                .collect::<Vec<_>>()
                .join(",")
        );
    }

    ReflowOutcome {
        segments,
        coverage_ok,
        diagnostics,
    }
}

/// Shift phase: slides movable segments left into the gap before them.
///
/// An immovable segment stops the slide, so a gap right before one survives.
fn shift_left(segments: &mut [Segment], pins: &ReflowPins) {
    let mut cursor = 0u32;
    for segment in segments.iter_mut() {
        if !pins.is_immovable(segment) && segment.start > cursor {
            segment.start = cursor;
        }
        cursor = cursor.max(segment.end());
    }
}

/// Expand phase: grows elastic segments into the gaps left after shifting.
///
/// Works per compartment, the stretch between two immovable segments (or an
/// axis edge). After the shift phase each compartment's movable segments sit
/// packed at its left edge, so its gap is the tail up to the next immovable.
fn expand_into_gaps(
    segments: &mut [Segment],
    config: &TimelineConfig,
    pins: &ReflowPins,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut lower = 0u32;
    let mut members: Vec<usize> = Vec::new();

    for index in 0..=segments.len() {
        let upper = match segments.get(index) {
            Some(segment) if pins.is_immovable(segment) => segment.start,
            Some(_) => {
                members.push(index);
                continue;
            }
            None => config.axis_length,
        };

        if let Some(diagnostic) = fill_compartment(segments, &members, lower, upper, pins) {
            diagnostics.push(diagnostic);
        }
        members.clear();
        if let Some(segment) = segments.get(index) {
            lower = lower.max(segment.end());
        }
    }

    diagnostics
}

fn fill_compartment(
    segments: &mut [Segment],
    members: &[usize],
    lower: u32,
    upper: u32,
    pins: &ReflowPins,
) -> Option<Diagnostic> {
    if upper <= lower {
        return None;
    }

    let Some(&first) = members.first() else {
        return Some(Diagnostic::NoFlexibleCapacity {
            start: lower,
            end: upper,
        });
    };

    let packed = members
        .windows(2)
        .all(|pair| segments[pair[0]].end() == segments[pair[1]].start);
    let occupied_end = members
        .iter()
        .map(|&index| segments[index].end())
        .max()
        .unwrap_or(lower);
    if occupied_end >= upper {
        return None;
    }
    let gap = Diagnostic::NoFlexibleCapacity {
        start: occupied_end,
        end: upper,
    };

    let elastic: Vec<usize> = members
        .iter()
        .copied()
        .filter(|&index| pins.is_elastic(&segments[index]))
        .collect();
    // A compartment with unresolved overlaps is left alone; repacking it
    // would push segments into the next immovable one.
    if elastic.is_empty() || !packed {
        return Some(gap);
    }

    let total = upper - occupied_end;
    let count = elastic.len() as u32;
    let share = total / count;
    let remainder = total % count;

    for (position, &index) in elastic.iter().enumerate() {
        let extra = share + u32::from((position as u32) < remainder);
        if extra == 0 {
            continue;
        }
        let segment = &mut segments[index];
        if segment.original_duration.is_none() {
            segment.original_duration = Some(segment.duration);
        }
        segment.duration += extra;
    }

    let mut cursor = segments[first].start;
    for &index in members {
        segments[index].start = cursor;
        cursor = segments[index].end();
    }

    None
}

#[cfg(test)]
mod tests {
    use super::apply_reflow;
    use crate::config::TimelineConfig;
    use crate::engine::Diagnostic;
    use crate::model::segment::Segment;

    fn config() -> TimelineConfig {
        TimelineConfig::default()
    }

    fn flex(id: &str, start: u32, duration: u32) -> Segment {
        Segment::new(id, start, duration, &config()).unwrap().flexible()
    }

    fn fixed(id: &str, start: u32, duration: u32) -> Segment {
        Segment::new(id, start, duration, &config()).unwrap()
    }

    fn bounds(segments: &[Segment]) -> Vec<(&str, u32, u32)> {
        segments
            .iter()
            .map(|segment| (segment.id.as_str(), segment.start, segment.end()))
            .collect()
    }

    #[test]
    fn covering_input_is_returned_unchanged() {
        let input = vec![flex("a", 0, 600), fixed("b", 600, 840)];

        let outcome = apply_reflow(input.clone(), &config());

        assert!(outcome.coverage_ok);
        assert!(outcome.diagnostics.is_empty());
        assert_eq!(outcome.segments, input);
    }

    #[test]
    fn gaps_are_shifted_out_then_split_equally_by_count() {
        let input = vec![flex("a", 100, 100), fixed("b", 300, 200), flex("c", 700, 400)];

        let outcome = apply_reflow(input, &config());

        // Shift packs [0,700); the 740 minute tail is split 370 / 370.
        assert!(outcome.coverage_ok);
        assert_eq!(
            bounds(&outcome.segments),
            vec![("a", 0, 470), ("b", 470, 670), ("c", 670, 1440)]
        );
        assert_eq!(outcome.segments[0].original_duration, Some(100));
        assert_eq!(outcome.segments[1].original_duration, None);
        assert_eq!(outcome.segments[2].original_duration, Some(400));
    }

    #[test]
    fn remainder_minutes_go_to_earliest_recipients() {
        let input = vec![flex("a", 0, 10), flex("b", 10, 10), flex("c", 20, 10)];
        let config = TimelineConfig::new(35, 1).unwrap();

        let outcome = apply_reflow(input, &config);

        assert!(outcome.coverage_ok);
        let durations: Vec<u32> = outcome.segments.iter().map(|s| s.duration).collect();
        assert_eq!(durations, vec![12, 12, 11]);
    }

    #[test]
    fn original_duration_is_kept_from_first_expansion() {
        let mut expanded = flex("a", 0, 500);
        expanded.original_duration = Some(300);

        let outcome = apply_reflow(vec![expanded], &config());

        assert_eq!(outcome.segments[0].duration, 1440);
        assert_eq!(outcome.segments[0].original_duration, Some(300));
    }

    #[test]
    fn gap_between_locked_segments_survives() {
        let input = vec![
            fixed("a", 0, 600).locked(),
            fixed("b", 700, 740).locked(),
        ];

        let outcome = apply_reflow(input.clone(), &config());

        assert!(!outcome.coverage_ok);
        assert_eq!(outcome.segments, input);
        assert_eq!(
            outcome.diagnostics,
            vec![Diagnostic::NoFlexibleCapacity {
                start: 600,
                end: 700
            }]
        );
    }

    #[test]
    fn gap_without_flexible_segment_is_reported() {
        let outcome = apply_reflow(vec![fixed("a", 200, 300)], &config());

        assert!(!outcome.coverage_ok);
        assert_eq!(bounds(&outcome.segments), vec![("a", 0, 300)]);
        assert_eq!(
            outcome.diagnostics,
            vec![Diagnostic::NoFlexibleCapacity {
                start: 300,
                end: 1440
            }]
        );
    }

    #[test]
    fn locked_segment_blocks_shift_but_not_expansion_on_either_side() {
        let input = vec![
            flex("a", 0, 100),
            fixed("lunch", 720, 60).locked(),
            flex("b", 900, 100),
        ];

        let outcome = apply_reflow(input, &config());

        assert!(outcome.coverage_ok);
        assert_eq!(
            bounds(&outcome.segments),
            vec![("a", 0, 720), ("lunch", 720, 780), ("b", 780, 1440)]
        );
    }

    #[test]
    fn overlap_and_gap_in_one_arrangement_are_both_fixed() {
        let input = vec![flex("a", 0, 500), flex("b", 400, 300)];

        let outcome = apply_reflow(input, &config());

        assert!(outcome.coverage_ok);
        assert_eq!(bounds(&outcome.segments), vec![("a", 0, 870), ("b", 870, 1440)]);
    }

    #[test]
    fn empty_timeline_reports_whole_axis() {
        let outcome = apply_reflow(Vec::new(), &config());

        assert!(!outcome.coverage_ok);
        assert_eq!(
            outcome.diagnostics,
            vec![Diagnostic::NoFlexibleCapacity {
                start: 0,
                end: 1440
            }]
        );
    }
}
