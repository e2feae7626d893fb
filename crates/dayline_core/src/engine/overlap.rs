//! Overlap detection and resolution.
//!
//! # Responsibility
//! - Trim, displace or shrink elastic segments so neighbors abut instead of
//!   intersecting.
//!
//! # Invariants
//! - Only elastic segments (`flexible && !locked`, not pinned) are modified.
//! - No segment is shrunk below `min_duration` or placed outside the axis.
//! - When both contenders are elastic, the earlier keeps its size and the
//!   later yields; a swallowed later segment is pushed forward, never onto an
//!   immovable one.

use super::reflow::{sort_for_reflow, ReflowPins};
use super::Diagnostic;
use crate::config::TimelineConfig;
use crate::model::segment::Segment;

/// Arrangement after overlap resolution plus unresolved overlaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapResolution {
    pub segments: Vec<Segment>,
    pub diagnostics: Vec<Diagnostic>,
}

impl OverlapResolution {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Resolves every overlap it can, left to right.
///
/// Unresolvable pairs are left as they are and reported: `AllSegmentsLocked`
/// when neither side may shrink, `NoFlexibleCapacity` when the eligible side
/// is already at its minimum size.
pub fn resolve_overlaps(segments: Vec<Segment>, config: &TimelineConfig) -> OverlapResolution {
    resolve_with_pins(segments, config, &ReflowPins::none())
}

pub(crate) fn resolve_with_pins(
    mut segments: Vec<Segment>,
    config: &TimelineConfig,
    pins: &ReflowPins,
) -> OverlapResolution {
    // Displacement can bounce a segment between two immovable neighbors; cap
    // the passes and report whatever is still unresolved.
    let max_passes = segments.len() * 2 + 2;

    let mut diagnostics = Vec::new();
    for _ in 0..max_passes {
        sort_for_reflow(&mut segments, pins);
        let pass = run_pass(&mut segments, config, pins);
        diagnostics = pass.diagnostics;
        if !pass.changed {
            break;
        }
    }
    sort_for_reflow(&mut segments, pins);

    OverlapResolution {
        segments,
        diagnostics,
    }
}

#[derive(Default)]
struct PassReport {
    changed: bool,
    diagnostics: Vec<Diagnostic>,
}

fn run_pass(segments: &mut [Segment], config: &TimelineConfig, pins: &ReflowPins) -> PassReport {
    let mut report = PassReport::default();
    let fixed: Vec<(u32, u32)> = segments
        .iter()
        .filter(|segment| pins.is_immovable(segment))
        .map(|segment| (segment.start, segment.end()))
        .collect();

    // Each segment is checked against the predecessor reaching furthest, so
    // a long segment overlapping more than its direct neighbor is caught.
    let mut reach = 0;
    for index in 1..segments.len() {
        let (head, tail) = segments.split_at_mut(index);
        let earlier = &mut head[reach];
        let later = &mut tail[0];

        // A pair put out of order by a displacement earlier in this pass is
        // left to the next pass, which re-sorts.
        if later.start >= earlier.start && later.start < earlier.end() {
            match resolve_pair(earlier, later, config, pins, &fixed) {
                Ok(()) => report.changed = true,
                Err(diagnostic) => report.diagnostics.push(diagnostic),
            }
        }

        reach = furthest_reaching(&segments[..=index]);
    }

    report
}

fn furthest_reaching(segments: &[Segment]) -> usize {
    segments
        .iter()
        .enumerate()
        .max_by_key(|(_, segment)| segment.end())
        .map_or(0, |(index, _)| index)
}

/// Resolves one overlapping pair.
///
/// The later segment yields first: it is trimmed, or if swallowed, pushed
/// forward at minimum size. The earlier one is shrunk only when the later
/// one is ineligible or has nowhere to go; as a last resort the later one
/// is moved in front of the earlier.
fn resolve_pair(
    earlier: &mut Segment,
    later: &mut Segment,
    config: &TimelineConfig,
    pins: &ReflowPins,
    fixed: &[(u32, u32)],
) -> Result<(), Diagnostic> {
    let overlap_start = later.start;
    let overlap_end = earlier.end().min(later.end());
    let earlier_elastic = pins.is_elastic(earlier);
    let later_elastic = pins.is_elastic(later);

    if !earlier_elastic && !later_elastic {
        return Err(Diagnostic::AllSegmentsLocked {
            first: earlier.id.clone(),
            second: later.id.clone(),
            start: overlap_start,
            end: overlap_end,
        });
    }

    let resolved = (later_elastic
        && (trim_later(earlier, later, config)
            || push_later_forward(earlier, later, config, fixed)))
        || (earlier_elastic && shrink_earlier(earlier, later, config))
        || (later_elastic && move_later_in_front(earlier, later, config, fixed));

    if resolved {
        Ok(())
    } else {
        Err(Diagnostic::NoFlexibleCapacity {
            start: overlap_start,
            end: overlap_end,
        })
    }
}

/// Makes `later` start where `earlier` ends, keeping its end.
fn trim_later(earlier: &Segment, later: &mut Segment, config: &TimelineConfig) -> bool {
    let boundary = earlier.end();
    let later_end = later.end();

    if later_end >= boundary.saturating_add(config.min_duration) {
        later.start = boundary;
        later.duration = later_end - boundary;
        true
    } else {
        false
    }
}

/// Places a swallowed `later` segment right after `earlier` at minimum size.
///
/// Refused when that slot runs past the axis or into an immovable segment.
fn push_later_forward(
    earlier: &Segment,
    later: &mut Segment,
    config: &TimelineConfig,
    fixed: &[(u32, u32)],
) -> bool {
    let start = earlier.end();
    let end = start.saturating_add(config.min_duration);
    let blocked = end > config.axis_length
        || fixed
            .iter()
            .any(|&(fixed_start, fixed_end)| fixed_start < end && start < fixed_end);
    if blocked {
        return false;
    }

    later.start = start;
    later.duration = config.min_duration;
    true
}

/// Moves `later` in front of `earlier`, keeping as much of its size as fits
/// after the closest immovable segment.
fn move_later_in_front(
    earlier: &Segment,
    later: &mut Segment,
    config: &TimelineConfig,
    fixed: &[(u32, u32)],
) -> bool {
    let floor = fixed
        .iter()
        .map(|&(_, fixed_end)| fixed_end)
        .filter(|&fixed_end| fixed_end <= earlier.start)
        .max()
        .unwrap_or(0);
    let start = earlier.start.saturating_sub(later.duration).max(floor);
    if earlier.start - start < config.min_duration {
        return false;
    }

    later.start = start;
    later.duration = earlier.start - start;
    true
}

/// Makes `earlier` end where `later` starts, never below `min_duration`.
fn shrink_earlier(earlier: &mut Segment, later: &Segment, config: &TimelineConfig) -> bool {
    let wanted = later.start.saturating_sub(earlier.start);
    let target = wanted.max(config.min_duration);

    if target < earlier.duration {
        earlier.duration = target;
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::resolve_overlaps;
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
    fn later_segment_yields_when_both_are_flexible() {
        let resolution = resolve_overlaps(vec![flex("a", 0, 100), flex("b", 50, 100)], &config());

        assert!(resolution.is_clean());
        assert_eq!(bounds(&resolution.segments), vec![("a", 0, 100), ("b", 100, 150)]);
    }

    #[test]
    fn only_flexible_side_is_shrunk() {
        let resolution =
            resolve_overlaps(vec![flex("a", 0, 100), fixed("b", 60, 100)], &config());

        assert!(resolution.is_clean());
        assert_eq!(bounds(&resolution.segments), vec![("a", 0, 60), ("b", 60, 160)]);
    }

    #[test]
    fn locked_pair_is_left_untouched_and_flagged() {
        let input = vec![
            fixed("a", 0, 100).locked(),
            fixed("b", 80, 100).locked(),
        ];

        let resolution = resolve_overlaps(input.clone(), &config());

        assert_eq!(resolution.segments, input);
        assert_eq!(
            resolution.diagnostics,
            vec![Diagnostic::AllSegmentsLocked {
                first: "a".into(),
                second: "b".into(),
                start: 80,
                end: 100,
            }]
        );
    }

    #[test]
    fn locked_flexible_segment_is_not_eligible() {
        let resolution = resolve_overlaps(
            vec![flex("a", 0, 100).locked(), fixed("b", 50, 100)],
            &config(),
        );

        assert_eq!(resolution.diagnostics.len(), 1);
        assert_eq!(resolution.diagnostics[0].code(), "all_segments_locked");
    }

    #[test]
    fn shrink_stops_at_minimum_and_reports_residual() {
        let config = TimelineConfig::new(1440, 15).unwrap();
        let earlier = Segment::new("a", 0, 60, &config).unwrap().flexible();
        let later = Segment::new("b", 5, 60, &config).unwrap();

        let resolution = resolve_overlaps(vec![earlier, later], &config);

        assert_eq!(bounds(&resolution.segments), vec![("a", 0, 15), ("b", 5, 65)]);
        assert_eq!(
            resolution.diagnostics,
            vec![Diagnostic::NoFlexibleCapacity { start: 5, end: 15 }]
        );
    }

    #[test]
    fn swallowed_segment_is_pushed_forward_and_cascades() {
        let resolution = resolve_overlaps(
            vec![
                fixed("wide", 0, 200),
                flex("inner", 50, 20),
                flex("next", 200, 100),
            ],
            &config(),
        );

        assert!(resolution.is_clean());
        assert_eq!(
            bounds(&resolution.segments),
            vec![("wide", 0, 200), ("inner", 200, 201), ("next", 201, 300)]
        );
    }

    #[test]
    fn swallowed_flexible_segment_yields_to_flexible_earlier_one() {
        let resolution = resolve_overlaps(
            vec![flex("a", 0, 500), flex("b", 100, 100), flex("c", 500, 940)],
            &config(),
        );

        assert!(resolution.is_clean());
        assert_eq!(resolution.segments[0].duration, 500);
        assert_eq!(
            bounds(&resolution.segments),
            vec![("a", 0, 500), ("b", 500, 501), ("c", 501, 1440)]
        );
    }

    #[test]
    fn swallowed_segment_is_not_pushed_onto_locked_neighbor() {
        let resolution = resolve_overlaps(
            vec![
                flex("a", 0, 500),
                flex("b", 100, 100),
                fixed("lunch", 500, 60).locked(),
                flex("c", 560, 880),
            ],
            &config(),
        );

        assert!(resolution.is_clean());
        assert_eq!(
            bounds(&resolution.segments),
            vec![("a", 0, 100), ("b", 100, 200), ("lunch", 500, 560), ("c", 560, 1440)]
        );
    }

    #[test]
    fn overlap_beyond_direct_neighbor_is_reported() {
        let resolution = resolve_overlaps(
            vec![
                fixed("x", 0, 500).locked(),
                fixed("y", 100, 100).locked(),
                fixed("z", 300, 100),
            ],
            &config(),
        );

        assert_eq!(
            resolution.diagnostics,
            vec![
                Diagnostic::AllSegmentsLocked {
                    first: "x".into(),
                    second: "y".into(),
                    start: 100,
                    end: 200,
                },
                Diagnostic::AllSegmentsLocked {
                    first: "x".into(),
                    second: "z".into(),
                    start: 300,
                    end: 400,
                },
            ]
        );
    }

    #[test]
    fn swallowed_segment_at_axis_end_moves_in_front() {
        let resolution = resolve_overlaps(
            vec![
                flex("head", 0, 960),
                fixed("moved", 960, 480).locked(),
                flex("tail", 1000, 440),
            ],
            &config(),
        );

        assert!(resolution.is_clean());
        assert_eq!(
            bounds(&resolution.segments),
            vec![("head", 0, 520), ("tail", 520, 960), ("moved", 960, 1440)]
        );
    }
}
