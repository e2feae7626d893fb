//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the timeline edit operations to Dart via FRB.
//! - Translate between plain DTOs and core domain types.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Edit calls are stateless: the caller passes the current arrangement and
//!   receives the next one.
//! - Structural errors come back as `ok = false` with a message; partial
//!   coverage comes back as `ok = true, coverage_ok = false`.

use dayline_core::db::open_db;
use dayline_core::{
    core_version as core_version_inner, delete_segment, find_gaps,
    init_logging as init_logging_inner, insert_at_position, move_segment, ping as ping_inner,
    resize_segment, restore_segment, split_segment, validate_full_coverage, Diagnostic,
    ReflowOutcome, Segment, SegmentId, SegmentMetadata, SegmentRepository,
    SqliteSegmentRepository, TimelineConfig, TimelineError, TimelineService,
};
use log::warn;
use std::path::PathBuf;
use std::sync::OnceLock;

const TIMELINE_DB_FILE_NAME: &str = "dayline_timeline.sqlite3";
static TIMELINE_DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Segment as seen by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentDto {
    pub id: String,
    /// Minutes from the start of the axis.
    pub start: u32,
    /// Length in minutes.
    pub duration: u32,
    pub locked: bool,
    pub flexible: bool,
    /// Size before the first automatic expansion, if any.
    pub original_duration: Option<u32>,
    pub title: String,
    pub color: Option<String>,
    pub category: Option<String>,
}

/// Axis settings; `None` at call sites means a 1440-minute axis with a
/// 1-minute minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineConfigDto {
    pub axis_length: u32,
    pub min_duration: u32,
}

/// Non-fatal reflow diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineDiagnosticDto {
    /// `no_flexible_capacity` or `all_segments_locked`.
    pub reason: String,
    pub start: u32,
    pub end: u32,
    /// Overlapping pair, only for `all_segments_locked`.
    pub first_id: Option<String>,
    pub second_id: Option<String>,
}

/// Response envelope shared by every timeline call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEditResponse {
    /// Whether the call was applied.
    pub ok: bool,
    /// Arrangement after the call, in start order (input unchanged on failure).
    pub segments: Vec<SegmentDto>,
    /// Whether the axis is fully and exactly covered.
    pub coverage_ok: bool,
    pub diagnostics: Vec<TimelineDiagnosticDto>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl TimelineEditResponse {
    fn from_outcome(outcome: ReflowOutcome, message: impl Into<String>) -> Self {
        Self {
            ok: true,
            segments: outcome.segments.iter().map(to_segment_dto).collect(),
            coverage_ok: outcome.coverage_ok,
            diagnostics: outcome.diagnostics.iter().map(to_diagnostic_dto).collect(),
            message: message.into(),
        }
    }

    fn failure(segments: Vec<SegmentDto>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            segments,
            coverage_ok: false,
            diagnostics: Vec::new(),
            message: message.into(),
        }
    }
}

/// Moves one segment to `new_start`, keeping its duration.
///
/// # FFI contract
/// - Sync call, pure computation.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn timeline_move(
    segments: Vec<SegmentDto>,
    id: String,
    new_start: u32,
    config: Option<TimelineConfigDto>,
) -> TimelineEditResponse {
    run_edit("timeline_move", segments, to_config(config), |current, config| {
        move_segment(current, &SegmentId::new(id), new_start, config)
    })
}

/// Changes one segment's duration (clamped to the minimum and the axis).
///
/// # FFI contract
/// - Sync call, pure computation.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn timeline_resize(
    segments: Vec<SegmentDto>,
    id: String,
    new_duration: u32,
    config: Option<TimelineConfigDto>,
) -> TimelineEditResponse {
    run_edit("timeline_resize", segments, to_config(config), |current, config| {
        resize_segment(current, &SegmentId::new(id), new_duration, config)
    })
}

/// Splits one segment at absolute minute `at`.
///
/// # FFI contract
/// - Sync call, pure computation.
/// - Never panics; `at` outside the segment yields `ok = false`.
#[flutter_rust_bridge::frb(sync)]
pub fn timeline_split(
    segments: Vec<SegmentDto>,
    id: String,
    at: u32,
    config: Option<TimelineConfigDto>,
) -> TimelineEditResponse {
    run_edit("timeline_split", segments, to_config(config), |current, config| {
        split_segment(current, &SegmentId::new(id), at, config)
    })
}

/// Inserts `segment` at `target_start`; a blank id gets a generated one.
///
/// # FFI contract
/// - Sync call, pure computation.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn timeline_insert(
    segments: Vec<SegmentDto>,
    segment: SegmentDto,
    target_start: u32,
    config: Option<TimelineConfigDto>,
) -> TimelineEditResponse {
    let config = to_config(config);
    // Placement is decided by the insert itself, so validate the size only.
    let inserted = match to_segment(SegmentDto { start: 0, ..segment }, &config) {
        Ok(inserted) => inserted,
        Err(err) => {
            return TimelineEditResponse::failure(segments, format!("timeline_insert failed: {err}"))
        }
    };
    run_edit("timeline_insert", segments, config, |current, config| {
        insert_at_position(current, inserted, target_start, config)
    })
}

/// Removes one segment and reflows.
///
/// # FFI contract
/// - Sync call, pure computation.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn timeline_delete(
    segments: Vec<SegmentDto>,
    id: String,
    config: Option<TimelineConfigDto>,
) -> TimelineEditResponse {
    run_edit("timeline_delete", segments, to_config(config), |current, config| {
        delete_segment(current, &SegmentId::new(id), config)
    })
}

/// Shrinks an expanded segment back to its `original_duration`.
///
/// # FFI contract
/// - Sync call, pure computation.
/// - Never panics; segments without a recorded size are returned reflowed.
#[flutter_rust_bridge::frb(sync)]
pub fn timeline_restore(
    segments: Vec<SegmentDto>,
    id: String,
    config: Option<TimelineConfigDto>,
) -> TimelineEditResponse {
    run_edit("timeline_restore", segments, to_config(config), |current, config| {
        restore_segment(current, &SegmentId::new(id), config)
    })
}

/// Reports whether `segments` cover the axis, without changing them.
///
/// # FFI contract
/// - Sync call, pure computation.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn timeline_validate(
    segments: Vec<SegmentDto>,
    config: Option<TimelineConfigDto>,
) -> TimelineEditResponse {
    let config = to_config(config);
    let mut domain = match to_segments(segments.clone(), &config) {
        Ok(domain) => domain,
        Err(err) => {
            return TimelineEditResponse::failure(segments, format!("timeline_validate failed: {err}"))
        }
    };
    domain.sort_by_key(|segment| segment.start);

    let coverage_ok = validate_full_coverage(&domain, config.axis_length);
    let message = if coverage_ok {
        "Timeline is fully covered.".to_string()
    } else {
        format!(
            "Timeline is not fully covered ({} gap(s)).",
            find_gaps(&domain, config.axis_length).len()
        )
    };

    TimelineEditResponse {
        ok: true,
        segments: domain.iter().map(to_segment_dto).collect(),
        coverage_ok,
        diagnostics: Vec::new(),
        message,
    }
}

/// Loads a stored timeline.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Unknown timelines load as an empty arrangement.
/// - `config = None` checks coverage against the default axis.
#[flutter_rust_bridge::frb(sync)]
pub fn timeline_load(
    timeline_id: String,
    config: Option<TimelineConfigDto>,
) -> TimelineEditResponse {
    let config = to_config(config);
    let loaded = with_repo(|repo| TimelineService::new(repo, config).load(&timeline_id));
    match loaded {
        Ok(segments) => TimelineEditResponse {
            ok: true,
            segments: segments.iter().map(to_segment_dto).collect(),
            coverage_ok: validate_full_coverage(&segments, config.axis_length),
            diagnostics: Vec::new(),
            message: format!("Loaded {} segment(s).", segments.len()),
        },
        Err(err) => {
            warn!("event=ffi_call module=ffi status=error op=timeline_load error={err}");
            TimelineEditResponse::failure(Vec::new(), format!("timeline_load failed: {err}"))
        }
    }
}

/// Replaces a stored timeline with `segments`.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Segments are validated against `config` (default axis when `None`)
///   before writing.
#[flutter_rust_bridge::frb(sync)]
pub fn timeline_save(
    timeline_id: String,
    segments: Vec<SegmentDto>,
    config: Option<TimelineConfigDto>,
) -> TimelineEditResponse {
    let config = to_config(config);
    let mut domain = match to_segments(segments.clone(), &config) {
        Ok(domain) => domain,
        Err(err) => {
            return TimelineEditResponse::failure(segments, format!("timeline_save failed: {err}"))
        }
    };
    domain.sort_by_key(|segment| segment.start);

    match with_repo(|repo| repo.save_segments(&timeline_id, &domain)) {
        Ok(()) => TimelineEditResponse {
            ok: true,
            coverage_ok: validate_full_coverage(&domain, config.axis_length),
            segments,
            diagnostics: Vec::new(),
            message: format!("Saved {} segment(s).", domain.len()),
        },
        Err(err) => {
            warn!("event=ffi_call module=ffi status=error op=timeline_save error={err}");
            TimelineEditResponse::failure(segments, format!("timeline_save failed: {err}"))
        }
    }
}

fn run_edit(
    op: &'static str,
    segments: Vec<SegmentDto>,
    config: TimelineConfig,
    edit: impl FnOnce(&[Segment], &TimelineConfig) -> Result<ReflowOutcome, TimelineError>,
) -> TimelineEditResponse {
    let domain = match to_segments(segments.clone(), &config) {
        Ok(domain) => domain,
        Err(err) => return TimelineEditResponse::failure(segments, format!("{op} failed: {err}")),
    };

    match edit(&domain, &config) {
        Ok(outcome) => {
            let message = if outcome.coverage_ok {
                "Timeline updated.".to_string()
            } else {
                format!(
                    "Timeline updated with {} unresolved range(s).",
                    outcome.diagnostics.len()
                )
            };
            TimelineEditResponse::from_outcome(outcome, message)
        }
        Err(err) => {
            warn!("event=ffi_call module=ffi status=rejected op={op} error={err}");
            TimelineEditResponse::failure(segments, format!("{op} failed: {err}"))
        }
    }
}

fn to_config(config: Option<TimelineConfigDto>) -> TimelineConfig {
    config.map_or_else(TimelineConfig::default, |dto| TimelineConfig {
        axis_length: dto.axis_length,
        min_duration: dto.min_duration,
    })
}

fn to_segments(
    dtos: Vec<SegmentDto>,
    config: &TimelineConfig,
) -> Result<Vec<Segment>, TimelineError> {
    config.validate()?;
    dtos.into_iter()
        .map(|dto| to_segment(dto, config))
        .collect()
}

fn to_segment(dto: SegmentDto, config: &TimelineConfig) -> Result<Segment, TimelineError> {
    let id = if dto.id.trim().is_empty() {
        SegmentId::generate()
    } else {
        SegmentId::new(dto.id)
    };
    let mut segment = Segment::new(id, dto.start, dto.duration, config)?.with_metadata(
        SegmentMetadata {
            title: dto.title,
            color: dto.color,
            category: dto.category,
        },
    );
    segment.locked = dto.locked;
    segment.flexible = dto.flexible;
    segment.original_duration = dto.original_duration;
    Ok(segment)
}

fn to_segment_dto(segment: &Segment) -> SegmentDto {
    SegmentDto {
        id: segment.id.to_string(),
        start: segment.start,
        duration: segment.duration,
        locked: segment.locked,
        flexible: segment.flexible,
        original_duration: segment.original_duration,
        title: segment.metadata.title.clone(),
        color: segment.metadata.color.clone(),
        category: segment.metadata.category.clone(),
    }
}

fn to_diagnostic_dto(diagnostic: &Diagnostic) -> TimelineDiagnosticDto {
    match diagnostic {
        Diagnostic::NoFlexibleCapacity { start, end } => TimelineDiagnosticDto {
            reason: diagnostic.code().to_string(),
            start: *start,
            end: *end,
            first_id: None,
            second_id: None,
        },
        Diagnostic::AllSegmentsLocked {
            first,
            second,
            start,
            end,
        } => TimelineDiagnosticDto {
            reason: diagnostic.code().to_string(),
            start: *start,
            end: *end,
            first_id: Some(first.to_string()),
            second_id: Some(second.to_string()),
        },
    }
}

fn resolve_timeline_db_path() -> PathBuf {
    TIMELINE_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("DAYLINE_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(TIMELINE_DB_FILE_NAME)
        })
        .clone()
}

fn with_repo<T, E: std::fmt::Display>(
    f: impl FnOnce(&SqliteSegmentRepository<'_>) -> Result<T, E>,
) -> Result<T, String> {
    let db_path = resolve_timeline_db_path();
    let conn = open_db(&db_path).map_err(|err| format!("timeline DB open failed: {err}"))?;
    let repo = SqliteSegmentRepository::new(&conn);
    f(&repo).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, init_logging, ping, timeline_delete, timeline_insert, timeline_load,
        timeline_move, timeline_restore, timeline_save, timeline_split, timeline_validate,
        SegmentDto, TimelineConfigDto,
    };
    use std::time::{SystemTime, UNIX_EPOCH};

    fn dto(id: &str, start: u32, duration: u32, locked: bool, flexible: bool) -> SegmentDto {
        SegmentDto {
            id: id.to_string(),
            start,
            duration,
            locked,
            flexible,
            original_duration: None,
            title: id.to_string(),
            color: None,
            category: None,
        }
    }

    fn day() -> Vec<SegmentDto> {
        vec![
            dto("sleep", 0, 480, true, false),
            dto("work", 480, 480, false, true),
            dto("evening", 960, 480, false, true),
        ]
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn delete_returns_reflowed_arrangement_with_titles() {
        let response = timeline_delete(day(), "work".to_string(), None);

        assert!(response.ok, "{}", response.message);
        assert!(response.coverage_ok);
        assert_eq!(response.segments.len(), 2);
        let evening = &response.segments[1];
        assert_eq!((evening.start, evening.duration), (480, 960));
        assert_eq!(evening.original_duration, Some(480));
        assert_eq!(evening.title, "evening");
    }

    #[test]
    fn move_of_unknown_segment_fails_and_echoes_input() {
        let response = timeline_move(day(), "nap".to_string(), 10, None);

        assert!(!response.ok);
        assert_eq!(response.segments, day());
        assert!(response.message.contains("segment not found"));
    }

    #[test]
    fn split_outside_segment_is_rejected() {
        let response = timeline_split(day(), "work".to_string(), 960, None);

        assert!(!response.ok);
        assert!(response.message.starts_with("timeline_split failed"));
    }

    #[test]
    fn insert_with_blank_id_gets_generated_id() {
        let meeting = dto("", 0, 30, true, false);

        let response = timeline_insert(day(), meeting, 500, None);

        assert!(response.ok, "{}", response.message);
        assert!(response.coverage_ok);
        let inserted = response
            .segments
            .iter()
            .find(|segment| segment.start == 500)
            .expect("inserted segment");
        assert_eq!(inserted.duration, 30);
        assert!(!inserted.id.is_empty());
    }

    #[test]
    fn segments_below_configured_minimum_are_rejected() {
        let config = TimelineConfigDto {
            axis_length: 1440,
            min_duration: 15,
        };
        let mut segments = day();
        segments.push(dto("blip", 100, 5, false, true));

        let response = timeline_validate(segments, Some(config));

        assert!(!response.ok);
    }

    #[test]
    fn locked_gap_is_reported_as_diagnostic() {
        let segments = vec![dto("a", 0, 700, true, false), dto("b", 700, 740, true, false)];

        let response = timeline_delete(segments, "b".to_string(), None);

        assert!(response.ok);
        assert!(!response.coverage_ok);
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].reason, "no_flexible_capacity");
        assert_eq!(
            (response.diagnostics[0].start, response.diagnostics[0].end),
            (700, 1440)
        );
    }

    #[test]
    fn restore_shrinks_expanded_segment_back() {
        let mut segments = day();
        segments[2].original_duration = Some(240);

        let response = timeline_restore(segments, "evening".to_string(), None);

        assert!(response.ok, "{}", response.message);
        assert!(response.coverage_ok);
        let work = &response.segments[1];
        assert_eq!((work.start, work.duration), (480, 720));
        let evening = &response.segments[2];
        assert_eq!((evening.start, evening.duration), (1200, 240));
        assert_eq!(evening.original_duration, None);
    }

    #[test]
    fn restore_keeps_coverage_when_nothing_else_can_absorb() {
        let deleted = timeline_delete(day(), "work".to_string(), None);

        let response = timeline_restore(deleted.segments, "evening".to_string(), None);

        assert!(response.ok, "{}", response.message);
        assert!(response.coverage_ok);
        let evening = &response.segments[1];
        assert_eq!((evening.start, evening.duration), (480, 960));
    }

    #[test]
    fn validate_reports_gaps_without_changing_segments() {
        let segments = vec![dto("a", 0, 600, false, true), dto("b", 700, 740, false, true)];

        let response = timeline_validate(segments.clone(), None);

        assert!(response.ok);
        assert!(!response.coverage_ok);
        assert_eq!(response.segments, segments);
        assert!(response.message.contains("1 gap"));
    }

    #[test]
    fn save_then_load_round_trips_through_database() {
        let timeline_id = unique_token("ffi-timeline");

        let saved = timeline_save(timeline_id.clone(), day(), None);
        assert!(saved.ok, "{}", saved.message);

        let loaded = timeline_load(timeline_id, None);
        assert!(loaded.ok, "{}", loaded.message);
        assert!(loaded.coverage_ok);
        assert_eq!(loaded.segments, day());
    }

    #[test]
    fn save_and_load_honor_custom_axis() {
        let timeline_id = unique_token("ffi-short-axis");
        let config = TimelineConfigDto {
            axis_length: 600,
            min_duration: 15,
        };
        let segments = vec![
            dto("focus", 0, 450, false, true),
            dto("wrap-up", 450, 150, false, true),
        ];

        let rejected = timeline_save(timeline_id.clone(), day(), Some(config));
        assert!(!rejected.ok);

        let saved = timeline_save(timeline_id.clone(), segments.clone(), Some(config));
        assert!(saved.ok, "{}", saved.message);
        assert!(saved.coverage_ok);

        let loaded = timeline_load(timeline_id.clone(), Some(config));
        assert!(loaded.coverage_ok);
        assert_eq!(loaded.segments, segments);

        let on_default_axis = timeline_load(timeline_id, None);
        assert!(on_default_axis.ok);
        assert!(!on_default_axis.coverage_ok);
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }
}
