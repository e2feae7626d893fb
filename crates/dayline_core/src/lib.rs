//! Core domain logic for Dayline, the gap-free day planner.
//! This crate is the single source of truth for timeline invariants.

pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, TimelineConfig};
pub use engine::coverage::validate_full_coverage;
pub use engine::edit::{
    delete_segment, insert_at_position, move_segment, resize_segment, restore_segment,
    split_segment,
};
pub use engine::gaps::{find_gaps, Gap};
pub use engine::overlap::{resolve_overlaps, OverlapResolution};
pub use engine::reflow::apply_reflow;
pub use engine::{Diagnostic, ReflowOutcome, TimelineError, TimelineResult};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::segment::{Segment, SegmentId, SegmentMetadata, SegmentValidationError};
pub use repo::segment_repo::{RepoError, RepoResult, SegmentRepository, SqliteSegmentRepository};
pub use service::timeline_service::{ServiceResult, TimelineService, TimelineServiceError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
