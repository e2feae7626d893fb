//! Timeline use-case service.
//!
//! # Responsibility
//! - Wire load -> edit -> save around the pure engine.
//! - Emit one `timeline_edit` event per use-case call.
//!
//! # Invariants
//! - Structural edit errors leave storage untouched.
//! - Partial coverage is still saved; it is a displayable state.
//! - The service adds no locking; callers serialize edits per timeline.

use crate::config::TimelineConfig;
use crate::engine::edit::{
    delete_segment, insert_at_position, move_segment, resize_segment, restore_segment,
    split_segment,
};
use crate::engine::reflow::{apply_reflow, sort_for_reflow, ReflowPins};
use crate::engine::{ReflowOutcome, TimelineError};
use crate::model::segment::{Segment, SegmentId};
use crate::repo::segment_repo::{RepoError, SegmentRepository};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

#[derive(Debug)]
pub enum TimelineServiceError {
    Edit(TimelineError),
    Repo(RepoError),
}

impl Display for TimelineServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Edit(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TimelineServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Edit(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<TimelineError> for TimelineServiceError {
    fn from(value: TimelineError) -> Self {
        Self::Edit(value)
    }
}

impl From<RepoError> for TimelineServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type ServiceResult<T> = Result<T, TimelineServiceError>;

/// Persistence-aware facade over the edit operations.
pub struct TimelineService<R: SegmentRepository> {
    repo: R,
    config: TimelineConfig,
}

impl<R: SegmentRepository> TimelineService<R> {
    pub fn new(repo: R, config: TimelineConfig) -> Self {
        Self { repo, config }
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Loads a timeline in reflow order without modifying it.
    pub fn load(&self, timeline_id: &str) -> ServiceResult<Vec<Segment>> {
        let mut segments = self.repo.load_segments(timeline_id)?;
        sort_for_reflow(&mut segments, &ReflowPins::none());
        Ok(segments)
    }

    /// Stores an initial day template after reflowing it into shape.
    pub fn seed(&self, timeline_id: &str, template: Vec<Segment>) -> ServiceResult<ReflowOutcome> {
        self.run("seed", timeline_id, |_| Ok(apply_reflow(template, &self.config)))
    }

    pub fn move_segment(
        &self,
        timeline_id: &str,
        id: &SegmentId,
        new_start: u32,
    ) -> ServiceResult<ReflowOutcome> {
        self.run("move", timeline_id, |segments| {
            move_segment(segments, id, new_start, &self.config)
        })
    }

    pub fn resize_segment(
        &self,
        timeline_id: &str,
        id: &SegmentId,
        new_duration: u32,
    ) -> ServiceResult<ReflowOutcome> {
        self.run("resize", timeline_id, |segments| {
            resize_segment(segments, id, new_duration, &self.config)
        })
    }

    pub fn split_segment(
        &self,
        timeline_id: &str,
        id: &SegmentId,
        at: u32,
    ) -> ServiceResult<ReflowOutcome> {
        self.run("split", timeline_id, |segments| {
            split_segment(segments, id, at, &self.config)
        })
    }

    pub fn insert_at_position(
        &self,
        timeline_id: &str,
        segment: Segment,
        target_start: u32,
    ) -> ServiceResult<ReflowOutcome> {
        self.run("insert", timeline_id, |segments| {
            insert_at_position(segments, segment, target_start, &self.config)
        })
    }

    pub fn delete_segment(&self, timeline_id: &str, id: &SegmentId) -> ServiceResult<ReflowOutcome> {
        self.run("delete", timeline_id, |segments| {
            delete_segment(segments, id, &self.config)
        })
    }

    pub fn restore_segment(
        &self,
        timeline_id: &str,
        id: &SegmentId,
    ) -> ServiceResult<ReflowOutcome> {
        self.run("restore", timeline_id, |segments| {
            restore_segment(segments, id, &self.config)
        })
    }

    fn run(
        &self,
        op: &'static str,
        timeline_id: &str,
        edit: impl FnOnce(&[Segment]) -> Result<ReflowOutcome, TimelineError>,
    ) -> ServiceResult<ReflowOutcome> {
        let started_at = Instant::now();
        let current = self.load(timeline_id)?;

        let outcome = match edit(&current) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(
                    "event=timeline_edit module=service status=rejected op={op} duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                return Err(err.into());
            }
        };

        self.repo.save_segments(timeline_id, &outcome.segments)?;
        info!(
            "event=timeline_edit module=service status=ok op={op} segments={} coverage_ok={} diagnostics={} duration_ms={}",
            outcome.segments.len(),
            outcome.coverage_ok,
            outcome.diagnostics.len(),
            started_at.elapsed().as_millis()
        );
        Ok(outcome)
    }
}
