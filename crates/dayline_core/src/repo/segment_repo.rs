//! Segment persistence port and its SQLite implementation.
//!
//! # Responsibility
//! - Load and save whole timelines for callers of the engine.
//! - Keep SQL details out of engine and service code.
//!
//! # Invariants
//! - `save_segments` replaces a timeline's rows atomically.
//! - Read paths reject corrupt rows instead of masking them.

use crate::db::DbError;
use crate::model::segment::{Segment, SegmentId, SegmentMetadata};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidTimelineId(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidTimelineId(value) => write!(f, "timeline id is invalid: `{value}`"),
            Self::InvalidData(message) => write!(f, "invalid persisted segment data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidTimelineId(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence port consumed around the engine.
pub trait SegmentRepository {
    /// Returns every segment of a timeline; order is not guaranteed.
    fn load_segments(&self, timeline_id: &str) -> RepoResult<Vec<Segment>>;
    /// Replaces all segments of a timeline.
    fn save_segments(&self, timeline_id: &str, segments: &[Segment]) -> RepoResult<()>;
}

impl<R: SegmentRepository + ?Sized> SegmentRepository for &R {
    fn load_segments(&self, timeline_id: &str) -> RepoResult<Vec<Segment>> {
        (**self).load_segments(timeline_id)
    }

    fn save_segments(&self, timeline_id: &str, segments: &[Segment]) -> RepoResult<()> {
        (**self).save_segments(timeline_id, segments)
    }
}

/// SQLite-backed segment store.
pub struct SqliteSegmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSegmentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SegmentRepository for SqliteSegmentRepository<'_> {
    fn load_segments(&self, timeline_id: &str) -> RepoResult<Vec<Segment>> {
        let timeline_id = normalize_timeline_id(timeline_id)?;
        let mut stmt = self.conn.prepare(
            "SELECT
                segment_id,
                start_min,
                duration_min,
                locked,
                flexible,
                original_duration,
                metadata_json
             FROM timeline_segments
             WHERE timeline_id = ?1
             ORDER BY start_min ASC, segment_id ASC;",
        )?;

        let mut rows = stmt.query([timeline_id])?;
        let mut segments = Vec::new();
        while let Some(row) = rows.next()? {
            segments.push(parse_segment_row(row)?);
        }

        Ok(segments)
    }

    fn save_segments(&self, timeline_id: &str, segments: &[Segment]) -> RepoResult<()> {
        let timeline_id = normalize_timeline_id(timeline_id)?;
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "DELETE FROM timeline_segments WHERE timeline_id = ?1;",
            [timeline_id],
        )?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO timeline_segments (
                    timeline_id,
                    segment_id,
                    start_min,
                    duration_min,
                    locked,
                    flexible,
                    original_duration,
                    metadata_json
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            )?;
            for segment in segments {
                let metadata_json = serde_json::to_string(&segment.metadata).map_err(|err| {
                    RepoError::InvalidData(format!(
                        "segment {} metadata is not serializable: {err}",
                        segment.id
                    ))
                })?;
                insert.execute(params![
                    timeline_id,
                    segment.id.as_str(),
                    segment.start,
                    segment.duration,
                    segment.locked,
                    segment.flexible,
                    segment.original_duration,
                    metadata_json,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

fn normalize_timeline_id(value: &str) -> RepoResult<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RepoError::InvalidTimelineId(value.to_string()));
    }
    Ok(trimmed)
}

fn parse_segment_row(row: &Row<'_>) -> RepoResult<Segment> {
    let segment_id: String = row.get("segment_id")?;
    let start = minutes(row.get("start_min")?, "start_min")?;
    let duration = minutes(row.get("duration_min")?, "duration_min")?;
    let original_duration = match row.get::<_, Option<i64>>("original_duration")? {
        Some(value) => Some(minutes(value, "original_duration")?),
        None => None,
    };

    let metadata_text: String = row.get("metadata_json")?;
    let metadata: SegmentMetadata = serde_json::from_str(&metadata_text).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid metadata for segment `{segment_id}` in timeline_segments.metadata_json: {err}"
        ))
    })?;

    Ok(Segment {
        id: SegmentId::new(segment_id),
        start,
        duration,
        locked: flag(row.get("locked")?, "locked")?,
        flexible: flag(row.get("flexible")?, "flexible")?,
        original_duration,
        metadata,
    })
}

fn minutes(value: i64, column: &str) -> RepoResult<u32> {
    u32::try_from(value).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid minute value `{value}` in timeline_segments.{column}"
        ))
    })
}

fn flag(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in timeline_segments.{column}"
        ))),
    }
}
