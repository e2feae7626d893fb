//! Timeline domain model.
//!
//! # Responsibility
//! - Define the segment record arranged by the reflow engine.
//!
//! # Invariants
//! - Every segment is identified by a caller-stable `SegmentId`.
//! - Metadata is opaque to the engine.

pub mod segment;
