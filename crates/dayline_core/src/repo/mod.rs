//! Persistence port and reference storage adapter.
//!
//! # Responsibility
//! - Define the load/save contract the engine's callers depend on.
//! - Isolate SQLite details from service orchestration.
//!
//! # Invariants
//! - The engine never calls a repository; only services do.

pub mod segment_repo;
