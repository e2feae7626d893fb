//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls around pure engine operations.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod timeline_service;
