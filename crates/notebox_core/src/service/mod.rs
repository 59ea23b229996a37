//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate note store and image store calls into use-case level APIs.
//! - Keep read access behind its own seam so it can be replaced in tests.

pub mod note_service;
pub mod query_service;
