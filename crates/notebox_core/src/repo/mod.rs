//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the note storage contract used by reconciliation and queries.
//! - Isolate SQLite query details and row mapping from orchestration code.
//!
//! # Invariants
//! - Note row and content rows are always written in one transaction.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod content_mapper;
pub mod live;
pub mod note_repo;
