//! Note content and image blob consistency engine.
//!
//! Keeps note rows, their ordered text/image content and the managed image
//! directory mutually consistent, and serves live ordered reads.

pub mod blob;
pub mod config;
pub mod db;
pub mod editor;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use blob::image_store::{BlobError, BlobResult, FileImageSource, ImageSource, ImageStore};
pub use config::EngineConfig;
pub use engine::{EngineError, NotesEngine};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::note::{now_epoch_ms, ContentItem, Note, NoteId, UNASSIGNED_NOTE_ID};
pub use repo::live::LiveNotes;
pub use repo::note_repo::{NoteStore, RepoError, RepoResult, SqliteNoteStore};
pub use service::note_service::{NoteService, NoteServiceError, NoteServiceResult, NoteWrite};
pub use service::query_service::{NoteQueries, NoteQueryService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
