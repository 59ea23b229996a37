//! Read-side note queries.
//!
//! # Responsibility
//! - Expose "all notes" and "search notes" as live, ordered sequences.
//!
//! # Invariants
//! - Results match the underlying store exactly (same filter, same order).

use crate::repo::live::LiveNotes;
use crate::repo::note_repo::NoteStore;

/// Live read contract consumed by list screens.
pub trait NoteQueries {
    /// All notes, most recently updated first.
    fn all_notes(&self) -> LiveNotes;
    /// Notes whose title or text contains `query` (case-sensitive).
    fn search_notes(&self, query: &str) -> LiveNotes;
}

/// Store-backed implementation of `NoteQueries`.
pub struct NoteQueryService<S: NoteStore> {
    store: S,
}

impl<S: NoteStore> NoteQueryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: NoteStore> NoteQueries for NoteQueryService<S> {
    fn all_notes(&self) -> LiveNotes {
        self.store.all_notes()
    }

    fn search_notes(&self, query: &str) -> LiveNotes {
        self.store.search_notes(query)
    }
}
