//! Notes list screen reducer.

use crate::model::note::{ContentItem, Note, NoteId};
use crate::repo::live::LiveNotes;
use crate::service::note_service::NoteWrite;
use crate::service::query_service::NoteQueries;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotesScreenState {
    /// Trimmed search text; empty means "all notes".
    pub query: String,
    pub pinned: Vec<Note>,
    pub others: Vec<Note>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotesCommand {
    AddNote { title: String, text: String },
    SearchNote(String),
    SwitchPinnedStatus(NoteId),
}

/// Applies one command. A changed `query` means the host must resubscribe
/// with [`subscribe`].
pub fn reduce(
    mut state: NotesScreenState,
    command: NotesCommand,
) -> (NotesScreenState, Option<NoteWrite>) {
    match command {
        NotesCommand::AddNote { title, text } => {
            let write = NoteWrite::Add {
                title,
                content: vec![ContentItem::Text { text }],
                is_pinned: false,
            };
            (state, Some(write))
        }
        NotesCommand::SearchNote(query) => {
            state.query = query.trim().to_string();
            (state, None)
        }
        NotesCommand::SwitchPinnedStatus(id) => (state, Some(NoteWrite::SwitchPinned(id))),
    }
}

/// Splits a fresh snapshot into pinned and other notes, keeping order.
pub fn apply_snapshot(mut state: NotesScreenState, notes: Vec<Note>) -> NotesScreenState {
    let (pinned, others): (Vec<Note>, Vec<Note>) =
        notes.into_iter().partition(|note| note.is_pinned);
    state.pinned = pinned;
    state.others = others;
    state
}

/// Opens the live query matching the current search text.
pub fn subscribe(queries: &impl NoteQueries, query: &str) -> LiveNotes {
    if query.trim().is_empty() {
        queries.all_notes()
    } else {
        queries.search_notes(query.trim())
    }
}
