//! Existing-note editor reducer.

use super::{append_image, edit_text, is_save_enabled, remove_image, without_blank_text};
use crate::model::note::Note;
use crate::service::note_service::NoteWrite;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditNoteState {
    /// Waiting for the stored note to load.
    #[default]
    Initial,
    Editing(Note),
    Finished,
}

impl EditNoteState {
    pub fn is_save_enabled(&self) -> bool {
        match self {
            Self::Editing(note) => is_save_enabled(&note.title, &note.content),
            Self::Initial | Self::Finished => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditNoteCommand {
    /// The stored note finished loading.
    Loaded(Note),
    InputTitle(String),
    InputContent { index: usize, text: String },
    AddImage(String),
    DeleteImage(usize),
    Save,
    Delete,
    Back,
}

/// Applies one command. `Save` yields `NoteWrite::Update`, `Delete` yields
/// `NoteWrite::Delete`.
pub fn reduce(state: EditNoteState, command: EditNoteCommand) -> (EditNoteState, Option<NoteWrite>) {
    match (state, command) {
        (EditNoteState::Initial, EditNoteCommand::Loaded(note)) => (EditNoteState::Editing(note), None),
        (_, EditNoteCommand::Back) => (EditNoteState::Finished, None),
        (EditNoteState::Editing(mut note), command) => {
            match command {
                EditNoteCommand::InputTitle(title) => note.title = title,
                EditNoteCommand::InputContent { index, text } => {
                    edit_text(&mut note.content, index, text)
                }
                EditNoteCommand::AddImage(url) => append_image(&mut note.content, url),
                EditNoteCommand::DeleteImage(index) => remove_image(&mut note.content, index),
                EditNoteCommand::Save => {
                    if !is_save_enabled(&note.title, &note.content) {
                        return (EditNoteState::Editing(note), None);
                    }
                    note.content = without_blank_text(note.content);
                    return (EditNoteState::Finished, Some(NoteWrite::Update(note)));
                }
                EditNoteCommand::Delete => {
                    return (EditNoteState::Finished, Some(NoteWrite::Delete(note.id)));
                }
                EditNoteCommand::Loaded(_) | EditNoteCommand::Back => {}
            }
            (EditNoteState::Editing(note), None)
        }
        (state, _) => (state, None),
    }
}

#[cfg(test)]
mod tests {
    use super::{reduce, EditNoteCommand, EditNoteState};
    use crate::model::note::{ContentItem, Note};
    use crate::service::note_service::NoteWrite;

    fn stored_note() -> Note {
        Note {
            id: 4,
            title: "Groceries".to_string(),
            content: vec![
                ContentItem::text("milk"),
                ContentItem::image("/data/images/img_a.jpg"),
                ContentItem::text(""),
            ],
            updated_at: 10,
            is_pinned: true,
        }
    }

    fn editing() -> EditNoteState {
        reduce(EditNoteState::Initial, EditNoteCommand::Loaded(stored_note())).0
    }

    #[test]
    fn save_keeps_images_and_drops_blank_text() {
        let (state, write) = reduce(editing(), EditNoteCommand::Save);
        assert_eq!(state, EditNoteState::Finished);
        let Some(NoteWrite::Update(note)) = write else {
            panic!("expected update write");
        };
        assert_eq!(note.id, 4);
        assert_eq!(
            note.content,
            vec![
                ContentItem::text("milk"),
                ContentItem::image("/data/images/img_a.jpg"),
            ]
        );
        assert!(note.is_pinned);
    }

    #[test]
    fn delete_emits_delete_for_loaded_id() {
        let (state, write) = reduce(editing(), EditNoteCommand::Delete);
        assert_eq!(state, EditNoteState::Finished);
        assert_eq!(write, Some(NoteWrite::Delete(4)));
    }

    #[test]
    fn content_commands_before_load_are_ignored() {
        let (state, write) = reduce(EditNoteState::Initial, EditNoteCommand::Save);
        assert_eq!(state, EditNoteState::Initial);
        assert!(write.is_none());
    }

    #[test]
    fn deleting_last_image_then_blank_text_disables_save() {
        let (state, _) = reduce(
            editing(),
            EditNoteCommand::InputContent {
                index: 0,
                text: " ".to_string(),
            },
        );
        let (state, _) = reduce(state, EditNoteCommand::DeleteImage(1));
        assert!(!state.is_save_enabled());
        let (state, write) = reduce(state, EditNoteCommand::Save);
        assert!(matches!(state, EditNoteState::Editing(_)));
        assert!(write.is_none());
    }
}
