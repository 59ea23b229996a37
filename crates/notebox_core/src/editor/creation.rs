//! New-note screen reducer.

use super::{append_image, edit_text, is_save_enabled, remove_image, without_blank_text};
use crate::model::note::ContentItem;
use crate::service::note_service::NoteWrite;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateNoteState {
    Creating {
        title: String,
        content: Vec<ContentItem>,
    },
    Finished,
}

impl Default for CreateNoteState {
    fn default() -> Self {
        Self::Creating {
            title: String::new(),
            content: vec![ContentItem::text("")],
        }
    }
}

impl CreateNoteState {
    pub fn is_save_enabled(&self) -> bool {
        match self {
            Self::Creating { title, content } => is_save_enabled(title, content),
            Self::Finished => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateNoteCommand {
    InputTitle(String),
    InputContent { index: usize, text: String },
    /// External image reference picked by the user.
    AddImage(String),
    DeleteImage(usize),
    Save,
    Back,
}

/// Applies one command. A `Save` on a saveable draft yields `NoteWrite::Add`.
pub fn reduce(
    state: CreateNoteState,
    command: CreateNoteCommand,
) -> (CreateNoteState, Option<NoteWrite>) {
    let CreateNoteState::Creating { mut title, mut content } = state else {
        return (CreateNoteState::Finished, None);
    };

    match command {
        CreateNoteCommand::InputTitle(value) => title = value,
        CreateNoteCommand::InputContent { index, text } => edit_text(&mut content, index, text),
        CreateNoteCommand::AddImage(url) => append_image(&mut content, url),
        CreateNoteCommand::DeleteImage(index) => remove_image(&mut content, index),
        CreateNoteCommand::Back => return (CreateNoteState::Finished, None),
        CreateNoteCommand::Save => {
            if !is_save_enabled(&title, &content) {
                return (CreateNoteState::Creating { title, content }, None);
            }
            let write = NoteWrite::Add {
                title,
                content: without_blank_text(content),
                is_pinned: false,
            };
            return (CreateNoteState::Finished, Some(write));
        }
    }

    (CreateNoteState::Creating { title, content }, None)
}
