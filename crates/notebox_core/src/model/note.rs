//! Note domain model.
//!
//! # Responsibility
//! - Define `Note` and its ordered `ContentItem` sequence.
//! - Provide small helpers used at mapping boundaries (image urls, blank text).
//!
//! # Invariants
//! - `id == 0` means "not yet persisted"; storage assigns the real id.
//! - Position in `content` is the only ordering signal exposed to callers.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Storage-assigned note identifier. `0` marks a note that was never stored.
pub type NoteId = i64;

/// Identifier value carried by notes that have not been persisted yet.
pub const UNASSIGNED_NOTE_ID: NoteId = 0;

/// One ordered unit of a note body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    /// Plain text paragraph.
    Text { text: String },
    /// Image reference, either external (host-resolvable) or a managed path.
    Image { url: String },
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self::Image { url: url.into() }
    }

    /// Returns the image url for `Image` items.
    pub fn image_url(&self) -> Option<&str> {
        match self {
            Self::Image { url } => Some(url.as_str()),
            Self::Text { .. } => None,
        }
    }

    /// True for `Text` items holding only whitespace.
    pub fn is_blank_text(&self) -> bool {
        match self {
            Self::Text { text } => text.trim().is_empty(),
            Self::Image { .. } => false,
        }
    }
}

/// Note with metadata and ordered mixed content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: Vec<ContentItem>,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
    pub is_pinned: bool,
}

impl Note {
    /// Creates a note that has not been persisted yet.
    pub fn new(
        title: impl Into<String>,
        content: Vec<ContentItem>,
        is_pinned: bool,
        updated_at: i64,
    ) -> Self {
        Self {
            id: UNASSIGNED_NOTE_ID,
            title: title.into(),
            content,
            updated_at,
            is_pinned,
        }
    }

    /// Whether storage has assigned an id to this note.
    pub fn is_persisted(&self) -> bool {
        self.id != UNASSIGNED_NOTE_ID
    }

    /// Image urls in content order, duplicates included.
    pub fn image_urls(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(ContentItem::image_url)
    }
}

/// Current wall-clock time in epoch milliseconds.
///
/// Falls back to `0` if the system clock is set before the unix epoch.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
