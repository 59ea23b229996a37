//! Mapping between `ContentItem` sequences and `note_content` rows.
//!
//! # Invariants
//! - Row `position` is the zero-based index of the item at write time.
//! - Re-assembly sorts rows by ascending `position`.

use crate::model::note::{ContentItem, NoteId};

/// Discriminator stored in `note_content.content_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Image,
}

/// Flat storage shape of one content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRow {
    pub note_id: NoteId,
    pub position: i64,
    pub kind: ContentKind,
    /// Text body or image url, depending on `kind`.
    pub content: String,
}

/// Flattens ordered items into rows tagged with `note_id` and their index.
pub fn to_content_rows(note_id: NoteId, items: &[ContentItem]) -> Vec<ContentRow> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let (kind, content) = match item {
                ContentItem::Text { text } => (ContentKind::Text, text.clone()),
                ContentItem::Image { url } => (ContentKind::Image, url.clone()),
            };
            ContentRow {
                note_id,
                position: index as i64,
                kind,
                content,
            }
        })
        .collect()
}

/// Re-assembles rows into an ordered item sequence.
pub fn to_content_items(mut rows: Vec<ContentRow>) -> Vec<ContentItem> {
    rows.sort_by_key(|row| row.position);
    rows.into_iter()
        .map(|row| match row.kind {
            ContentKind::Text => ContentItem::Text { text: row.content },
            ContentKind::Image => ContentItem::Image { url: row.content },
        })
        .collect()
}

pub fn content_kind_to_db(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Text => "text",
        ContentKind::Image => "image",
    }
}

pub fn parse_content_kind(value: &str) -> Option<ContentKind> {
    match value {
        "text" => Some(ContentKind::Text),
        "image" => Some(ContentKind::Image),
        _ => None,
    }
}
