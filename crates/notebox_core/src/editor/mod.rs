//! Pure state reducers for note screens.
//!
//! # Responsibility
//! - Apply user commands to explicit screen states without side effects.
//! - Hand storage work back to the caller as a `NoteWrite` at defined
//!   transitions (save, delete, pin toggle, quick add).
//!
//! # Invariants
//! - Reducers never call storage; the host applies returned writes through
//!   `NoteService::apply`.
//! - Saved content never carries blank text items; images are always kept.

pub mod creation;
pub mod editing;
pub mod notes_list;

use crate::model::note::ContentItem;

/// Whether a draft may be saved: non-blank title and at least one image or
/// non-blank text.
pub fn is_save_enabled(title: &str, content: &[ContentItem]) -> bool {
    !title.trim().is_empty() && content.iter().any(|item| !item.is_blank_text())
}

/// Replaces the text at `index`; non-text items and out-of-range indexes are
/// left untouched.
fn edit_text(content: &mut [ContentItem], index: usize, new_text: String) {
    if let Some(ContentItem::Text { text }) = content.get_mut(index) {
        *text = new_text;
    }
}

/// Appends an image followed by a fresh text slot, dropping a trailing blank
/// text first so empty paragraphs do not pile up.
fn append_image(content: &mut Vec<ContentItem>, url: String) {
    if content.last().is_some_and(ContentItem::is_blank_text) {
        content.pop();
    }
    content.push(ContentItem::Image { url });
    content.push(ContentItem::text(""));
}

fn remove_image(content: &mut Vec<ContentItem>, index: usize) {
    if matches!(content.get(index), Some(ContentItem::Image { .. })) {
        content.remove(index);
    }
}

fn without_blank_text(content: Vec<ContentItem>) -> Vec<ContentItem> {
    content
        .into_iter()
        .filter(|item| !item.is_blank_text())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{append_image, is_save_enabled, remove_image, without_blank_text};
    use crate::model::note::ContentItem;

    #[test]
    fn save_requires_title_and_meaningful_content() {
        let text = vec![ContentItem::text("body")];
        let blank = vec![ContentItem::text("  ")];
        let image = vec![ContentItem::image("content://1"), ContentItem::text("")];

        assert!(is_save_enabled("title", &text));
        assert!(is_save_enabled("title", &image));
        assert!(!is_save_enabled("title", &blank));
        assert!(!is_save_enabled("title", &[]));
        assert!(!is_save_enabled("   ", &text));
    }

    #[test]
    fn append_image_replaces_trailing_blank_text() {
        let mut content = vec![ContentItem::text("a"), ContentItem::text("")];
        append_image(&mut content, "content://1".to_string());
        assert_eq!(
            content,
            vec![
                ContentItem::text("a"),
                ContentItem::image("content://1"),
                ContentItem::text(""),
            ]
        );
    }

    #[test]
    fn append_image_to_empty_content_does_not_panic() {
        let mut content = Vec::new();
        append_image(&mut content, "content://1".to_string());
        assert_eq!(content.len(), 2);
    }

    #[test]
    fn remove_image_ignores_text_and_out_of_range() {
        let mut content = vec![ContentItem::text("a"), ContentItem::image("x")];
        remove_image(&mut content, 0);
        remove_image(&mut content, 9);
        assert_eq!(content.len(), 2);
        remove_image(&mut content, 1);
        assert_eq!(content, vec![ContentItem::text("a")]);
    }

    #[test]
    fn blank_text_is_dropped_but_images_stay() {
        let cleaned = without_blank_text(vec![
            ContentItem::text(""),
            ContentItem::image("x"),
            ContentItem::text("kept"),
            ContentItem::text(" "),
        ]);
        assert_eq!(
            cleaned,
            vec![ContentItem::image("x"), ContentItem::text("kept")]
        );
    }
}
