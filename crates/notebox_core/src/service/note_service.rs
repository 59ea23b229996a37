//! Note write-side reconciliation service.
//!
//! # Responsibility
//! - Translate note use-cases into image store + note store calls.
//! - Keep stored image references and managed files consistent without a
//!   shared transaction.
//!
//! # Invariants
//! - External images are ingested before the structured write that references
//!   them; an ingestion failure aborts the write.
//! - Managed images passed through unchanged must still exist on disk.
//! - Old managed files are released only after the structured write commits,
//!   so a crash can leave orphaned files but never dangling references.
//! - Only managed urls that no stored note references any more are released.
//! - Release failures are logged and swallowed.

use crate::blob::image_store::{BlobError, ImageStore};
use crate::model::note::{ContentItem, Note, NoteId};
use crate::repo::live::LiveNotes;
use crate::repo::note_repo::{NoteStore, RepoError};
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type NoteServiceResult<T> = Result<T, NoteServiceError>;

/// Caller-facing error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Target note does not exist.
    NoteNotFound(NoteId),
    /// Image ingestion failed; nothing was written.
    Blob(BlobError),
    /// Structured store failure; stored note state is unchanged.
    Storage(RepoError),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::Blob(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NoteNotFound(_) => None,
            Self::Blob(err) => Some(err),
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NoteNotFound(id),
            other => Self::Storage(other),
        }
    }
}

impl From<BlobError> for NoteServiceError {
    fn from(value: BlobError) -> Self {
        Self::Blob(value)
    }
}

/// Write requested by a UI reducer at a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteWrite {
    Add {
        title: String,
        content: Vec<ContentItem>,
        is_pinned: bool,
    },
    Update(Note),
    Delete(NoteId),
    SwitchPinned(NoteId),
}

struct IngestedContent {
    content: Vec<ContentItem>,
    /// Managed paths created by this ingestion pass.
    fresh: Vec<String>,
}

/// Coordinates the note store and the managed image directory.
pub struct NoteService<S: NoteStore> {
    store: S,
    images: ImageStore,
}

impl<S: NoteStore> NoteService<S> {
    pub fn new(store: S, images: ImageStore) -> Self {
        Self { store, images }
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    /// Creates a note, ingesting every external image first.
    ///
    /// Item order is preserved exactly; text and managed images pass through.
    pub fn add_note(
        &self,
        title: impl Into<String>,
        content: Vec<ContentItem>,
        is_pinned: bool,
        updated_at: i64,
    ) -> NoteServiceResult<NoteId> {
        let ingested = self.ingest_external_images(content)?;
        let note = Note::new(title, ingested.content, is_pinned, updated_at);

        match self.store.add_note_with_content(&note) {
            Ok(note_id) => {
                info!(
                    "event=note_add module=service status=ok note_id={note_id} ingested={}",
                    ingested.fresh.len()
                );
                Ok(note_id)
            }
            Err(err) => {
                self.discard_fresh(&ingested.fresh);
                Err(err.into())
            }
        }
    }

    /// Replaces a stored note, ingesting new external images and releasing
    /// managed images the new content no longer holds.
    pub fn update_note(&self, note: Note) -> NoteServiceResult<()> {
        let previous = self.store.get_note(note.id)?;
        let ingested = self.ingest_external_images(note.content)?;
        let updated = Note {
            content: ingested.content,
            ..note
        };
        let removed = removed_images(&previous, &updated, |url| self.images.is_managed(url));

        if let Err(err) = self.store.update_note_with_content(&updated) {
            self.discard_fresh(&ingested.fresh);
            return Err(err.into());
        }

        let released = self.release_unreferenced(&removed);
        info!(
            "event=note_update module=service status=ok note_id={} ingested={} released={}",
            updated.id,
            ingested.fresh.len(),
            released
        );
        Ok(())
    }

    /// Deletes a note, then releases the managed images it referenced.
    pub fn delete_note(&self, id: NoteId) -> NoteServiceResult<()> {
        let note = self.store.get_note(id)?;
        self.store.delete_note(id)?;

        let urls = note
            .image_urls()
            .filter(|url| self.images.is_managed(url))
            .map(str::to_owned)
            .collect::<BTreeSet<_>>();
        let released = self.release_unreferenced(&urls);
        info!("event=note_delete module=service status=ok note_id={id} released={released}");
        Ok(())
    }

    pub fn switch_pinned_status(&self, id: NoteId) -> NoteServiceResult<()> {
        Ok(self.store.switch_pinned(id)?)
    }

    pub fn get_note(&self, id: NoteId) -> NoteServiceResult<Note> {
        Ok(self.store.get_note(id)?)
    }

    pub fn all_notes(&self) -> LiveNotes {
        self.store.all_notes()
    }

    pub fn search_note(&self, query: &str) -> LiveNotes {
        self.store.search_notes(query)
    }

    /// Executes a reducer-issued write. Saved edits are stamped with `now_ms`.
    ///
    /// Returns the affected note id, or `None` after a delete.
    pub fn apply(&self, write: NoteWrite, now_ms: i64) -> NoteServiceResult<Option<NoteId>> {
        match write {
            NoteWrite::Add {
                title,
                content,
                is_pinned,
            } => self.add_note(title, content, is_pinned, now_ms).map(Some),
            NoteWrite::Update(note) => {
                let id = note.id;
                self.update_note(Note {
                    updated_at: now_ms,
                    ..note
                })?;
                Ok(Some(id))
            }
            NoteWrite::Delete(id) => {
                self.delete_note(id)?;
                Ok(None)
            }
            NoteWrite::SwitchPinned(id) => {
                self.switch_pinned_status(id)?;
                Ok(Some(id))
            }
        }
    }

    /// Releases managed files that no stored note references.
    ///
    /// Manual maintenance for files orphaned by an interrupted cleanup. Must
    /// not run concurrently with writes. Returns the number of deleted files.
    pub fn sweep_orphaned_images(&self) -> NoteServiceResult<usize> {
        let referenced = self.store.referenced_images()?;
        let mut released = 0;
        for path in self.images.managed_files()? {
            if referenced.contains(&path) {
                continue;
            }
            match self.images.release(&path) {
                Ok(true) => released += 1,
                Ok(false) => {}
                Err(err) => warn!(
                    "event=image_sweep module=service status=error error_code=release_failed error={err}"
                ),
            }
        }
        info!("event=image_sweep module=service status=ok released={released}");
        Ok(released)
    }

    fn ingest_external_images(&self, content: Vec<ContentItem>) -> NoteServiceResult<IngestedContent> {
        let mut fresh = Vec::new();
        let mut rewritten = Vec::with_capacity(content.len());

        for item in content {
            let item = match item {
                ContentItem::Image { url } if self.images.is_managed(&url) => self
                    .images
                    .ensure_present(&url)
                    .map(|()| ContentItem::Image { url }),
                ContentItem::Image { url } => self.images.ingest(&url).map(|managed| {
                    fresh.push(managed.clone());
                    ContentItem::Image { url: managed }
                }),
                text @ ContentItem::Text { .. } => Ok(text),
            };
            match item {
                Ok(item) => rewritten.push(item),
                Err(err) => {
                    self.discard_fresh(&fresh);
                    return Err(err.into());
                }
            }
        }

        Ok(IngestedContent {
            content: rewritten,
            fresh,
        })
    }

    /// Best-effort removal of files ingested for a write that did not land.
    fn discard_fresh(&self, fresh: &[String]) {
        for path in fresh {
            if let Err(err) = self.images.release(path) {
                warn!(
                    "event=image_discard module=service status=error error_code=release_failed error={err}"
                );
            }
        }
    }

    fn release_unreferenced(&self, urls: &BTreeSet<String>) -> usize {
        let mut released = 0;
        for url in urls {
            match self.store.image_reference_count(url) {
                Ok(0) => match self.images.release(url) {
                    Ok(true) => released += 1,
                    Ok(false) => {}
                    Err(err) => warn!(
                        "event=image_release module=service status=error error_code=release_failed error={err}"
                    ),
                },
                Ok(count) => {
                    debug!("event=image_release module=service status=skipped references={count}");
                }
                Err(err) => warn!(
                    "event=image_release module=service status=error error_code=reference_check_failed error={err}"
                ),
            }
        }
        released
    }
}

/// Managed urls held by `previous` that appear nowhere in `updated`.
fn removed_images(
    previous: &Note,
    updated: &Note,
    is_managed: impl Fn(&str) -> bool,
) -> BTreeSet<String> {
    let kept = updated.image_urls().collect::<BTreeSet<_>>();
    previous
        .image_urls()
        .filter(|url| is_managed(*url) && !kept.contains(url))
        .map(str::to_owned)
        .collect()
}
