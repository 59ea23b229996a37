//! Live note query subscriptions.
//!
//! # Responsibility
//! - Turn a store change signal plus a snapshot query into a push-style,
//!   cancellable sequence of note lists.
//!
//! # Invariants
//! - The first `next()` yields the current snapshot without waiting.
//! - Every later `next()` yields a snapshot taken after at least one committed
//!   write since the previous emission.
//! - Dropping a `LiveNotes` cancels it; nothing else needs cleanup.

use crate::model::note::Note;
use crate::repo::note_repo::RepoResult;
use log::debug;
use std::fmt::{Debug, Formatter};
use tokio::sync::watch;

type NotesFetch = Box<dyn Fn() -> RepoResult<Vec<Note>> + Send + Sync>;

/// Re-emitting query over stored notes.
pub struct LiveNotes {
    changes: watch::Receiver<u64>,
    fetch: NotesFetch,
    primed: bool,
}

impl LiveNotes {
    /// Builds a subscription from a revision channel and a snapshot query.
    ///
    /// `changes` must be bumped by the owner after every committed write.
    pub fn new(
        changes: watch::Receiver<u64>,
        fetch: impl Fn() -> RepoResult<Vec<Note>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            changes,
            fetch: Box::new(fetch),
            primed: false,
        }
    }

    /// Runs the query once, without waiting for changes.
    pub fn snapshot(&self) -> RepoResult<Vec<Note>> {
        (self.fetch)()
    }

    /// Whether a write committed since the last emission.
    pub fn has_pending_change(&self) -> bool {
        self.changes.has_changed().unwrap_or(false)
    }

    /// Waits for the next snapshot.
    ///
    /// Returns `None` once the owning store is gone.
    pub async fn next(&mut self) -> Option<RepoResult<Vec<Note>>> {
        if !self.primed {
            self.primed = true;
            drop(self.changes.borrow_and_update());
            return Some(self.snapshot());
        }

        match self.changes.changed().await {
            Ok(()) => Some(self.snapshot()),
            Err(_) => {
                debug!("event=live_query_end module=repo status=ok reason=store_closed");
                None
            }
        }
    }

    /// Stops the subscription.
    pub fn cancel(self) {
        debug!("event=live_query_cancel module=repo status=ok");
    }
}

impl Debug for LiveNotes {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveNotes")
            .field("revision", &*self.changes.borrow())
            .field("primed", &self.primed)
            .finish_non_exhaustive()
    }
}
