//! Domain model for notes and their ordered content.
//!
//! # Responsibility
//! - Define the note shape shared by storage, reconciliation and UI reducers.
//! - Keep text/image content as a closed sum type.
//!
//! # Invariants
//! - `Note::content` order is meaningful and preserved end to end.
//! - A stored `ContentItem::Image` always carries a managed path.

pub mod note;
