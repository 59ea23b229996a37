//! Image blob storage outside the structured store.
//!
//! # Responsibility
//! - Own the managed image directory (ingest, release, classify).
//! - Expose the seam through which hosts resolve external image references.

pub mod image_store;
