//! Process-start wiring of the note engine.
//!
//! # Responsibility
//! - Build the store, image directory, write service and query facade once.
//! - Hand them to the host as explicitly owned values.
//!
//! # Invariants
//! - The write service and the query facade share one store handle.

use crate::blob::image_store::{BlobError, FileImageSource, ImageSource, ImageStore};
use crate::config::EngineConfig;
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::logging::init_logging;
use crate::repo::note_repo::{RepoError, SqliteNoteStore};
use crate::service::note_service::NoteService;
use crate::service::query_service::NoteQueryService;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Bootstrap failure.
#[derive(Debug)]
pub enum EngineError {
    Config(String),
    Logging(String),
    Db(DbError),
    Repo(RepoError),
    Blob(BlobError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(message) => write!(f, "{message}"),
            Self::Logging(message) => write!(f, "logging setup failed: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Blob(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Blob(err) => Some(err),
            Self::Config(_) | Self::Logging(_) => None,
        }
    }
}

impl From<DbError> for EngineError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for EngineError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<BlobError> for EngineError {
    fn from(value: BlobError) -> Self {
        Self::Blob(value)
    }
}

/// Wired engine: write-side service plus read-side facade.
pub struct NotesEngine {
    pub notes: NoteService<SqliteNoteStore>,
    pub queries: NoteQueryService<SqliteNoteStore>,
}

impl NotesEngine {
    /// Opens the engine described by `config` using the filesystem image resolver.
    ///
    /// Starts logging first when `log_dir` is configured.
    pub fn open(config: &EngineConfig) -> Result<Self, EngineError> {
        Self::open_with_source(config, FileImageSource)
    }

    /// Opens the engine with a host-specific external image resolver.
    pub fn open_with_source(
        config: &EngineConfig,
        source: impl ImageSource + 'static,
    ) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::Config)?;
        if let Some(log_dir) = &config.log_dir {
            init_logging(config.effective_log_level(), log_dir).map_err(EngineError::Logging)?;
        }

        let conn = open_db(&config.database_path)?;
        Self::assemble(conn, config.image_dir.clone(), source)
    }

    /// Engine over an in-memory database; images still live in `image_dir`.
    pub fn open_in_memory(image_dir: impl Into<PathBuf>) -> Result<Self, EngineError> {
        Self::assemble(
            open_db_in_memory()?,
            image_dir.into(),
            FileImageSource,
        )
    }

    fn assemble(
        conn: Connection,
        image_dir: PathBuf,
        source: impl ImageSource + 'static,
    ) -> Result<Self, EngineError> {
        let store = SqliteNoteStore::try_new(conn)?;
        let images = ImageStore::open(image_dir, source)?;
        Ok(Self {
            notes: NoteService::new(store.clone(), images),
            queries: NoteQueryService::new(store),
        })
    }
}
