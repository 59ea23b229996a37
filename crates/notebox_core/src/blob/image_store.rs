//! Managed image directory.
//!
//! # Responsibility
//! - Copy external image sources into a private flat directory.
//! - Delete managed image files.
//! - Classify references as managed or external.
//!
//! # Invariants
//! - Managed files are named `img_<uuid>.jpg` and live directly in the
//!   managed directory.
//! - A managed reference has exactly one spelling: `dir.join(file_name)`.
//!   Aliases (`./`, trailing `/`, `..`) are external.
//! - A managed path is only returned after every byte was copied and synced;
//!   interrupted copies leave no file under a managed name.
//! - `release` never deletes anything outside the managed directory.
//! - The store keeps no record of which files are referenced.

use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

const IMAGE_FILE_PREFIX: &str = "img_";
const IMAGE_FILE_EXTENSION: &str = "jpg";
const STAGING_FILE_PREFIX: &str = ".ingest_";
const FILE_URI_SCHEME: &str = "file://";

static MANAGED_FILE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^img_[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}\.[A-Za-z0-9]+$")
        .expect("valid managed file name regex")
});

pub type BlobResult<T> = Result<T, BlobError>;

/// Error for image ingestion and release.
#[derive(Debug)]
pub enum BlobError {
    /// External reference could not be opened for reading.
    SourceUnavailable { reference: String, source: io::Error },
    /// Filesystem error while copying, syncing, renaming or deleting.
    Io(io::Error),
    /// Release was requested for a path outside the managed directory.
    NotManaged(String),
    /// A managed reference points at a file that is not on disk.
    MissingFile(String),
    /// Managed directory path is unusable.
    InvalidDirectory(String),
    /// Generated managed path cannot be represented as UTF-8.
    NonUtf8Path(PathBuf),
}

impl Display for BlobError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceUnavailable { source, .. } => {
                write!(f, "image source cannot be opened: {source}")
            }
            Self::Io(err) => write!(f, "image file operation failed: {err}"),
            Self::NotManaged(path) => write!(f, "path is not a managed image: `{path}`"),
            Self::MissingFile(path) => write!(f, "managed image is missing: `{path}`"),
            Self::InvalidDirectory(message) => write!(f, "invalid image directory: {message}"),
            Self::NonUtf8Path(path) => {
                write!(f, "managed image path is not UTF-8: `{}`", path.display())
            }
        }
    }
}

impl Error for BlobError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SourceUnavailable { source, .. } => Some(source),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for BlobError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Resolves an external image reference to a readable byte stream.
///
/// Hosts plug their platform resolver in here (content providers, picker
/// handles, ...). The store never interprets the reference beyond this call.
pub trait ImageSource: Send + Sync {
    fn open(&self, reference: &str) -> io::Result<Box<dyn Read + Send>>;
}

/// Resolves plain filesystem paths and `file://` URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileImageSource;

impl ImageSource for FileImageSource {
    fn open(&self, reference: &str) -> io::Result<Box<dyn Read + Send>> {
        let path = reference.strip_prefix(FILE_URI_SCHEME).unwrap_or(reference);
        Ok(Box::new(File::open(path)?))
    }
}

/// Flat directory of managed image files.
pub struct ImageStore {
    dir: PathBuf,
    source: Box<dyn ImageSource>,
}

impl ImageStore {
    /// Opens (and creates when missing) the managed directory.
    ///
    /// # Errors
    /// - `InvalidDirectory` when `dir` is relative or contains `..`.
    /// - `Io` when the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>, source: impl ImageSource + 'static) -> BlobResult<Self> {
        let dir = dir.into();
        if !dir.is_absolute() {
            return Err(BlobError::InvalidDirectory(format!(
                "image directory must be an absolute path, got `{}`",
                dir.display()
            )));
        }
        if dir
            .components()
            .any(|component| component == Component::ParentDir)
        {
            return Err(BlobError::InvalidDirectory(format!(
                "image directory must not contain `..`, got `{}`",
                dir.display()
            )));
        }
        // Drops interior `.` and trailing separators so joined names have one form.
        let dir = dir.components().collect::<PathBuf>();
        std::fs::create_dir_all(&dir)?;

        info!(
            "event=image_store_open module=blob status=ok dir={}",
            dir.display()
        );
        Ok(Self {
            dir,
            source: Box::new(source),
        })
    }

    /// Opens the managed directory with the filesystem resolver.
    pub fn with_file_source(dir: impl Into<PathBuf>) -> BlobResult<Self> {
        Self::open(dir, FileImageSource)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copies `external_ref` into a new managed file and returns its absolute path.
    ///
    /// # Errors
    /// - `SourceUnavailable` when the reference cannot be opened.
    /// - `Io` when the copy, sync or final rename fails; no managed file is
    ///   left behind in that case.
    pub fn ingest(&self, external_ref: &str) -> BlobResult<String> {
        let started_at = Instant::now();
        let mut reader =
            self.source
                .open(external_ref)
                .map_err(|err| BlobError::SourceUnavailable {
                    reference: external_ref.to_string(),
                    source: err,
                })?;

        match self.copy_into_managed_file(&mut reader) {
            Ok((path, bytes)) => {
                info!(
                    "event=image_ingest module=blob status=ok file={} bytes={} duration_ms={}",
                    file_name_of(&path),
                    bytes,
                    started_at.elapsed().as_millis()
                );
                Ok(path)
            }
            Err(err) => {
                error!(
                    "event=image_ingest module=blob status=error duration_ms={} error_code=image_copy_failed error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn copy_into_managed_file(&self, reader: &mut dyn Read) -> BlobResult<(String, u64)> {
        // The staging file deletes itself when dropped on any early return.
        let mut staging = tempfile::Builder::new()
            .prefix(STAGING_FILE_PREFIX)
            .tempfile_in(&self.dir)?;
        let bytes = io::copy(reader, staging.as_file_mut())?;
        staging.as_file().sync_all()?;

        let target = self.dir.join(format!(
            "{IMAGE_FILE_PREFIX}{}.{IMAGE_FILE_EXTENSION}",
            Uuid::new_v4()
        ));
        let target_text = target
            .to_str()
            .ok_or_else(|| BlobError::NonUtf8Path(target.clone()))?
            .to_string();
        staging
            .persist_noclobber(&target)
            .map_err(|err| BlobError::Io(err.error))?;
        Ok((target_text, bytes))
    }

    /// Deletes a managed file.
    ///
    /// Returns `Ok(false)` when the file is already gone, so retries are safe.
    ///
    /// # Errors
    /// - `NotManaged` when `path` is not inside the managed directory.
    /// - `Io` for any other filesystem failure.
    pub fn release(&self, path: &str) -> BlobResult<bool> {
        if !self.is_managed(path) {
            warn!("event=image_release module=blob status=error error_code=not_managed");
            return Err(BlobError::NotManaged(path.to_string()));
        }

        match std::fs::remove_file(path) {
            Ok(()) => {
                info!(
                    "event=image_release module=blob status=ok file={}",
                    file_name_of(path)
                );
                Ok(true)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(
                    "event=image_release module=blob status=ok file={} already_absent=true",
                    file_name_of(path)
                );
                Ok(false)
            }
            Err(err) => Err(BlobError::Io(err)),
        }
    }

    /// True iff `reference` is spelled exactly as `dir.join(name)` for a
    /// generated managed file name. Says nothing about the file existing.
    pub fn is_managed(&self, reference: &str) -> bool {
        let Some(name) = Path::new(reference)
            .file_name()
            .and_then(|name| name.to_str())
        else {
            return false;
        };
        MANAGED_FILE_NAME_RE.is_match(name) && self.dir.join(name).to_str() == Some(reference)
    }

    /// Checks that a managed reference still resolves to a regular file.
    ///
    /// # Errors
    /// - `NotManaged` when `reference` is not a managed spelling.
    /// - `MissingFile` when no regular file is on disk under that name.
    pub fn ensure_present(&self, reference: &str) -> BlobResult<()> {
        if !self.is_managed(reference) {
            return Err(BlobError::NotManaged(reference.to_string()));
        }
        match std::fs::metadata(reference) {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(BlobError::MissingFile(reference.to_string())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(BlobError::MissingFile(reference.to_string()))
            }
            Err(err) => Err(BlobError::Io(err)),
        }
    }

    /// Absolute paths of every managed image file currently on disk, sorted.
    ///
    /// Staging files and foreign files in the directory are skipped.
    pub fn managed_files(&self) -> BlobResult<Vec<String>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if !MANAGED_FILE_NAME_RE.is_match(&name) {
                continue;
            }
            let path = entry.path();
            let path_text = path
                .to_str()
                .ok_or_else(|| BlobError::NonUtf8Path(path.clone()))?
                .to_string();
            files.push(path_text);
        }
        files.sort();
        Ok(files)
    }
}

fn file_name_of(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("?")
}

#[cfg(test)]
mod tests {
    use super::{ImageStore, MANAGED_FILE_NAME_RE};

    #[test]
    fn managed_name_pattern_matches_generated_names_only() {
        assert!(MANAGED_FILE_NAME_RE.is_match("img_67e55044-10b1-426f-9247-bb680e5fe0c8.jpg"));
        assert!(!MANAGED_FILE_NAME_RE.is_match(".ingest_abc123"));
        assert!(!MANAGED_FILE_NAME_RE.is_match("img_cover.jpg"));
        assert!(!MANAGED_FILE_NAME_RE.is_match("photo.jpg"));
    }

    const NAME: &str = "img_67e55044-10b1-426f-9247-bb680e5fe0c8.jpg";

    #[test]
    fn is_managed_accepts_only_the_canonical_spelling() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        let store = ImageStore::with_file_source(&images).unwrap();
        let base = images.to_str().unwrap();

        assert!(store.is_managed(&format!("{base}/{NAME}")));
        assert!(!store.is_managed(&format!("{base}/./{NAME}")));
        assert!(!store.is_managed(&format!("{base}/{NAME}/")));
        assert!(!store.is_managed(&format!("{base}//{NAME}")));
        assert!(!store.is_managed(&format!("{base}/nested/{NAME}")));
        assert!(!store.is_managed(&format!("{base}/../{NAME}")));
        assert!(!store.is_managed(&format!("{base}2/{NAME}")));
        assert!(!store.is_managed(&format!("{base}/img_cover.jpg")));
        assert!(!store.is_managed(base));
        assert!(!store.is_managed("content://media/external/images/1"));
        assert!(!store.is_managed(NAME));
    }

    #[test]
    fn directory_spelling_is_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().to_str().unwrap();
        let store = ImageStore::with_file_source(format!("{base}/./images/")).unwrap();

        assert_eq!(store.dir(), dir.path().join("images"));
        assert!(store.is_managed(&format!("{base}/images/{NAME}")));
    }

    #[test]
    fn relative_directory_is_rejected() {
        assert!(ImageStore::with_file_source("relative/images").is_err());
    }
}
