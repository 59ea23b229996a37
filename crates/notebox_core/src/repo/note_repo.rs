//! Note storage contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist note rows and their ordered content rows atomically.
//! - Serve point reads, ordered list/search reads and live subscriptions.
//!
//! # Invariants
//! - A note row and its content rows become visible together or not at all.
//! - List and search results are sorted by `updated_at DESC, id DESC`.
//! - Search is a case-sensitive substring match over title and text rows.
//! - Every committed write bumps the change revision observed by `LiveNotes`.

use crate::db::DbError;
use crate::model::note::{ContentItem, Note, NoteId};
use crate::repo::content_mapper::{
    content_kind_to_db, parse_content_kind, to_content_items, to_content_rows, ContentRow,
};
use crate::repo::live::LiveNotes;
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    title,
    updated_at,
    is_pinned
FROM notes";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for note persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(NoteId),
    InvalidData(String),
    /// A writer panicked while holding the connection.
    ConnectionPoisoned,
    /// Every store handle was dropped while a subscription was still polling.
    StoreClosed,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
            Self::ConnectionPoisoned => write!(f, "note store connection is poisoned"),
            Self::StoreClosed => write!(f, "note store is closed"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage contract for notes and their ordered content.
pub trait NoteStore {
    /// Inserts a note with its content. Assigns a fresh id when `note.id == 0`,
    /// otherwise writes the row under the given id, replacing any previous
    /// content for it.
    fn add_note_with_content(&self, note: &Note) -> RepoResult<NoteId>;
    /// Replaces the note row and its whole content set.
    fn update_note_with_content(&self, note: &Note) -> RepoResult<()>;
    fn get_note(&self, id: NoteId) -> RepoResult<Note>;
    /// Removes the note row and every content row it owns.
    fn delete_note(&self, id: NoteId) -> RepoResult<()>;
    /// Toggles `is_pinned` without touching content or `updated_at`.
    fn switch_pinned(&self, id: NoteId) -> RepoResult<()>;
    /// Number of content rows, across all notes, holding this image url.
    fn image_reference_count(&self, url: &str) -> RepoResult<u64>;
    /// Every distinct image url referenced by stored content.
    fn referenced_images(&self) -> RepoResult<BTreeSet<String>>;
    /// Live list of all notes.
    fn all_notes(&self) -> LiveNotes;
    /// Live list of notes matching `query`; empty query behaves as `all_notes`.
    fn search_notes(&self, query: &str) -> LiveNotes;
}

/// SQLite-backed note store.
///
/// Cloning yields another handle to the same connection and change channel.
#[derive(Clone)]
pub struct SqliteNoteStore {
    shared: Arc<StoreShared>,
}

struct StoreShared {
    conn: Mutex<Connection>,
    revision: watch::Sender<u64>,
}

impl StoreShared {
    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> RepoResult<T>) -> RepoResult<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| RepoError::ConnectionPoisoned)?;
        f(&mut conn)
    }

    fn notify_changed(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}

impl SqliteNoteStore {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `InvalidData` when the note tables are missing or incomplete.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_note_connection_ready(&conn)?;
        let (revision, _) = watch::channel(0);
        Ok(Self {
            shared: Arc::new(StoreShared {
                conn: Mutex::new(conn),
                revision,
            }),
        })
    }

    fn live(&self, query: Option<String>) -> LiveNotes {
        let shared = Arc::downgrade(&self.shared);
        LiveNotes::new(self.shared.revision.subscribe(), move || {
            let shared = shared.upgrade().ok_or(RepoError::StoreClosed)?;
            shared.with_conn(|conn| query_notes(conn, query.as_deref()))
        })
    }
}

impl NoteStore for SqliteNoteStore {
    fn add_note_with_content(&self, note: &Note) -> RepoResult<NoteId> {
        let note_id = self.shared.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let note_id = if note.is_persisted() {
                tx.execute(
                    "INSERT INTO notes (id, title, updated_at, is_pinned)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(id) DO UPDATE SET
                        title = excluded.title,
                        updated_at = excluded.updated_at,
                        is_pinned = excluded.is_pinned;",
                    params![
                        note.id,
                        note.title.as_str(),
                        note.updated_at,
                        bool_to_int(note.is_pinned),
                    ],
                )?;
                tx.execute("DELETE FROM note_content WHERE note_id = ?1;", [note.id])?;
                note.id
            } else {
                tx.execute(
                    "INSERT INTO notes (title, updated_at, is_pinned) VALUES (?1, ?2, ?3);",
                    params![
                        note.title.as_str(),
                        note.updated_at,
                        bool_to_int(note.is_pinned),
                    ],
                )?;
                tx.last_insert_rowid()
            };
            insert_content_rows(&tx, note_id, &note.content)?;
            tx.commit()?;
            Ok(note_id)
        })?;

        self.shared.notify_changed();
        info!(
            "event=note_add module=repo status=ok note_id={note_id} items={}",
            note.content.len()
        );
        Ok(note_id)
    }

    fn update_note_with_content(&self, note: &Note) -> RepoResult<()> {
        self.shared.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let changed = tx.execute(
                "UPDATE notes
                 SET
                    title = ?2,
                    updated_at = ?3,
                    is_pinned = ?4
                 WHERE id = ?1;",
                params![
                    note.id,
                    note.title.as_str(),
                    note.updated_at,
                    bool_to_int(note.is_pinned),
                ],
            )?;
            if changed == 0 {
                return Err(RepoError::NotFound(note.id));
            }

            tx.execute("DELETE FROM note_content WHERE note_id = ?1;", [note.id])?;
            insert_content_rows(&tx, note.id, &note.content)?;
            tx.commit()?;
            Ok(())
        })?;

        self.shared.notify_changed();
        info!(
            "event=note_update module=repo status=ok note_id={} items={}",
            note.id,
            note.content.len()
        );
        Ok(())
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Note> {
        self.shared
            .with_conn(|conn| load_note(conn, id))?
            .ok_or(RepoError::NotFound(id))
    }

    fn delete_note(&self, id: NoteId) -> RepoResult<()> {
        self.shared.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute("DELETE FROM note_content WHERE note_id = ?1;", [id])?;
            let changed = tx.execute("DELETE FROM notes WHERE id = ?1;", [id])?;
            if changed == 0 {
                return Err(RepoError::NotFound(id));
            }
            tx.commit()?;
            Ok(())
        })?;

        self.shared.notify_changed();
        info!("event=note_delete module=repo status=ok note_id={id}");
        Ok(())
    }

    fn switch_pinned(&self, id: NoteId) -> RepoResult<()> {
        let changed = self.shared.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE notes SET is_pinned = 1 - is_pinned WHERE id = ?1;",
                [id],
            )?)
        })?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        self.shared.notify_changed();
        debug!("event=note_pin_toggle module=repo status=ok note_id={id}");
        Ok(())
    }

    fn image_reference_count(&self, url: &str) -> RepoResult<u64> {
        let count: i64 = self.shared.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*)
                 FROM note_content
                 WHERE content_type = 'image'
                   AND content = ?1;",
                [url],
                |row| row.get(0),
            )?)
        })?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative reference count `{count}`")))
    }

    fn referenced_images(&self) -> RepoResult<BTreeSet<String>> {
        self.shared.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT content
                 FROM note_content
                 WHERE content_type = 'image';",
            )?;
            let mut rows = stmt.query([])?;
            let mut urls = BTreeSet::new();
            while let Some(row) = rows.next()? {
                urls.insert(row.get::<_, String>(0)?);
            }
            Ok(urls)
        })
    }

    fn all_notes(&self) -> LiveNotes {
        self.live(None)
    }

    fn search_notes(&self, query: &str) -> LiveNotes {
        if query.is_empty() {
            return self.live(None);
        }
        self.live(Some(query.to_string()))
    }
}

fn insert_content_rows(
    tx: &Transaction<'_>,
    note_id: NoteId,
    items: &[ContentItem],
) -> RepoResult<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO note_content (note_id, position, content_type, content)
         VALUES (?1, ?2, ?3, ?4);",
    )?;
    for row in to_content_rows(note_id, items) {
        stmt.execute(params![
            row.note_id,
            row.position,
            content_kind_to_db(row.kind),
            row.content,
        ])?;
    }
    Ok(())
}

fn load_note(conn: &Connection, id: NoteId) -> RepoResult<Option<Note>> {
    let header = conn
        .query_row(
            &format!("{NOTE_SELECT_SQL} WHERE id = ?1;"),
            [id],
            |row| Ok(parse_note_row(row)),
        )
        .optional()?;

    match header {
        Some(note) => {
            let mut note = note?;
            note.content = load_content_items(conn, note.id)?;
            Ok(Some(note))
        }
        None => Ok(None),
    }
}

fn query_notes(conn: &Connection, query: Option<&str>) -> RepoResult<Vec<Note>> {
    let mut stmt = conn.prepare_cached(&format!(
        "{NOTE_SELECT_SQL}
         WHERE ?1 IS NULL
            OR instr(title, ?1) > 0
            OR EXISTS (
                SELECT 1
                FROM note_content c
                WHERE c.note_id = notes.id
                  AND c.content_type = 'text'
                  AND instr(c.content, ?1) > 0
            )
         ORDER BY updated_at DESC, id DESC;"
    ))?;

    let mut rows = stmt.query([query])?;
    let mut notes = Vec::new();
    while let Some(row) = rows.next()? {
        notes.push(parse_note_row(row)?);
    }
    for note in &mut notes {
        note.content = load_content_items(conn, note.id)?;
    }
    Ok(notes)
}

fn load_content_items(conn: &Connection, note_id: NoteId) -> RepoResult<Vec<ContentItem>> {
    let mut stmt = conn.prepare_cached(
        "SELECT note_id, position, content_type, content
         FROM note_content
         WHERE note_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([note_id])?;
    let mut content_rows = Vec::new();
    while let Some(row) = rows.next()? {
        let type_text: String = row.get("content_type")?;
        let kind = parse_content_kind(&type_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid content type `{type_text}` in note_content.content_type"
            ))
        })?;
        content_rows.push(ContentRow {
            note_id: row.get("note_id")?,
            position: row.get("position")?,
            kind,
            content: row.get("content")?,
        });
    }
    Ok(to_content_items(content_rows))
}

/// Parses the note header; `content` is filled by the caller.
fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let is_pinned = match row.get::<_, i64>("is_pinned")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_pinned value `{other}` in notes.is_pinned"
            )));
        }
    };

    Ok(Note {
        id: row.get("id")?,
        title: row.get("title")?,
        content: Vec::new(),
        updated_at: row.get("updated_at")?,
        is_pinned,
    })
}

fn ensure_note_connection_ready(conn: &Connection) -> RepoResult<()> {
    const REQUIRED: &[(&str, &[&str])] = &[
        ("notes", &["id", "title", "updated_at", "is_pinned"]),
        (
            "note_content",
            &["note_id", "position", "content_type", "content"],
        ),
    ];

    for (table, columns) in REQUIRED {
        if !table_exists(conn, table)? {
            return Err(RepoError::InvalidData(format!(
                "required table `{table}` is missing; run migrations first"
            )));
        }
        for column in *columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::InvalidData(format!(
                    "required column `{table}.{column}` is missing"
                )));
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
