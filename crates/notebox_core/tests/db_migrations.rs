use notebox_core::db::migrations::latest_version;
use notebox_core::db::{open_db, open_db_in_memory, DbError};
use notebox_core::{RepoError, SqliteNoteStore};
use rusqlite::Connection;

#[test]
fn fresh_in_memory_db_has_note_schema() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(user_version(&conn), latest_version());
    assert_eq!(
        tables(&conn),
        vec!["note_content".to_string(), "notes".to_string()]
    );
}

#[test]
fn reopening_a_migrated_file_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.sqlite3");

    {
        let conn = open_db(&path).unwrap();
        conn.execute(
            "INSERT INTO notes (title, updated_at, is_pinned) VALUES ('kept', 1, 0);",
            [],
        )
        .unwrap();
    }

    let conn = open_db(&path).unwrap();
    assert_eq!(user_version(&conn), latest_version());
    let title: String = conn
        .query_row("SELECT title FROM notes;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(title, "kept");
}

#[test]
fn file_from_newer_build_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("newer.sqlite3");
    Connection::open(&path)
        .unwrap()
        .pragma_update(None, "user_version", latest_version() + 1)
        .unwrap();

    let err = open_db(&path).unwrap_err();
    assert!(matches!(
        err,
        DbError::UnsupportedSchemaVersion { db_version, latest_supported }
            if db_version == latest_version() + 1 && latest_supported == latest_version()
    ));
}

#[test]
fn conflicting_table_fails_migration_without_bumping_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conflict.sqlite3");
    Connection::open(&path)
        .unwrap()
        .execute_batch("CREATE TABLE note_content (junk TEXT);")
        .unwrap();

    let err = open_db(&path).unwrap_err();
    assert!(matches!(err, DbError::MigrationFailed { version: 1, .. }));

    let conn = Connection::open(&path).unwrap();
    assert_eq!(user_version(&conn), 0);
    assert_eq!(tables(&conn), vec!["note_content".to_string()]);
}

#[test]
fn content_rows_cascade_with_their_note() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO notes (id, title, updated_at, is_pinned) VALUES (1, 't', 0, 0);",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO note_content (note_id, position, content_type, content)
         VALUES (1, 0, 'text', 'a');",
        [],
    )
    .unwrap();

    conn.execute("DELETE FROM notes WHERE id = 1;", []).unwrap();
    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM note_content;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
}

#[test]
fn unknown_content_type_is_rejected_by_schema() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO notes (id, title, updated_at, is_pinned) VALUES (1, 't', 0, 0);",
        [],
    )
    .unwrap();
    let result = conn.execute(
        "INSERT INTO note_content (note_id, position, content_type, content)
         VALUES (1, 0, 'video', 'x');",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn store_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteNoteStore::try_new(conn).err().unwrap();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

fn user_version(conn: &Connection) -> u32 {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap()
}

fn tables(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name;",
        )
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap()
}
