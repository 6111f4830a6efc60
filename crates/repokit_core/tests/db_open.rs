use repokit_core::db::{open_db, open_db_in_memory};
use repokit_core::{attributes, CrudRepository, EntityDescriptor, RepoError, SqliteRepository};
use rusqlite::Connection;

fn foreign_keys_enabled(conn: &Connection) -> bool {
    conn.query_row("PRAGMA foreign_keys;", [], |row| row.get::<_, i64>(0))
        .unwrap()
        == 1
}

#[test]
fn in_memory_connection_enables_foreign_keys() {
    let conn = open_db_in_memory().unwrap();
    assert!(foreign_keys_enabled(&conn));
}

#[test]
fn file_database_persists_rows_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("repokit.db");

    let conn = open_db(&path).unwrap();
    assert!(foreign_keys_enabled(&conn));
    conn.execute_batch("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT NOT NULL);")
        .unwrap();
    let notes = SqliteRepository::<repokit_core::Record>::try_new(
        &conn,
        EntityDescriptor::new("notes"),
    )
    .unwrap();
    notes.create(attributes([("body", "hello")])).unwrap();
    drop(notes);
    drop(conn);

    let reopened = open_db(&path).unwrap();
    let mut notes = SqliteRepository::<repokit_core::Record>::try_new(
        &reopened,
        EntityDescriptor::new("notes"),
    )
    .unwrap();
    assert_eq!(notes.count().unwrap(), 1);
}

#[test]
fn foreign_key_failures_surface_as_constraint_violations() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE folders (id INTEGER PRIMARY KEY);
         CREATE TABLE files (
            id INTEGER PRIMARY KEY,
            folder_id INTEGER NOT NULL REFERENCES folders(id)
         );",
    )
    .unwrap();
    let files = SqliteRepository::<repokit_core::Record>::try_new(
        &conn,
        EntityDescriptor::new("files"),
    )
    .unwrap();

    let err = files.create(attributes([("folder_id", 42)])).unwrap_err();
    assert!(matches!(err, RepoError::ConstraintViolation(_)));
}

#[test]
fn opening_a_directory_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(open_db(dir.path()).is_err());
}
