use std::path::PathBuf;

use rusqlite::Connection;

/// Opens a fresh on-disk SQLite database in a temp directory and leaks the
/// directory handle so the file survives for the life of the test process,
/// mirroring the pattern used by the driver crates' own live-integration tests.
pub fn temp_sqlite_path() -> PathBuf {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("test.sqlite");
    std::mem::forget(dir);
    path
}

/// Creates the `users(id, name, age, email)` table used across scenario tests.
pub fn seed_users_table(conn: &Connection) {
    conn.execute_batch(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            age INTEGER,
            email TEXT
        )",
    )
    .expect("create users table");
}
