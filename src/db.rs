use rusqlite::Connection;
use std::path::Path;

/// Opens the school store under `workspace` and rebuilds the schema.
///
/// The store is reset on every open: all five tables are dropped and
/// recreated. Nothing survives a process restart by design.
pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("rollbook.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute_batch(
        "DROP TABLE IF EXISTS attendance;
         DROP TABLE IF EXISTS grades;
         DROP TABLE IF EXISTS messages;
         DROP TABLE IF EXISTS students;
         DROP TABLE IF EXISTS users;",
    )?;

    conn.execute(
        "CREATE TABLE users(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            role TEXT NOT NULL CHECK(role IN ('Student', 'Teacher', 'Parent', 'Admin')),
            UNIQUE(name, role)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX idx_users_name ON users(name)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE students(
            user_id TEXT PRIMARY KEY,
            age INTEGER NOT NULL,
            grade TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE attendance(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            date TEXT NOT NULL,
            status TEXT NOT NULL,
            FOREIGN KEY(student_id) REFERENCES students(user_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX idx_attendance_student ON attendance(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE grades(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            subject TEXT NOT NULL,
            score INTEGER NOT NULL,
            FOREIGN KEY(student_id) REFERENCES students(user_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX idx_grades_student ON grades(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE messages(
            id TEXT PRIMARY KEY,
            sender TEXT NOT NULL,
            receiver TEXT NOT NULL,
            body TEXT NOT NULL,
            sent_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX idx_messages_receiver ON messages(receiver)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX idx_messages_sender ON messages(sender)",
        [],
    )?;

    Ok(conn)
}
