use anyhow::bail;
use rusqlite::Connection;
use std::path::Path;

const SCHEMA_VERSION: i64 = 1;

pub const DB_FILE: &str = "quizzer.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;

    let found: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    if found > SCHEMA_VERSION {
        bail!(
            "workspace schema v{} is newer than this quizzerd (v{})",
            found,
            SCHEMA_VERSION
        );
    }

    // Submissions deliberately carry no foreign key to tasks: deleting a task
    // orphans its submissions instead of cascading.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS tasks(
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            text TEXT NOT NULL,
            kind TEXT NOT NULL,
            answers TEXT,
            correct_answer TEXT,
            image TEXT,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS submissions(
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            student_name TEXT NOT NULL,
            task_id TEXT NOT NULL,
            task_text TEXT NOT NULL,
            task_kind TEXT NOT NULL,
            answer TEXT NOT NULL,
            submitted_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_submissions_student ON submissions(student_name)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_submissions_task ON submissions(task_id)",
        [],
    )?;

    conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))?;

    Ok(conn)
}
