use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

use crate::db;
use crate::error::StoreError;
use crate::model::{Submission, Task, TaskKind};

/// Repository boundary for all persistent state. The daemon runs on
/// [`SqliteStore`]; tests exercise the core against [`MemoryStore`].
///
/// `append_submissions` is the only way answers enter the ledger, and the
/// whole batch commits atomically or not at all.
pub trait Store {
    fn tasks(&self) -> Result<Vec<Task>, StoreError>;
    fn get_task(&self, task_id: &str) -> Result<Option<Task>, StoreError>;
    fn put_task(&mut self, task: &Task) -> Result<(), StoreError>;
    fn update_correct_answer(
        &mut self,
        task_id: &str,
        answer: Option<&str>,
    ) -> Result<(), StoreError>;
    fn delete_task(&mut self, task_id: &str) -> Result<bool, StoreError>;

    /// Full ledger in ledger order.
    fn submissions(&self) -> Result<Vec<Submission>, StoreError>;
    /// One student's slice of the ledger, in ledger order.
    fn submissions_for(&self, student_name: &str) -> Result<Vec<Submission>, StoreError>;
    fn append_submissions(&mut self, batch: &[Submission]) -> Result<(), StoreError>;
    fn delete_submissions_by_student(&mut self, student_name: &str) -> Result<usize, StoreError>;

    /// Wholesale state replacement, used by bundle import.
    fn replace_all(
        &mut self,
        tasks: &[Task],
        submissions: &[Submission],
    ) -> Result<(), StoreError>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        let conn = db::open_db(workspace)?;
        Ok(Self { conn })
    }
}

type TaskRow = (
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    String,
);

fn decode_task(raw: TaskRow) -> Result<Task, StoreError> {
    let (id, text, kind, answers, correct_answer, image, created_by, created_at) = raw;
    let kind = TaskKind::parse(&kind)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown task kind '{kind}'")))?;
    let answers = match answers {
        Some(json) => Some(serde_json::from_str::<Vec<String>>(&json)?),
        None => None,
    };
    Ok(Task {
        id,
        text,
        kind,
        answers,
        correct_answer,
        image,
        created_by,
        created_at,
    })
}

type SubmissionRow = (String, String, String, String, String, String, String);

fn decode_submission(raw: SubmissionRow) -> Result<Submission, StoreError> {
    let (id, student_name, task_id, task_text, task_kind, answer, submitted_at) = raw;
    let task_kind = TaskKind::parse(&task_kind)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown task kind '{task_kind}'")))?;
    Ok(Submission {
        id,
        student_name,
        task_id,
        task_text,
        task_kind,
        answer,
        submitted_at,
    })
}

const TASK_COLS: &str = "id, text, kind, answers, correct_answer, image, created_by, created_at";
const SUBMISSION_COLS: &str =
    "id, student_name, task_id, task_text, task_kind, answer, submitted_at";

fn task_row(row: &rusqlite::Row) -> rusqlite::Result<TaskRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn submission_row(row: &rusqlite::Row) -> rusqlite::Result<SubmissionRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn encode_answers(task: &Task) -> Result<Option<String>, StoreError> {
    task.answers
        .as_ref()
        .map(|a| serde_json::to_string(a))
        .transpose()
        .map_err(StoreError::from)
}

fn insert_submission(conn: &Connection, sub: &Submission) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO submissions(id, student_name, task_id, task_text, task_kind, answer, submitted_at)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &sub.id,
            &sub.student_name,
            &sub.task_id,
            &sub.task_text,
            sub.task_kind.as_str(),
            &sub.answer,
            &sub.submitted_at,
        ),
    )?;
    Ok(())
}

fn insert_task(conn: &Connection, task: &Task) -> Result<(), StoreError> {
    let answers = encode_answers(task)?;
    conn.execute(
        "INSERT INTO tasks(id, text, kind, answers, correct_answer, image, created_by, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &task.id,
            &task.text,
            task.kind.as_str(),
            answers,
            &task.correct_answer,
            &task.image,
            &task.created_by,
            &task.created_at,
        ),
    )?;
    Ok(())
}

impl Store for SqliteStore {
    fn tasks(&self) -> Result<Vec<Task>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {TASK_COLS} FROM tasks ORDER BY seq"))?;
        let raw = stmt
            .query_map([], task_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(decode_task).collect()
    }

    fn get_task(&self, task_id: &str) -> Result<Option<Task>, StoreError> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLS} FROM tasks WHERE id = ?"),
                [task_id],
                task_row,
            )
            .optional()?;
        raw.map(decode_task).transpose()
    }

    fn put_task(&mut self, task: &Task) -> Result<(), StoreError> {
        insert_task(&self.conn, task)
    }

    fn update_correct_answer(
        &mut self,
        task_id: &str,
        answer: Option<&str>,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE tasks SET correct_answer = ? WHERE id = ?",
            (answer, task_id),
        )?;
        Ok(())
    }

    fn delete_task(&mut self, task_id: &str) -> Result<bool, StoreError> {
        let n = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?", [task_id])?;
        Ok(n > 0)
    }

    fn submissions(&self) -> Result<Vec<Submission>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SUBMISSION_COLS} FROM submissions ORDER BY seq"
        ))?;
        let raw = stmt
            .query_map([], submission_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(decode_submission).collect()
    }

    fn submissions_for(&self, student_name: &str) -> Result<Vec<Submission>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SUBMISSION_COLS} FROM submissions WHERE student_name = ? ORDER BY seq"
        ))?;
        let raw = stmt
            .query_map([student_name], submission_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(decode_submission).collect()
    }

    fn append_submissions(&mut self, batch: &[Submission]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        for sub in batch {
            insert_submission(&tx, sub)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_submissions_by_student(&mut self, student_name: &str) -> Result<usize, StoreError> {
        let n = self.conn.execute(
            "DELETE FROM submissions WHERE student_name = ?",
            [student_name],
        )?;
        Ok(n)
    }

    fn replace_all(
        &mut self,
        tasks: &[Task],
        submissions: &[Submission],
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM submissions", [])?;
        tx.execute("DELETE FROM tasks", [])?;
        for task in tasks {
            insert_task(&tx, task)?;
        }
        for sub in submissions {
            insert_submission(&tx, sub)?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// In-memory store for unit tests. Ledger order is Vec order.
#[derive(Debug, Default)]
#[allow(dead_code)]
pub struct MemoryStore {
    tasks: Vec<Task>,
    submissions: Vec<Submission>,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn tasks(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.tasks.clone())
    }

    fn get_task(&self, task_id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.iter().find(|t| t.id == task_id).cloned())
    }

    fn put_task(&mut self, task: &Task) -> Result<(), StoreError> {
        self.tasks.push(task.clone());
        Ok(())
    }

    fn update_correct_answer(
        &mut self,
        task_id: &str,
        answer: Option<&str>,
    ) -> Result<(), StoreError> {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) {
            task.correct_answer = answer.map(str::to_string);
        }
        Ok(())
    }

    fn delete_task(&mut self, task_id: &str) -> Result<bool, StoreError> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != task_id);
        Ok(self.tasks.len() < before)
    }

    fn submissions(&self) -> Result<Vec<Submission>, StoreError> {
        Ok(self.submissions.clone())
    }

    fn submissions_for(&self, student_name: &str) -> Result<Vec<Submission>, StoreError> {
        Ok(self
            .submissions
            .iter()
            .filter(|s| s.student_name == student_name)
            .cloned()
            .collect())
    }

    fn append_submissions(&mut self, batch: &[Submission]) -> Result<(), StoreError> {
        self.submissions.extend_from_slice(batch);
        Ok(())
    }

    fn delete_submissions_by_student(&mut self, student_name: &str) -> Result<usize, StoreError> {
        let before = self.submissions.len();
        self.submissions.retain(|s| s.student_name != student_name);
        Ok(before - self.submissions.len())
    }

    fn replace_all(
        &mut self,
        tasks: &[Task],
        submissions: &[Submission],
    ) -> Result<(), StoreError> {
        self.tasks = tasks.to_vec();
        self.submissions = submissions.to_vec();
        Ok(())
    }
}
