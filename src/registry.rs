use chrono::Utc;
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{Task, TaskKind};
use crate::session::{Role, Session};
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct NewTask {
    pub text: String,
    pub kind: TaskKind,
    pub answers: Vec<String>,
    pub image: Option<String>,
}

/// Validates and appends a new task. The task's kind and options are fixed
/// from here on; the correct answer starts unset.
pub fn create_task(
    store: &mut dyn Store,
    session: &Session,
    input: NewTask,
) -> Result<Task, CoreError> {
    session.require_admin()?;

    let text = input.text.trim();
    if text.is_empty() {
        return Err(CoreError::validation("task text must not be empty"));
    }

    let answers = match input.kind {
        TaskKind::MultipleChoice => {
            let options: Vec<String> = input
                .answers
                .iter()
                .map(|a| a.trim())
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect();
            if options.len() < 2 {
                return Err(CoreError::validation(
                    "multiple-choice tasks need at least 2 answer options",
                ));
            }
            Some(options)
        }
        TaskKind::TextInput => None,
    };

    let task = Task {
        id: Uuid::new_v4().to_string(),
        text: text.to_string(),
        kind: input.kind,
        answers,
        correct_answer: None,
        image: input.image,
        created_by: session.username.clone(),
        created_at: Utc::now().to_rfc3339(),
    };
    store.put_task(&task)?;
    Ok(task)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrectAnswerChange {
    Set(String),
    Cleared,
}

/// Updates a task's designated correct answer.
///
/// Multiple-choice semantics are a toggle: passing the currently-set option
/// clears it, any other option replaces it, and the value must be one of the
/// task's options. Text-input always overwrites with the trimmed value.
/// Passing `None` clears either kind.
pub fn set_correct_answer(
    store: &mut dyn Store,
    session: &Session,
    task_id: &str,
    answer: Option<&str>,
) -> Result<CorrectAnswerChange, CoreError> {
    session.require_admin()?;

    let task = store
        .get_task(task_id)?
        .ok_or_else(|| CoreError::TaskNotFound(task_id.to_string()))?;

    let change = match answer {
        None => CorrectAnswerChange::Cleared,
        Some(value) => match task.kind {
            TaskKind::MultipleChoice => {
                if !task.has_option(value) {
                    return Err(CoreError::validation(
                        "correct answer must be one of the task's options",
                    ));
                }
                if task.correct_answer.as_deref() == Some(value) {
                    CorrectAnswerChange::Cleared
                } else {
                    CorrectAnswerChange::Set(value.to_string())
                }
            }
            TaskKind::TextInput => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(CoreError::validation("correct answer must not be empty"));
                }
                CorrectAnswerChange::Set(trimmed.to_string())
            }
        },
    };

    match &change {
        CorrectAnswerChange::Set(value) => store.update_correct_answer(task_id, Some(value))?,
        CorrectAnswerChange::Cleared => store.update_correct_answer(task_id, None)?,
    }
    Ok(change)
}

/// Removes a task. Submissions referencing it stay in the ledger as orphans
/// and are skipped by scoring and the admin overview.
pub fn delete_task(store: &mut dyn Store, session: &Session, task_id: &str) -> Result<(), CoreError> {
    session.require_admin()?;
    if !store.delete_task(task_id)? {
        return Err(CoreError::TaskNotFound(task_id.to_string()));
    }
    Ok(())
}

/// Task list for either dashboard. Students never see correct answers.
pub fn list_tasks(store: &dyn Store, session: &Session) -> Result<Vec<Task>, CoreError> {
    let mut tasks = store.tasks()?;
    if session.role == Role::Student {
        for task in &mut tasks {
            task.correct_answer = None;
        }
    }
    Ok(tasks)
}
