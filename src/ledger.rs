use std::collections::{HashMap, HashSet};

use chrono::Utc;
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{Submission, Task, TaskKind};
use crate::session::Session;
use crate::store::Store;

/// Whether `student_name` may still submit. An empty registry never blocks;
/// otherwise submission is blocked once the student has answered every task
/// currently open. Recomputed fresh on every call, so a task created after a
/// student finished reopens their eligibility.
///
/// This is a liveness policy for the UI path, not a security boundary.
pub fn can_submit(store: &dyn Store, student_name: &str) -> Result<bool, CoreError> {
    let tasks = store.tasks()?;
    if tasks.is_empty() {
        return Ok(true);
    }
    let submitted: HashSet<String> = store
        .submissions_for(student_name)?
        .into_iter()
        .map(|s| s.task_id)
        .collect();
    Ok(!tasks.iter().all(|t| submitted.contains(&t.id)))
}

/// Per-kind answer validation shared by the bulk and single-task paths.
/// Returns the normalized answer, or `None` when the task counts as
/// unanswered: a multiple-choice value that is not one of the options, or a
/// text answer that is empty after trimming.
fn validate_answer(task: &Task, raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    match task.kind {
        TaskKind::MultipleChoice => task.has_option(raw).then(|| raw.to_string()),
        TaskKind::TextInput => {
            let trimmed = raw.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
    }
}

fn build_submission(session: &Session, task: &Task, answer: String, submitted_at: &str) -> Submission {
    Submission {
        id: Uuid::new_v4().to_string(),
        student_name: session.username.clone(),
        task_id: task.id.clone(),
        task_text: task.text.clone(),
        task_kind: task.kind,
        answer,
        submitted_at: submitted_at.to_string(),
    }
}

/// The one-shot bulk submission. Every task currently open must carry a valid
/// answer in `answers_by_task_id`; otherwise the whole call fails with
/// `IncompleteSubmission` and the ledger is untouched. On success the batch is
/// appended in task-iteration order inside one transaction.
pub fn submit_all(
    store: &mut dyn Store,
    session: &Session,
    answers_by_task_id: &HashMap<String, String>,
) -> Result<Vec<Submission>, CoreError> {
    session.require_student()?;

    let tasks = store.tasks()?;
    let submitted_at = Utc::now().to_rfc3339();

    let mut batch = Vec::with_capacity(tasks.len());
    let mut missing = Vec::new();
    for task in &tasks {
        let raw = answers_by_task_id.get(&task.id).map(String::as_str);
        match validate_answer(task, raw) {
            Some(answer) => batch.push(build_submission(session, task, answer, &submitted_at)),
            None => missing.push(task.id.clone()),
        }
    }

    if !missing.is_empty() {
        return Err(CoreError::IncompleteSubmission { missing });
    }

    store.append_submissions(&batch)?;
    Ok(batch)
}

/// Single-task submission through the same append primitive, for answering a
/// task added after the student's bulk pass. The latest-attempt rule makes a
/// repeated answer for the same task supersede the earlier one.
pub fn submit_one(
    store: &mut dyn Store,
    session: &Session,
    task_id: &str,
    answer: &str,
) -> Result<Submission, CoreError> {
    session.require_student()?;

    let task = store
        .get_task(task_id)?
        .ok_or_else(|| CoreError::TaskNotFound(task_id.to_string()))?;

    let answer = validate_answer(&task, Some(answer)).ok_or_else(|| match task.kind {
        TaskKind::MultipleChoice => {
            CoreError::validation("answer must be one of the task's options")
        }
        TaskKind::TextInput => CoreError::validation("answer must not be empty"),
    })?;

    let submission = build_submission(session, &task, answer, &Utc::now().to_rfc3339());
    store.append_submissions(std::slice::from_ref(&submission))?;
    Ok(submission)
}

/// Purges every submission by `student_name`, resetting the gate for them.
/// Irreversible at the data layer.
pub fn allow_retake(
    store: &mut dyn Store,
    session: &Session,
    student_name: &str,
) -> Result<usize, CoreError> {
    session.require_admin()?;
    Ok(store.delete_submissions_by_student(student_name)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{create_task, NewTask};
    use crate::session::Role;
    use crate::store::MemoryStore;

    fn admin() -> Session {
        Session {
            username: "admin".to_string(),
            role: Role::Admin,
        }
    }

    fn student() -> Session {
        Session {
            username: "student".to_string(),
            role: Role::Student,
        }
    }

    fn add_text_task(store: &mut MemoryStore, text: &str) -> Task {
        create_task(
            store,
            &admin(),
            NewTask {
                text: text.to_string(),
                kind: TaskKind::TextInput,
                answers: vec![],
                image: None,
            },
        )
        .unwrap()
    }

    fn add_mc_task(store: &mut MemoryStore, text: &str, options: &[&str]) -> Task {
        create_task(
            store,
            &admin(),
            NewTask {
                text: text.to_string(),
                kind: TaskKind::MultipleChoice,
                answers: options.iter().map(|s| s.to_string()).collect(),
                image: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn empty_registry_never_blocks() {
        let store = MemoryStore::new();
        assert!(can_submit(&store, "student").unwrap());
    }

    #[test]
    fn submit_all_is_atomic_over_the_batch() {
        let mut store = MemoryStore::new();
        let t1 = add_text_task(&mut store, "Q1");
        let t2 = add_mc_task(&mut store, "Q2", &["A", "B"]);

        // t2 answered with a value that is not an option: nothing commits.
        let mut answers = HashMap::new();
        answers.insert(t1.id.clone(), "yes".to_string());
        answers.insert(t2.id.clone(), "C".to_string());
        let err = submit_all(&mut store, &student(), &answers).unwrap_err();
        match err {
            CoreError::IncompleteSubmission { missing } => assert_eq!(missing, vec![t2.id.clone()]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.submissions().unwrap().is_empty());

        // Whitespace-only text answers count as unanswered too.
        answers.insert(t1.id.clone(), "   ".to_string());
        answers.insert(t2.id.clone(), "A".to_string());
        assert!(submit_all(&mut store, &student(), &answers).is_err());
        assert!(store.submissions().unwrap().is_empty());

        answers.insert(t1.id.clone(), " yes ".to_string());
        let batch = submit_all(&mut store, &student(), &answers).unwrap();
        assert_eq!(batch.len(), 2);
        // Ledger order follows task-iteration order and trims text answers.
        let ledger = store.submissions().unwrap();
        assert_eq!(ledger[0].task_id, t1.id);
        assert_eq!(ledger[0].answer, "yes");
        assert_eq!(ledger[1].task_id, t2.id);
        // Snapshots taken at submission time.
        assert_eq!(ledger[0].task_text, "Q1");
        assert_eq!(ledger[1].task_kind, TaskKind::MultipleChoice);
    }

    #[test]
    fn gate_blocks_after_full_submission_and_reopens_on_new_task() {
        let mut store = MemoryStore::new();
        let t1 = add_text_task(&mut store, "Q1");
        let t2 = add_text_task(&mut store, "Q2");

        let mut answers = HashMap::new();
        answers.insert(t1.id.clone(), "a".to_string());
        answers.insert(t2.id.clone(), "b".to_string());
        submit_all(&mut store, &student(), &answers).unwrap();

        assert!(!can_submit(&store, "student").unwrap());
        // Another student is unaffected.
        assert!(can_submit(&store, "someone-else").unwrap());

        add_text_task(&mut store, "Q3");
        assert!(can_submit(&store, "student").unwrap());
    }

    #[test]
    fn submit_one_answers_a_late_task_without_a_full_pass() {
        let mut store = MemoryStore::new();
        let t1 = add_text_task(&mut store, "Q1");
        let mut answers = HashMap::new();
        answers.insert(t1.id.clone(), "a".to_string());
        submit_all(&mut store, &student(), &answers).unwrap();

        let t2 = add_mc_task(&mut store, "Q2", &["A", "B"]);
        assert!(can_submit(&store, "student").unwrap());

        let err = submit_one(&mut store, &student(), &t2.id, "C").unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(store.submissions().unwrap().len(), 1);

        submit_one(&mut store, &student(), &t2.id, "B").unwrap();
        assert!(!can_submit(&store, "student").unwrap());
    }

    #[test]
    fn retake_purges_the_student_and_resets_the_gate() {
        let mut store = MemoryStore::new();
        let t1 = add_text_task(&mut store, "Q1");
        let mut answers = HashMap::new();
        answers.insert(t1.id.clone(), "a".to_string());
        submit_all(&mut store, &student(), &answers).unwrap();
        assert!(!can_submit(&store, "student").unwrap());

        let purged = allow_retake(&mut store, &admin(), "student").unwrap();
        assert_eq!(purged, 1);
        assert!(store.submissions_for("student").unwrap().is_empty());
        assert!(can_submit(&store, "student").unwrap());

        // Admin-only.
        let err = allow_retake(&mut store, &student(), "student").unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }
}
