use std::collections::HashMap;

use serde::Serialize;

use crate::model::{Submission, Task, TaskKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StudentScore {
    pub correct: usize,
    pub total: usize,
}

/// Type-dependent comparison against the task's designated correct answer:
/// multiple-choice is a case-sensitive exact match, text input compares
/// case-insensitively.
pub fn answer_matches(task: &Task, answer: &str) -> bool {
    let Some(correct) = task.correct_answer.as_deref() else {
        return false;
    };
    match task.kind {
        TaskKind::MultipleChoice => answer == correct,
        TaskKind::TextInput => answer.to_lowercase() == correct.to_lowercase(),
    }
}

/// Collapses a ledger slice to one attempt per task: the latest in ledger
/// order, kept at the position where the task first appeared. This is the
/// canonical attempt rule; scoring and the admin overview both read through
/// it.
pub fn latest_attempts(submissions: &[Submission]) -> Vec<&Submission> {
    let mut out: Vec<&Submission> = Vec::new();
    let mut slot_by_task: HashMap<&str, usize> = HashMap::new();
    for sub in submissions {
        match slot_by_task.get(sub.task_id.as_str()) {
            Some(&slot) => out[slot] = sub,
            None => {
                slot_by_task.insert(sub.task_id.as_str(), out.len());
                out.push(sub);
            }
        }
    }
    out
}

/// Derives a student's score from the live registry and their ledger slice.
/// Tasks that were deleted or have no correct answer set are excluded from
/// both counts. Never cached: an admin edit to a correct answer changes the
/// next read.
pub fn student_score(tasks: &[Task], student_submissions: &[Submission]) -> StudentScore {
    let task_by_id: HashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();

    let mut correct = 0;
    let mut total = 0;
    for sub in latest_attempts(student_submissions) {
        let Some(task) = task_by_id.get(sub.task_id.as_str()) else {
            continue;
        };
        if task.correct_answer.is_none() {
            continue;
        }
        total += 1;
        if answer_matches(task, &sub.answer) {
            correct += 1;
        }
    }
    StudentScore { correct, total }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewEntry {
    pub task_id: String,
    pub task_text: String,
    #[serde(rename = "taskType")]
    pub task_kind: TaskKind,
    pub answer: String,
    pub submitted_at: String,
    /// Present only when the task has a correct answer set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentOverview {
    pub student_name: String,
    pub submission_count: usize,
    pub latest_submitted_at: String,
    pub score: StudentScore,
    pub entries: Vec<OverviewEntry>,
}

/// Read model behind the admin submissions view (the one the UI polls).
/// Students appear in first-submission order; per student, one entry per
/// surviving task holding the latest attempt. Orphaned submissions are
/// skipped but still counted in `submission_count`.
pub fn overview(tasks: &[Task], submissions: &[Submission]) -> Vec<StudentOverview> {
    let task_by_id: HashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();

    let mut order: Vec<&str> = Vec::new();
    let mut by_student: HashMap<&str, Vec<Submission>> = HashMap::new();
    for sub in submissions {
        let name = sub.student_name.as_str();
        if !by_student.contains_key(name) {
            order.push(name);
        }
        by_student.entry(name).or_default().push(sub.clone());
    }

    order
        .into_iter()
        .map(|name| {
            let subs = &by_student[name];
            let entries = latest_attempts(subs)
                .into_iter()
                .filter_map(|sub| {
                    let task = task_by_id.get(sub.task_id.as_str())?;
                    let graded = task.correct_answer.is_some();
                    Some(OverviewEntry {
                        task_id: sub.task_id.clone(),
                        task_text: task.text.clone(),
                        task_kind: sub.task_kind,
                        answer: sub.answer.clone(),
                        submitted_at: sub.submitted_at.clone(),
                        is_correct: graded.then(|| answer_matches(task, &sub.answer)),
                        correct_answer: task.correct_answer.clone(),
                    })
                })
                .collect();
            StudentOverview {
                student_name: name.to_string(),
                submission_count: subs.len(),
                latest_submitted_at: subs
                    .last()
                    .map(|s| s.submitted_at.clone())
                    .unwrap_or_default(),
                score: student_score(tasks, subs),
                entries,
            }
        })
        .collect()
}
