use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    #[serde(rename = "multiple-choice")]
    MultipleChoice,
    #[serde(rename = "text-input")]
    TextInput,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::MultipleChoice => "multiple-choice",
            TaskKind::TextInput => "text-input",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "multiple-choice" => Some(TaskKind::MultipleChoice),
            "text-input" => Some(TaskKind::TextInput),
            _ => None,
        }
    }
}

/// An admin-authored question. `kind` and `answers` are fixed at creation;
/// only `correct_answer` may change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    /// Answer options; present only for multiple-choice tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    /// Data-URL image payload attached at creation. Not used in scoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_by: String,
    pub created_at: String,
}

impl Task {
    pub fn has_option(&self, value: &str) -> bool {
        self.answers
            .as_deref()
            .map(|opts| opts.iter().any(|o| o == value))
            .unwrap_or(false)
    }
}

/// One recorded answer to one task. Immutable once appended to the ledger;
/// `task_text`/`task_kind` are snapshots taken at submission time and are
/// never re-synced if the task changes later.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub student_name: String,
    pub task_id: String,
    pub task_text: String,
    #[serde(rename = "taskType")]
    pub task_kind: TaskKind,
    pub answer: String,
    pub submitted_at: String,
}
