use thiserror::Error;

/// Failures surfaced by the persistence layer. Never swallowed: every store
/// operation propagates these to the caller as `storage_failed`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("corrupt stored record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt stored record: {0}")]
    Corrupt(String),
}

/// Core error taxonomy. Validation and incomplete-submission failures are
/// fail-closed: they mutate nothing.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0}")]
    Validation(String),
    #[error("{} task(s) unanswered", missing.len())]
    IncompleteSubmission { missing: Vec<String> },
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("{0}")]
    Forbidden(String),
    #[error("invalid credentials")]
    Unauthorized,
    #[error("no such task: {0}")]
    TaskNotFound(String),
}

impl CoreError {
    /// Stable wire code for the IPC error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation_failed",
            CoreError::IncompleteSubmission { .. } => "incomplete_submission",
            CoreError::Storage(_) => "storage_failed",
            CoreError::Forbidden(_) => "forbidden",
            CoreError::Unauthorized => "unauthorized",
            CoreError::TaskNotFound(_) => "not_found",
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }
}
