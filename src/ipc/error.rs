use serde_json::json;

use crate::error::CoreError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Maps the core taxonomy onto the wire envelope.
pub fn core_err(id: &str, e: &CoreError) -> serde_json::Value {
    if let CoreError::Storage(inner) = e {
        tracing::warn!(error = %inner, "storage failure");
    }
    let details = match e {
        CoreError::IncompleteSubmission { missing } => Some(json!({ "missingTaskIds": missing })),
        _ => None,
    };
    err(id, e.code(), e.to_string(), details)
}
