use serde_json::json;

use crate::ipc::error::{core_err, err, ok};
use crate::ipc::helpers::{session_from_params, str_param};
use crate::ipc::types::{AppState, Request};
use crate::model::TaskKind;
use crate::registry::{self, CorrectAnswerChange, NewTask};

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let session = match session_from_params(&req.params) {
        Ok(s) => s,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };

    let Some(text) = str_param(&req.params, "text") else {
        return err(&req.id, "bad_params", "missing params.text", None);
    };
    let Some(kind) = str_param(&req.params, "type").and_then(TaskKind::parse) else {
        return err(
            &req.id,
            "bad_params",
            "params.type must be 'multiple-choice' or 'text-input'",
            None,
        );
    };
    let answers: Vec<String> = req
        .params
        .get("answers")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let image = str_param(&req.params, "image").map(str::to_string);

    let input = NewTask {
        text: text.to_string(),
        kind,
        answers,
        image,
    };
    match registry::create_task(store, &session, input) {
        Ok(task) => ok(&req.id, json!({ "task": task })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let session = match session_from_params(&req.params) {
        Ok(s) => s,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };

    match registry::list_tasks(store, &session) {
        Ok(tasks) => ok(&req.id, json!({ "tasks": tasks })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_set_correct_answer(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let session = match session_from_params(&req.params) {
        Ok(s) => s,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let Some(task_id) = str_param(&req.params, "taskId") else {
        return err(&req.id, "bad_params", "missing params.taskId", None);
    };
    // Absent or null answer clears the designation.
    let answer = str_param(&req.params, "answer");

    match registry::set_correct_answer(store, &session, task_id, answer) {
        Ok(change) => {
            let value = match change {
                CorrectAnswerChange::Set(v) => json!(v),
                CorrectAnswerChange::Cleared => serde_json::Value::Null,
            };
            ok(&req.id, json!({ "taskId": task_id, "correctAnswer": value }))
        }
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let session = match session_from_params(&req.params) {
        Ok(s) => s,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let Some(task_id) = str_param(&req.params, "taskId") else {
        return err(&req.id, "bad_params", "missing params.taskId", None);
    };

    match registry::delete_task(store, &session, task_id) {
        Ok(()) => ok(&req.id, json!({ "deleted": true })),
        Err(e) => core_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "tasks.create" => Some(handle_create(state, req)),
        "tasks.list" => Some(handle_list(state, req)),
        "tasks.setCorrectAnswer" => Some(handle_set_correct_answer(state, req)),
        "tasks.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
