use std::collections::HashMap;

use serde_json::json;

use crate::ipc::error::{core_err, err, ok};
use crate::ipc::helpers::{session_from_params, str_param};
use crate::ipc::types::{AppState, Request};
use crate::ledger;
use crate::score;
use crate::session::Role;
use crate::store::Store;

fn handle_submit_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let session = match session_from_params(&req.params) {
        Ok(s) => s,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };

    let Some(raw) = req.params.get("answers").and_then(|v| v.as_object()) else {
        return err(
            &req.id,
            "bad_params",
            "params.answers must be an object keyed by taskId",
            None,
        );
    };
    let mut answers: HashMap<String, String> = HashMap::new();
    for (task_id, value) in raw {
        let Some(answer) = value.as_str() else {
            return err(
                &req.id,
                "bad_params",
                "answers values must be strings",
                Some(json!({ "taskId": task_id })),
            );
        };
        answers.insert(task_id.clone(), answer.to_string());
    }

    match ledger::submit_all(store, &session, &answers) {
        Ok(batch) => {
            let count = batch.len();
            ok(&req.id, json!({ "submissions": batch, "count": count }))
        }
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_submit_one(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let Some(answer) = str_param(&req.params, "answer") else {
        return err(&req.id, "bad_params", "missing params.answer", None);
    };

    match ledger::submit_one(store, &session, task_id, answer) {
        Ok(submission) => ok(&req.id, json!({ "submission": submission })),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_can_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let session = match session_from_params(&req.params) {
        Ok(s) => s,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };

    // Admins may ask about any student; students only about themselves.
    let student_name = match (session.role, str_param(&req.params, "studentName")) {
        (Role::Admin, Some(name)) => name.to_string(),
        _ => session.username.clone(),
    };

    match ledger::can_submit(store, &student_name) {
        Ok(allowed) => ok(
            &req.id,
            json!({ "studentName": student_name, "canSubmit": allowed }),
        ),
        Err(e) => core_err(&req.id, &e),
    }
}

fn handle_overview(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let session = match session_from_params(&req.params) {
        Ok(s) => s,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    if let Err(e) = session.require_admin() {
        return core_err(&req.id, &e);
    }

    let tasks = match store.tasks() {
        Ok(v) => v,
        Err(e) => return core_err(&req.id, &e.into()),
    };
    let submissions = match store.submissions() {
        Ok(v) => v,
        Err(e) => return core_err(&req.id, &e.into()),
    };

    let students = score::overview(&tasks, &submissions);
    ok(&req.id, json!({ "students": students }))
}

fn handle_allow_retake(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let session = match session_from_params(&req.params) {
        Ok(s) => s,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let Some(student_name) = str_param(&req.params, "studentName") else {
        return err(&req.id, "bad_params", "missing params.studentName", None);
    };

    match ledger::allow_retake(store, &session, student_name) {
        Ok(deleted) => ok(
            &req.id,
            json!({ "studentName": student_name, "deleted": deleted }),
        ),
        Err(e) => core_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "submissions.submitAll" => Some(handle_submit_all(state, req)),
        "submissions.submitOne" => Some(handle_submit_one(state, req)),
        "submissions.canSubmit" => Some(handle_can_submit(state, req)),
        "submissions.overview" => Some(handle_overview(state, req)),
        "submissions.allowRetake" => Some(handle_allow_retake(state, req)),
        _ => None,
    }
}
