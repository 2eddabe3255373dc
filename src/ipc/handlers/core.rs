use serde_json::json;
use std::path::PathBuf;

use crate::ipc::error::{core_err, err, ok};
use crate::ipc::helpers::str_param;
use crate::ipc::types::{AppState, Request};
use crate::session::{self, Role};
use crate::store::SqliteStore;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(path) = str_param(&req.params, "path").map(PathBuf::from) else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match SqliteStore::open(&path) {
        Ok(store) => {
            tracing::info!(path = %path.to_string_lossy(), "workspace opened");
            state.workspace = Some(path.clone());
            state.store = Some(store);
            ok(&req.id, json!({ "workspacePath": path.to_string_lossy() }))
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

fn handle_auth_login(req: &Request) -> serde_json::Value {
    let Some(username) = str_param(&req.params, "username") else {
        return err(&req.id, "bad_params", "missing params.username", None);
    };
    let Some(password) = str_param(&req.params, "password") else {
        return err(&req.id, "bad_params", "missing params.password", None);
    };
    let Some(role) = str_param(&req.params, "role").and_then(Role::parse) else {
        return err(
            &req.id,
            "bad_params",
            "params.role must be 'admin' or 'student'",
            None,
        );
    };

    match session::login(username, password, role) {
        Ok(session) => ok(&req.id, json!({ "session": session })),
        Err(e) => core_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "auth.login" => Some(handle_auth_login(req)),
        _ => None,
    }
}
