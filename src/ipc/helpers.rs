use serde_json::Value;

use crate::session::{Role, Session};

/// Pulls the acting session out of `params.session`. Every method that acts
/// on behalf of a user carries one; there is no server-side session state.
pub fn session_from_params(params: &Value) -> Result<Session, String> {
    let obj = params
        .get("session")
        .ok_or_else(|| "missing params.session".to_string())?;
    let username = obj
        .get("username")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "missing session.username".to_string())?;
    let role = obj
        .get("role")
        .and_then(|v| v.as_str())
        .and_then(Role::parse)
        .ok_or_else(|| "session.role must be 'admin' or 'student'".to_string())?;
    Ok(Session {
        username: username.to_string(),
        role,
    })
}

pub fn str_param<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}
