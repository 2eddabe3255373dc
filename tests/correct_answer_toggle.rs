use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_quizzerd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn quizzerd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn admin() -> serde_json::Value {
    json!({ "username": "admin", "role": "admin" })
}

fn set_correct(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    task_id: &str,
    answer: &str,
) -> serde_json::Value {
    let result = request_ok(
        stdin,
        reader,
        id,
        "tasks.setCorrectAnswer",
        json!({ "session": admin(), "taskId": task_id, "answer": answer }),
    );
    result.get("correctAnswer").cloned().unwrap_or(json!(null))
}

#[test]
fn multiple_choice_set_is_an_idempotent_toggle() {
    let workspace = temp_dir("quizzer-toggle-mc");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "tasks.create",
        json!({
            "session": admin(),
            "text": "Pick one",
            "type": "multiple-choice",
            "answers": ["A", "B"]
        }),
    );
    let task_id = created
        .get("task")
        .and_then(|t| t.get("id"))
        .and_then(|v| v.as_str())
        .expect("task id")
        .to_string();

    assert_eq!(set_correct(&mut stdin, &mut reader, "3", &task_id, "A"), json!("A"));
    // Same option again clears the designation.
    assert_eq!(set_correct(&mut stdin, &mut reader, "4", &task_id, "A"), json!(null));
    assert_eq!(set_correct(&mut stdin, &mut reader, "5", &task_id, "A"), json!("A"));
    // A different option replaces rather than clears.
    assert_eq!(set_correct(&mut stdin, &mut reader, "6", &task_id, "B"), json!("B"));

    // Values outside the option list are rejected.
    let resp = request(
        &mut stdin,
        &mut reader,
        "7",
        "tasks.setCorrectAnswer",
        json!({ "session": admin(), "taskId": task_id, "answer": "C" }),
    );
    assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        resp.get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some("validation_failed")
    );

    // The rejected call left the previous designation in place.
    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "tasks.list",
        json!({ "session": admin() }),
    );
    let task = &listed.get("tasks").and_then(|v| v.as_array()).expect("tasks")[0];
    assert_eq!(task.get("correctAnswer").and_then(|v| v.as_str()), Some("B"));
}

#[test]
fn text_input_set_overwrites_and_rejects_blank() {
    let workspace = temp_dir("quizzer-toggle-text");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "tasks.create",
        json!({ "session": admin(), "text": "2+2?", "type": "text-input" }),
    );
    let task_id = created
        .get("task")
        .and_then(|t| t.get("id"))
        .and_then(|v| v.as_str())
        .expect("task id")
        .to_string();

    assert_eq!(set_correct(&mut stdin, &mut reader, "3", &task_id, " 4 "), json!("4"));
    // No toggle for text input: repeating the value keeps it set.
    assert_eq!(set_correct(&mut stdin, &mut reader, "4", &task_id, "4"), json!("4"));

    let resp = request(
        &mut stdin,
        &mut reader,
        "5",
        "tasks.setCorrectAnswer",
        json!({ "session": admin(), "taskId": task_id, "answer": "   " }),
    );
    assert_eq!(
        resp.get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some("validation_failed")
    );

    // Explicit null clears.
    let cleared = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "tasks.setCorrectAnswer",
        json!({ "session": admin(), "taskId": task_id, "answer": null }),
    );
    assert!(cleared.get("correctAnswer").map(|v| v.is_null()).unwrap_or(false));
}
