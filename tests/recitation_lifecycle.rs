use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_workspace(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "recitad-{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_daemon() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_recitad");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn recitad");
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
    let payload = json!({ "id": id, "method": method, "params": params });
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

fn error_code(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .expect("error code")
        .to_string()
}

fn signup_and_login(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    email: &str,
) -> String {
    let _ = request_ok(
        stdin,
        reader,
        &format!("signup-{}", email),
        "auth.signup",
        json!({ "name": email, "email": email, "password": "pw" }),
    );
    let login = request_ok(
        stdin,
        reader,
        &format!("login-{}", email),
        "auth.login",
        json!({ "email": email, "password": "pw" }),
    );
    login
        .get("token")
        .and_then(|v| v.as_str())
        .expect("token")
        .to_string()
}

#[test]
fn create_update_delete_with_attendance_cascade() {
    let workspace = temp_workspace("recitation-lifecycle");
    let (_child, mut stdin, mut reader) = spawn_daemon();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let token = signup_and_login(&mut stdin, &mut reader, "t1@example.com");

    let class = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "classes.create",
        json!({ "token": token, "name": "Algo101" }),
    );
    let class_id = class
        .get("classId")
        .and_then(|v| v.as_str())
        .expect("classId")
        .to_string();
    let student = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.add",
        json!({ "token": token, "classId": class_id, "name": "Avery" }),
    );
    let student_id = student
        .get("studentId")
        .and_then(|v| v.as_str())
        .expect("studentId")
        .to_string();

    // Empty or missing topic is rejected up front.
    let code = error_code(
        &mut stdin,
        &mut reader,
        "4",
        "recitations.create",
        json!({ "token": token, "classId": class_id, "topic": "   " }),
    );
    assert_eq!(code, "bad_params");
    let code = error_code(
        &mut stdin,
        &mut reader,
        "5",
        "recitations.create",
        json!({ "token": token, "classId": class_id }),
    );
    assert_eq!(code, "bad_params");

    let recitation = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "recitations.create",
        json!({ "token": token, "classId": class_id, "topic": "Sorting" }),
    );
    let recitation_id = recitation
        .get("recitationId")
        .and_then(|v| v.as_str())
        .expect("recitationId")
        .to_string();
    assert!(recitation.get("createdAt").and_then(|v| v.as_str()).is_some());

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "recitations.updateTopic",
        json!({ "token": token, "recitationId": recitation_id, "topic": "Merge Sort" }),
    );
    let listing = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "recitations.list",
        json!({ "token": token, "classId": class_id }),
    );
    let topics: Vec<&str> = listing
        .get("recitations")
        .and_then(|v| v.as_array())
        .expect("recitations")
        .iter()
        .filter_map(|r| r.get("topic").and_then(|v| v.as_str()))
        .collect();
    assert_eq!(topics, vec!["Merge Sort"]);

    // Mark attendance, then delete the recitation; the entries must go too.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "attendance.mark",
        json!({ "token": token, "recitationId": recitation_id, "studentId": student_id, "score": 10 }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "recitations.delete",
        json!({ "token": token, "recitationId": recitation_id }),
    );

    let listing = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "recitations.list",
        json!({ "token": token, "classId": class_id }),
    );
    assert_eq!(
        listing
            .get("recitations")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(0)
    );

    // The id no longer resolves anywhere.
    let code = error_code(
        &mut stdin,
        &mut reader,
        "12",
        "attendance.list",
        json!({ "token": token, "recitationId": recitation_id }),
    );
    assert_eq!(code, "not_found");
    let code = error_code(
        &mut stdin,
        &mut reader,
        "13",
        "recitations.updateTopic",
        json!({ "token": token, "recitationId": recitation_id, "topic": "Ghost" }),
    );
    assert_eq!(code, "not_found");

    // A fresh recitation starts with a clean ledger: the old mark is gone, so
    // the whole roster is eligible again.
    let recitation = request_ok(
        &mut stdin,
        &mut reader,
        "14",
        "recitations.create",
        json!({ "token": token, "classId": class_id, "topic": "Graphs" }),
    );
    let new_id = recitation
        .get("recitationId")
        .and_then(|v| v.as_str())
        .expect("recitationId")
        .to_string();
    let entries = request_ok(
        &mut stdin,
        &mut reader,
        "15",
        "attendance.list",
        json!({ "token": token, "recitationId": new_id }),
    );
    let entries = entries.get("entries").and_then(|v| v.as_array()).expect("entries");
    assert_eq!(entries.len(), 1);
    assert!(entries[0].get("score").map(|v| v.is_null()).unwrap_or(false));
}
