use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

use crate::auth;
use crate::error::{insert_error, AppError};
use crate::ipc::helpers::{require_teacher, required_str, required_trimmed, with_conn};
use crate::ipc::types::{AppState, Request};
use crate::session;

fn signup(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, AppError> {
    let name = required_trimmed(params, "name")?;
    let email = required_trimmed(params, "email")?.to_lowercase();
    let password = required_str(params, "password")?;
    if !email.contains('@') {
        return Err(AppError::InvalidInput("email must contain '@'".to_string()));
    }
    if password.is_empty() {
        return Err(AppError::InvalidInput("password must not be empty".to_string()));
    }

    let teacher_id = Uuid::new_v4().to_string();
    let digest = auth::hash_password(&password)?;
    conn.execute(
        "INSERT INTO teachers(id, name, email, password_hash) VALUES(?, ?, ?, ?)",
        (&teacher_id, &name, &email, &digest),
    )
    .map_err(|e| insert_error(e, "email already registered"))?;

    tracing::info!(teacher_id = %teacher_id, "teacher signed up");
    Ok(json!({ "teacherId": teacher_id }))
}

fn login(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, AppError> {
    let email = required_trimmed(params, "email")?.to_lowercase();
    let password = required_str(params, "password")?;

    let row: Option<(String, String, String)> = conn
        .query_row(
            "SELECT id, name, password_hash FROM teachers WHERE email = ?",
            [&email],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?;

    // Unknown email and wrong password are the same outcome on the wire.
    let Some((teacher_id, name, digest)) = row else {
        return Err(AppError::Unauthenticated);
    };
    if !auth::verify_password(&password, &digest)? {
        return Err(AppError::Unauthenticated);
    }

    let token = session::create(conn, &teacher_id)?;
    Ok(json!({
        "token": token,
        "teacher": { "id": teacher_id, "name": name, "email": email }
    }))
}

fn logout(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, AppError> {
    let token = required_str(params, "token")?;
    session::invalidate(conn, &token)?;
    Ok(json!({ "ok": true }))
}

fn whoami(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, AppError> {
    let teacher = require_teacher(conn, params)?;
    Ok(json!({
        "teacher": { "id": teacher.id, "name": teacher.name, "email": teacher.email }
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.signup" => Some(with_conn(state, req, signup)),
        "auth.login" => Some(with_conn(state, req, login)),
        "auth.logout" => Some(with_conn(state, req, logout)),
        "auth.whoami" => Some(with_conn(state, req, whoami)),
        _ => None,
    }
}
