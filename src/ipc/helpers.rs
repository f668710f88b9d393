use rusqlite::Connection;

use super::error::{fail, ok};
use super::types::{AppState, Request};
use crate::error::AppError;
use crate::session::{self, Teacher};

/// Standard handler shell: require an open workspace, run the operation, and
/// wrap the outcome in the response envelope.
pub fn with_conn<F>(state: &AppState, req: &Request, f: F) -> serde_json::Value
where
    F: FnOnce(&Connection, &serde_json::Value) -> Result<serde_json::Value, AppError>,
{
    let Some(conn) = state.db.as_ref() else {
        return fail(&req.id, &AppError::NoWorkspace);
    };
    match f(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => {
            if let AppError::Storage(msg) = &e {
                tracing::warn!(method = %req.method, error = %msg, "storage failure");
            }
            fail(&req.id, &e)
        }
    }
}

pub fn required_str(params: &serde_json::Value, key: &str) -> Result<String, AppError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| AppError::InvalidInput(format!("missing {}", key)))
}

/// Required string that must be non-empty after trimming (names, topics).
pub fn required_trimmed(params: &serde_json::Value, key: &str) -> Result<String, AppError> {
    let value = required_str(params, key)?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(format!("{} must not be empty", key)));
    }
    Ok(trimmed.to_string())
}

pub fn optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Resolves the `token` param to a teacher. The transport passes the token in
/// explicitly on every authenticated method; nothing reads ambient state.
/// A missing, unknown, or expired token is the same `unauthenticated` outcome.
pub fn require_teacher(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<Teacher, AppError> {
    let token = params
        .get("token")
        .and_then(|v| v.as_str())
        .ok_or(AppError::Unauthenticated)?;
    session::resolve(conn, token)?.ok_or(AppError::Unauthenticated)
}
