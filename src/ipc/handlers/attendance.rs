use rusqlite::{Connection, OptionalExtension};
use serde_json::json;

use crate::error::AppError;
use crate::guard;
use crate::ipc::helpers::{optional_str, require_teacher, required_str, with_conn};
use crate::ipc::types::{AppState, Request};
use crate::ledger::{self, Score};

fn mark(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, AppError> {
    let teacher = require_teacher(conn, params)?;
    let recitation_id = required_str(params, "recitationId")?;
    let student_id = required_str(params, "studentId")?;
    let class_id = guard::recitation_access(conn, &teacher.id, &recitation_id)?.require()?;

    // The student must be on this recitation's roster; a student from one of
    // the teacher's other classes is still not found here.
    let on_roster: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM students WHERE id = ? AND class_id = ?",
            (&student_id, &class_id),
            |r| r.get(0),
        )
        .optional()?;
    if on_roster.is_none() {
        return Err(AppError::NotFound("student not found in this class"));
    }

    let score = Score::parse(params.get("score"))?;
    let status = optional_str(params, "status");
    if let Some(s) = &status {
        if s.trim().is_empty() {
            return Err(AppError::InvalidInput("status must not be empty".to_string()));
        }
    }

    ledger::mark(conn, &recitation_id, &student_id, &score, status.as_deref())?;
    Ok(json!({ "ok": true }))
}

fn list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, AppError> {
    let teacher = require_teacher(conn, params)?;
    let recitation_id = required_str(params, "recitationId")?;
    let class_id = guard::recitation_access(conn, &teacher.id, &recitation_id)?.require()?;

    let rows = ledger::list_for_recitation(conn, &recitation_id, &class_id)?;
    let entries: Vec<serde_json::Value> = rows
        .into_iter()
        .map(|r| {
            json!({
                "studentId": r.student_id,
                "studentName": r.student_name,
                "score": r.score,
                "status": r.status,
                "pickedAt": r.picked_at,
            })
        })
        .collect();

    Ok(json!({ "entries": entries }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.mark" => Some(with_conn(state, req, mark)),
        "attendance.list" => Some(with_conn(state, req, list)),
        _ => None,
    }
}
