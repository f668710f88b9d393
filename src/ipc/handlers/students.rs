use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::guard::{self, Access};
use crate::ipc::helpers::{require_teacher, required_str, required_trimmed, with_conn};
use crate::ipc::types::{AppState, Request};

/// Resolves a student to its class and authorizes the chain root. A student
/// id that doesn't resolve, or whose class belongs to someone else, maps to
/// the guard's outcome for the class.
fn authorize_student(
    conn: &Connection,
    teacher_id: &str,
    student_id: &str,
) -> Result<String, AppError> {
    let class_id: Option<String> = conn
        .query_row(
            "SELECT class_id FROM students WHERE id = ?",
            [student_id],
            |r| r.get(0),
        )
        .optional()?;
    let Some(class_id) = class_id else {
        return Err(AppError::NotFound("student not found"));
    };
    match guard::class_access(conn, teacher_id, &class_id)? {
        Access::Owned => Ok(class_id),
        Access::Forbidden => Err(AppError::Forbidden("student belongs to another teacher")),
        Access::NotFound => Err(AppError::NotFound("student not found")),
    }
}

fn list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, AppError> {
    let teacher = require_teacher(conn, params)?;
    let class_id = required_str(params, "classId")?;
    guard::class_access(conn, &teacher.id, &class_id)?.require("class")?;

    let mut stmt = conn.prepare(
        "SELECT id, name FROM students WHERE class_id = ? ORDER BY name",
    )?;
    let students = stmt
        .query_map([&class_id], |row| {
            Ok(json!({
                "id": row.get::<_, String>(0)?,
                "name": row.get::<_, String>(1)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(json!({ "students": students }))
}

fn add(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, AppError> {
    let teacher = require_teacher(conn, params)?;
    let class_id = required_str(params, "classId")?;
    let name = required_trimmed(params, "name")?;
    guard::class_access(conn, &teacher.id, &class_id)?.require("class")?;

    let student_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO students(id, class_id, name) VALUES(?, ?, ?)",
        (&student_id, &class_id, &name),
    )?;
    Ok(json!({ "studentId": student_id, "name": name }))
}

fn rename(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, AppError> {
    let teacher = require_teacher(conn, params)?;
    let student_id = required_str(params, "studentId")?;
    let name = required_trimmed(params, "name")?;
    authorize_student(conn, &teacher.id, &student_id)?;

    conn.execute(
        "UPDATE students SET name = ? WHERE id = ?",
        (&name, &student_id),
    )?;
    Ok(json!({ "ok": true }))
}

fn delete(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, AppError> {
    let teacher = require_teacher(conn, params)?;
    let student_id = required_str(params, "studentId")?;
    authorize_student(conn, &teacher.id, &student_id)?;

    // Attendance rows go first, same transaction.
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM attendance WHERE student_id = ?", [&student_id])?;
    tx.execute("DELETE FROM students WHERE id = ?", [&student_id])?;
    tx.commit()?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(with_conn(state, req, list)),
        "students.add" => Some(with_conn(state, req, add)),
        "students.rename" => Some(with_conn(state, req, rename)),
        "students.delete" => Some(with_conn(state, req, delete)),
        _ => None,
    }
}
