use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::guard;
use crate::ipc::helpers::{require_teacher, required_str, required_trimmed, with_conn};
use crate::ipc::types::{AppState, Request};

fn list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, AppError> {
    let teacher = require_teacher(conn, params)?;

    // Correlated subqueries for the counts, to avoid double-counting joins.
    let mut stmt = conn.prepare(
        "SELECT
           c.id,
           c.name,
           (SELECT COUNT(*) FROM students s WHERE s.class_id = c.id) AS student_count,
           (SELECT COUNT(*) FROM recitations r WHERE r.class_id = c.id) AS recitation_count
         FROM classes c
         WHERE c.teacher_id = ?
         ORDER BY c.name",
    )?;
    let classes = stmt
        .query_map([&teacher.id], |row| {
            Ok(json!({
                "id": row.get::<_, String>(0)?,
                "name": row.get::<_, String>(1)?,
                "studentCount": row.get::<_, i64>(2)?,
                "recitationCount": row.get::<_, i64>(3)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(json!({ "classes": classes }))
}

fn create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, AppError> {
    let teacher = require_teacher(conn, params)?;
    let name = required_trimmed(params, "name")?;

    let class_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO classes(id, teacher_id, name) VALUES(?, ?, ?)",
        (&class_id, &teacher.id, &name),
    )?;
    Ok(json!({ "classId": class_id, "name": name }))
}

fn rename(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, AppError> {
    let teacher = require_teacher(conn, params)?;
    let class_id = required_str(params, "classId")?;
    let name = required_trimmed(params, "name")?;

    guard::class_access(conn, &teacher.id, &class_id)?.require("class")?;
    conn.execute(
        "UPDATE classes SET name = ? WHERE id = ?",
        (&name, &class_id),
    )?;
    Ok(json!({ "ok": true }))
}

/// Manual cascade in dependency order: attendance -> recitations -> students
/// -> class, all inside one transaction. An uncommitted transaction rolls
/// back on drop, so any failure leaves the chain intact.
fn delete(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, AppError> {
    let teacher = require_teacher(conn, params)?;
    let class_id = required_str(params, "classId")?;

    guard::class_access(conn, &teacher.id, &class_id)?.require("class")?;

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM attendance
         WHERE recitation_id IN (SELECT id FROM recitations WHERE class_id = ?)",
        [&class_id],
    )?;
    tx.execute("DELETE FROM recitations WHERE class_id = ?", [&class_id])?;
    tx.execute("DELETE FROM students WHERE class_id = ?", [&class_id])?;
    tx.execute("DELETE FROM classes WHERE id = ?", [&class_id])?;
    tx.commit()?;

    tracing::info!(class_id = %class_id, "class deleted");
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(with_conn(state, req, list)),
        "classes.create" => Some(with_conn(state, req, create)),
        "classes.rename" => Some(with_conn(state, req, rename)),
        "classes.delete" => Some(with_conn(state, req, delete)),
        _ => None,
    }
}
