use rusqlite::Connection;
use serde_json::json;

use crate::error::AppError;
use crate::export::{self, AggregateRow};
use crate::guard;
use crate::ipc::helpers::{require_teacher, required_str, with_conn};
use crate::ipc::types::{AppState, Request};
use crate::ledger;

fn recitation_csv(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, AppError> {
    let teacher = require_teacher(conn, params)?;
    let recitation_id = required_str(params, "recitationId")?;
    let class_id = guard::recitation_access(conn, &teacher.id, &recitation_id)?.require()?;

    let rows = ledger::list_for_recitation(conn, &recitation_id, &class_id)?;
    Ok(json!({ "csv": export::recitation_csv(&rows) }))
}

/// Marked entries across recitations, oldest pick first. `class_id = None`
/// spans all of the teacher's classes.
fn aggregate_rows(
    conn: &Connection,
    teacher_id: &str,
    class_id: Option<&str>,
) -> Result<Vec<AggregateRow>, rusqlite::Error> {
    let sql = "SELECT s.name, c.name, r.topic, a.score, a.picked_at
         FROM attendance a
         JOIN recitations r ON r.id = a.recitation_id
         JOIN students s ON s.id = a.student_id
         JOIN classes c ON c.id = r.class_id
         WHERE c.teacher_id = ?1 AND (?2 IS NULL OR c.id = ?2)
         ORDER BY a.picked_at";
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map((teacher_id, class_id), |r| {
            Ok(AggregateRow {
                student_name: r.get(0)?,
                class_name: r.get(1)?,
                topic: r.get(2)?,
                score: r.get(3)?,
                picked_at: r.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn class_csv(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, AppError> {
    let teacher = require_teacher(conn, params)?;
    let class_id = required_str(params, "classId")?;
    guard::class_access(conn, &teacher.id, &class_id)?.require("class")?;

    let rows = aggregate_rows(conn, &teacher.id, Some(&class_id))?;
    Ok(json!({ "csv": export::aggregate_csv(&rows) }))
}

fn all_csv(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, AppError> {
    let teacher = require_teacher(conn, params)?;
    let rows = aggregate_rows(conn, &teacher.id, None)?;
    Ok(json!({ "csv": export::aggregate_csv(&rows) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "export.recitationCsv" => Some(with_conn(state, req, recitation_csv)),
        "export.classCsv" => Some(with_conn(state, req, class_csv)),
        "export.allCsv" => Some(with_conn(state, req, all_csv)),
        _ => None,
    }
}
