use chrono::Utc;
use rand::rngs::StdRng;
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::guard;
use crate::ipc::error::{fail, ok};
use crate::ipc::helpers::{require_teacher, required_str, required_trimmed, with_conn};
use crate::ipc::types::{AppState, Request};
use crate::ledger;
use crate::picker;

fn list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, AppError> {
    let teacher = require_teacher(conn, params)?;
    let class_id = required_str(params, "classId")?;
    guard::class_access(conn, &teacher.id, &class_id)?.require("class")?;

    let mut stmt = conn.prepare(
        "SELECT id, topic, created_at FROM recitations
         WHERE class_id = ?
         ORDER BY created_at DESC",
    )?;
    let recitations = stmt
        .query_map([&class_id], |row| {
            Ok(json!({
                "id": row.get::<_, String>(0)?,
                "topic": row.get::<_, String>(1)?,
                "createdAt": row.get::<_, String>(2)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(json!({ "recitations": recitations }))
}

fn create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, AppError> {
    let teacher = require_teacher(conn, params)?;
    let class_id = required_str(params, "classId")?;
    let topic = required_trimmed(params, "topic")?;
    guard::class_access(conn, &teacher.id, &class_id)?.require("class")?;

    // Creation time is assigned here, never taken from the client, so the
    // listing and exports order consistently.
    let recitation_id = Uuid::new_v4().to_string();
    let created_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO recitations(id, class_id, topic, created_at) VALUES(?, ?, ?, ?)",
        (&recitation_id, &class_id, &topic, &created_at),
    )?;
    Ok(json!({ "recitationId": recitation_id, "topic": topic, "createdAt": created_at }))
}

fn update_topic(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, AppError> {
    let teacher = require_teacher(conn, params)?;
    let recitation_id = required_str(params, "recitationId")?;
    let topic = required_trimmed(params, "topic")?;
    guard::recitation_access(conn, &teacher.id, &recitation_id)?.require()?;

    conn.execute(
        "UPDATE recitations SET topic = ? WHERE id = ?",
        (&topic, &recitation_id),
    )?;
    Ok(json!({ "ok": true }))
}

/// Cascade: attendance rows first, then the recitation, one transaction.
fn delete(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, AppError> {
    let teacher = require_teacher(conn, params)?;
    let recitation_id = required_str(params, "recitationId")?;
    guard::recitation_access(conn, &teacher.id, &recitation_id)?.require()?;

    let tx = conn.unchecked_transaction()?;
    ledger::delete_all_for_recitation(&tx, &recitation_id)?;
    tx.execute("DELETE FROM recitations WHERE id = ?", [&recitation_id])?;
    tx.commit()?;
    Ok(json!({ "ok": true }))
}

fn pick(
    conn: &Connection,
    rng: &mut StdRng,
    params: &serde_json::Value,
) -> Result<serde_json::Value, AppError> {
    let teacher = require_teacher(conn, params)?;
    let recitation_id = required_str(params, "recitationId")?;
    let class_id = guard::recitation_access(conn, &teacher.id, &recitation_id)?.require()?;

    let pool = picker::eligible(conn, &recitation_id, &class_id)?;
    let Some(candidate) = picker::draw(&pool, rng) else {
        // Everyone has been called; this is a normal outcome, not an error.
        return Ok(json!({
            "exhausted": true,
            "message": "all students have been called"
        }));
    };

    Ok(json!({
        "exhausted": false,
        "student": { "id": candidate.id, "name": candidate.name },
        "remaining": pool.len() as i64 - 1
    }))
}

fn handle_pick(state: &mut AppState, req: &Request) -> serde_json::Value {
    // Split borrows: the picker needs the connection and the RNG at once.
    let AppState { db, rng, .. } = state;
    let Some(conn) = db.as_ref() else {
        return fail(&req.id, &AppError::NoWorkspace);
    };
    match pick(conn, rng, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "recitations.list" => Some(with_conn(state, req, list)),
        "recitations.create" => Some(with_conn(state, req, create)),
        "recitations.updateTopic" => Some(with_conn(state, req, update_topic)),
        "recitations.delete" => Some(with_conn(state, req, delete)),
        "recitations.pick" => Some(handle_pick(state, req)),
        _ => None,
    }
}
