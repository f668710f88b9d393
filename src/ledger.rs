use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::error::AppError;

/// Status recorded when the caller doesn't supply one.
pub const DEFAULT_STATUS: &str = "called";

/// A recitation score: points earned, or one of the two sentinels.
#[derive(Debug, Clone, PartialEq)]
pub enum Score {
    Points(f64),
    Absent,
    Skip,
}

impl Score {
    /// Accepts a JSON number, a numeric string, or the literal sentinels
    /// `absent` / `skip`.
    pub fn parse(value: Option<&serde_json::Value>) -> Result<Score, AppError> {
        let Some(value) = value else {
            return Err(AppError::InvalidInput("missing score".to_string()));
        };
        if let Some(n) = value.as_f64() {
            return Ok(Score::Points(n));
        }
        let Some(s) = value.as_str() else {
            return Err(AppError::InvalidInput(
                "score must be a number, \"absent\", or \"skip\"".to_string(),
            ));
        };
        match s.trim() {
            "absent" => Ok(Score::Absent),
            "skip" => Ok(Score::Skip),
            t => t.parse::<f64>().map(Score::Points).map_err(|_| {
                AppError::InvalidInput(
                    "score must be a number, \"absent\", or \"skip\"".to_string(),
                )
            }),
        }
    }

    /// Canonical TEXT-column form: a bare decimal or the sentinel word.
    pub fn storage_value(&self) -> String {
        match self {
            Score::Points(n) => format_points(*n),
            Score::Absent => "absent".to_string(),
            Score::Skip => "skip".to_string(),
        }
    }

    pub fn from_storage(s: &str) -> Score {
        match s {
            "absent" => Score::Absent,
            "skip" => Score::Skip,
            t => t.parse::<f64>().map(Score::Points).unwrap_or(Score::Points(0.0)),
        }
    }

    /// Human-facing form used by the CSV exports.
    pub fn display(&self) -> String {
        match self {
            Score::Points(n) => format!("{} pts", format_points(*n)),
            Score::Absent => "Absent".to_string(),
            Score::Skip => "Skip".to_string(),
        }
    }
}

fn format_points(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// One roster row from `list_for_recitation`. Unmarked students carry `None`
/// in the ledger columns.
#[derive(Debug, Clone)]
pub struct LedgerRow {
    pub student_id: String,
    pub student_name: String,
    pub score: Option<String>,
    pub status: Option<String>,
    pub picked_at: Option<String>,
}

/// Insert-or-update keyed on (recitation, student). The conflict clause makes
/// the check-then-act atomic: two concurrent marks for the same pair collapse
/// into one row with the later write's score. `picked_at` is refreshed on
/// every upsert, so re-marking moves the student in the pick-order listing.
pub fn mark(
    conn: &Connection,
    recitation_id: &str,
    student_id: &str,
    score: &Score,
    status: Option<&str>,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO attendance(id, recitation_id, student_id, score, status, picked_at)
         VALUES(?, ?, ?, ?, ?, ?)
         ON CONFLICT(recitation_id, student_id) DO UPDATE SET
           score = excluded.score,
           status = excluded.status,
           picked_at = excluded.picked_at",
        (
            Uuid::new_v4().to_string(),
            recitation_id,
            student_id,
            score.storage_value(),
            status.unwrap_or(DEFAULT_STATUS),
            Utc::now().to_rfc3339(),
        ),
    )?;
    Ok(())
}

/// Left-outer-join view of the recitation: every student in the class appears
/// exactly once. Marked students first in pick order, then the unmarked by
/// name ("who went first" followed by "who's left").
pub fn list_for_recitation(
    conn: &Connection,
    recitation_id: &str,
    class_id: &str,
) -> Result<Vec<LedgerRow>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.name, a.score, a.status, a.picked_at
         FROM students s
         LEFT JOIN attendance a
           ON a.student_id = s.id AND a.recitation_id = ?
         WHERE s.class_id = ?
         ORDER BY (a.picked_at IS NULL), a.picked_at, s.name",
    )?;
    let rows = stmt
        .query_map((recitation_id, class_id), |r| {
            Ok(LedgerRow {
                student_id: r.get(0)?,
                student_name: r.get(1)?,
                score: r.get(2)?,
                status: r.get(3)?,
                picked_at: r.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Bulk delete; first step of recitation deletion (run inside the caller's
/// transaction).
pub fn delete_all_for_recitation(
    conn: &Connection,
    recitation_id: &str,
) -> Result<usize, rusqlite::Error> {
    conn.execute("DELETE FROM attendance WHERE recitation_id = ?", [recitation_id])
}
