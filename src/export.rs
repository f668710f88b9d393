//! CSV rendering for the attendance exports. Column layouts are fixed for
//! compatibility with existing spreadsheets; keep them stable.

use chrono::DateTime;

use crate::ledger::{LedgerRow, Score};

pub const RECITATION_HEADER: &str = "Student Name,Score,Time Called";
pub const AGGREGATE_HEADER: &str = "Student Name,Class,Topic,Score,Date,Time";

/// One marked row of the aggregate export, already joined across the chain.
#[derive(Debug, Clone)]
pub struct AggregateRow {
    pub student_name: String,
    pub class_name: String,
    pub topic: String,
    pub score: String,
    pub picked_at: String,
}

/// Per-recitation CSV: marked students in pick order, then the unmarked with
/// empty score/time cells (same order the ledger listing produces).
pub fn recitation_csv(rows: &[LedgerRow]) -> String {
    let mut out = String::from(RECITATION_HEADER);
    out.push('\n');
    for row in rows {
        let score = row
            .score
            .as_deref()
            .map(|s| Score::from_storage(s).display())
            .unwrap_or_default();
        let time = row
            .picked_at
            .as_deref()
            .map(|ts| split_timestamp(ts).1)
            .unwrap_or_default();
        out.push_str(&format!(
            "{},{},{}\n",
            field(&row.student_name),
            field(&score),
            field(&time)
        ));
    }
    out
}

pub fn aggregate_csv(rows: &[AggregateRow]) -> String {
    let mut out = String::from(AGGREGATE_HEADER);
    out.push('\n');
    for row in rows {
        let (date, time) = split_timestamp(&row.picked_at);
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            field(&row.student_name),
            field(&row.class_name),
            field(&row.topic),
            field(&Score::from_storage(&row.score).display()),
            field(&date),
            field(&time)
        ));
    }
    out
}

// RFC 3339 -> ("YYYY-MM-DD", "HH:MM:SS"); unparseable input yields empty cells.
fn split_timestamp(ts: &str) -> (String, String) {
    match DateTime::parse_from_rfc3339(ts) {
        Ok(dt) => (
            dt.format("%Y-%m-%d").to_string(),
            dt.format("%H:%M:%S").to_string(),
        ),
        Err(_) => (String::new(), String::new()),
    }
}

fn field(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
