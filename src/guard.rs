use rusqlite::{Connection, OptionalExtension};

use crate::error::AppError;

/// Three-way outcome of an ownership check. "Does not exist" and "exists but
/// belongs to someone else" stay distinguishable; call sites that must deny
/// either way use `require`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Owned,
    Forbidden,
    NotFound,
}

impl Access {
    pub fn require(self, what: &'static str) -> Result<(), AppError> {
        match self {
            Access::Owned => Ok(()),
            Access::Forbidden => Err(AppError::Forbidden(what)),
            Access::NotFound => Err(AppError::NotFound(what)),
        }
    }
}

/// Like `Access`, but carries the recitation's class id on success so callers
/// don't need a second lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecitationAccess {
    Owned { class_id: String },
    Forbidden,
    NotFound,
}

impl RecitationAccess {
    pub fn require(self) -> Result<String, AppError> {
        match self {
            RecitationAccess::Owned { class_id } => Ok(class_id),
            RecitationAccess::Forbidden => {
                Err(AppError::Forbidden("recitation belongs to another teacher"))
            }
            RecitationAccess::NotFound => Err(AppError::NotFound("recitation not found")),
        }
    }
}

pub fn class_access(
    conn: &Connection,
    teacher_id: &str,
    class_id: &str,
) -> Result<Access, rusqlite::Error> {
    let owner: Option<String> = conn
        .query_row(
            "SELECT teacher_id FROM classes WHERE id = ?",
            [class_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(match owner {
        None => Access::NotFound,
        Some(owner) if owner == teacher_id => Access::Owned,
        Some(_) => Access::Forbidden,
    })
}

/// Resolves the recitation to its class and delegates to `class_access`.
pub fn recitation_access(
    conn: &Connection,
    teacher_id: &str,
    recitation_id: &str,
) -> Result<RecitationAccess, rusqlite::Error> {
    let class_id: Option<String> = conn
        .query_row(
            "SELECT class_id FROM recitations WHERE id = ?",
            [recitation_id],
            |r| r.get(0),
        )
        .optional()?;
    let Some(class_id) = class_id else {
        return Ok(RecitationAccess::NotFound);
    };
    Ok(match class_access(conn, teacher_id, &class_id)? {
        Access::Owned => RecitationAccess::Owned { class_id },
        Access::Forbidden => RecitationAccess::Forbidden,
        Access::NotFound => RecitationAccess::NotFound,
    })
}
