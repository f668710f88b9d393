use thiserror::Error;

/// Every expected failure on the request path is one of these kinds. Handlers
/// return `Result<_, AppError>` and the IPC layer turns the kind into a wire
/// code; storage errors are wrapped here and never reach the caller raw.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    /// No token, unknown token, or expired session.
    #[error("authentication required")]
    Unauthenticated,

    /// Authenticated, but the resource belongs to another teacher.
    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    /// Unique-key violation, e.g. a duplicate signup email.
    #[error("{0}")]
    Conflict(String),

    #[error("select a workspace first")]
    NoWorkspace,

    #[error("storage error: {0}")]
    Storage(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "bad_params",
            AppError::Unauthenticated => "unauthenticated",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::NoWorkspace => "no_workspace",
            AppError::Storage(_) => "storage_failed",
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Storage(e.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(e: bcrypt::BcryptError) -> Self {
        AppError::Storage(e.to_string())
    }
}

/// Maps a failed INSERT to `Conflict` when it tripped a unique constraint,
/// otherwise wraps it as a storage failure.
pub fn insert_error(e: rusqlite::Error, conflict_message: &str) -> AppError {
    match &e {
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            AppError::Conflict(conflict_message.to_string())
        }
        _ => AppError::Storage(e.to_string()),
    }
}
