use rusqlite::ffi;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// A UNIQUE or PRIMARY KEY constraint rejected the row.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The row references an order or license that does not exist.
    #[error("Foreign key violation: {0}")]
    ForeignKey(String),

    /// A required column was NULL.
    #[error("Missing value: {0}")]
    MissingValue(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// True for any error raised by a declared table constraint.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            AppError::Conflict(_)
                | AppError::ForeignKey(_)
                | AppError::MissingValue(_)
                | AppError::Constraint(_)
        )
    }
}

/// Constraint failures are classified by SQLite's extended result code so
/// callers can match on the variant instead of parsing messages.
impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref failure, ref message) = err
            && failure.code == rusqlite::ErrorCode::ConstraintViolation
        {
            let detail = message
                .clone()
                .unwrap_or_else(|| failure.to_string());
            return match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    AppError::Conflict(detail)
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => AppError::ForeignKey(detail),
                ffi::SQLITE_CONSTRAINT_NOTNULL => AppError::MissingValue(detail),
                _ => AppError::Constraint(detail),
            };
        }
        AppError::Database(err)
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
