use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// A single rejected input field, reported back to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        FieldError {
            field,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum PollError {
    #[error("Poll start date is after its end date")]
    InvalidDateRange,
    #[error("Invalid time slot: {0}")]
    InvalidRange(String),
    #[error("Poll already has a chairman")]
    DuplicateChairman,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Invalid input")]
    Validation(Vec<FieldError>),
    #[error("Poll is closed")]
    PollClosed,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Only the poll organizer may do this")]
    Forbidden,
    #[error("Database is busy, try again")]
    Busy,
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl IntoResponse for PollError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            PollError::InvalidDateRange => (StatusCode::BAD_REQUEST, "Invalid date range"),
            PollError::InvalidRange(_) => (StatusCode::BAD_REQUEST, "Invalid time slot"),
            PollError::DuplicateChairman => (StatusCode::CONFLICT, "Duplicate chairman"),
            PollError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
            PollError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "Invalid input"),
            PollError::PollClosed => (StatusCode::BAD_REQUEST, "Poll is closed"),
            PollError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            PollError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden"),
            PollError::Busy => {
                warn!("write transaction gave up while the database stayed busy");
                (StatusCode::SERVICE_UNAVAILABLE, "Database busy")
            }
            PollError::DatabaseError(message) => {
                error!("storage failure: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = match &self {
            PollError::Validation(fields) => Json(json!({
                "error": error_message,
                "details": self.to_string(),
                "fields": fields,
            })),
            PollError::DatabaseError(_) => Json(json!({
                "error": error_message,
                "details": "The request could not be completed"
            })),
            _ => Json(json!({
                "error": error_message,
                "details": self.to_string()
            })),
        };

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for PollError {
    fn from(error: sqlx::Error) -> Self {
        if is_busy(&error) {
            return PollError::Busy;
        }
        PollError::DatabaseError(error.to_string())
    }
}

/// SQLITE_BUSY and its extended codes (BUSY_RECOVERY, BUSY_SNAPSHOT,
/// BUSY_TIMEOUT) share the primary code 5.
const SQLITE_BUSY: i32 = 5;

/// True when SQLite refused a lock because another connection is writing.
pub fn is_busy(error: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db) = error else {
        return false;
    };
    db.code()
        .and_then(|code| code.parse::<i32>().ok())
        .is_some_and(|code| code & 0xff == SQLITE_BUSY)
}

/// True when `error` is the storage layer rejecting a duplicate key.
pub fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}
