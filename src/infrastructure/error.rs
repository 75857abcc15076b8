use crate::domain::error::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("network error: {0}")]
    Network(String),
    #[error("backend api error: http {status}; {message}")]
    Api { status: u16, message: String },
    #[error("authorization expired, log in again")]
    AuthExpired,
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),
    #[error("not authenticated, log in first")]
    NotAuthenticated,
    #[error("client storage error: {0}")]
    Storage(String),
    #[error("a submission is already in progress")]
    SubmissionInProgress,
    #[error("no study sessions were created ({attempted} attempted)")]
    NoSessionsCreated { attempted: usize },
}
