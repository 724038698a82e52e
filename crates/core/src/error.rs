use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::validate::ValidationError;

/// Failure of a read or write against a token-gated record.
///
/// `NotFound` deliberately carries no detail: callers render one generic
/// "link not found" state whether the token never existed or was purged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum WorkflowError {
    #[error("link not found")]
    NotFound,
    #[error("the response window closed at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },
    #[error("already finalized as {outcome}")]
    AlreadyFinalized { outcome: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("the record changed since it was loaded; reload and try again")]
    WriteConflict,
    #[error("{workflow} cannot {command} from {from}")]
    InvalidTransition {
        workflow: &'static str,
        from: String,
        command: String,
    },
}

impl WorkflowError {
    /// Stable machine-readable code, shared by the HTTP layer and the client.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Expired { .. } => "expired",
            Self::AlreadyFinalized { .. } => "already_finalized",
            Self::Validation(_) => "validation_failed",
            Self::WriteConflict => "write_conflict",
            Self::InvalidTransition { .. } => "invalid_transition",
        }
    }
}

/// Persisted data that does not match the model (bad enum text, bad timestamp).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DataError {
    #[error("unknown {kind} value {value:?}")]
    UnknownValue { kind: &'static str, value: String },
    #[error("malformed timestamp {value:?}")]
    Timestamp { value: String },
    #[error("malformed date {value:?}")]
    Date { value: String },
}
