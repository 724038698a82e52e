use chrono::{DateTime, Utc};
use tallyback_api::ApiError;
use tallyback_core::WorkflowError;
use tallyback_core::validate::ValidationError;
use thiserror::Error;

/// Failure of a client call, whether caught locally or reported by the server.
///
/// Local checks and server responses land on the same variants, so callers
/// render one state per variant regardless of where it was detected.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    #[error("link not found")]
    NotFound,
    #[error("the response window has closed")]
    Expired { expired_at: Option<DateTime<Utc>> },
    #[error("already finalized")]
    AlreadyFinalized { outcome: Option<String> },
    /// The record changed between load and submit; reload before retrying.
    #[error("the record changed; reload and try again")]
    WriteConflict,
    #[error("{message}")]
    Validation {
        field: Option<String>,
        message: String,
    },
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    /// Map a non-2xx response. The JSON `code` wins; the status is the
    /// fallback for bodies from something other than the tallyback server.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<ApiError> = serde_json::from_str(body).ok();
        let code = parsed.as_ref().map(|e| e.code.clone());
        match (code.as_deref(), status) {
            (Some("not_found"), _) | (None, 404) => Self::NotFound,
            (Some("expired"), _) | (None, 410) => Self::Expired {
                expired_at: parsed.and_then(|e| e.expired_at),
            },
            (Some("already_finalized"), _) => Self::AlreadyFinalized {
                outcome: parsed.and_then(|e| e.outcome),
            },
            (Some("write_conflict"), _) | (None, 409) => Self::WriteConflict,
            (Some("validation_failed"), _) | (None, 400) => {
                let (field, message) = match parsed {
                    Some(e) => (e.field, e.error),
                    None => (None, body.to_string()),
                };
                Self::Validation { field, message }
            }
            _ => Self::Http {
                status,
                message: parsed.map(|e| e.error).unwrap_or_else(|| body.to_string()),
            },
        }
    }
}

impl From<WorkflowError> for ClientError {
    fn from(e: WorkflowError) -> Self {
        match e {
            WorkflowError::NotFound => Self::NotFound,
            WorkflowError::Expired { expired_at } => Self::Expired {
                expired_at: Some(expired_at),
            },
            WorkflowError::AlreadyFinalized { outcome } => Self::AlreadyFinalized {
                outcome: Some(outcome),
            },
            WorkflowError::Validation(v) => v.into(),
            WorkflowError::WriteConflict => Self::WriteConflict,
            other => Self::Http {
                status: 409,
                message: other.to_string(),
            },
        }
    }
}

impl From<ValidationError> for ClientError {
    fn from(e: ValidationError) -> Self {
        Self::Validation {
            field: Some(e.field().to_string()),
            message: e.to_string(),
        }
    }
}
