//! Shared API types, token generation, and SQL builders for tallyback.
//!
//! This crate is the single source of truth for request/response types used
//! by the server and by `tallyback-api-client`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tallyback_core::WorkflowError;

#[cfg(feature = "backend")]
pub mod crypto;
#[cfg(feature = "backend")]
pub mod db;
#[cfg(feature = "backend")]
pub mod service;

pub use tallyback_core::access::{
    AccessState, ResolvedAccess, ResolvedClarification, ResolvedReview, ReviewSummary,
};
pub use tallyback_core::reconcile::DescriptionDiff;
pub use tallyback_core::{
    AccessToken, AssignmentStatus, ClarificationAssignment, ClarificationMessage, CustomerAction,
    Id, ReportStatus, TimeEntry,
};

// ─── Access ──────────────────────────────────────────────────────────────────

/// Returned by `POST /api/access/{token}/visit`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisitResponse {
    /// `false` when this request had already been counted.
    pub logged: bool,
    pub first_opened_at: Option<DateTime<Utc>>,
    pub last_opened_at: Option<DateTime<Utc>>,
    pub open_count: i64,
}

// ─── Review ──────────────────────────────────────────────────────────────────

/// `POST /api/access/{token}/accept`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcceptRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

/// `POST /api/access/{token}/dispute`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeRequest {
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewActionResponse {
    pub action: CustomerAction,
    pub acted_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub report_status: ReportStatus,
}

// ─── Clarification ───────────────────────────────────────────────────────────

/// `POST /api/access/{token}/respond`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondRequest {
    pub message: String,
    #[serde(default)]
    pub suggested_description: Option<String>,
    /// Required when the link covers several assignments.
    #[serde(default)]
    pub assignment_id: Option<Id>,
}

/// `POST /api/assignments/{id}/reply`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyRequest {
    pub admin: String,
    pub message: String,
}

/// `POST /api/assignments/{id}/clear`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearRequest {
    pub admin: String,
    #[serde(default)]
    pub apply_suggested_description: bool,
}

/// `POST /api/assignments/{id}/cancel`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequest {
    pub admin: String,
}

/// Result of any assignment command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssignmentActionResponse {
    pub assignment_id: Id,
    pub status: AssignmentStatus,
    /// Set when the command appended a message.
    pub message_id: Option<Id>,
    /// Set by `clear` when the entry description was rewritten.
    #[serde(default)]
    pub description_applied: bool,
}

/// `GET /api/assignments/{id}`: the admin view of one thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignmentThreadResponse {
    pub assignment: ClarificationAssignment,
    pub entry: Option<TimeEntry>,
    pub messages: Vec<ClarificationMessage>,
    /// Current entry description against the stored suggestion.
    pub diff: DescriptionDiff,
}

/// `GET /api/assignments`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpenAssignmentsResponse {
    pub assignments: Vec<ClarificationAssignment>,
}

// ─── Issuance ────────────────────────────────────────────────────────────────

/// `POST /api/report-periods/{id}/review-token`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssuedTokenResponse {
    pub token: String,
    pub url: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// One assignment inside `POST /api/clarifications`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAssignment {
    pub time_entry_id: Id,
    pub assignee_name: String,
    #[serde(default)]
    pub assignee_email: Option<String>,
    pub question: String,
}

/// `POST /api/clarifications`: open one or more assignments behind one link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClarificationRequest {
    pub admin: String,
    pub assignments: Vec<NewAssignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateClarificationResponse {
    /// Present when more than one assignment was created.
    pub batch_id: Option<String>,
    pub assignment_ids: Vec<Id>,
    pub link: IssuedTokenResponse,
}

// ─── Health ──────────────────────────────────────────────────────────────────

/// Returned by `GET /api/health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// ─── Service Error ───────────────────────────────────────────────────────────

/// Framework-agnostic service error.
///
/// Each variant maps to an HTTP status code; workflow failures keep their
/// machine-readable code so clients can tell them apart.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum ServiceError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Workflow(WorkflowError),
    Internal(String),
}

impl ServiceError {
    /// HTTP status code as a `u16`.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Workflow(e) => workflow_status(e),
            Self::Internal(_) => 500,
        }
    }

    /// Stable error code carried in the JSON body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Workflow(e) => e.code(),
            Self::Internal(_) => "internal",
        }
    }

    /// The error message.
    pub fn message(&self) -> String {
        match self {
            Self::BadRequest(m) | Self::NotFound(m) | Self::Conflict(m) | Self::Internal(m) => {
                m.clone()
            }
            Self::Workflow(e) => e.to_string(),
        }
    }

    /// Build a closure that wraps a DB/IO error as `Internal`.
    pub fn from_db<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> Self + '_ {
        move |e| Self::Internal(format!("{context}: {e}"))
    }
}

fn workflow_status(e: &WorkflowError) -> u16 {
    match e {
        WorkflowError::NotFound => 404,
        WorkflowError::Expired { .. } => 410,
        WorkflowError::Validation(_) => 400,
        _ => 409,
    }
}

impl From<WorkflowError> for ServiceError {
    fn from(e: WorkflowError) -> Self {
        Self::Workflow(e)
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ServiceError {}

// ─── Error body ──────────────────────────────────────────────────────────────

/// JSON error shape returned by every error response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub error: String,
    pub code: String,
    /// Offending request field for `validation_failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// When the window closed, for `expired`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expired_at: Option<DateTime<Utc>>,
    /// Recorded outcome, for `already_finalized`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

impl From<&ServiceError> for ApiError {
    fn from(e: &ServiceError) -> Self {
        let mut body = Self {
            error: e.message(),
            code: e.code().to_string(),
            field: None,
            expired_at: None,
            outcome: None,
        };
        if let ServiceError::Workflow(w) = e {
            match w {
                WorkflowError::Validation(v) => body.field = Some(v.field().to_string()),
                WorkflowError::Expired { expired_at } => body.expired_at = Some(*expired_at),
                WorkflowError::AlreadyFinalized { outcome } => {
                    body.outcome = Some(outcome.clone())
                }
                _ => {}
            }
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tallyback_core::validate::ValidationError;

    #[test]
    fn workflow_errors_map_to_distinct_statuses() {
        let cases = [
            (WorkflowError::NotFound, 404, "not_found"),
            (
                WorkflowError::Expired {
                    expired_at: DateTime::<Utc>::UNIX_EPOCH,
                },
                410,
                "expired",
            ),
            (
                WorkflowError::AlreadyFinalized {
                    outcome: "accepted".into(),
                },
                409,
                "already_finalized",
            ),
            (WorkflowError::WriteConflict, 409, "write_conflict"),
            (
                ValidationError::MissingField {
                    field: "notes".into(),
                }
                .into(),
                400,
                "validation_failed",
            ),
        ];
        for (err, status, code) in cases {
            let e = ServiceError::from(err);
            assert_eq!(e.status_code(), status);
            assert_eq!(e.code(), code);
        }
    }

    #[test]
    fn error_body_carries_workflow_detail() {
        let e = ServiceError::from(WorkflowError::AlreadyFinalized {
            outcome: "accepted".into(),
        });
        let body = ApiError::from(&e);
        assert_eq!(body.code, "already_finalized");
        assert_eq!(body.outcome.as_deref(), Some("accepted"));

        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("field").is_none());
    }

    #[test]
    fn not_found_message_is_generic() {
        let e = ServiceError::from(WorkflowError::NotFound);
        assert_eq!(e.message(), "link not found");
    }
}
