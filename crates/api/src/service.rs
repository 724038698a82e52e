//! Shared business logic: framework-agnostic pure functions.
//!
//! Route handlers stay thin adapters: parse the request, call into these
//! helpers and the store, map errors.

use tallyback_core::validate::{self, ValidationError};
use tallyback_core::{TokenKind, WorkflowError};

use crate::{CreateClarificationRequest, ServiceError};

/// Longest token accepted from a URL.
pub const MAX_TOKEN_LEN: usize = 128;

/// Most assignments one link may cover.
pub const MAX_BATCH_SIZE: usize = 50;

// ─── Tokens ─────────────────────────────────────────────────────────────────

/// Reject obviously malformed path tokens without a lookup. Failures are the
/// same generic not-found a missing token produces.
pub fn normalize_token(raw: &str) -> Result<&str, ServiceError> {
    let token = raw.trim();
    if token.is_empty()
        || token.len() > MAX_TOKEN_LEN
        || !token.bytes().all(|b| b.is_ascii_graphic())
    {
        return Err(WorkflowError::NotFound.into());
    }
    Ok(token)
}

/// Public page a link token opens.
pub fn link_url(base_url: &str, kind: TokenKind, token: &str) -> String {
    let page = match kind {
        TokenKind::Review => "review",
        TokenKind::Clarification => "clarify",
    };
    format!("{}/{page}/{token}", base_url.trim_end_matches('/'))
}

/// Identifier shared by assignments issued behind one link.
pub fn new_batch_id() -> String {
    format!("cb_{}", uuid::Uuid::new_v4().simple())
}

// ─── Clarification batches ──────────────────────────────────────────────────

/// A validated assignment ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentDraft {
    pub time_entry_id: i64,
    pub assignee_name: String,
    pub assignee_email: Option<String>,
    pub question: String,
}

/// Validate a create-clarification request. Returns the admin identity and
/// the drafts in request order.
pub fn validate_new_clarification(
    req: &CreateClarificationRequest,
    max_len: usize,
) -> Result<(String, Vec<AssignmentDraft>), ServiceError> {
    let admin = validate::admin_identity(&req.admin).map_err(WorkflowError::from)?;
    if req.assignments.is_empty() {
        return Err(WorkflowError::from(ValidationError::MissingField {
            field: "assignments".to_string(),
        })
        .into());
    }
    if req.assignments.len() > MAX_BATCH_SIZE {
        return Err(WorkflowError::from(ValidationError::Invalid {
            field: "assignments".to_string(),
            reason: format!("at most {MAX_BATCH_SIZE} per link"),
        })
        .into());
    }

    let drafts = req
        .assignments
        .iter()
        .map(|a| -> Result<AssignmentDraft, ValidationError> {
            Ok(AssignmentDraft {
                time_entry_id: a.time_entry_id,
                assignee_name: validate::require_text("assignee_name", &a.assignee_name, 200)?,
                assignee_email: validate::optional_text(
                    "assignee_email",
                    a.assignee_email.as_deref(),
                    254,
                )?,
                question: validate::require_text("question", &a.question, max_len)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(WorkflowError::from)?;
    Ok((admin, drafts))
}
