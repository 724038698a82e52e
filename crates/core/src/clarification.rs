//! Assignment lifecycle: pending → responded ⇄ replies → cleared | cancelled.

use chrono::{DateTime, Utc};

use crate::error::WorkflowError;
use crate::model::{AccessToken, AssignmentStatus, ClarificationAssignment, Id, TokenKind};
use crate::validate::{self, ValidationError};
use crate::workflow::{self, Workflow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClarificationCommand {
    Respond,
    Reply,
    Clear,
    Cancel,
}

impl std::fmt::Display for ClarificationCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Respond => "respond",
            Self::Reply => "reply",
            Self::Clear => "clear",
            Self::Cancel => "cancel",
        })
    }
}

pub struct ClarificationWorkflow;

impl Workflow for ClarificationWorkflow {
    type State = AssignmentStatus;
    type Command = ClarificationCommand;
    const NAME: &'static str = "clarification";

    fn is_terminal(state: AssignmentStatus) -> bool {
        state.is_terminal()
    }

    fn next(state: AssignmentStatus, command: ClarificationCommand) -> Option<AssignmentStatus> {
        use AssignmentStatus::*;
        use ClarificationCommand as C;

        match (state, command) {
            (Pending | Responded, C::Respond) => Some(Responded),
            // Replies are conversational and never move the status.
            (Pending | Responded, C::Reply) => Some(state),
            (Pending | Responded, C::Clear) => Some(Cleared),
            (Pending | Responded, C::Cancel) => Some(Cancelled),
            (Cleared | Cancelled, _) => None,
        }
    }
}

/// Apply `command` to one assignment.
pub fn advance(
    assignment: &ClarificationAssignment,
    command: ClarificationCommand,
) -> Result<AssignmentStatus, WorkflowError> {
    workflow::transition::<ClarificationWorkflow>(assignment.status, command)
}

/// `true` when there is nothing left to act on. An empty set is not finalized;
/// resolvers treat it as not found.
pub fn all_terminal(assignments: &[ClarificationAssignment]) -> bool {
    !assignments.is_empty() && assignments.iter().all(|a| a.status.is_terminal())
}

/// Outcome label for a fully resolved set: the shared status, or "resolved"
/// when a batch ended in a mix of cleared and cancelled.
pub fn finalized_outcome(assignments: &[ClarificationAssignment]) -> String {
    match assignments.split_first() {
        Some((first, rest)) if rest.iter().all(|a| a.status == first.status) => {
            first.status.to_string()
        }
        _ => "resolved".to_string(),
    }
}

/// Validated assignee response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssigneeResponse {
    pub message: String,
    pub suggested_description: Option<String>,
}

impl AssigneeResponse {
    pub fn new(
        message: &str,
        suggested_description: Option<&str>,
        max_len: usize,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            message: validate::require_text("message", message, max_len)?,
            suggested_description: validate::suggested_description(suggested_description, max_len)?,
        })
    }
}

/// Validated admin reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminReply {
    pub admin: String,
    pub message: String,
}

impl AdminReply {
    pub fn new(admin: &str, message: &str, max_len: usize) -> Result<Self, ValidationError> {
        Ok(Self {
            admin: validate::admin_identity(admin)?,
            message: validate::require_text("message", message, max_len)?,
        })
    }
}

/// Pick the assignment a token-scoped response lands on.
///
/// A response is recorded once, on one assignment. A link covering a single
/// assignment targets it implicitly; a multi-assignment batch requires the
/// respondent to name the assignment, which must belong to the batch.
pub fn respond_target<'a>(
    token: &AccessToken,
    assignments: &'a [ClarificationAssignment],
    requested: Option<Id>,
    now: DateTime<Utc>,
) -> Result<&'a ClarificationAssignment, WorkflowError> {
    if token.kind != TokenKind::Clarification || assignments.is_empty() {
        return Err(WorkflowError::NotFound);
    }
    if all_terminal(assignments) {
        return Err(WorkflowError::AlreadyFinalized {
            outcome: finalized_outcome(assignments),
        });
    }
    if let Some(expired_at) = token.expires_at.filter(|_| token.is_expired_at(now)) {
        return Err(WorkflowError::Expired { expired_at });
    }

    let target = match (requested, assignments) {
        (Some(id), _) => assignments.iter().find(|a| a.id == id).ok_or_else(|| {
            ValidationError::Invalid {
                field: "assignment_id".to_string(),
                reason: "not covered by this link".to_string(),
            }
        })?,
        (None, [only]) => only,
        (None, _) => {
            return Err(ValidationError::MissingField {
                field: "assignment_id".to_string(),
            }
            .into());
        }
    };
    advance(target, ClarificationCommand::Respond)?;
    Ok(target)
}

/// Check a clear request. Returns the description to propose to the
/// reconciler when `apply_suggested_description` is set.
pub fn plan_clear(
    assignment: &ClarificationAssignment,
    apply_suggested_description: bool,
) -> Result<Option<String>, WorkflowError> {
    advance(assignment, ClarificationCommand::Clear)?;
    if !apply_suggested_description {
        return Ok(None);
    }
    match assignment.suggested_description.as_deref() {
        Some(suggested) => Ok(Some(suggested.to_string())),
        None => Err(ValidationError::MissingField {
            field: "suggested_description".to_string(),
        }
        .into()),
    }
}
