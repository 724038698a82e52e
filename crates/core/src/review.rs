//! Customer accept/dispute decision on a weekly report.

use chrono::{DateTime, Utc};

use crate::error::WorkflowError;
use crate::model::{AccessToken, CustomerAction, ReviewOutcome, TokenKind};
use crate::validate::{self, ValidationError, DEFAULT_MAX_TEXT_LEN};
use crate::workflow::{self, Workflow};

/// Stored review state. Expiry is derived from time and never stored;
/// resolvers report it as `AccessState::Expired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    Issued,
    Accepted,
    Disputed,
}

impl ReviewState {
    pub fn of(token: &AccessToken) -> Self {
        match token.outcome.as_ref().map(|o| o.action) {
            None => Self::Issued,
            Some(CustomerAction::Accepted) => Self::Accepted,
            Some(CustomerAction::Disputed) => Self::Disputed,
        }
    }
}

impl std::fmt::Display for ReviewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Issued => "issued",
            Self::Accepted => "accepted",
            Self::Disputed => "disputed",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewCommand {
    Accept,
    Dispute,
}

impl std::fmt::Display for ReviewCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Accept => "accept",
            Self::Dispute => "dispute",
        })
    }
}

pub struct ReviewWorkflow;

impl Workflow for ReviewWorkflow {
    type State = ReviewState;
    type Command = ReviewCommand;
    const NAME: &'static str = "review";

    fn is_terminal(state: ReviewState) -> bool {
        state != ReviewState::Issued
    }

    fn next(state: ReviewState, command: ReviewCommand) -> Option<ReviewState> {
        match (state, command) {
            (ReviewState::Issued, ReviewCommand::Accept) => Some(ReviewState::Accepted),
            (ReviewState::Issued, ReviewCommand::Dispute) => Some(ReviewState::Disputed),
            _ => None,
        }
    }
}

/// A validated accept or dispute request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDecision {
    pub action: CustomerAction,
    pub notes: Option<String>,
}

impl ReviewDecision {
    pub fn accept(notes: Option<&str>) -> Result<Self, ValidationError> {
        Ok(Self {
            action: CustomerAction::Accepted,
            notes: validate::optional_text("notes", notes, DEFAULT_MAX_TEXT_LEN)?,
        })
    }

    pub fn dispute(notes: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            action: CustomerAction::Disputed,
            notes: Some(validate::dispute_notes(notes)?),
        })
    }

    pub fn command(&self) -> ReviewCommand {
        match self.action {
            CustomerAction::Accepted => ReviewCommand::Accept,
            CustomerAction::Disputed => ReviewCommand::Dispute,
        }
    }
}

/// Check `decision` against the token at `now` and build the outcome to store.
///
/// A finalized token reports `AlreadyFinalized` even when it has also expired;
/// an un-actioned expired token reports `Expired` so the sweep stays the only
/// writer of late outcomes.
pub fn decide(
    token: &AccessToken,
    decision: &ReviewDecision,
    now: DateTime<Utc>,
) -> Result<ReviewOutcome, WorkflowError> {
    if token.kind != TokenKind::Review {
        return Err(WorkflowError::NotFound);
    }
    workflow::transition::<ReviewWorkflow>(ReviewState::of(token), decision.command())?;
    if let Some(expired_at) = token.expires_at.filter(|_| token.is_expired_at(now)) {
        return Err(WorkflowError::Expired { expired_at });
    }
    Ok(ReviewOutcome {
        action: decision.action,
        acted_at: now,
        notes: decision.notes.clone(),
    })
}
