//! Resolved views of a token: what a link holder is allowed to see.
//!
//! Stores load the raw records; the builders here order them, classify the
//! token, and compute the derived fields shown on the page. Building is pure,
//! so resolving the same rows twice yields the same view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::clarification;
use crate::error::WorkflowError;
use crate::model::{
    AccessToken, ClarificationAssignment, ClarificationMessage, Customer, Id, ReportPeriod,
    TimeEntry, TokenKind,
};

/// Page-level state of a resolved link.
///
/// Precedence is `AlreadyFinalized` > `Expired` > `Active`: a decision made
/// before the deadline is shown as such even after the deadline passes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccessState {
    Active,
    Expired,
    AlreadyFinalized,
}

impl AccessState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::AlreadyFinalized => "already_finalized",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for AccessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn classify(finalized: bool, token: &AccessToken, now: DateTime<Utc>) -> AccessState {
    if finalized {
        AccessState::AlreadyFinalized
    } else if token.is_expired_at(now) {
        AccessState::Expired
    } else {
        AccessState::Active
    }
}

/// Totals shown above the entry table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewSummary {
    pub total_hours: f64,
    pub entry_count: usize,
    pub employee_count: usize,
}

impl ReviewSummary {
    fn of(entries: &[TimeEntry]) -> Self {
        let mut employees: Vec<&str> = entries.iter().map(|e| e.employee.as_str()).collect();
        employees.sort_unstable();
        employees.dedup();
        Self {
            total_hours: entries.iter().map(|e| e.hours).sum(),
            entry_count: entries.len(),
            employee_count: employees.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedReview {
    pub token: AccessToken,
    pub state: AccessState,
    pub period: ReportPeriod,
    pub customer: Customer,
    /// Billable entries inside the period, ordered by date then id.
    pub entries: Vec<TimeEntry>,
    pub summary: ReviewSummary,
    pub remaining_business_days: u32,
}

impl ResolvedReview {
    pub fn build(
        token: AccessToken,
        period: ReportPeriod,
        customer: Customer,
        mut entries: Vec<TimeEntry>,
        now: DateTime<Utc>,
    ) -> Result<Self, WorkflowError> {
        if token.kind != TokenKind::Review || token.subject_id != period.id {
            return Err(WorkflowError::NotFound);
        }
        entries.retain(|e| {
            e.billable
                && e.customer_id == period.customer_id
                && (period.week_start..=period.week_end).contains(&e.date)
        });
        entries.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));

        let state = classify(token.outcome.is_some(), &token, now);
        Ok(Self {
            remaining_business_days: calendar::remaining_business_days(
                &now,
                token.expires_at.as_ref(),
            ),
            summary: ReviewSummary::of(&entries),
            token,
            state,
            period,
            customer,
            entries,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedClarification {
    pub token: AccessToken,
    pub state: AccessState,
    /// Ascending id.
    pub assignments: Vec<ClarificationAssignment>,
    /// Ascending `(created_at, id)` across every assignment in scope.
    pub messages: Vec<ClarificationMessage>,
    /// Distinct entries referenced by the assignments, ascending id.
    pub entries: Vec<TimeEntry>,
    /// Distinct customers of those entries, ascending id.
    pub customers: Vec<Customer>,
    pub remaining_business_days: u32,
}

impl ResolvedClarification {
    pub fn build(
        token: AccessToken,
        mut assignments: Vec<ClarificationAssignment>,
        mut messages: Vec<ClarificationMessage>,
        mut entries: Vec<TimeEntry>,
        mut customers: Vec<Customer>,
        now: DateTime<Utc>,
    ) -> Result<Self, WorkflowError> {
        if token.kind != TokenKind::Clarification {
            return Err(WorkflowError::NotFound);
        }
        assignments.sort_by_key(|a| a.id);
        assignments.dedup_by_key(|a| a.id);
        if assignments.is_empty() {
            return Err(WorkflowError::NotFound);
        }

        let in_scope = |id: Id| assignments.binary_search_by_key(&id, |a| a.id).is_ok();
        messages.retain(|m| in_scope(m.assignment_id));
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        entries.sort_by_key(|e| e.id);
        entries.dedup_by_key(|e| e.id);
        customers.sort_by_key(|c| c.id);
        customers.dedup_by_key(|c| c.id);

        let state = classify(clarification::all_terminal(&assignments), &token, now);
        Ok(Self {
            remaining_business_days: calendar::remaining_business_days(
                &now,
                token.expires_at.as_ref(),
            ),
            token,
            state,
            assignments,
            messages,
            entries,
            customers,
        })
    }

    pub fn assignment_ids(&self) -> Vec<Id> {
        self.assignments.iter().map(|a| a.id).collect()
    }

    /// Messages of one assignment, in thread order.
    pub fn thread(&self, assignment_id: Id) -> impl Iterator<Item = &ClarificationMessage> {
        self.messages
            .iter()
            .filter(move |m| m.assignment_id == assignment_id)
    }

    pub fn entry_for(&self, assignment: &ClarificationAssignment) -> Option<&TimeEntry> {
        self.entries.iter().find(|e| e.id == assignment.time_entry_id)
    }

    /// Initial text for the suggested-description editor.
    ///
    /// Only offered when the link covers exactly one time entry; a batch over
    /// several entries gets an empty editor.
    pub fn editor_prefill(&self) -> Option<&str> {
        match self.entries.as_slice() {
            [only] => Some(only.description.as_deref().unwrap_or_default()),
            _ => None,
        }
    }
}

/// Everything a token grants access to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedAccess {
    Review(ResolvedReview),
    Clarification(ResolvedClarification),
}

impl ResolvedAccess {
    pub fn token(&self) -> &AccessToken {
        match self {
            Self::Review(r) => &r.token,
            Self::Clarification(c) => &c.token,
        }
    }

    pub fn state(&self) -> AccessState {
        match self {
            Self::Review(r) => r.state,
            Self::Clarification(c) => c.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssignmentStatus, CustomerAction, ReportStatus, ReviewOutcome, SenderRole};
    use crate::testing::{assignment, at, clarification_token, day, entry, message, period, review_token};

    fn customer() -> Customer {
        Customer {
            id: 1,
            name: "Acme Plumbing".to_string(),
            email: None,
        }
    }

    #[test]
    fn review_filters_and_orders_entries() {
        let mut late = entry(3, 2.0, Some("late"));
        late.date = day("2024-01-05");
        let mut outside = entry(4, 8.0, None);
        outside.date = day("2024-01-09");
        let mut unbilled = entry(5, 1.0, None);
        unbilled.billable = false;
        let early = entry(7, 1.5, Some("early"));

        let resolved = ResolvedReview::build(
            review_token("R1", Some("2024-01-10T00:00:00Z")),
            period(1, ReportStatus::Sent),
            customer(),
            vec![late, outside, unbilled, early],
            at("2024-01-08T09:00:00Z"),
        )
        .unwrap();

        let ids: Vec<_> = resolved.entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![7, 3]);
        assert_eq!(resolved.summary.total_hours, 3.5);
        assert_eq!(resolved.summary.employee_count, 1);
        assert_eq!(resolved.state, AccessState::Active);
        assert_eq!(resolved.remaining_business_days, 2);
    }

    #[test]
    fn expired_review_still_shows_entries() {
        let resolved = ResolvedReview::build(
            review_token("R1", Some("2024-01-10T00:00:00Z")),
            period(1, ReportStatus::Sent),
            customer(),
            vec![entry(1, 4.0, None)],
            at("2024-01-11T00:00:00Z"),
        )
        .unwrap();
        assert_eq!(resolved.state, AccessState::Expired);
        assert!(resolved.token.outcome.is_none());
        assert_eq!(resolved.entries.len(), 1);
        assert_eq!(resolved.remaining_business_days, 0);
    }

    #[test]
    fn recorded_outcome_wins_over_expiry() {
        let mut token = review_token("R1", Some("2024-01-10T00:00:00Z"));
        token.outcome = Some(ReviewOutcome {
            action: CustomerAction::Accepted,
            acted_at: at("2024-01-09T00:00:00Z"),
            notes: None,
        });
        let resolved = ResolvedReview::build(
            token,
            period(1, ReportStatus::Accepted),
            customer(),
            vec![],
            at("2024-01-11T00:00:00Z"),
        )
        .unwrap();
        assert_eq!(resolved.state, AccessState::AlreadyFinalized);
    }

    #[test]
    fn batch_orders_assignments_by_id() {
        let resolved = ResolvedClarification::build(
            clarification_token("C1", 9, Some("G1"), None),
            vec![
                assignment(5, AssignmentStatus::Pending, Some("G1")),
                assignment(2, AssignmentStatus::Pending, Some("G1")),
                assignment(9, AssignmentStatus::Pending, Some("G1")),
            ],
            vec![],
            vec![entry(105, 1.0, None), entry(102, 1.0, None), entry(109, 1.0, None)],
            vec![customer()],
            at("2024-01-08T09:00:00Z"),
        )
        .unwrap();
        assert_eq!(resolved.assignment_ids(), vec![2, 5, 9]);
        assert_eq!(resolved.editor_prefill(), None);
    }

    #[test]
    fn messages_order_by_time_then_id() {
        let resolved = ResolvedClarification::build(
            clarification_token("C1", 1, None, None),
            vec![assignment(1, AssignmentStatus::Responded, None)],
            vec![
                message(12, 1, SenderRole::Admin, "2024-01-03T10:00:00Z"),
                message(11, 1, SenderRole::Assignee, "2024-01-03T10:00:00Z"),
                message(10, 1, SenderRole::Assignee, "2024-01-04T10:00:00Z"),
                message(13, 99, SenderRole::Admin, "2024-01-01T10:00:00Z"),
            ],
            vec![entry(101, 2.0, Some("Fixed pump"))],
            vec![customer()],
            at("2024-01-08T09:00:00Z"),
        )
        .unwrap();
        let ids: Vec<_> = resolved.messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![11, 12, 10]);
        assert_eq!(resolved.thread(1).count(), 3);
        assert_eq!(resolved.editor_prefill(), Some("Fixed pump"));
        let a = &resolved.assignments[0];
        assert_eq!(resolved.entry_for(a).map(|e| e.id), Some(101));
    }

    #[test]
    fn empty_assignment_set_is_not_found() {
        let err = ResolvedClarification::build(
            clarification_token("C1", 1, Some("G1"), None),
            vec![],
            vec![],
            vec![],
            vec![],
            at("2024-01-08T09:00:00Z"),
        )
        .unwrap_err();
        assert_eq!(err, WorkflowError::NotFound);
    }

    #[test]
    fn all_terminal_batch_is_finalized() {
        let resolved = ResolvedClarification::build(
            clarification_token("C1", 1, Some("G1"), Some("2024-01-05T00:00:00Z")),
            vec![
                assignment(1, AssignmentStatus::Cleared, Some("G1")),
                assignment(2, AssignmentStatus::Cancelled, Some("G1")),
            ],
            vec![],
            vec![],
            vec![],
            at("2024-01-08T09:00:00Z"),
        )
        .unwrap();
        assert_eq!(resolved.state, AccessState::AlreadyFinalized);
    }

    #[test]
    fn resolved_access_serializes_with_kind_tag() {
        let resolved = ResolvedClarification::build(
            clarification_token("C1", 1, None, None),
            vec![assignment(1, AssignmentStatus::Pending, None)],
            vec![],
            vec![],
            vec![],
            at("2024-01-08T09:00:00Z"),
        )
        .unwrap();
        let json = serde_json::to_value(ResolvedAccess::Clarification(resolved)).unwrap();
        assert_eq!(json["kind"], "clarification");
        assert_eq!(json["state"], "active");
    }
}
