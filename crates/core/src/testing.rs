use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    AccessToken, Assignee, AssignmentStatus, ClarificationAssignment, ClarificationMessage, Id,
    ReportPeriod, ReportStatus, SenderRole, TimeEntry, TokenKind,
};

/// Parse an RFC 3339 instant, panicking on bad input.
pub fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap_or_else(|e| panic!("bad test instant {rfc3339:?}: {e}"))
        .with_timezone(&Utc)
}

/// Parse a `YYYY-MM-DD` date, panicking on bad input.
pub fn day(ymd: &str) -> NaiveDate {
    NaiveDate::parse_from_str(ymd, "%Y-%m-%d")
        .unwrap_or_else(|e| panic!("bad test date {ymd:?}: {e}"))
}

/// Unvisited review token for report period 1, issued 2024-01-01.
pub fn review_token(token: &str, expires_at: Option<&str>) -> AccessToken {
    AccessToken {
        id: next_id(),
        token: token.to_string(),
        kind: TokenKind::Review,
        subject_id: 1,
        batch_id: None,
        created_at: at("2024-01-01T00:00:00Z"),
        expires_at: expires_at.map(at),
        first_opened_at: None,
        last_opened_at: None,
        open_count: 0,
        outcome: None,
    }
}

/// Unvisited clarification token pointing at `assignment_id`.
pub fn clarification_token(
    token: &str,
    assignment_id: Id,
    batch_id: Option<&str>,
    expires_at: Option<&str>,
) -> AccessToken {
    AccessToken {
        kind: TokenKind::Clarification,
        subject_id: assignment_id,
        batch_id: batch_id.map(str::to_string),
        ..review_token(token, expires_at)
    }
}

/// Assignment on time entry 100 + `id`, asked by `admin@example.com`.
pub fn assignment(id: Id, status: AssignmentStatus, batch_id: Option<&str>) -> ClarificationAssignment {
    ClarificationAssignment {
        id,
        time_entry_id: 100 + id,
        assigned_by: "admin@example.com".to_string(),
        assigned_to: Assignee {
            name: "Dana".to_string(),
            email: Some("dana@example.com".to_string()),
        },
        question: "What was done here?".to_string(),
        suggested_description: None,
        status,
        batch_id: batch_id.map(str::to_string),
        created_at: at("2024-01-02T09:00:00Z"),
        responded_at: None,
        cleared_at: None,
        cleared_by: None,
    }
}

pub fn entry(id: Id, hours: f64, description: Option<&str>) -> TimeEntry {
    TimeEntry {
        id,
        customer_id: 1,
        employee: "Dana".to_string(),
        date: day("2024-01-02"),
        hours,
        description: description.map(str::to_string),
        billable: true,
    }
}

pub fn period(id: Id, status: ReportStatus) -> ReportPeriod {
    ReportPeriod {
        id,
        customer_id: 1,
        week_start: day("2024-01-01"),
        week_end: day("2024-01-07"),
        status,
        total_hours: 0.0,
        entry_count: 0,
    }
}

pub fn message(id: Id, assignment_id: Id, role: SenderRole, created_at: &str) -> ClarificationMessage {
    ClarificationMessage {
        id,
        assignment_id,
        sender_role: role,
        sender_name: match role {
            SenderRole::Admin => "admin@example.com".to_string(),
            SenderRole::Assignee => "Dana".to_string(),
        },
        sender_email: None,
        message: format!("message {id}"),
        suggested_description: None,
        created_at: at(created_at),
    }
}

fn next_id() -> Id {
    use std::sync::atomic::{AtomicI64, Ordering};
    static COUNTER: AtomicI64 = AtomicI64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}
