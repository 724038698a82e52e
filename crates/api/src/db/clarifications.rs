//! Clarification assignment and message query builders.

use sea_query::{Expr, Func, Query, SimpleExpr, SqliteQueryBuilder};
use tallyback_core::{AssignmentStatus, Id, SenderRole};

use super::tables::{ClarificationAssignments as A, ClarificationMessages as M};
use super::Built;

const OPEN: [&str; 2] = ["pending", "responded"];

pub fn assignment_columns() -> [A; 13] {
    [
        A::Id,
        A::TimeEntryId,
        A::AssignedBy,
        A::AssigneeName,
        A::AssigneeEmail,
        A::Question,
        A::SuggestedDescription,
        A::Status,
        A::BatchId,
        A::CreatedAt,
        A::RespondedAt,
        A::ClearedAt,
        A::ClearedBy,
    ]
}

pub fn message_columns() -> [M; 8] {
    [
        M::Id,
        M::AssignmentId,
        M::SenderRole,
        M::SenderName,
        M::SenderEmail,
        M::Message,
        M::SuggestedDescription,
        M::CreatedAt,
    ]
}

// ─── Assignments ─────────────────────────────────────────────────────────────

/// INSERT a pending assignment.
#[allow(clippy::too_many_arguments)]
pub fn insert_assignment(
    time_entry_id: Id,
    assigned_by: &str,
    assignee_name: &str,
    assignee_email: Option<&str>,
    question: &str,
    batch_id: Option<&str>,
    created_at: &str,
) -> Built {
    Query::insert()
        .into_table(A::Table)
        .columns([
            A::TimeEntryId,
            A::AssignedBy,
            A::AssigneeName,
            A::AssigneeEmail,
            A::Question,
            A::Status,
            A::BatchId,
            A::CreatedAt,
        ])
        .values_panic([
            time_entry_id.into(),
            assigned_by.into(),
            assignee_name.into(),
            assignee_email.map(str::to_string).into(),
            question.into(),
            AssignmentStatus::Pending.as_str().into(),
            batch_id.map(str::to_string).into(),
            created_at.into(),
        ])
        .build(SqliteQueryBuilder)
}

pub fn lookup_assignment(id: Id) -> Built {
    Query::select()
        .columns(assignment_columns())
        .from(A::Table)
        .and_where(Expr::col(A::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Every assignment sharing `batch_id`, ascending id.
pub fn list_by_batch(batch_id: &str) -> Built {
    Query::select()
        .columns(assignment_columns())
        .from(A::Table)
        .and_where(Expr::col(A::BatchId).eq(batch_id))
        .order_by(A::Id, sea_query::Order::Asc)
        .build(SqliteQueryBuilder)
}

/// Pending and responded assignments by id.
pub fn list_open() -> Built {
    Query::select()
        .columns(assignment_columns())
        .from(A::Table)
        .and_where(Expr::col(A::Status).is_in(OPEN))
        .order_by(A::Id, sea_query::Order::Asc)
        .build(SqliteQueryBuilder)
}

/// Move an open assignment to `responded`. The first response time sticks;
/// a new suggestion replaces the stored one.
pub fn mark_responded(id: Id, now: &str, suggested_description: Option<&str>) -> Built {
    let mut query = Query::update();
    query
        .table(A::Table)
        .value(A::Status, AssignmentStatus::Responded.as_str())
        .value(
            A::RespondedAt,
            Func::coalesce([SimpleExpr::from(Expr::col(A::RespondedAt)), Expr::val(now).into()]),
        )
        .and_where(Expr::col(A::Id).eq(id))
        .and_where(Expr::col(A::Status).is_in(OPEN));
    if let Some(suggested) = suggested_description {
        query.value(A::SuggestedDescription, suggested);
    }
    query.build(SqliteQueryBuilder)
}

/// Close an open assignment as `cleared` or `cancelled`.
pub fn mark_terminal(id: Id, status: AssignmentStatus, admin: &str, now: &str) -> Built {
    Query::update()
        .table(A::Table)
        .value(A::Status, status.as_str())
        .value(A::ClearedAt, now)
        .value(A::ClearedBy, admin)
        .and_where(Expr::col(A::Id).eq(id))
        .and_where(Expr::col(A::Status).is_in(OPEN))
        .build(SqliteQueryBuilder)
}

// ─── Messages ────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub fn insert_message(
    assignment_id: Id,
    sender_role: SenderRole,
    sender_name: &str,
    sender_email: Option<&str>,
    message: &str,
    suggested_description: Option<&str>,
    created_at: &str,
) -> Built {
    Query::insert()
        .into_table(M::Table)
        .columns([
            M::AssignmentId,
            M::SenderRole,
            M::SenderName,
            M::SenderEmail,
            M::Message,
            M::SuggestedDescription,
            M::CreatedAt,
        ])
        .values_panic([
            assignment_id.into(),
            sender_role.as_str().into(),
            sender_name.into(),
            sender_email.map(str::to_string).into(),
            message.into(),
            suggested_description.map(str::to_string).into(),
            created_at.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Messages of the given assignments in thread order.
pub fn list_messages(assignment_ids: &[Id]) -> Built {
    Query::select()
        .columns(message_columns())
        .from(M::Table)
        .and_where(Expr::col(M::AssignmentId).is_in(assignment_ids.iter().copied()))
        .order_by(M::CreatedAt, sea_query::Order::Asc)
        .order_by(M::Id, sea_query::Order::Asc)
        .build(SqliteQueryBuilder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn responded_update_only_sets_suggestion_when_given() {
        let (without, values) = mark_responded(1, "2024-01-08T09:00:00.000000Z", None);
        assert!(!without.contains("suggested_description"));
        let (with, more) = mark_responded(1, "2024-01-08T09:00:00.000000Z", Some("x"));
        assert!(with.contains("\"suggested_description\" = ?"));
        assert_eq!(more.0.len(), values.0.len() + 1);
    }

    #[test]
    fn terminal_update_is_guarded_by_open_status() {
        let (sql, _) = mark_terminal(1, AssignmentStatus::Cleared, "admin@x", "now");
        assert!(sql.contains("\"status\" IN (?, ?)"));
    }
}
