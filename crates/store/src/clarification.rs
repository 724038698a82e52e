//! Clarification commands and admin views.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use tallyback_api::db;
use tallyback_api::{AssignmentActionResponse, AssignmentThreadResponse};
use tallyback_core::clarification::{self, AdminReply, AssigneeResponse, ClarificationCommand};
use tallyback_core::reconcile;
use tallyback_core::timestamp;
use tallyback_core::validate;
use tallyback_core::{AssignmentStatus, ClarificationAssignment, Id, SenderRole, WorkflowError};

use crate::access::load_assignment_set;
use crate::{load_token, rows, sql};
use crate::{Result, ReviewDb};

fn load_assignment(conn: &Connection, id: Id) -> Result<ClarificationAssignment> {
    sql::query_opt(conn, db::clarifications::lookup_assignment(id), rows::assignment)?
        .ok_or_else(|| WorkflowError::NotFound.into())
}

/// Guarded move to a terminal status; a concurrent close surfaces as a conflict.
fn close(
    conn: &Connection,
    assignment: &ClarificationAssignment,
    status: AssignmentStatus,
    admin: &str,
    now: &str,
) -> Result<()> {
    let updated = sql::execute(
        conn,
        db::clarifications::mark_terminal(assignment.id, status, admin, now),
    )?;
    if updated == 0 {
        return Err(WorkflowError::WriteConflict.into());
    }
    Ok(())
}

/// Write `suggested` as the entry's description. Only the description
/// column changes; an identical description is a no-op and returns `false`.
fn apply_description(
    conn: &Connection,
    time_entry_id: Id,
    suggested: &str,
    now: &str,
) -> Result<bool> {
    let entry = sql::query_opt(conn, db::time_entries::lookup(time_entry_id), rows::entry)?
        .ok_or(WorkflowError::NotFound)?;
    let Some(next) = reconcile::replacement(entry.description.as_deref(), suggested) else {
        return Ok(false);
    };
    sql::execute(conn, db::time_entries::update_description(entry.id, &next, now))?;
    Ok(true)
}

/// Staff identities double as email addresses when they look like one.
fn email_of(identity: &str) -> Option<&str> {
    identity.contains('@').then_some(identity)
}

impl ReviewDb {
    /// Assignee response through a clarification link.
    ///
    /// `assignment_id` picks the assignment inside a batch link; a link for a
    /// single assignment may omit it.
    pub fn respond(
        &self,
        token: &str,
        message: &str,
        suggested_description: Option<&str>,
        assignment_id: Option<Id>,
        now: DateTime<Utc>,
    ) -> Result<AssignmentActionResponse> {
        let response = AssigneeResponse::new(
            message,
            suggested_description,
            self.config().clarification.max_message_len,
        )?;

        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let token = load_token(&tx, token)?;
        let set = load_assignment_set(&tx, &token)?;
        let target = clarification::respond_target(&token, &set, assignment_id, now)?;

        let created_at = timestamp::format(&now);
        sql::execute(
            &tx,
            db::clarifications::insert_message(
                target.id,
                SenderRole::Assignee,
                &target.assigned_to.name,
                target.assigned_to.email.as_deref(),
                &response.message,
                response.suggested_description.as_deref(),
                &created_at,
            ),
        )?;
        let message_id = tx.last_insert_rowid();

        let updated = sql::execute(
            &tx,
            db::clarifications::mark_responded(
                target.id,
                &created_at,
                response.suggested_description.as_deref(),
            ),
        )?;
        if updated == 0 {
            return Err(WorkflowError::WriteConflict.into());
        }
        tx.commit()?;

        tracing::info!(assignment_id = target.id, "assignee responded");
        Ok(AssignmentActionResponse {
            assignment_id: target.id,
            status: AssignmentStatus::Responded,
            message_id: Some(message_id),
            description_applied: false,
        })
    }

    /// Admin message on an open thread. Does not change the status.
    pub fn reply(
        &self,
        assignment_id: Id,
        admin: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<AssignmentActionResponse> {
        let reply = AdminReply::new(admin, message, self.config().clarification.max_message_len)?;

        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let assignment = load_assignment(&tx, assignment_id)?;
        let status = clarification::advance(&assignment, ClarificationCommand::Reply)?;

        sql::execute(
            &tx,
            db::clarifications::insert_message(
                assignment.id,
                SenderRole::Admin,
                &reply.admin,
                email_of(&reply.admin),
                &reply.message,
                None,
                &timestamp::format(&now),
            ),
        )?;
        let message_id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(AssignmentActionResponse {
            assignment_id,
            status,
            message_id: Some(message_id),
            description_applied: false,
        })
    }

    /// Resolve an assignment. With `apply_suggested_description`, the stored
    /// suggestion is written to the time entry in the same transaction; if
    /// that write fails the assignment stays open.
    pub fn clear(
        &self,
        assignment_id: Id,
        admin: &str,
        apply_suggested_description: bool,
        now: DateTime<Utc>,
    ) -> Result<AssignmentActionResponse> {
        let admin = validate::admin_identity(admin)?;

        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let assignment = load_assignment(&tx, assignment_id)?;
        let proposal = clarification::plan_clear(&assignment, apply_suggested_description)?;
        let stamp = timestamp::format(&now);

        let description_applied = match proposal {
            Some(suggested) => {
                apply_description(&tx, assignment.time_entry_id, &suggested, &stamp)?
            }
            None => false,
        };

        close(&tx, &assignment, AssignmentStatus::Cleared, &admin, &stamp)?;
        tx.commit()?;

        tracing::info!(assignment_id, description_applied, "assignment cleared");
        Ok(AssignmentActionResponse {
            assignment_id,
            status: AssignmentStatus::Cleared,
            message_id: None,
            description_applied,
        })
    }

    /// Withdraw an assignment without touching the time entry.
    pub fn cancel(
        &self,
        assignment_id: Id,
        admin: &str,
        now: DateTime<Utc>,
    ) -> Result<AssignmentActionResponse> {
        let admin = validate::admin_identity(admin)?;

        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let assignment = load_assignment(&tx, assignment_id)?;
        clarification::advance(&assignment, ClarificationCommand::Cancel)?;
        close(
            &tx,
            &assignment,
            AssignmentStatus::Cancelled,
            &admin,
            &timestamp::format(&now),
        )?;
        tx.commit()?;

        tracing::info!(assignment_id, "assignment cancelled");
        Ok(AssignmentActionResponse {
            assignment_id,
            status: AssignmentStatus::Cancelled,
            message_id: None,
            description_applied: false,
        })
    }

    /// One assignment with its entry and full thread, for the admin view.
    pub fn assignment_thread(&self, assignment_id: Id) -> Result<AssignmentThreadResponse> {
        let conn = self.conn();
        let assignment = load_assignment(&conn, assignment_id)?;
        let entry = sql::query_opt(
            &conn,
            db::time_entries::lookup(assignment.time_entry_id),
            rows::entry,
        )?;
        let messages = sql::query_all(
            &conn,
            db::clarifications::list_messages(&[assignment.id]),
            rows::message,
        )?;
        let diff = reconcile::diff(
            entry.as_ref().and_then(|e| e.description.as_deref()),
            assignment.suggested_description.as_deref(),
        );
        Ok(AssignmentThreadResponse {
            assignment,
            entry,
            messages,
            diff,
        })
    }

    /// Pending and responded assignments, id ascending.
    pub fn list_open_assignments(&self) -> Result<Vec<ClarificationAssignment>> {
        let conn = self.conn();
        Ok(sql::query_all(&conn, db::clarifications::list_open(), rows::assignment)?)
    }
}

#[cfg(test)]
mod tests {
    use tallyback_api::service::AssignmentDraft;
    use tallyback_core::access::AccessState;
    use tallyback_core::testing::at;

    use super::*;
    use crate::test_support::seeded_db;
    use crate::NewClarification;

    fn draft(time_entry_id: Id) -> AssignmentDraft {
        AssignmentDraft {
            time_entry_id,
            assignee_name: "Dana".to_string(),
            assignee_email: Some("dana@example.com".to_string()),
            question: "What was done on site?".to_string(),
        }
    }

    fn open(db: &ReviewDb, entries: &[Id]) -> NewClarification {
        let drafts: Vec<_> = entries.iter().copied().map(draft).collect();
        db.create_clarification("admin@x", &drafts, at("2024-01-08T09:00:00Z"))
            .unwrap()
    }

    #[test]
    fn respond_then_clear_applies_the_suggestion() {
        let db = seeded_db();
        let created = open(&db, &[101]);
        let a1 = created.assignment_ids[0];

        let r = db
            .respond(
                &created.token.token,
                "did X",
                Some("Replaced gasket"),
                None,
                at("2024-01-08T10:00:00Z"),
            )
            .unwrap();
        assert_eq!(r.status, AssignmentStatus::Responded);

        let thread = db.assignment_thread(a1).unwrap();
        assert_eq!(thread.messages.len(), 1);
        assert_eq!(thread.messages[0].sender_role, SenderRole::Assignee);
        assert_eq!(thread.messages[0].sender_name, "Dana");
        assert_eq!(
            thread.assignment.suggested_description.as_deref(),
            Some("Replaced gasket")
        );
        assert!(thread.diff.changed);
        assert_eq!(thread.diff.current, "Fixed pump");

        let cleared = db.clear(a1, "admin@x", true, at("2024-01-08T11:00:00Z")).unwrap();
        assert!(cleared.description_applied);

        let thread = db.assignment_thread(a1).unwrap();
        assert_eq!(thread.assignment.status, AssignmentStatus::Cleared);
        assert_eq!(thread.assignment.cleared_by.as_deref(), Some("admin@x"));
        assert!(!thread.diff.changed);
        assert_eq!(
            thread.entry.unwrap().description.as_deref(),
            Some("Replaced gasket")
        );

        let err = db
            .respond(&created.token.token, "more", None, None, at("2024-01-08T12:00:00Z"))
            .unwrap_err();
        assert_eq!(err.as_workflow().map(WorkflowError::code), Some("already_finalized"));
        let err = db.reply(a1, "admin@x", "one more thing", at("2024-01-08T12:00:00Z")).unwrap_err();
        assert_eq!(err.as_workflow().map(WorkflowError::code), Some("already_finalized"));

        let resolved = db
            .resolve_clarification(&created.token.token, at("2024-01-08T12:00:00Z"))
            .unwrap();
        assert_eq!(resolved.state, AccessState::AlreadyFinalized);
    }

    #[test]
    fn clear_without_apply_leaves_entry_alone() {
        let db = seeded_db();
        let created = open(&db, &[101]);
        let a1 = created.assignment_ids[0];
        db.respond(&created.token.token, "did X", Some("Replaced gasket"), None, at("2024-01-08T10:00:00Z"))
            .unwrap();

        let cleared = db.clear(a1, "admin@x", false, at("2024-01-08T11:00:00Z")).unwrap();
        assert!(!cleared.description_applied);
        let thread = db.assignment_thread(a1).unwrap();
        assert_eq!(thread.entry.unwrap().description.as_deref(), Some("Fixed pump"));
    }

    #[test]
    fn applying_an_identical_description_is_a_no_op() {
        let db = seeded_db();
        let created = open(&db, &[101]);
        let a1 = created.assignment_ids[0];
        db.respond(&created.token.token, "already right", Some("Fixed pump"), None, at("2024-01-08T10:00:00Z"))
            .unwrap();

        let cleared = db.clear(a1, "admin@x", true, at("2024-01-08T11:00:00Z")).unwrap();
        assert!(!cleared.description_applied);
        assert_eq!(cleared.status, AssignmentStatus::Cleared);
    }

    #[test]
    fn apply_without_suggestion_keeps_assignment_open() {
        let db = seeded_db();
        let created = open(&db, &[101]);
        let a1 = created.assignment_ids[0];
        db.respond(&created.token.token, "did X", None, None, at("2024-01-08T10:00:00Z"))
            .unwrap();

        let err = db.clear(a1, "admin@x", true, at("2024-01-08T11:00:00Z")).unwrap_err();
        assert_eq!(err.as_workflow().map(WorkflowError::code), Some("validation_failed"));
        let thread = db.assignment_thread(a1).unwrap();
        assert_eq!(thread.assignment.status, AssignmentStatus::Responded);
    }

    #[test]
    fn reply_keeps_status_and_orders_thread() {
        let db = seeded_db();
        let created = open(&db, &[101]);
        let a1 = created.assignment_ids[0];
        let same = at("2024-01-08T10:00:00Z");

        db.reply(a1, "admin@x", "Any update?", same).unwrap();
        db.respond(&created.token.token, "did X", None, None, same).unwrap();
        let r = db.reply(a1, "admin@x", "Thanks", at("2024-01-08T11:00:00Z")).unwrap();
        assert_eq!(r.status, AssignmentStatus::Responded);

        let thread = db.assignment_thread(a1).unwrap();
        let roles: Vec<_> = thread.messages.iter().map(|m| m.sender_role).collect();
        assert_eq!(
            roles,
            vec![SenderRole::Admin, SenderRole::Assignee, SenderRole::Admin]
        );
        assert_eq!(thread.messages[0].sender_email.as_deref(), Some("admin@x"));
    }

    #[test]
    fn batch_response_needs_a_target() {
        let db = seeded_db();
        let created = open(&db, &[101, 102]);
        let now = at("2024-01-08T10:00:00Z");

        let err = db.respond(&created.token.token, "did X", None, None, now).unwrap_err();
        assert_eq!(err.as_workflow().map(WorkflowError::code), Some("validation_failed"));

        let second = created.assignment_ids[1];
        let r = db
            .respond(&created.token.token, "did X", None, Some(second), now)
            .unwrap();
        assert_eq!(r.assignment_id, second);

        let open_now = db.list_open_assignments().unwrap();
        let statuses: Vec<_> = open_now.iter().map(|a| (a.id, a.status)).collect();
        assert_eq!(
            statuses,
            vec![
                (created.assignment_ids[0], AssignmentStatus::Pending),
                (second, AssignmentStatus::Responded),
            ]
        );
    }

    #[test]
    fn cancel_is_terminal_without_side_effects() {
        let db = seeded_db();
        let created = open(&db, &[101]);
        let a1 = created.assignment_ids[0];

        db.cancel(a1, "admin@x", at("2024-01-08T10:00:00Z")).unwrap();
        let thread = db.assignment_thread(a1).unwrap();
        assert_eq!(thread.assignment.status, AssignmentStatus::Cancelled);
        assert_eq!(thread.entry.unwrap().description.as_deref(), Some("Fixed pump"));

        let err = db.clear(a1, "admin@x", false, at("2024-01-08T11:00:00Z")).unwrap_err();
        assert_eq!(err.as_workflow().map(WorkflowError::code), Some("already_finalized"));
        assert!(db.list_open_assignments().unwrap().is_empty());
    }

    #[test]
    fn unknown_assignment_is_not_found() {
        let db = seeded_db();
        let err = db.cancel(42, "admin@x", at("2024-01-08T10:00:00Z")).unwrap_err();
        assert!(matches!(err.as_workflow(), Some(WorkflowError::NotFound)));
    }

    #[test]
    fn batch_members_resolve_in_ascending_id_order() {
        let db = seeded_db();
        {
            let conn = db.conn();
            for id in [5, 2, 9] {
                conn.execute(
                    "INSERT INTO clarification_assignments \
                     (id, time_entry_id, assigned_by, assignee_name, question, status, batch_id, created_at) \
                     VALUES (?1, 101, 'admin@x', 'Dana', 'Why?', 'pending', 'G1', '2024-01-08T09:00:00.000000Z')",
                    [id],
                )
                .unwrap();
            }
            conn.execute(
                "INSERT INTO access_tokens (token, kind, subject_id, batch_id, created_at) \
                 VALUES ('tb_cl_g1', 'clarification', 9, 'G1', '2024-01-08T09:00:00.000000Z')",
                [],
            )
            .unwrap();
        }
        let resolved = db
            .resolve_clarification("tb_cl_g1", at("2024-01-08T10:00:00Z"))
            .unwrap();
        assert_eq!(resolved.assignment_ids(), vec![2, 5, 9]);
        assert_eq!(resolved.editor_prefill(), Some("Fixed pump"));
    }
}
