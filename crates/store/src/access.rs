//! Read path: token resolution and visit accounting.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tallyback_api::db;
use tallyback_core::access::{ResolvedAccess, ResolvedClarification, ResolvedReview};
use tallyback_core::timestamp;
use tallyback_core::visit::{VisitGuard, VisitStamp};
use tallyback_core::{AccessToken, ClarificationAssignment, TokenKind, WorkflowError};

use crate::{load_token, rows, sql};
use crate::{Result, ReviewDb};

/// Result of [`ReviewDb::record_visit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitOutcome {
    /// `false` when the guard had already been claimed and nothing was written.
    pub logged: bool,
    pub stamp: VisitStamp,
}

fn stamp(token: &AccessToken) -> VisitStamp {
    VisitStamp {
        first_opened_at: token.first_opened_at,
        last_opened_at: token.last_opened_at,
        open_count: token.open_count,
    }
}

impl ReviewDb {
    /// Load everything `token` grants access to. Read-only.
    pub fn resolve(&self, token: &str, now: DateTime<Utc>) -> Result<ResolvedAccess> {
        let conn = self.conn();
        let record = load_token(&conn, token)?;
        match record.kind {
            TokenKind::Review => resolve_review(&conn, record, now).map(ResolvedAccess::Review),
            TokenKind::Clarification => {
                resolve_clarification(&conn, record, now).map(ResolvedAccess::Clarification)
            }
        }
    }

    pub fn resolve_review(&self, token: &str, now: DateTime<Utc>) -> Result<ResolvedReview> {
        match self.resolve(token, now)? {
            ResolvedAccess::Review(r) => Ok(r),
            ResolvedAccess::Clarification(_) => Err(WorkflowError::NotFound.into()),
        }
    }

    pub fn resolve_clarification(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<ResolvedClarification> {
        match self.resolve(token, now)? {
            ResolvedAccess::Clarification(c) => Ok(c),
            ResolvedAccess::Review(_) => Err(WorkflowError::NotFound.into()),
        }
    }

    /// Count one open of `token`, at most once per `guard`.
    ///
    /// The write is a single `UPDATE`, so concurrent opens each increment the
    /// counter and never clobber the first-open time.
    pub fn record_visit(
        &self,
        token: &str,
        guard: &mut VisitGuard,
        now: DateTime<Utc>,
    ) -> Result<VisitOutcome> {
        let conn = self.conn();
        if guard.is_logged() {
            let current = load_token(&conn, token)?;
            return Ok(VisitOutcome {
                logged: false,
                stamp: stamp(&current),
            });
        }

        let updated = sql::execute(
            &conn,
            db::access_tokens::record_visit(token, &timestamp::format(&now)),
        )?;
        if updated == 0 {
            return Err(WorkflowError::NotFound.into());
        }
        guard.claim();
        let current = load_token(&conn, token)?;
        tracing::debug!(open_count = current.open_count, "link opened");
        Ok(VisitOutcome {
            logged: true,
            stamp: stamp(&current),
        })
    }
}

fn resolve_review(conn: &Connection, token: AccessToken, now: DateTime<Utc>) -> Result<ResolvedReview> {
    let period = sql::query_opt(conn, db::report_periods::lookup(token.subject_id), rows::period)?
        .ok_or(WorkflowError::NotFound)?;
    let customer = sql::query_opt(conn, db::customers::lookup(period.customer_id), rows::customer)?
        .ok_or(WorkflowError::NotFound)?;
    let entries = sql::query_all(
        conn,
        db::time_entries::list_billable(
            period.customer_id,
            &timestamp::format_date(&period.week_start),
            &timestamp::format_date(&period.week_end),
        ),
        rows::entry,
    )?;
    Ok(ResolvedReview::build(token, period, customer, entries, now)?)
}

/// Assignments a clarification token covers: the whole batch when it has one.
pub(crate) fn load_assignment_set(
    conn: &Connection,
    token: &AccessToken,
) -> Result<Vec<ClarificationAssignment>> {
    let set = match token.batch_id.as_deref() {
        Some(batch_id) => sql::query_all(conn, db::clarifications::list_by_batch(batch_id), rows::assignment)?,
        None => sql::query_opt(
            conn,
            db::clarifications::lookup_assignment(token.subject_id),
            rows::assignment,
        )?
        .into_iter()
        .collect(),
    };
    Ok(set)
}

fn resolve_clarification(
    conn: &Connection,
    token: AccessToken,
    now: DateTime<Utc>,
) -> Result<ResolvedClarification> {
    let assignments = load_assignment_set(conn, &token)?;
    if assignments.is_empty() {
        return Err(WorkflowError::NotFound.into());
    }

    let assignment_ids: Vec<_> = assignments.iter().map(|a| a.id).collect();
    let messages = sql::query_all(conn, db::clarifications::list_messages(&assignment_ids), rows::message)?;

    let mut entry_ids: Vec<_> = assignments.iter().map(|a| a.time_entry_id).collect();
    entry_ids.sort_unstable();
    entry_ids.dedup();
    let entries = sql::query_all(conn, db::time_entries::list_by_ids(&entry_ids), rows::entry)?;

    let mut customer_ids: Vec<_> = entries.iter().map(|e| e.customer_id).collect();
    customer_ids.sort_unstable();
    customer_ids.dedup();
    let customers = sql::query_all(conn, db::customers::list_by_ids(&customer_ids), rows::customer)?;

    Ok(ResolvedClarification::build(
        token,
        assignments,
        messages,
        entries,
        customers,
        now,
    )?)
}

#[cfg(test)]
mod tests {
    use tallyback_api::service::AssignmentDraft;
    use tallyback_core::access::AccessState;
    use tallyback_core::testing::at;

    use super::*;
    use crate::test_support::seeded_db;

    #[test]
    fn review_resolution_is_deterministic() {
        let db = seeded_db();
        let issued = db.issue_review_token(1, at("2024-01-08T09:00:00Z")).unwrap();
        let now = at("2024-01-08T10:00:00Z");

        let first = db.resolve_review(&issued.token, now).unwrap();
        let second = db.resolve_review(&issued.token, now).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.state, AccessState::Active);
        // 103 falls outside the week.
        let ids: Vec<_> = first.entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![101, 102]);
        assert_eq!(first.summary.total_hours, 5.0);
        assert_eq!(first.customer.name, "Acme Plumbing");
    }

    #[test]
    fn resolve_does_not_count_visits() {
        let db = seeded_db();
        let issued = db.issue_review_token(1, at("2024-01-08T09:00:00Z")).unwrap();
        db.resolve(&issued.token, at("2024-01-08T10:00:00Z")).unwrap();
        assert_eq!(db.lookup_token(&issued.token).unwrap().open_count, 0);
    }

    #[test]
    fn unknown_token_is_not_found() {
        let db = seeded_db();
        let err = db.resolve("tb_rv_nope", at("2024-01-08T10:00:00Z")).unwrap_err();
        assert!(matches!(err.as_workflow(), Some(WorkflowError::NotFound)));
    }

    #[test]
    fn visits_keep_first_open_and_count_every_request() {
        let db = seeded_db();
        let issued = db.issue_review_token(1, at("2024-01-08T09:00:00Z")).unwrap();
        let first = at("2024-01-08T10:00:00Z");
        let second = at("2024-01-08T11:00:00Z");

        let a = db.record_visit(&issued.token, &mut VisitGuard::new(), first).unwrap();
        let b = db.record_visit(&issued.token, &mut VisitGuard::new(), second).unwrap();
        assert!(a.logged && b.logged);
        assert_eq!(b.stamp.first_opened_at, Some(first));
        assert_eq!(b.stamp.last_opened_at, Some(second));
        assert_eq!(b.stamp.open_count, 2);
    }

    #[test]
    fn one_guard_counts_once() {
        let db = seeded_db();
        let issued = db.issue_review_token(1, at("2024-01-08T09:00:00Z")).unwrap();
        let mut guard = VisitGuard::new();
        let now = at("2024-01-08T10:00:00Z");

        assert!(db.record_visit(&issued.token, &mut guard, now).unwrap().logged);
        let again = db.record_visit(&issued.token, &mut guard, now).unwrap();
        assert!(!again.logged);
        assert_eq!(again.stamp.open_count, 1);
    }

    #[test]
    fn concurrent_visits_all_count() {
        let db = std::sync::Arc::new(seeded_db());
        let issued = db.issue_review_token(1, at("2024-01-08T09:00:00Z")).unwrap();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = db.clone();
                let token = issued.token.clone();
                std::thread::spawn(move || {
                    let now = at("2024-01-08T10:00:00Z") + chrono::Duration::seconds(i);
                    db.record_visit(&token, &mut VisitGuard::new(), now).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let token = db.lookup_token(&issued.token).unwrap();
        assert_eq!(token.open_count, 8);
        assert!(token.first_opened_at <= token.last_opened_at);
    }

    #[test]
    fn visit_on_unknown_token_is_not_found() {
        let db = seeded_db();
        let err = db
            .record_visit("tb_cl_nope", &mut VisitGuard::new(), at("2024-01-08T10:00:00Z"))
            .unwrap_err();
        assert!(matches!(err.as_workflow(), Some(WorkflowError::NotFound)));
    }

    #[test]
    fn batch_resolves_in_id_order() {
        let db = seeded_db();
        let drafts: Vec<_> = [103, 101, 102]
            .into_iter()
            .map(|time_entry_id| AssignmentDraft {
                time_entry_id,
                assignee_name: "Dana".to_string(),
                assignee_email: None,
                question: "What was done?".to_string(),
            })
            .collect();
        let created = db
            .create_clarification("admin@x", &drafts, at("2024-01-08T09:00:00Z"))
            .unwrap();

        let resolved = db
            .resolve_clarification(&created.token.token, at("2024-01-08T10:00:00Z"))
            .unwrap();
        let mut expected = created.assignment_ids.clone();
        expected.sort_unstable();
        assert_eq!(resolved.assignment_ids(), expected);
        assert_eq!(resolved.entries.len(), 3);
        assert_eq!(resolved.customers.len(), 1);
        assert_eq!(resolved.editor_prefill(), None);
    }

    #[test]
    fn review_token_cannot_open_the_clarification_view() {
        let db = seeded_db();
        let issued = db.issue_review_token(1, at("2024-01-08T09:00:00Z")).unwrap();
        let err = db
            .resolve_clarification(&issued.token, at("2024-01-08T10:00:00Z"))
            .unwrap_err();
        assert!(matches!(err.as_workflow(), Some(WorkflowError::NotFound)));
    }
}
