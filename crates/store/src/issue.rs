//! Issuing review and clarification links.

use chrono::{DateTime, Utc};
use rusqlite::TransactionBehavior;
use tallyback_api::db;
use tallyback_api::service::AssignmentDraft;
use tallyback_api::{crypto, service};
use tallyback_core::timestamp;
use tallyback_core::validate::ValidationError;
use tallyback_core::{AccessToken, Id, TokenKind, WorkflowError};

use crate::{load_token, rows, sql};
use crate::{Result, ReviewDb, StoreError};

/// Assignments created behind one clarification link.
#[derive(Debug, Clone)]
pub struct NewClarification {
    /// Set only when the link covers more than one assignment.
    pub batch_id: Option<String>,
    pub assignment_ids: Vec<Id>,
    pub token: AccessToken,
}

fn new_token(kind: TokenKind) -> Result<String> {
    crypto::generate_link_token(kind).map_err(|e| StoreError::Token(e.message()))
}

impl ReviewDb {
    /// Issue a customer review link for a report period.
    pub fn issue_review_token(&self, period_id: Id, now: DateTime<Utc>) -> Result<AccessToken> {
        let token = new_token(TokenKind::Review)?;
        let expires_at = self.config().review.expires_at(now);

        let conn = self.conn();
        sql::query_opt(&conn, db::report_periods::lookup(period_id), rows::period)?
            .ok_or(WorkflowError::NotFound)?;
        sql::execute(
            &conn,
            db::access_tokens::insert(
                &token,
                TokenKind::Review,
                period_id,
                None,
                &timestamp::format(&now),
                Some(&timestamp::format(&expires_at)),
            ),
        )?;
        tracing::info!(period_id, "issued review link");
        load_token(&conn, &token)
    }

    /// Open one assignment per draft and issue a single link covering them.
    pub fn create_clarification(
        &self,
        admin: &str,
        drafts: &[AssignmentDraft],
        now: DateTime<Utc>,
    ) -> Result<NewClarification> {
        if drafts.is_empty() {
            return Err(ValidationError::MissingField {
                field: "assignments".to_string(),
            }
            .into());
        }
        let token = new_token(TokenKind::Clarification)?;
        let batch_id = (drafts.len() > 1).then(service::new_batch_id);
        let created_at = timestamp::format(&now);
        let expires_at = self
            .config()
            .clarification
            .expires_at(now)
            .map(|at| timestamp::format(&at));

        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut assignment_ids = Vec::with_capacity(drafts.len());
        for draft in drafts {
            sql::query_opt(&tx, db::time_entries::lookup(draft.time_entry_id), rows::entry)?
                .ok_or_else(|| ValidationError::Invalid {
                    field: "time_entry_id".to_string(),
                    reason: format!("unknown time entry {}", draft.time_entry_id),
                })?;
            sql::execute(
                &tx,
                db::clarifications::insert_assignment(
                    draft.time_entry_id,
                    admin,
                    &draft.assignee_name,
                    draft.assignee_email.as_deref(),
                    &draft.question,
                    batch_id.as_deref(),
                    &created_at,
                ),
            )?;
            assignment_ids.push(tx.last_insert_rowid());
        }

        let subject_id = assignment_ids[0];
        sql::execute(
            &tx,
            db::access_tokens::insert(
                &token,
                TokenKind::Clarification,
                subject_id,
                batch_id.as_deref(),
                &created_at,
                expires_at.as_deref(),
            ),
        )?;
        let token = load_token(&tx, &token)?;
        tx.commit()?;

        tracing::info!(
            assignments = assignment_ids.len(),
            batch_id = batch_id.as_deref().unwrap_or("-"),
            "opened clarification"
        );
        Ok(NewClarification {
            batch_id,
            assignment_ids,
            token,
        })
    }
}
