//! Customer accept/dispute commands.

use chrono::{DateTime, Utc};
use rusqlite::TransactionBehavior;
use tallyback_api::db;
use tallyback_api::ReviewActionResponse;
use tallyback_core::review::{self, ReviewDecision};
use tallyback_core::timestamp;
use tallyback_core::{ReportStatus, WorkflowError};

use crate::{load_token, sql};
use crate::{Result, ReviewDb};

impl ReviewDb {
    pub fn accept(
        &self,
        token: &str,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ReviewActionResponse> {
        self.decide(token, &ReviewDecision::accept(notes)?, now)
    }

    /// Dispute notes are required; blank notes fail before any write.
    pub fn dispute(
        &self,
        token: &str,
        notes: &str,
        now: DateTime<Utc>,
    ) -> Result<ReviewActionResponse> {
        self.decide(token, &ReviewDecision::dispute(notes)?, now)
    }

    fn decide(
        &self,
        token: &str,
        decision: &ReviewDecision,
        now: DateTime<Utc>,
    ) -> Result<ReviewActionResponse> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = load_token(&tx, token)?;
        let outcome = review::decide(&current, decision, now)?;

        let updated = sql::execute(
            &tx,
            db::access_tokens::record_outcome(
                token,
                outcome.action,
                &timestamp::format(&outcome.acted_at),
                outcome.notes.as_deref(),
            ),
        )?;
        if updated == 0 {
            // Another writer finalized the token after it was read.
            let latest = load_token(&tx, token)?;
            review::decide(&latest, decision, now)?;
            return Err(WorkflowError::WriteConflict.into());
        }

        let report_status = ReportStatus::from(outcome.action);
        sql::execute(
            &tx,
            db::report_periods::update_status(
                current.subject_id,
                report_status,
                &timestamp::format(&now),
            ),
        )?;
        tx.commit()?;

        tracing::info!(
            period_id = current.subject_id,
            action = %outcome.action,
            "review decision recorded"
        );
        Ok(ReviewActionResponse {
            action: outcome.action,
            acted_at: outcome.acted_at,
            notes: outcome.notes,
            report_status,
        })
    }
}
