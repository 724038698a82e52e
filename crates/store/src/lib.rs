//! SQLite persistence for review and clarification links.
//!
//! [`ReviewDb`] owns one connection. Every command runs as a single
//! `IMMEDIATE` transaction and re-checks the terminal guard in its `UPDATE`,
//! so a command racing another writer fails instead of overwriting it.

mod access;
mod clarification;
mod error;
mod import;
mod issue;
mod review;
mod rows;
mod sql;

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::Connection;
use tallyback_api::db::migrations::MIGRATIONS;
use tallyback_core::config::TallybackConfig;
use tallyback_core::{AccessToken, WorkflowError};

pub use access::VisitOutcome;
pub use error::{Result, StoreError};
pub use issue::NewClarification;

/// Thread-safe handle; share it via `Arc<ReviewDb>`.
pub struct ReviewDb {
    conn: Mutex<Connection>,
    config: TallybackConfig,
}

impl ReviewDb {
    /// Open (or create) the database at `path` and apply pending migrations.
    pub fn open_path(path: &Path, config: TallybackConfig) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Open {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn, config)
    }

    /// Private database for tests and one-off tools.
    pub fn open_in_memory(config: TallybackConfig) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, config)
    }

    fn init(conn: Connection, config: TallybackConfig) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            config,
        })
    }

    pub fn config(&self) -> &TallybackConfig {
        &self.config
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exact token lookup.
    pub fn lookup_token(&self, token: &str) -> Result<AccessToken> {
        let conn = self.conn();
        load_token(&conn, token)
    }
}

fn load_token(conn: &Connection, token: &str) -> Result<AccessToken> {
    sql::query_opt(conn, tallyback_api::db::access_tokens::lookup(token), rows::token)?
        .ok_or_else(|| WorkflowError::NotFound.into())
}

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for &(name, sql) in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
            [name],
            |row| row.get(0),
        )?;
        if already_applied {
            continue;
        }
        conn.execute_batch(sql)
            .map_err(|source| StoreError::Migration { name, source })?;
        conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])?;
        tracing::info!("Applied migration: {name}");
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use tallyback_core::config::TallybackConfig;
    use tallyback_core::testing::{day, entry, period};
    use tallyback_core::{Customer, ReportStatus};

    use std::path::PathBuf;

    use crate::ReviewDb;

    /// Database on disk with customer 1, report period 1 (week of 2024-01-01)
    /// and entries 101..=103.
    pub fn seeded_db() -> ReviewDb {
        seeded_db_on_disk().0
    }

    /// Like [`seeded_db`], also returning the file so a second handle can open it.
    pub fn seeded_db_on_disk() -> (ReviewDb, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.keep().join("tallyback.db");
        let db = ReviewDb::open_path(&path, TallybackConfig::default()).unwrap();

        db.import_customer(&Customer {
            id: 1,
            name: "Acme Plumbing".to_string(),
            email: Some("ap@acme.test".to_string()),
        })
        .unwrap();
        db.import_report_period(&period(1, ReportStatus::Sent))
            .unwrap();

        let mut second = entry(102, 3.0, Some("Pump"));
        second.date = day("2024-01-03");
        let mut outside = entry(103, 8.0, None);
        outside.date = day("2024-01-09");
        for e in [entry(101, 2.0, Some("Fixed pump")), second, outside] {
            db.import_time_entry(&e).unwrap();
        }
        (db, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.keep().join("nested").join("tallyback.db");
        drop(ReviewDb::open_path(&path, TallybackConfig::default()).unwrap());
        let db = ReviewDb::open_path(&path, TallybackConfig::default()).unwrap();
        let applied: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, MIGRATIONS.len() as i64);
    }

    #[test]
    fn unknown_token_is_not_found() {
        let db = ReviewDb::open_in_memory(TallybackConfig::default()).unwrap();
        let err = db.lookup_token("tb_rv_missing").unwrap_err();
        assert!(matches!(err.as_workflow(), Some(WorkflowError::NotFound)));
    }

    #[test]
    fn malformed_timestamp_is_a_data_error() {
        let db = ReviewDb::open_in_memory(TallybackConfig::default()).unwrap();
        db.conn()
            .execute(
                "INSERT INTO access_tokens (token, kind, subject_id, created_at) \
                 VALUES ('tb_rv_bad', 'review', 1, 'last tuesday')",
                [],
            )
            .unwrap();
        let err = db.lookup_token("tb_rv_bad").unwrap_err();
        assert!(matches!(err, StoreError::Data(_)), "got {err:?}");
    }
}
