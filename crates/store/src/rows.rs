//! Row mappers. Column order follows the `columns()` lists in `tallyback_api::db`.

use rusqlite::types::Type;
use rusqlite::Row;
use tallyback_core::timestamp;
use tallyback_core::{
    AccessToken, Assignee, ClarificationAssignment, ClarificationMessage, Customer, DataError,
    ReportPeriod, ReviewOutcome, TimeEntry,
};

fn data<T>(idx: usize, r: Result<T, DataError>) -> rusqlite::Result<T> {
    r.map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn instant(row: &Row<'_>, idx: usize) -> rusqlite::Result<chrono::DateTime<chrono::Utc>> {
    let raw: String = row.get(idx)?;
    data(idx, timestamp::parse(&raw))
}

fn instant_opt(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<chrono::DateTime<chrono::Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    data(idx, timestamp::parse_opt(raw.as_deref()))
}

fn date(row: &Row<'_>, idx: usize) -> rusqlite::Result<chrono::NaiveDate> {
    let raw: String = row.get(idx)?;
    data(idx, timestamp::parse_date(&raw))
}

fn parsed<T: std::str::FromStr<Err = DataError>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    data(idx, raw.parse())
}

pub(crate) fn token(row: &Row<'_>) -> rusqlite::Result<AccessToken> {
    let action: Option<String> = row.get(10)?;
    let outcome = match action {
        None => None,
        Some(action) => Some(ReviewOutcome {
            action: data(10, action.parse())?,
            acted_at: instant(row, 11)?,
            notes: row.get(12)?,
        }),
    };
    Ok(AccessToken {
        id: row.get(0)?,
        token: row.get(1)?,
        kind: parsed(row, 2)?,
        subject_id: row.get(3)?,
        batch_id: row.get(4)?,
        created_at: instant(row, 5)?,
        expires_at: instant_opt(row, 6)?,
        first_opened_at: instant_opt(row, 7)?,
        last_opened_at: instant_opt(row, 8)?,
        open_count: row.get(9)?,
        outcome,
    })
}

pub(crate) fn customer(row: &Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
    })
}

pub(crate) fn period(row: &Row<'_>) -> rusqlite::Result<ReportPeriod> {
    Ok(ReportPeriod {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        week_start: date(row, 2)?,
        week_end: date(row, 3)?,
        status: parsed(row, 4)?,
        total_hours: row.get(5)?,
        entry_count: row.get(6)?,
    })
}

pub(crate) fn entry(row: &Row<'_>) -> rusqlite::Result<TimeEntry> {
    Ok(TimeEntry {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        employee: row.get(2)?,
        date: date(row, 3)?,
        hours: row.get(4)?,
        description: row.get(5)?,
        billable: row.get(6)?,
    })
}

pub(crate) fn assignment(row: &Row<'_>) -> rusqlite::Result<ClarificationAssignment> {
    Ok(ClarificationAssignment {
        id: row.get(0)?,
        time_entry_id: row.get(1)?,
        assigned_by: row.get(2)?,
        assigned_to: Assignee {
            name: row.get(3)?,
            email: row.get(4)?,
        },
        question: row.get(5)?,
        suggested_description: row.get(6)?,
        status: parsed(row, 7)?,
        batch_id: row.get(8)?,
        created_at: instant(row, 9)?,
        responded_at: instant_opt(row, 10)?,
        cleared_at: instant_opt(row, 11)?,
        cleared_by: row.get(12)?,
    })
}

pub(crate) fn message(row: &Row<'_>) -> rusqlite::Result<ClarificationMessage> {
    Ok(ClarificationMessage {
        id: row.get(0)?,
        assignment_id: row.get(1)?,
        sender_role: parsed(row, 2)?,
        sender_name: row.get(3)?,
        sender_email: row.get(4)?,
        message: row.get(5)?,
        suggested_description: row.get(6)?,
        created_at: instant(row, 7)?,
    })
}
