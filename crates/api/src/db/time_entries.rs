//! Time entry query builders.

use sea_query::{Expr, OnConflict, Query, SqliteQueryBuilder};
use tallyback_core::Id;

use super::tables::TimeEntries;
use super::Built;

pub fn columns() -> [TimeEntries; 7] {
    [
        TimeEntries::Id,
        TimeEntries::CustomerId,
        TimeEntries::Employee,
        TimeEntries::EntryDate,
        TimeEntries::Hours,
        TimeEntries::Description,
        TimeEntries::Billable,
    ]
}

/// INSERT or refresh an entry mirrored from the accounting system.
#[allow(clippy::too_many_arguments)]
pub fn upsert(
    id: Id,
    customer_id: Id,
    employee: &str,
    entry_date: &str,
    hours: f64,
    description: Option<&str>,
    billable: bool,
) -> Built {
    Query::insert()
        .into_table(TimeEntries::Table)
        .columns(columns())
        .values_panic([
            id.into(),
            customer_id.into(),
            employee.into(),
            entry_date.into(),
            hours.into(),
            description.map(str::to_string).into(),
            billable.into(),
        ])
        .on_conflict(
            OnConflict::column(TimeEntries::Id)
                .update_columns([
                    TimeEntries::Employee,
                    TimeEntries::EntryDate,
                    TimeEntries::Hours,
                    TimeEntries::Description,
                    TimeEntries::Billable,
                ])
                .to_owned(),
        )
        .build(SqliteQueryBuilder)
}

pub fn lookup(id: Id) -> Built {
    Query::select()
        .columns(columns())
        .from(TimeEntries::Table)
        .and_where(Expr::col(TimeEntries::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Billable entries of one customer within `[week_start, week_end]`, by date.
pub fn list_billable(customer_id: Id, week_start: &str, week_end: &str) -> Built {
    Query::select()
        .columns(columns())
        .from(TimeEntries::Table)
        .and_where(Expr::col(TimeEntries::CustomerId).eq(customer_id))
        .and_where(Expr::col(TimeEntries::Billable).eq(true))
        .and_where(Expr::col(TimeEntries::EntryDate).between(week_start, week_end))
        .order_by(TimeEntries::EntryDate, sea_query::Order::Asc)
        .order_by(TimeEntries::Id, sea_query::Order::Asc)
        .build(SqliteQueryBuilder)
}

/// Entries by id, ascending.
pub fn list_by_ids(ids: &[Id]) -> Built {
    Query::select()
        .columns(columns())
        .from(TimeEntries::Table)
        .and_where(Expr::col(TimeEntries::Id).is_in(ids.iter().copied()))
        .order_by(TimeEntries::Id, sea_query::Order::Asc)
        .build(SqliteQueryBuilder)
}

/// The only write this workflow makes to an entry.
pub fn update_description(id: Id, description: &str, now: &str) -> Built {
    Query::update()
        .table(TimeEntries::Table)
        .value(TimeEntries::Description, description)
        .value(TimeEntries::UpdatedAt, now)
        .and_where(Expr::col(TimeEntries::Id).eq(id))
        .build(SqliteQueryBuilder)
}
