//! Report period query builders.

use sea_query::{Expr, OnConflict, Query, SqliteQueryBuilder};
use tallyback_core::{Id, ReportStatus};

use super::tables::ReportPeriods;
use super::Built;

pub fn columns() -> [ReportPeriods; 7] {
    [
        ReportPeriods::Id,
        ReportPeriods::CustomerId,
        ReportPeriods::WeekStart,
        ReportPeriods::WeekEnd,
        ReportPeriods::Status,
        ReportPeriods::TotalHours,
        ReportPeriods::EntryCount,
    ]
}

/// INSERT or refresh a period produced by the weekly report job.
#[allow(clippy::too_many_arguments)]
pub fn upsert(
    id: Id,
    customer_id: Id,
    week_start: &str,
    week_end: &str,
    status: ReportStatus,
    total_hours: f64,
    entry_count: i64,
) -> Built {
    Query::insert()
        .into_table(ReportPeriods::Table)
        .columns(columns())
        .values_panic([
            id.into(),
            customer_id.into(),
            week_start.into(),
            week_end.into(),
            status.as_str().into(),
            total_hours.into(),
            entry_count.into(),
        ])
        .on_conflict(
            OnConflict::column(ReportPeriods::Id)
                .update_columns([
                    ReportPeriods::Status,
                    ReportPeriods::TotalHours,
                    ReportPeriods::EntryCount,
                ])
                .to_owned(),
        )
        .build(SqliteQueryBuilder)
}

pub fn lookup(id: Id) -> Built {
    Query::select()
        .columns(columns())
        .from(ReportPeriods::Table)
        .and_where(Expr::col(ReportPeriods::Id).eq(id))
        .build(SqliteQueryBuilder)
}

/// Mirror a customer decision onto the period.
pub fn update_status(id: Id, status: ReportStatus, now: &str) -> Built {
    Query::update()
        .table(ReportPeriods::Table)
        .value(ReportPeriods::Status, status.as_str())
        .value(ReportPeriods::UpdatedAt, now)
        .and_where(Expr::col(ReportPeriods::Id).eq(id))
        .build(SqliteQueryBuilder)
}
