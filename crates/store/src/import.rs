//! Mirrors of accounting-system records. The sync job calls these; the
//! workflow itself only ever rewrites `time_entries.description`.

use tallyback_api::db;
use tallyback_core::timestamp;
use tallyback_core::{Customer, ReportPeriod, TimeEntry};

use crate::sql;
use crate::{Result, ReviewDb};

impl ReviewDb {
    pub fn import_customer(&self, customer: &Customer) -> Result<()> {
        let conn = self.conn();
        sql::execute(
            &conn,
            db::customers::upsert(customer.id, &customer.name, customer.email.as_deref()),
        )?;
        Ok(())
    }

    pub fn import_report_period(&self, period: &ReportPeriod) -> Result<()> {
        let conn = self.conn();
        sql::execute(
            &conn,
            db::report_periods::upsert(
                period.id,
                period.customer_id,
                &timestamp::format_date(&period.week_start),
                &timestamp::format_date(&period.week_end),
                period.status,
                period.total_hours,
                period.entry_count,
            ),
        )?;
        Ok(())
    }

    pub fn import_time_entry(&self, entry: &TimeEntry) -> Result<()> {
        let conn = self.conn();
        sql::execute(
            &conn,
            db::time_entries::upsert(
                entry.id,
                entry.customer_id,
                &entry.employee,
                &timestamp::format_date(&entry.date),
                entry.hours,
                entry.description.as_deref(),
                entry.billable,
            ),
        )?;
        Ok(())
    }
}
