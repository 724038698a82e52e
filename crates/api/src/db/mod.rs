//! Shared database schema, migrations, and query builders.
//!
//! Builders return `(sql, values)` pairs; executing them is left to the store.

pub mod access_tokens;
pub mod clarifications;
pub mod customers;
pub mod migrations;
pub mod report_periods;
pub mod tables;
pub mod time_entries;

pub use tables::*;

pub type Built = (String, sea_query::Values);
