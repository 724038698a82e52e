//! Link-open accounting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-request "already logged" flag.
///
/// A page load owns one guard and passes it to every visit call it makes, so
/// re-renders within that load count once. The flag never outlives the
/// request, so concurrent tenants cannot observe each other's state.
#[derive(Debug, Default)]
pub struct VisitGuard {
    logged: bool,
}

impl VisitGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` exactly once per guard.
    pub fn claim(&mut self) -> bool {
        !std::mem::replace(&mut self.logged, true)
    }

    pub fn is_logged(&self) -> bool {
        self.logged
    }
}

/// Visit counters carried on a token.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisitStamp {
    pub first_opened_at: Option<DateTime<Utc>>,
    pub last_opened_at: Option<DateTime<Utc>>,
    pub open_count: i64,
}

impl VisitStamp {
    /// The effect of one visit. Stores apply the same rule as a single
    /// statement; see `tallyback-store`.
    pub fn record(self, now: DateTime<Utc>) -> Self {
        Self {
            first_opened_at: self.first_opened_at.or(Some(now)),
            last_opened_at: Some(now),
            open_count: self.open_count.saturating_add(1),
        }
    }
}
