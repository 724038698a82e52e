//! Records reachable through an access token.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Row identity used by every persisted record.
pub type Id = i64;

// ─── Enums ───────────────────────────────────────────────────────────────────

/// Which workflow a token grants access to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Review,
    Clarification,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Review => "review",
            Self::Clarification => "clarification",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenKind {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "review" => Ok(Self::Review),
            "clarification" => Ok(Self::Clarification),
            other => Err(DataError::UnknownValue {
                kind: "token kind",
                value: other.to_string(),
            }),
        }
    }
}

/// Customer decision recorded on a review token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CustomerAction {
    Accepted,
    Disputed,
}

impl CustomerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Disputed => "disputed",
        }
    }
}

impl std::fmt::Display for CustomerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CustomerAction {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accepted" => Ok(Self::Accepted),
            "disputed" => Ok(Self::Disputed),
            other => Err(DataError::UnknownValue {
                kind: "customer action",
                value: other.to_string(),
            }),
        }
    }
}

/// Lifecycle of a weekly report period.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Sent,
    SupplementalSent,
    Accepted,
    Disputed,
    NoTime,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::SupplementalSent => "supplemental_sent",
            Self::Accepted => "accepted",
            Self::Disputed => "disputed",
            Self::NoTime => "no_time",
        }
    }
}

impl From<CustomerAction> for ReportStatus {
    fn from(action: CustomerAction) -> Self {
        match action {
            CustomerAction::Accepted => Self::Accepted,
            CustomerAction::Disputed => Self::Disputed,
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "supplemental_sent" => Ok(Self::SupplementalSent),
            "accepted" => Ok(Self::Accepted),
            "disputed" => Ok(Self::Disputed),
            "no_time" => Ok(Self::NoTime),
            other => Err(DataError::UnknownValue {
                kind: "report status",
                value: other.to_string(),
            }),
        }
    }
}

/// Lifecycle of a clarification assignment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Responded,
    Cleared,
    Cancelled,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Responded => "responded",
            Self::Cleared => "cleared",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cleared | Self::Cancelled)
    }
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentStatus {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "responded" => Ok(Self::Responded),
            "cleared" => Ok(Self::Cleared),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(DataError::UnknownValue {
                kind: "assignment status",
                value: other.to_string(),
            }),
        }
    }
}

/// Author side of a clarification message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    Admin,
    Assignee,
}

impl SenderRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Assignee => "assignee",
        }
    }
}

impl std::fmt::Display for SenderRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SenderRole {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "assignee" => Ok(Self::Assignee),
            other => Err(DataError::UnknownValue {
                kind: "sender role",
                value: other.to_string(),
            }),
        }
    }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// Decision recorded on a review token. Immutable once present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub action: CustomerAction,
    pub acted_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// One issued link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessToken {
    pub id: Id,
    pub token: String,
    pub kind: TokenKind,
    /// Report period id for review tokens; assignment id for clarification tokens.
    pub subject_id: Id,
    /// When set, the token covers every assignment sharing this batch.
    pub batch_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
    pub first_opened_at: Option<DateTime<Utc>>,
    pub last_opened_at: Option<DateTime<Utc>>,
    pub open_count: i64,
    /// Review tokens only.
    pub outcome: Option<ReviewOutcome>,
}

impl AccessToken {
    /// Expiry is inclusive: a token is closed from `expires_at` onwards.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Customer {
    pub id: Id,
    pub name: String,
    pub email: Option<String>,
}

/// A customer's week of billable time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportPeriod {
    pub id: Id,
    pub customer_id: Id,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub status: ReportStatus,
    pub total_hours: f64,
    pub entry_count: i64,
}

/// Externally owned time entry. Only `description` is ever written here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeEntry {
    pub id: Id,
    pub customer_id: Id,
    pub employee: String,
    pub date: NaiveDate,
    pub hours: f64,
    pub description: Option<String>,
    pub billable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assignee {
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClarificationAssignment {
    pub id: Id,
    pub time_entry_id: Id,
    pub assigned_by: String,
    pub assigned_to: Assignee,
    pub question: String,
    pub suggested_description: Option<String>,
    pub status: AssignmentStatus,
    pub batch_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub cleared_at: Option<DateTime<Utc>>,
    pub cleared_by: Option<String>,
}

/// One turn of a clarification thread. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClarificationMessage {
    pub id: Id,
    pub assignment_id: Id,
    pub sender_role: SenderRole,
    pub sender_name: String,
    pub sender_email: Option<String>,
    pub message: String,
    pub suggested_description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_text_roundtrips_through_storage_form() {
        for status in [
            ReportStatus::Pending,
            ReportStatus::Sent,
            ReportStatus::SupplementalSent,
            ReportStatus::Accepted,
            ReportStatus::Disputed,
            ReportStatus::NoTime,
        ] {
            assert_eq!(status.as_str().parse::<ReportStatus>().unwrap(), status);
        }
        assert_eq!(
            "cancelled".parse::<AssignmentStatus>().unwrap(),
            AssignmentStatus::Cancelled
        );
    }

    #[test]
    fn unknown_storage_text_is_a_data_error() {
        let err = "approved".parse::<CustomerAction>().unwrap_err();
        assert_eq!(
            err,
            DataError::UnknownValue {
                kind: "customer action",
                value: "approved".to_string()
            }
        );
    }

    #[test]
    fn serde_uses_snake_case_names() {
        let json = serde_json::to_string(&ReportStatus::SupplementalSent).unwrap();
        assert_eq!(json, "\"supplemental_sent\"");
        let role: SenderRole = serde_json::from_str("\"assignee\"").unwrap();
        assert_eq!(role, SenderRole::Assignee);
    }

    #[test]
    fn expiry_is_inclusive_of_the_deadline_instant() {
        let token = crate::testing::review_token("t", Some("2024-01-10T00:00:00Z"));
        assert!(!token.is_expired_at(crate::testing::at("2024-01-09T23:59:59Z")));
        assert!(token.is_expired_at(crate::testing::at("2024-01-10T00:00:00Z")));

        let open = crate::testing::review_token("t", None);
        assert!(!open.is_expired_at(crate::testing::at("2999-01-01T00:00:00Z")));
    }
}
