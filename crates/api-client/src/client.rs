use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use tallyback_api::*;
use tallyback_core::clarification::{self, AdminReply, AssigneeResponse};
use tallyback_core::review::{self, ReviewDecision};
use tallyback_core::validate::{self, DEFAULT_MAX_TEXT_LEN};

use crate::error::ClientError;
use crate::retry::{RetryConfig, retry_get};

type Result<T> = std::result::Result<T, ClientError>;

/// Typed HTTP client for the tallyback API.
///
/// Token commands take the page the user is looking at and re-check it at
/// `now` before sending, so a finalized or expired link, blank dispute notes
/// or an empty message fail without a round trip. The server re-checks
/// everything; a race between load and submit comes back as
/// [`ClientError::WriteConflict`] or [`ClientError::AlreadyFinalized`].
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl ApiClient {
    /// Create a new client with the given base URL and timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create from an existing `reqwest::Client` (e.g. shared in tests).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryConfig::default(),
        }
    }

    /// Backoff for [`ApiClient::resolve`] and the other reads.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = retry_get(&self.client, &self.url(path), &self.retry).await?;
        parse_response(resp).await
    }

    /// Single attempt; a failed command is reported, never replayed.
    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let resp = self.client.post(self.url(path)).json(body).send().await?;
        parse_response(resp).await
    }

    // ── Health ────────────────────────────────────────────────────────────

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get("/health").await
    }

    // ── Links ─────────────────────────────────────────────────────────────

    pub async fn resolve(&self, token: &str) -> Result<ResolvedAccess> {
        self.get(&format!("/access/{token}")).await
    }

    /// Count one open of the page. Call once per page load.
    pub async fn visit(&self, token: &str) -> Result<VisitResponse> {
        self.post(&format!("/access/{token}/visit"), &serde_json::json!({}))
            .await
    }

    // ── Review ────────────────────────────────────────────────────────────

    pub async fn accept(
        &self,
        page: &ResolvedReview,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ReviewActionResponse> {
        let decision = ReviewDecision::accept(notes)?;
        review::decide(&page.token, &decision, now)?;
        let body = AcceptRequest {
            notes: decision.notes,
        };
        self.post(&format!("/access/{}/accept", page.token.token), &body)
            .await
    }

    pub async fn dispute(
        &self,
        page: &ResolvedReview,
        notes: &str,
        now: DateTime<Utc>,
    ) -> Result<ReviewActionResponse> {
        let decision = ReviewDecision::dispute(notes)?;
        review::decide(&page.token, &decision, now)?;
        let body = DisputeRequest {
            notes: decision.notes.unwrap_or_default(),
        };
        self.post(&format!("/access/{}/dispute", page.token.token), &body)
            .await
    }

    // ── Clarification ─────────────────────────────────────────────────────

    /// Answer one assignment of the page. `assignment_id` is required when the
    /// link covers several.
    pub async fn respond(
        &self,
        page: &ResolvedClarification,
        message: &str,
        suggested_description: Option<&str>,
        assignment_id: Option<Id>,
        now: DateTime<Utc>,
    ) -> Result<AssignmentActionResponse> {
        let response = AssigneeResponse::new(message, suggested_description, DEFAULT_MAX_TEXT_LEN)?;
        let target = clarification::respond_target(&page.token, &page.assignments, assignment_id, now)?;
        let body = RespondRequest {
            message: response.message,
            suggested_description: response.suggested_description,
            assignment_id: Some(target.id),
        };
        self.post(&format!("/access/{}/respond", page.token.token), &body)
            .await
    }

    // ── Admin ─────────────────────────────────────────────────────────────

    pub async fn list_open_assignments(&self) -> Result<OpenAssignmentsResponse> {
        self.get("/assignments").await
    }

    pub async fn assignment_thread(&self, assignment_id: Id) -> Result<AssignmentThreadResponse> {
        self.get(&format!("/assignments/{assignment_id}")).await
    }

    pub async fn reply(
        &self,
        assignment_id: Id,
        admin: &str,
        message: &str,
    ) -> Result<AssignmentActionResponse> {
        let reply = AdminReply::new(admin, message, DEFAULT_MAX_TEXT_LEN)?;
        let body = ReplyRequest {
            admin: reply.admin,
            message: reply.message,
        };
        self.post(&format!("/assignments/{assignment_id}/reply"), &body)
            .await
    }

    pub async fn clear(
        &self,
        assignment_id: Id,
        admin: &str,
        apply_suggested_description: bool,
    ) -> Result<AssignmentActionResponse> {
        let body = ClearRequest {
            admin: validate::admin_identity(admin)?,
            apply_suggested_description,
        };
        self.post(&format!("/assignments/{assignment_id}/clear"), &body)
            .await
    }

    pub async fn cancel(&self, assignment_id: Id, admin: &str) -> Result<AssignmentActionResponse> {
        let body = CancelRequest {
            admin: validate::admin_identity(admin)?,
        };
        self.post(&format!("/assignments/{assignment_id}/cancel"), &body)
            .await
    }

    // ── Issuance ──────────────────────────────────────────────────────────

    pub async fn issue_review_token(&self, period_id: Id) -> Result<IssuedTokenResponse> {
        self.post(
            &format!("/report-periods/{period_id}/review-token"),
            &serde_json::json!({}),
        )
        .await
    }

    pub async fn create_clarification(
        &self,
        req: &CreateClarificationRequest,
    ) -> Result<CreateClarificationResponse> {
        self.post("/clarifications", req).await
    }
}

/// Parse an HTTP response: the deserialized body on 2xx, the mapped
/// [`ClientError`] otherwise.
async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::from_response(status.as_u16(), &body));
    }
    Ok(resp.json().await?)
}
