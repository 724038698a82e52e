use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use tallyback_api::service;
use tallyback_api::{
    AccessToken, CreateClarificationRequest, CreateClarificationResponse, Id, IssuedTokenResponse,
};
use tallyback_store::ReviewDb;

use crate::error::ApiErr;
use crate::{AppConfig, Clock};

fn issued(config: &AppConfig, token: &AccessToken) -> IssuedTokenResponse {
    IssuedTokenResponse {
        token: token.token.clone(),
        url: service::link_url(&config.base_url, token.kind, &token.token),
        expires_at: token.expires_at,
    }
}

/// POST /api/report-periods/{id}/review-token: issue the customer's link.
pub async fn issue_review_token(
    State(db): State<Arc<ReviewDb>>,
    State(config): State<AppConfig>,
    State(clock): State<Clock>,
    Path(period_id): Path<Id>,
) -> Result<(StatusCode, Json<IssuedTokenResponse>), ApiErr> {
    let token = db
        .issue_review_token(period_id, clock.now())
        .map_err(ApiErr::from_store("issue review token"))?;
    Ok((StatusCode::CREATED, Json(issued(&config, &token))))
}

/// POST /api/clarifications: open assignments behind one link.
pub async fn create_clarification(
    State(db): State<Arc<ReviewDb>>,
    State(config): State<AppConfig>,
    State(clock): State<Clock>,
    Json(req): Json<CreateClarificationRequest>,
) -> Result<(StatusCode, Json<CreateClarificationResponse>), ApiErr> {
    let max_len = db.config().clarification.max_message_len;
    let (admin, drafts) = service::validate_new_clarification(&req, max_len)?;
    let created = db
        .create_clarification(&admin, &drafts, clock.now())
        .map_err(ApiErr::from_store("create clarification"))?;
    Ok((
        StatusCode::CREATED,
        Json(CreateClarificationResponse {
            link: issued(&config, &created.token),
            batch_id: created.batch_id,
            assignment_ids: created.assignment_ids,
        }),
    ))
}
