use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};

use tallyback_api::service;
use tallyback_api::{AcceptRequest, DisputeRequest, ReviewActionResponse};
use tallyback_store::ReviewDb;

use crate::Clock;
use crate::error::ApiErr;

/// POST /api/access/{token}/accept
pub async fn accept(
    State(db): State<Arc<ReviewDb>>,
    State(clock): State<Clock>,
    Path(token): Path<String>,
    Json(req): Json<AcceptRequest>,
) -> Result<Json<ReviewActionResponse>, ApiErr> {
    let token = service::normalize_token(&token)?;
    let receipt = db
        .accept(token, req.notes.as_deref(), clock.now())
        .map_err(ApiErr::from_store("accept review"))?;
    Ok(Json(receipt))
}

/// POST /api/access/{token}/dispute: notes are required.
pub async fn dispute(
    State(db): State<Arc<ReviewDb>>,
    State(clock): State<Clock>,
    Path(token): Path<String>,
    Json(req): Json<DisputeRequest>,
) -> Result<Json<ReviewActionResponse>, ApiErr> {
    let token = service::normalize_token(&token)?;
    let receipt = db
        .dispute(token, &req.notes, clock.now())
        .map_err(ApiErr::from_store("dispute review"))?;
    Ok(Json(receipt))
}
