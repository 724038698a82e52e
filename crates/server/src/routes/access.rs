use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};

use tallyback_api::service;
use tallyback_api::{ResolvedAccess, VisitResponse};
use tallyback_core::visit::VisitGuard;
use tallyback_store::ReviewDb;

use crate::Clock;
use crate::error::ApiErr;

/// GET /api/access/{token}: everything the link grants, plus its state.
///
/// Read-only; opening the page is counted separately through `visit`.
pub async fn resolve(
    State(db): State<Arc<ReviewDb>>,
    State(clock): State<Clock>,
    Path(token): Path<String>,
) -> Result<Json<ResolvedAccess>, ApiErr> {
    let token = service::normalize_token(&token)?;
    let resolved = db
        .resolve(token, clock.now())
        .map_err(ApiErr::from_store("resolve link"))?;
    Ok(Json(resolved))
}

/// POST /api/access/{token}/visit: count one open of the link.
pub async fn visit(
    State(db): State<Arc<ReviewDb>>,
    State(clock): State<Clock>,
    Path(token): Path<String>,
) -> Result<Json<VisitResponse>, ApiErr> {
    let token = service::normalize_token(&token)?;
    let mut guard = VisitGuard::new();
    let outcome = db
        .record_visit(token, &mut guard, clock.now())
        .map_err(ApiErr::from_store("record visit"))?;
    Ok(Json(VisitResponse {
        logged: outcome.logged,
        first_opened_at: outcome.stamp.first_opened_at,
        last_opened_at: outcome.stamp.last_opened_at,
        open_count: outcome.stamp.open_count,
    }))
}
