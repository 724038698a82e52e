use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};

use tallyback_api::service;
use tallyback_api::{
    AssignmentActionResponse, AssignmentThreadResponse, CancelRequest, ClearRequest, Id,
    OpenAssignmentsResponse, ReplyRequest, RespondRequest,
};
use tallyback_store::ReviewDb;

use crate::Clock;
use crate::error::ApiErr;

// ---------------------------------------------------------------------------
// Assignee (token-gated)
// ---------------------------------------------------------------------------

/// POST /api/access/{token}/respond
pub async fn respond(
    State(db): State<Arc<ReviewDb>>,
    State(clock): State<Clock>,
    Path(token): Path<String>,
    Json(req): Json<RespondRequest>,
) -> Result<Json<AssignmentActionResponse>, ApiErr> {
    let token = service::normalize_token(&token)?;
    let result = db
        .respond(
            token,
            &req.message,
            req.suggested_description.as_deref(),
            req.assignment_id,
            clock.now(),
        )
        .map_err(ApiErr::from_store("respond to clarification"))?;
    Ok(Json(result))
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

/// GET /api/assignments: pending and responded assignments.
pub async fn list_open(
    State(db): State<Arc<ReviewDb>>,
) -> Result<Json<OpenAssignmentsResponse>, ApiErr> {
    let assignments = db
        .list_open_assignments()
        .map_err(ApiErr::from_store("list open assignments"))?;
    Ok(Json(OpenAssignmentsResponse { assignments }))
}

/// GET /api/assignments/{id}
pub async fn thread(
    State(db): State<Arc<ReviewDb>>,
    Path(id): Path<Id>,
) -> Result<Json<AssignmentThreadResponse>, ApiErr> {
    let thread = db
        .assignment_thread(id)
        .map_err(ApiErr::from_store("load assignment thread"))?;
    Ok(Json(thread))
}

/// POST /api/assignments/{id}/reply
pub async fn reply(
    State(db): State<Arc<ReviewDb>>,
    State(clock): State<Clock>,
    Path(id): Path<Id>,
    Json(req): Json<ReplyRequest>,
) -> Result<Json<AssignmentActionResponse>, ApiErr> {
    let result = db
        .reply(id, &req.admin, &req.message, clock.now())
        .map_err(ApiErr::from_store("reply to assignment"))?;
    Ok(Json(result))
}

/// POST /api/assignments/{id}/clear
pub async fn clear(
    State(db): State<Arc<ReviewDb>>,
    State(clock): State<Clock>,
    Path(id): Path<Id>,
    Json(req): Json<ClearRequest>,
) -> Result<Json<AssignmentActionResponse>, ApiErr> {
    let result = db
        .clear(id, &req.admin, req.apply_suggested_description, clock.now())
        .map_err(ApiErr::from_store("clear assignment"))?;
    Ok(Json(result))
}

/// POST /api/assignments/{id}/cancel
pub async fn cancel(
    State(db): State<Arc<ReviewDb>>,
    State(clock): State<Clock>,
    Path(id): Path<Id>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<AssignmentActionResponse>, ApiErr> {
    let result = db
        .cancel(id, &req.admin, clock.now())
        .map_err(ApiErr::from_store("cancel assignment"))?;
    Ok(Json(result))
}
