use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use tallyback_api::{ApiError, ServiceError};
use tallyback_store::StoreError;

/// Unified API error type.
///
/// Renders the shared [`ApiError`] body: `{"error", "code"}` plus the field,
/// expiry or recorded outcome when the failure carries one.
pub struct ApiErr(ServiceError);

impl ApiErr {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self(ServiceError::Internal(msg.into()))
    }

    /// Build a closure that logs a DB/IO error and returns `500 Internal Server Error`.
    pub fn from_db<E: fmt::Display>(context: &str) -> impl FnOnce(E) -> Self + '_ {
        move |e| {
            tracing::error!("{context}: {e}");
            Self::internal("internal server error")
        }
    }

    /// Like [`ApiErr::from_db`], but refused commands keep their workflow code.
    pub fn from_store(context: &str) -> impl FnOnce(StoreError) -> Self + '_ {
        move |e| match e {
            StoreError::Workflow(w) => {
                tracing::warn!(code = w.code(), "{context}: {w}");
                Self(ServiceError::Workflow(w))
            }
            other => Self::from_db(context)(other),
        }
    }

    #[cfg(test)]
    pub fn code(&self) -> &'static str {
        self.0.code()
    }
}

impl From<ServiceError> for ApiErr {
    fn from(e: ServiceError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ApiError::from(&self.0))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tallyback_core::WorkflowError;

    #[test]
    fn storage_failures_hide_details() {
        let err = ApiErr::from_store("accept")(StoreError::Token("rng".into()));
        assert_eq!(err.code(), "internal");
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn workflow_failures_keep_their_status() {
        let err = ApiErr::from_store("accept")(StoreError::Workflow(WorkflowError::WriteConflict));
        assert_eq!(err.code(), "write_conflict");
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }
}
