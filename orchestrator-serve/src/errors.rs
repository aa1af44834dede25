//! Maps [`OrchestratorError`] onto an HTTP status and JSON body (§7).
//!
//! Streaming endpoints never use this directly: a mid-stream failure is
//! delivered as a final SSE `error` frame (see [`crate::sse`]), not an HTTP
//! status change, since headers are already flushed by then. This module
//! backs the plain-JSON endpoints (status, approval decision, resume's
//! synchronous validation) and request-validation failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use orchestrator_core::OrchestratorError;
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

/// Newtype so `OrchestratorError` (defined in another crate) can implement
/// axum's `IntoResponse` here.
pub struct ApiError(pub OrchestratorError);

impl From<OrchestratorError> for ApiError {
    fn from(e: OrchestratorError) -> Self {
        ApiError(e)
    }
}

fn status_for(err: &OrchestratorError) -> StatusCode {
    match err {
        OrchestratorError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        OrchestratorError::Unauthenticated => StatusCode::UNAUTHORIZED,
        OrchestratorError::NotFound(_) => StatusCode::NOT_FOUND,
        OrchestratorError::FailedPrecondition(_) => StatusCode::CONFLICT,
        OrchestratorError::Conflict(_) => StatusCode::CONFLICT,
        OrchestratorError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        OrchestratorError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
        OrchestratorError::ToolError(_) => StatusCode::BAD_GATEWAY,
        OrchestratorError::UpstreamCorrupt(_) => StatusCode::BAD_GATEWAY,
        OrchestratorError::ApprovalExpired(_) => StatusCode::CONFLICT,
        OrchestratorError::Cancelled => StatusCode::from_u16(499).unwrap(),
        OrchestratorError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let body = ErrorBody {
            kind: self.0.kind(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
