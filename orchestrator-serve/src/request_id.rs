//! Per-request id middleware (§4.1): every request gets an opaque id, attached
//! to its tracing span and to the `x-request-id` response header, so one
//! workflow's log lines can be grepped end-to-end.

use axum::http::{HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};

/// Mints a time-ordered id via the same generator workflow/session ids use,
/// instead of pulling in a second UUID implementation just for this.
#[derive(Clone, Default)]
pub struct MakeOrchestratorRequestId;

impl MakeRequestId for MakeOrchestratorRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = orchestrator_core::uuid6().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}
