//! Turns a stream of [`ProtocolEvent`]s into an axum SSE response (§4.1/§6).
//!
//! Keepalive is `axum`'s built-in `KeepAlive`, which writes a `: keepalive\n\n`
//! comment line whenever the interval elapses with no other event sent — exactly
//! the wire behavior §6 calls for, with no hand-rolled timer.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use orchestrator_protocol::ProtocolEvent;

/// Renders one event as the SSE `data:` line content. Falls back to a terminal
/// `error` frame if the event somehow fails to serialize (it never should, since
/// `ProtocolEvent` only carries plain strings and a fixed shape).
pub fn to_sse_event(ev: &ProtocolEvent) -> Event {
    let json = ev.to_json_string().unwrap_or_else(|_| {
        r#"{"type":"error","kind":"INTERNAL","message":"event serialization failed"}"#.to_string()
    });
    Event::default().data(json)
}

pub fn sse_response<S>(
    events: S,
    keepalive_interval: Duration,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: Stream<Item = ProtocolEvent> + Send + 'static,
{
    let body = events.map(|ev| Ok(to_sse_event(&ev)));
    Sse::new(body).keep_alive(KeepAlive::new().interval(keepalive_interval).text("keepalive"))
}
