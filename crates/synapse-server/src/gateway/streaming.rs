//! Turns a [`ChatEvent`] stream into Server-Sent Events. Every `ChatEvent`
//! already carries its own `type` tag, so it is forwarded to the client as
//! `data: <json>` verbatim rather than translated into OpenAI chunk deltas.

use std::convert::Infallible;

use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::{Stream, StreamExt};
use tokio_stream::wrappers::UnboundedReceiverStream;

use synapse_core::chat::ChatEvent;

/// Builds the streaming response, including the transport headers
/// (`Cache-Control: no-cache`, `Connection: keep-alive`,
/// `X-Accel-Buffering: no`) so an intermediary proxy doesn't buffer the
/// frames.
pub fn chat_event_response(events: UnboundedReceiverStream<ChatEvent>) -> Response {
    let sse = Sse::new(to_sse_stream(events));

    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(HeaderName::from_static("x-accel-buffering"), HeaderValue::from_static("no"));

    (headers, sse).into_response()
}

fn to_sse_stream(events: UnboundedReceiverStream<ChatEvent>) -> impl Stream<Item = Result<Event, Infallible>> {
    events.map(|event| {
        let json = serde_json::to_string(&event).unwrap_or_else(|err| {
            tracing::error!(error = %err, "failed to serialize chat event");
            r#"{"type":"error","message":"serialization failure"}"#.to_string()
        });
        Ok(Event::default().data(json))
    })
}
