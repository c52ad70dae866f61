//! Server-Sent Events support

use crate::conversation::OutboundMessage;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert a conversation's broadcast channel to an SSE stream
pub fn sse_stream(
    broadcast_rx: broadcast::Receiver<OutboundMessage>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(message) => Some(Ok(outbound_to_event(&message))),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "SSE subscriber lagged, dropping messages");
            None
        }
    });

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn outbound_to_event(message: &OutboundMessage) -> Event {
    let data = serde_json::to_string(message).unwrap_or_default();
    Event::default()
        .event(message.kind.as_str())
        .id(message.id.to_string())
        .data(data)
}
