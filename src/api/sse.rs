//! Server-Sent Events support
//!
//! Streams outbox deliveries to transports.

use crate::runtime::Delivery;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert the outbox broadcast into an SSE stream
pub fn outbox_stream(
    broadcast_rx: tokio::sync::broadcast::Receiver<Delivery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let deliveries = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(delivery) => Some(Ok(delivery_to_axum(&delivery))),
        Err(e) => {
            tracing::warn!(error = %e, "Outbox subscriber lagged");
            None
        }
    });

    Sse::new(deliveries).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn delivery_to_axum(delivery: &Delivery) -> Event {
    let data = serde_json::to_string(delivery).unwrap_or_else(|_| "{}".to_string());
    Event::default().event("delivery").data(data)
}
