//! Server-Sent Events (SSE) broadcaster
//!
//! Streams outbound node reports (vital, error, respawn result) to connected
//! clients. A stream ends after the terminal respawn result, or shortly after
//! the node has terminated for clients that connected too late to see it.

use crate::api::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::future;
use futures::stream::{Stream, StreamExt};
use ltrp_common::events::{NodeEvent, Readiness};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

/// Time left to deliver queued reports once the node has terminated
const FLUSH_GRACE: Duration = Duration::from_millis(250);

/// GET /api/v1/events - SSE event stream
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE client connected");

    let rx = state.bus.subscribe();
    let mut terminated = state.terminated.clone();

    let stream = BroadcastStream::new(rx)
        .filter_map(|result| async move {
            match result {
                Ok(event) => Some(event),
                Err(e) => {
                    // Lagged subscriber
                    warn!("SSE stream error: {:?}", e);
                    None
                }
            }
        })
        // Yield the terminal report, then end
        .scan(false, |finished, event| {
            if *finished {
                return future::ready(None);
            }
            *finished = is_terminal(&event);
            future::ready(Some(event))
        })
        .filter_map(|event| async move { to_sse_event(&event) })
        .take_until(async move {
            let _ = terminated.wait_for(|done| *done).await;
            tokio::time::sleep(FLUSH_GRACE).await;
        })
        .map(Ok);

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn is_terminal(event: &NodeEvent) -> bool {
    matches!(event, NodeEvent::RespawnResult(r) if r.readiness == Readiness::Offline)
}

fn to_sse_event(event: &NodeEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => {
            debug!("Broadcasting SSE event: {}", event.event_type());
            Some(Event::default().event(event.event_type()).data(json))
        }
        Err(e) => {
            warn!("Failed to serialize event: {}", e);
            None
        }
    }
}
