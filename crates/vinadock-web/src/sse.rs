//! Server-Sent Events (SSE) streaming of docking job transitions.

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_core::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use vinadock_molecules::JobId;

use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct EventFilter {
    /// Only forward events for this job.
    pub job: Option<JobId>,
}

/// SSE endpoint — `event:` carries the transition name, `data:` the JSON event.
pub async fn job_events(
    State(state): State<SharedState>,
    Query(filter): Query<EventFilter>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        // Lagged receivers skip the missed events.
        let event = result.ok()?;
        if filter.job.is_some_and(|id| id != event.job_id()) {
            return None;
        }
        Event::default()
            .event(event.name())
            .json_data(&event)
            .ok()
            .map(Ok)
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
