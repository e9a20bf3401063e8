//! Server-Sent Events for server-driven runs

use crate::debate::{RunEnd, RunEvent};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

/// Convert a run's event channel into an SSE response. Dropping the
/// response (client disconnect) drops the receiver, which ends the run.
pub fn sse_stream(
    events: mpsc::Receiver<RunEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = ReceiverStream::new(events).map(|event| Ok(run_event_to_axum(&event)));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn run_event_to_axum(event: &RunEvent) -> Event {
    let (event_type, data) = run_event_payload(event);
    Event::default().event(event_type).data(data.to_string())
}

fn run_event_payload(event: &RunEvent) -> (&'static str, serde_json::Value) {
    match event {
        RunEvent::Turn(turn) => (
            "turn",
            json!({
                "type": "turn",
                "turn": turn
            }),
        ),
        RunEvent::Finished(RunEnd::Failed(message)) => (
            "error",
            json!({
                "type": "error",
                "message": message
            }),
        ),
        RunEvent::Finished(end) => (
            "done",
            json!({
                "type": "done",
                "reason": end.reason()
            }),
        ),
    }
}
