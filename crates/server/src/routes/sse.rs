use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use events::{EventEnvelope, SessionEvent};

use crate::state::AppState;

pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 1000;
pub const SSE_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Restrict the stream to one session's events
    pub session_id: Option<String>,
}

/// Replay buffer for the observation stream, so reconnecting clients can
/// resume from their `Last-Event-ID`.
pub struct EventBuffer {
    events: VecDeque<EventEnvelope>,
    max_size: usize,
}

impl EventBuffer {
    pub fn new(max_size: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    pub fn push(&mut self, envelope: EventEnvelope) {
        if self.events.len() >= self.max_size {
            self.events.pop_front();
        }
        self.events.push_back(envelope);
    }

    pub fn events_after(&self, event_id: Uuid) -> Vec<EventEnvelope> {
        let mut found = false;
        self.events
            .iter()
            .filter_map(|envelope| {
                if found {
                    Some(envelope.clone())
                } else if envelope.id == event_id {
                    found = true;
                    None
                } else {
                    None
                }
            })
            .collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.events.len()
    }
}

pub type SharedEventBuffer = Arc<RwLock<EventBuffer>>;

fn envelope_to_sse_event(envelope: &EventEnvelope) -> Result<Event, Infallible> {
    let event_type = match &envelope.event {
        SessionEvent::PlanningStarted => "planning.started",
        SessionEvent::CapabilityPlanned { .. } => "capability.planned",
        SessionEvent::NoCapabilitiesPlanned => "planning.empty",
        SessionEvent::SynthesisStarted { .. } => "synthesis.started",
        SessionEvent::SynthesisCompleted { .. } => "synthesis.completed",
        SessionEvent::PersistenceFailed { .. } => "persistence.failed",
        SessionEvent::CannotProceed => "run.cannot_proceed",
        SessionEvent::InvocationStarted => "invocation.started",
        SessionEvent::CallsRequested { .. } => "calls.requested",
        SessionEvent::NoCallsRequested => "calls.none",
        SessionEvent::LoadingCapability { .. } => "capability.loading",
        SessionEvent::CapabilityLoaded { .. } => "capability.loaded",
        SessionEvent::ExecutingCall { .. } => "call.executing",
        SessionEvent::CallCompleted { .. } => "call.completed",
        SessionEvent::CallFailed { .. } => "call.failed",
        SessionEvent::Summarizing => "summary.started",
        SessionEvent::FinalAnswer { .. } => "summary.final",
        SessionEvent::Fatal { .. } => "run.failed",
    };

    let data = serde_json::to_string(&envelope).unwrap_or_else(|_| "{}".to_string());

    Ok(Event::default()
        .id(envelope.id.to_string())
        .event(event_type)
        .data(data))
}

#[utoipa::path(
    get,
    path = "/api/events",
    params(
        ("session_id" = Option<String>, Query, description = "Restrict the stream to one session"),
    ),
    responses(
        (status = 200, description = "SSE event stream"),
    ),
    tag = "events"
)]
pub async fn events_stream(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
    headers: axum::http::HeaderMap,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_filter = query.session_id;
    let last_event_id = headers
        .get("Last-Event-ID")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<Uuid>().ok());

    let buffer = Arc::clone(&state.event_buffer);
    let buffer_for_live = Arc::clone(&buffer);

    let rx = state.event_bus.subscribe();

    let missed_events = if let Some(event_id) = last_event_id {
        buffer
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .events_after(event_id)
    } else {
        vec![]
    };

    let missed_stream =
        futures::stream::iter(missed_events.into_iter().map(|e| envelope_to_sse_event(&e)));

    let live_stream = BroadcastStream::new(rx).filter_map(move |result| {
        let session_filter = session_filter.clone();
        let buffer = Arc::clone(&buffer_for_live);

        async move {
            match result {
                Ok(envelope) => {
                    buffer
                        .write()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .push(envelope.clone());

                    if let Some(ref session_id) = session_filter {
                        if &envelope.session_id != session_id {
                            return None;
                        }
                    }

                    Some(envelope_to_sse_event(&envelope))
                }
                Err(e) => {
                    tracing::warn!("SSE broadcast error: {:?}", e);
                    None
                }
            }
        }
    });

    let stream = missed_stream.chain(live_stream);

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(SSE_KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(session_id: &str) -> EventEnvelope {
        EventEnvelope::new(session_id, SessionEvent::PlanningStarted)
    }

    #[test]
    fn test_event_buffer_events_after() {
        let mut buffer = EventBuffer::new(3);

        let e1 = envelope("sess-1");
        let e2 = envelope("sess-1");
        let e3 = envelope("sess-2");

        let id1 = e1.id;
        let id2 = e2.id;

        buffer.push(e1);
        buffer.push(e2);
        buffer.push(e3.clone());

        let after_first = buffer.events_after(id1);
        assert_eq!(after_first.len(), 2);
        assert_eq!(after_first[0].id, id2);

        let after_second = buffer.events_after(id2);
        assert_eq!(after_second.len(), 1);
        assert_eq!(after_second[0].id, e3.id);

        let after_nonexistent = buffer.events_after(Uuid::new_v4());
        assert!(after_nonexistent.is_empty());
    }

    #[test]
    fn test_event_buffer_evicts_oldest() {
        let mut buffer = EventBuffer::new(2);

        let e1 = envelope("sess-1");
        let e2 = envelope("sess-1");
        let e3 = envelope("sess-1");

        let id1 = e1.id;
        let id2 = e2.id;
        let id3 = e3.id;

        buffer.push(e1);
        buffer.push(e2);
        buffer.push(e3);

        assert_eq!(buffer.len(), 2);
        let after_e1 = buffer.events_after(id1);
        assert!(after_e1.is_empty());
        let after_e2 = buffer.events_after(id2);
        assert_eq!(after_e2.len(), 1);
        assert_eq!(after_e2[0].id, id3);
    }

    #[test]
    fn test_envelope_to_sse_event_does_not_panic() {
        let envelope = EventEnvelope::new(
            "sess-1",
            SessionEvent::FinalAnswer {
                text: "done".to_string(),
            },
        );

        let _event = envelope_to_sse_event(&envelope).unwrap();
    }
}
