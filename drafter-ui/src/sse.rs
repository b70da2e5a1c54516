//! Server-Sent Events for streamed generation.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::StreamExt;
use futures::stream::Stream;
use tracing::{info, warn};

use drafter::agent::AgentEvent;
use drafter::stream::run_streaming;

use crate::routes::{ApiError, GenerateRequest};
use crate::state::AppState;

const KEEP_ALIVE_SECS: u64 = 15;

/// POST /api/generate/stream - one SSE event per agent event.
///
/// The SSE event name is the agent state; the data is the serialized event.
pub async fn generate_stream(
    State(state): State<AppState>,
    Json(body): Json<GenerateRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let (prompt, profile) = body.into_job()?;
    info!(contract_type = %profile.contract_type(), "starting streamed generation");

    let stream = async_stream::stream! {
        let mut events = std::pin::pin!(run_streaming(Arc::clone(&state.agent), prompt, profile));
        while let Some(event) = events.next().await {
            yield Ok(sse_event(&event));
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(KEEP_ALIVE_SECS))
            .text("ping"),
    ))
}

fn sse_event(event: &AgentEvent) -> Event {
    let name = event.state().as_str();
    Event::default().event(name).json_data(event).unwrap_or_else(|err| {
        warn!(err = %err, "failed to serialize agent event");
        Event::default()
            .event("error")
            .data(r#"{"state":"error","message":"Generation failed"}"#)
    })
}

