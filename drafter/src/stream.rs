//! Incremental delivery of an agent run.
//!
//! The run executes to completion on the blocking pool; its trace is then
//! replayed in order with error messages redacted, followed by one closing
//! event carrying the result.

use std::sync::Arc;

use async_stream::stream;
use futures::Stream;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::agent::{AgentEvent, AgentResult, AgentRun, AgentState, DraftingAgent, EventDetail};
use crate::core::profile::ConstraintProfile;
use crate::io::gateway::GenerationGateway;

/// Replacement text for every `error` event crossing the stream boundary.
pub const REDACTED_ERROR_MESSAGE: &str = "An error occurred during processing";

const STREAM_BUFFER: usize = 32;

/// Replay `run` for an external consumer.
///
/// Error events keep their position and timestamp but lose message and data.
/// A final event summarizes the result: `complete` with output, validation and
/// attempt count on success, `error` with validation and attempt count otherwise.
pub fn project_run(run: &AgentRun) -> Vec<AgentEvent> {
    let mut events: Vec<AgentEvent> = run.events.iter().map(redact).collect();
    events.push(closing_event(&run.result));
    events
}

fn redact(event: &AgentEvent) -> AgentEvent {
    if event.state() != AgentState::Error {
        return event.clone();
    }
    AgentEvent {
        message: REDACTED_ERROR_MESSAGE.to_string(),
        detail: EventDetail::Error,
        timestamp: event.timestamp,
    }
}

fn closing_event(result: &AgentResult) -> AgentEvent {
    match (&result.output, &result.validation) {
        (Some(output), Some(validation)) if result.success => AgentEvent::new(
            "Generation complete",
            EventDetail::Delivered {
                output: Box::new(output.clone()),
                validation: validation.clone(),
                total_attempts: result.total_attempts,
            },
        ),
        _ => AgentEvent::new(
            "Generation could not be completed",
            EventDetail::Undelivered {
                validation: result.validation.clone(),
                total_attempts: result.total_attempts,
            },
        ),
    }
}

/// Run the agent and stream the projected events.
///
/// Nothing starts until the stream is first polled. Dropping the stream stops
/// delivery only; the run itself always finishes.
pub fn run_streaming<G>(
    agent: Arc<DraftingAgent<G>>,
    prompt: String,
    profile: ConstraintProfile,
) -> impl Stream<Item = AgentEvent>
where
    G: GenerationGateway + Send + Sync + 'static,
{
    stream! {
        let (tx, mut rx) = mpsc::channel(STREAM_BUFFER);
        let producer = tokio::task::spawn_blocking(move || {
            let run = agent.run_sync(&prompt, &profile);
            for event in project_run(&run) {
                if tx.blocking_send(event).is_err() {
                    debug!("stream consumer dropped, discarding remaining events");
                    break;
                }
            }
        });

        while let Some(event) = rx.recv().await {
            yield event;
        }

        if let Err(err) = producer.await {
            error!(err = %err, "agent run aborted");
            yield AgentEvent::new(
                "Generation could not be completed",
                EventDetail::Undelivered {
                    validation: None,
                    total_attempts: 0,
                },
            );
        }
    }
}
