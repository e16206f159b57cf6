//! Scripted participant streamer
//!
//! Produces deterministic answers word by word on a spawned task, so a whole
//! round can run offline. Failures are injected per model.

use super::registry::InMemoryStreamRegistry;
use async_trait::async_trait;
use roundtable_application::ports::participant_stream::{
    GatewayError, ModeratorRequest, ParticipantRequest, ParticipantStreamPort, StreamHandle,
};
use roundtable_domain::{
    ErrorCategory, FinishReason, MessageError, Model, StreamEvent, StreamResumptionRecord,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 64;

/// Offline stand-in for the model gateway.
pub struct SimulatedParticipantStreamer {
    failures: HashMap<String, ErrorCategory>,
    chunk_delay: Duration,
    registry: Option<Arc<InMemoryStreamRegistry>>,
}

impl Default for SimulatedParticipantStreamer {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedParticipantStreamer {
    pub fn new() -> Self {
        Self {
            failures: HashMap::new(),
            chunk_delay: Duration::from_millis(15),
            registry: None,
        }
    }

    /// Make every turn of `model` fail with `category`.
    pub fn with_failure(mut self, model: &Model, category: ErrorCategory) -> Self {
        self.failures.insert(model.to_string(), category);
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Buffer participant streams so they can be resumed.
    pub fn with_registry(mut self, registry: Arc<InMemoryStreamRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    fn participant_events(&self, request: &ParticipantRequest) -> Vec<StreamEvent> {
        let answer = compose_answer(request);
        let mut events = chunk_words(&answer);
        match self.failures.get(request.model.as_str()) {
            None => events.push(StreamEvent::Finished(Some(FinishReason::Stop))),
            // Ends without text or reason.
            Some(ErrorCategory::SilentFailure) => events.clear(),
            Some(category) => {
                events.truncate(2);
                events.push(StreamEvent::Failed(MessageError::from_category(*category)));
            }
        }
        events
    }

    /// Send `events` on a spawned task. The task keeps feeding the registry
    /// after the receiver is dropped.
    fn spawn(&self, events: Vec<StreamEvent>, buffered_as: Option<String>) -> StreamHandle {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let delay = self.chunk_delay;
        let registry = self.registry.clone();

        tokio::spawn(async move {
            let mut detached = false;
            for event in events {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if let (Some(registry), Some(id)) = (&registry, &buffered_as) {
                    registry.push(id, event.clone());
                }
                if !detached && tx.send(event).await.is_err() {
                    debug!("Client detached, stream continues server-side");
                    detached = true;
                    if buffered_as.is_none() {
                        return;
                    }
                }
            }
        });

        StreamHandle::new(rx)
    }
}

/// Failures that happen before any output is produced.
fn pre_stream_error(category: ErrorCategory, model: &Model) -> Option<GatewayError> {
    match category {
        ErrorCategory::RateLimit => Some(GatewayError::RateLimited(model.to_string())),
        ErrorCategory::ModelUnavailable => Some(GatewayError::ModelNotAvailable(model.to_string())),
        ErrorCategory::ValidationError => {
            Some(GatewayError::InvalidRequest(format!("{} rejected the request", model)))
        }
        _ => None,
    }
}

fn question_of(prompt: &str) -> &str {
    prompt
        .lines()
        .skip_while(|line| !line.starts_with("Question:"))
        .nth(1)
        .unwrap_or_default()
        .trim()
}

fn compose_answer(request: &ParticipantRequest) -> String {
    let question = question_of(&request.prompt);
    let earlier = request.prompt.matches("\n--- ").count();
    let mut answer = format!(
        "{} on \"{}\": the core trade-off is between simplicity and control.",
        request.model, question
    );
    if earlier > 0 {
        answer.push_str(&format!(
            " Building on the {} earlier answer{}, I would add a concrete example.",
            earlier,
            if earlier == 1 { "" } else { "s" }
        ));
    }
    if request.prompt.contains("Web search results:") {
        answer.push_str(" The search results support this.");
    }
    answer
}

fn chunk_words(text: &str) -> Vec<StreamEvent> {
    text.split_inclusive(' ')
        .map(|word| StreamEvent::Delta(word.to_string()))
        .collect()
}

#[async_trait]
impl ParticipantStreamPort for SimulatedParticipantStreamer {
    async fn stream_participant(
        &self,
        request: &ParticipantRequest,
    ) -> Result<StreamHandle, GatewayError> {
        if let Some(error) = self
            .failures
            .get(request.model.as_str())
            .and_then(|category| pre_stream_error(*category, &request.model))
        {
            return Err(error);
        }

        let buffered_as = self.registry.as_ref().map(|registry| {
            let record = StreamResumptionRecord::active(
                &request.thread_id,
                request.round_number,
                request.participant_index,
            );
            let id = record.stream_id.clone();
            registry.open(record, &request.participant_id, &request.model);
            id
        });

        let events = self.participant_events(request);
        Ok(self.spawn(events, buffered_as))
    }

    async fn stream_moderator(
        &self,
        request: &ModeratorRequest,
    ) -> Result<StreamHandle, GatewayError> {
        let answered = request.prompt.matches("\n--- ").count();
        let failed = request.prompt.matches("(no answer: failed)").count();
        let summary = format!(
            "**Conclusion**: {} of {} participants answered and broadly agree. **Key Points**: simplicity versus control; concrete examples help.",
            answered - failed,
            answered
        );
        let mut events = chunk_words(&summary);
        events.push(StreamEvent::Finished(Some(FinishReason::Stop)));
        Ok(self.spawn(events, None))
    }
}
