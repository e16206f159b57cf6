//! In-memory buffered stream registry
//!
//! Streams keep running after the client that opened them goes away. Every
//! event is buffered under the stream id so a returning client can replay
//! the output, and a finished stream's message is persisted the way a
//! server would. Opening a stream drops the thread's finished buffers, since
//! only the latest stream of a thread is ever resumed.

use super::repository::InMemoryThreadRepository;
use async_trait::async_trait;
use roundtable_application::ports::participant_stream::{GatewayError, StreamHandle};
use roundtable_application::ports::resumable_stream::{ResumableStreamPort, StreamStatus};
use roundtable_domain::{Message, Model, StreamEvent, StreamResumptionRecord};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

const FOLLOW_CAPACITY: usize = 64;

struct BufferedStream {
    record: StreamResumptionRecord,
    participant_id: String,
    model: Model,
    events: Vec<StreamEvent>,
    followers: Vec<mpsc::UnboundedSender<StreamEvent>>,
}

impl BufferedStream {
    fn is_completed(&self) -> bool {
        self.events.last().is_some_and(StreamEvent::is_terminal)
    }

    /// The participant message as the server would persist it.
    fn final_message(&self) -> Message {
        let mut message = Message::participant(
            &self.record.thread_id,
            self.record.round_number,
            self.record.participant_index,
            self.participant_id.clone(),
            self.model.clone(),
        );
        for event in &self.events {
            match event {
                StreamEvent::Delta(chunk) => message.push_text(chunk),
                StreamEvent::Reasoning(chunk) => message.push_reasoning(chunk),
                StreamEvent::Finished(reason) => message.finish(reason.clone()),
                StreamEvent::Failed(error) => message.fail(error.clone()),
            }
        }
        message
    }
}

/// Buffers participant streams by id.
#[derive(Default)]
pub struct InMemoryStreamRegistry {
    streams: Mutex<HashMap<String, BufferedStream>>,
    repository: Option<Arc<InMemoryThreadRepository>>,
}

impl InMemoryStreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist finished streams into `repository`.
    pub fn with_repository(mut self, repository: Arc<InMemoryThreadRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Start buffering a stream. Re-opening an id discards the old buffer.
    pub fn open(&self, record: StreamResumptionRecord, participant_id: &str, model: &Model) {
        let Ok(mut streams) = self.streams.lock() else {
            return;
        };
        streams.retain(|_, s| s.record.thread_id != record.thread_id || !s.is_completed());
        debug!(stream_id = %record.stream_id, "Stream opened");
        streams.insert(
            record.stream_id.clone(),
            BufferedStream {
                record,
                participant_id: participant_id.to_string(),
                model: model.clone(),
                events: Vec::new(),
                followers: Vec::new(),
            },
        );
    }

    /// Buffer an event and forward it to re-attached clients.
    pub fn push(&self, stream_id: &str, event: StreamEvent) {
        let finished = {
            let Ok(mut streams) = self.streams.lock() else {
                return;
            };
            let Some(stream) = streams.get_mut(stream_id) else {
                return;
            };
            if stream.is_completed() {
                return;
            }
            stream
                .followers
                .retain(|tx| tx.send(event.clone()).is_ok());
            stream.events.push(event);
            if stream.is_completed() {
                stream.followers.clear();
                Some(stream.final_message())
            } else {
                None
            }
        };

        if let (Some(message), Some(repository)) = (finished, &self.repository) {
            debug!(message_id = %message.id, "Stream finished, message persisted");
            repository.store_message(message);
        }
    }

    fn status_of(stream: &BufferedStream) -> StreamStatus {
        if stream.is_completed() {
            StreamStatus::Completed
        } else {
            StreamStatus::Active
        }
    }
}

#[async_trait]
impl ResumableStreamPort for InMemoryStreamRegistry {
    async fn latest_for_thread(
        &self,
        thread_id: &str,
    ) -> Result<Option<StreamResumptionRecord>, GatewayError> {
        let streams = self.streams.lock().map_err(|_| GatewayError::TransportClosed)?;
        Ok(streams
            .values()
            .filter(|s| s.record.thread_id == thread_id)
            .max_by_key(|s| (s.record.round_number, s.record.participant_index))
            .map(|s| {
                let record = s.record.clone();
                if s.is_completed() {
                    record.completed()
                } else {
                    record
                }
            }))
    }

    async fn lookup(&self, stream_id: &str) -> Result<StreamStatus, GatewayError> {
        let streams = self.streams.lock().map_err(|_| GatewayError::TransportClosed)?;
        Ok(streams
            .get(stream_id)
            .map(Self::status_of)
            .unwrap_or(StreamStatus::NotFound))
    }

    async fn resume(&self, stream_id: &str) -> Result<StreamHandle, GatewayError> {
        let mut streams = self.streams.lock().map_err(|_| GatewayError::TransportClosed)?;
        let stream = streams
            .get_mut(stream_id)
            .ok_or_else(|| GatewayError::StreamNotFound(stream_id.to_string()))?;

        // Followers never drop events; a forwarding task applies backpressure
        // toward the client instead.
        let (queue, mut queued) = mpsc::unbounded_channel();
        for event in &stream.events {
            let _ = queue.send(event.clone());
        }
        if !stream.is_completed() {
            stream.followers.push(queue);
        }

        let (tx, rx) = mpsc::channel(FOLLOW_CAPACITY);
        tokio::spawn(async move {
            while let Some(event) = queued.recv().await {
                if tx.send(event).await.is_err() {
                    debug!("Resumed client detached");
                    return;
                }
            }
        });
        Ok(StreamHandle::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundtable_domain::FinishReason;

    fn registry_with_stream() -> (InMemoryStreamRegistry, String) {
        let registry = InMemoryStreamRegistry::new();
        let record = StreamResumptionRecord::active("thread-1", 0, 1);
        let id = record.stream_id.clone();
        registry.open(record, "p1", &Model::Gpt52);
        (registry, id)
    }

    #[tokio::test]
    async fn test_lookup_tracks_completion() {
        let (registry, id) = registry_with_stream();
        assert_eq!(registry.lookup(&id).await, Ok(StreamStatus::Active));

        registry.push(&id, StreamEvent::Delta("a".into()));
        registry.push(&id, StreamEvent::Finished(Some(FinishReason::Stop)));
        assert_eq!(registry.lookup(&id).await, Ok(StreamStatus::Completed));
        assert_eq!(registry.lookup("nope").await, Ok(StreamStatus::NotFound));
    }

    #[tokio::test]
    async fn test_resume_replays_then_follows() {
        let (registry, id) = registry_with_stream();
        registry.push(&id, StreamEvent::Delta("Hello ".into()));

        let handle = registry.resume(&id).await.unwrap();
        registry.push(&id, StreamEvent::Delta("world".into()));
        registry.push(&id, StreamEvent::Finished(Some(FinishReason::Stop)));

        assert_eq!(handle.collect_text().await, Ok("Hello world".to_string()));
    }

    #[tokio::test]
    async fn test_latest_for_thread_picks_last_participant() {
        let (registry, _) = registry_with_stream();
        registry.open(StreamResumptionRecord::active("thread-1", 0, 0), "p0", &Model::Grok4);
        registry.open(StreamResumptionRecord::active("thread-2", 3, 0), "p0", &Model::Grok4);

        let latest = registry.latest_for_thread("thread-1").await.unwrap().unwrap();
        assert_eq!(latest.participant_index, 1);
        assert!(registry.latest_for_thread("thread-9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_finished_stream_is_persisted() {
        let repository = Arc::new(InMemoryThreadRepository::new());
        let registry = InMemoryStreamRegistry::new().with_repository(repository.clone());
        let record = StreamResumptionRecord::active("thread-1", 0, 0);
        let id = record.stream_id.clone();
        registry.open(record, "p0", &Model::Gpt52);

        registry.push(&id, StreamEvent::Delta("done".into()));
        registry.push(&id, StreamEvent::Finished(Some(FinishReason::Stop)));

        let messages = repository.messages_for_thread("thread-1");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text(), "done");
        assert!(messages[0].is_terminal());
    }

    #[tokio::test]
    async fn test_slow_follower_receives_every_event() {
        let (registry, id) = registry_with_stream();
        let handle = registry.resume(&id).await.unwrap();

        let mut expected = String::new();
        for i in 0..(FOLLOW_CAPACITY * 3) {
            let chunk = format!("{} ", i);
            expected.push_str(&chunk);
            registry.push(&id, StreamEvent::Delta(chunk));
        }
        registry.push(&id, StreamEvent::Finished(Some(FinishReason::Stop)));

        assert_eq!(handle.collect_text().await, Ok(expected));
    }

    #[tokio::test]
    async fn test_opening_stream_prunes_finished_buffers_of_thread() {
        let (registry, id) = registry_with_stream();
        registry.push(&id, StreamEvent::Finished(Some(FinishReason::Stop)));
        let other = StreamResumptionRecord::active("thread-2", 0, 0);
        let other_id = other.stream_id.clone();
        registry.open(other, "p0", &Model::Grok4);
        registry.push(&other_id, StreamEvent::Finished(Some(FinishReason::Stop)));

        registry.open(StreamResumptionRecord::active("thread-1", 1, 0), "p0", &Model::Gpt52);

        assert_eq!(registry.lookup(&id).await, Ok(StreamStatus::NotFound));
        assert_eq!(registry.lookup(&other_id).await, Ok(StreamStatus::Completed));
    }
}
