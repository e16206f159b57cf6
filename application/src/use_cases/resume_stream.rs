//! Resume Stream use case
//!
//! After a reload, re-attach to a participant stream that is still running
//! server-side, or pull the persisted message of one that finished while the
//! client was away. Either way the round continues from the committed
//! participant pointer; nothing is requested twice.

use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::participant_stream::{GatewayError, StreamHandle};
use crate::ports::resumable_stream::{ResumableStreamPort, StreamStatus};
use crate::ports::thread_repository::{RepositoryError, ThreadRepository};
use crate::store::{ChatStore, ParticipantStep, StoreError};
use crate::use_cases::run_round::next_event;
use chrono::Utc;
use roundtable_domain::message::identity::participant_message_id;
use roundtable_domain::{InvalidReason, ResumptionVerdict, StreamEvent};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ResumeStreamError {
    #[error("Store rejected transition: {0}")]
    Store(#[from] StoreError),

    #[error("Persistence error: {0}")]
    Repository(#[from] RepositoryError),
}

/// What happened to the stored resumption record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// No record for the loaded thread.
    NothingToResume,
    /// The record did not apply and was dropped.
    Discarded(InvalidReason),
    /// This `(round, participant)` was already handled.
    AlreadyAttempted,
    /// The stream could not be re-attached; the round was unblocked.
    Failed,
    /// Live stream re-attached and drained.
    Resumed {
        round_number: u32,
        participant_index: usize,
        next_participant: Option<usize>,
    },
    /// Finished stream; the persisted message was loaded instead.
    Synced {
        round_number: u32,
        participant_index: usize,
        next_participant: Option<usize>,
    },
}

impl ResumeOutcome {
    /// Round and next participant to continue with, if the round goes on.
    pub fn continuation(&self) -> Option<(u32, Option<usize>)> {
        match self {
            ResumeOutcome::Resumed {
                round_number,
                next_participant,
                ..
            }
            | ResumeOutcome::Synced {
                round_number,
                next_participant,
                ..
            } => Some((*round_number, *next_participant)),
            _ => None,
        }
    }
}

/// Use case for resuming an interrupted participant stream
pub struct ResumeStreamUseCase<P, R>
where
    P: ResumableStreamPort + 'static,
    R: ThreadRepository + 'static,
{
    streams: Arc<P>,
    repository: Arc<R>,
    conversation_logger: Arc<dyn ConversationLogger>,
    idle_timeout: Option<Duration>,
}

impl<P, R> ResumeStreamUseCase<P, R>
where
    P: ResumableStreamPort + 'static,
    R: ThreadRepository + 'static,
{
    pub fn new(streams: Arc<P>, repository: Arc<R>) -> Self {
        Self {
            streams,
            repository,
            conversation_logger: Arc::new(NoConversationLogger),
            idle_timeout: None,
        }
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Ask the stream registry for the loaded thread's latest stream when the
    /// store has no record yet.
    pub async fn discover(&self, store: &mut ChatStore) -> Result<bool, ResumeStreamError> {
        if store.state().stream_resumption.is_some() {
            return Ok(true);
        }
        let Some(thread_id) = store.state().thread_id().map(str::to_string) else {
            return Ok(false);
        };
        match self.streams.latest_for_thread(&thread_id).await {
            Ok(Some(record)) => {
                store.set_stream_resumption(record);
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => {
                warn!(thread_id = %thread_id, "Stream lookup failed: {}", e);
                Ok(false)
            }
        }
    }

    pub async fn execute(&self, store: &mut ChatStore) -> Result<ResumeOutcome, ResumeStreamError> {
        self.discover(store).await?;

        match store.resumption_verdict(Utc::now()) {
            ResumptionVerdict::None => Ok(ResumeOutcome::NothingToResume),
            ResumptionVerdict::Invalid(reason) => {
                warn!(?reason, "Discarding stream resumption record");
                store.clear_stream_resumption();
                Ok(ResumeOutcome::Discarded(reason))
            }
            ResumptionVerdict::Resume {
                round_number,
                participant_index,
            } => {
                if !store.mark_resumption_attempted(round_number, participant_index) {
                    return Ok(ResumeOutcome::AlreadyAttempted);
                }
                self.resume(store, round_number, participant_index).await
            }
            ResumptionVerdict::SyncMessage {
                round_number,
                participant_index,
            } => {
                if !store.mark_resumption_attempted(round_number, participant_index) {
                    return Ok(ResumeOutcome::AlreadyAttempted);
                }
                self.sync(store, round_number, participant_index).await
            }
        }
    }

    async fn resume(
        &self,
        store: &mut ChatStore,
        round_number: u32,
        participant_index: usize,
    ) -> Result<ResumeOutcome, ResumeStreamError> {
        let Some(stream_id) = store
            .state()
            .stream_resumption
            .as_ref()
            .map(|r| r.stream_id.clone())
        else {
            return Ok(ResumeOutcome::NothingToResume);
        };

        match self.streams.lookup(&stream_id).await {
            Ok(StreamStatus::Active) => {}
            Ok(StreamStatus::Completed) => {
                info!(stream_id = %stream_id, "Stream finished while away, syncing");
                return self.sync(store, round_number, participant_index).await;
            }
            Ok(StreamStatus::NotFound) => return Ok(self.fail(store, &stream_id, None)),
            Err(e) => return Ok(self.fail(store, &stream_id, Some(e))),
        }

        let handle = match self.streams.resume(&stream_id).await {
            Ok(handle) => handle,
            Err(e) => return Ok(self.fail(store, &stream_id, Some(e))),
        };

        store.begin_resumed_participant(round_number, participant_index)?;
        info!(stream_id = %stream_id, "Stream re-attached");
        let step = self.drain(store, participant_index, handle).await?;
        store.clear_stream_resumption();

        if let Some(message) = store.message(&participant_message_id(
            store.state().thread_id().unwrap_or_default(),
            round_number,
            participant_index,
        )) {
            if let Err(e) = self.repository.save_message(message).await {
                warn!(participant_index, "Could not persist resumed message: {}", e);
            }
        }

        self.log("stream_resumed", round_number, participant_index, "resume");
        Ok(ResumeOutcome::Resumed {
            round_number,
            participant_index,
            next_participant: step.next_index(),
        })
    }

    async fn drain(
        &self,
        store: &mut ChatStore,
        index: usize,
        mut handle: StreamHandle,
    ) -> Result<ParticipantStep, ResumeStreamError> {
        loop {
            match next_event(&mut handle, self.idle_timeout).await {
                Some(StreamEvent::Delta(chunk)) => {
                    store.append_participant_chunk(index, &chunk);
                }
                Some(StreamEvent::Reasoning(chunk)) => {
                    store.append_participant_reasoning(index, &chunk);
                }
                Some(StreamEvent::Finished(reason)) => {
                    return Ok(store.complete_participant(index, reason)?);
                }
                Some(StreamEvent::Failed(error)) => {
                    return Ok(store.fail_participant(index, error)?);
                }
                None => return Ok(store.complete_participant(index, None)?),
            }
        }
    }

    async fn sync(
        &self,
        store: &mut ChatStore,
        round_number: u32,
        participant_index: usize,
    ) -> Result<ResumeOutcome, ResumeStreamError> {
        let thread_id = store.state().thread_id().unwrap_or_default().to_string();
        let id = participant_message_id(&thread_id, round_number, participant_index);

        let message = match self.repository.load_message(&id).await? {
            Some(message) if message.is_terminal() => message,
            _ => {
                warn!(message_id = %id, "Finished stream has no persisted message");
                return Ok(self.fail(store, &id, None));
            }
        };
        store.upsert_message(message);
        let next_participant = store.handle_resumed_stream_complete(round_number, participant_index)?;

        self.log("stream_resumed", round_number, participant_index, "sync");
        Ok(ResumeOutcome::Synced {
            round_number,
            participant_index,
            next_participant,
        })
    }

    fn fail(&self, store: &mut ChatStore, stream_id: &str, error: Option<GatewayError>) -> ResumeOutcome {
        match error {
            Some(e) => warn!(stream_id = %stream_id, "Stream resumption failed: {}", e),
            None => warn!(stream_id = %stream_id, "Stream no longer available"),
        }
        store.handle_resumption_failure();
        ResumeOutcome::Failed
    }

    fn log(&self, event_type: &'static str, round_number: u32, participant_index: usize, mode: &str) {
        self.conversation_logger.log(ConversationEvent::new(
            event_type,
            json!({
                "round_number": round_number,
                "participant_index": participant_index,
                "mode": mode,
            }),
        ));
    }
}
