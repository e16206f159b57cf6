//! Run Round use case
//!
//! Drives one round end to end against the [`ChatStore`]:
//!
//! 1. create the thread if none is loaded
//! 2. stage the round (`prepare_for_new_message`) and confirm the user message
//! 3. pre-search, deduplicated per round; failure or staleness degrades to no context
//! 4. participants strictly in order, each started only after its index is committed
//! 5. moderator, fired by the flow machine's `CREATE_MODERATOR` edge
//! 6. navigation edge, then `complete_streaming`
//!
//! Every store mutation happens between network awaits, never during one.

use crate::config::RoundParams;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::navigator::{NoNavigation, Navigator};
use crate::ports::participant_stream::{
    ModeratorRequest, ParticipantRequest, ParticipantStreamPort, StreamHandle,
};
use crate::ports::progress::{NoProgress, RoundProgressNotifier};
use crate::ports::thread_repository::{RepositoryError, ThreadRepository};
use crate::ports::web_search::WebSearchPort;
use crate::store::{ChatStore, ParticipantStep, StoreError};
use chrono::Utc;
use roundtable_domain::orchestration::round::user_message;
use roundtable_domain::{
    AnalysisPayload, ErrorCategory, FlowAction, FlowMachine, FlowState, GateDecision, Message,
    MessageError, Participant, PreSearchRecord, PromptTemplate, RecordStatus, ScreenMode,
    StreamEvent,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors that abort a round.
///
/// A failing participant is not one of them: its error is attached to its
/// message and the round goes on.
#[derive(Error, Debug)]
pub enum RunRoundError {
    #[error("No participants configured")]
    NoParticipants,

    #[error("Round cancelled")]
    Cancelled,

    #[error("Store rejected transition: {0}")]
    Store(#[from] StoreError),

    #[error("Persistence error: {0}")]
    Repository(#[from] RepositoryError),
}

impl RunRoundError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunRoundError::Cancelled)
    }
}

/// Summary of a finished round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    pub thread_id: String,
    pub round_number: u32,
    /// Participant indices that answered.
    pub succeeded: Vec<usize>,
    /// Participant indices whose message carries an error.
    pub failed: Vec<usize>,
    pub moderator_status: Option<RecordStatus>,
    pub flow_state: FlowState,
}

/// Use case for running a round
pub struct RunRoundUseCase<S, W, R>
where
    S: ParticipantStreamPort + 'static,
    W: WebSearchPort + 'static,
    R: ThreadRepository + 'static,
{
    streamer: Arc<S>,
    search: Arc<W>,
    repository: Arc<R>,
    navigator: Arc<dyn Navigator>,
    conversation_logger: Arc<dyn ConversationLogger>,
    params: RoundParams,
}

impl<S, W, R> RunRoundUseCase<S, W, R>
where
    S: ParticipantStreamPort + 'static,
    W: WebSearchPort + 'static,
    R: ThreadRepository + 'static,
{
    pub fn new(streamer: Arc<S>, search: Arc<W>, repository: Arc<R>) -> Self {
        Self {
            streamer,
            search,
            repository,
            navigator: Arc::new(NoNavigation),
            conversation_logger: Arc::new(NoConversationLogger),
            params: RoundParams::default(),
        }
    }

    pub fn with_params(mut self, params: RoundParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    pub fn params(&self) -> &RoundParams {
        &self.params
    }

    /// Execute with default (no-op) progress and no cancellation
    pub async fn execute(
        &self,
        store: &mut ChatStore,
        text: &str,
    ) -> Result<RoundOutcome, RunRoundError> {
        self.execute_with_progress(store, text, &NoProgress, &CancellationToken::new())
            .await
    }

    /// Submit `text` as a new round and drive it to completion.
    pub async fn execute_with_progress(
        &self,
        store: &mut ChatStore,
        text: &str,
        progress: &dyn RoundProgressNotifier,
        cancel: &CancellationToken,
    ) -> Result<RoundOutcome, RunRoundError> {
        if store.state().participant_count() == 0 {
            return Err(RunRoundError::NoParticipants);
        }

        let created = self.ensure_thread(store).await?;
        let round_number = store.prepare_for_new_message(text, true)?;
        let thread_id = self.thread_id(store)?;

        let user = match self
            .repository
            .save_user_message(&thread_id, round_number, text)
            .await
        {
            Ok(user) => user,
            Err(e) => {
                store.remove_optimistic_messages();
                store.stop_streaming();
                store.set_error(e.to_string());
                return Err(e.into());
            }
        };
        store.confirm_user_message(user)?;
        store.mark_pending_message_sent()?;

        if created {
            self.generate_title(store, &thread_id, text).await;
        }

        info!(round_number, "Starting round");
        self.log(
            "round_started",
            json!({
                "thread_id": thread_id,
                "round_number": round_number,
                "question": text,
                "participants": store.state().enabled_participants().iter().map(|p| p.model.to_string()).collect::<Vec<_>>(),
            }),
        );
        progress.on_round_start(round_number, store.state().participant_count());

        self.run_round_body(store, round_number, progress, cancel)
            .await
    }

    /// Replay the latest round with the same participants and context.
    pub async fn regenerate(
        &self,
        store: &mut ChatStore,
        round_number: u32,
        progress: &dyn RoundProgressNotifier,
        cancel: &CancellationToken,
    ) -> Result<RoundOutcome, RunRoundError> {
        if store.state().participant_count() == 0 {
            return Err(RunRoundError::NoParticipants);
        }
        store.start_regeneration(round_number)?;
        info!(round_number, "Regenerating round");
        progress.on_round_start(round_number, store.state().participant_count());

        self.run_round_body(store, round_number, progress, cancel)
            .await
    }

    /// Continue a round that is already streaming (after resumption):
    /// participants from `next_index` onwards, then the moderator.
    pub async fn continue_round(
        &self,
        store: &mut ChatStore,
        round_number: u32,
        next_index: Option<usize>,
        progress: &dyn RoundProgressNotifier,
        cancel: &CancellationToken,
    ) -> Result<RoundOutcome, RunRoundError> {
        let mut machine = FlowMachine::new();
        // With no participant left the first evaluation is already the edge
        // into moderator creation, so finish_round must be the one to see it.
        if let Some(index) = next_index {
            machine.step(&store.flow_context());
            self.stream_participants(store, round_number, index, progress, cancel)
                .await?;
        }
        self.finish_round(store, &mut machine, round_number, progress, cancel)
            .await
    }

    async fn run_round_body(
        &self,
        store: &mut ChatStore,
        round_number: u32,
        progress: &dyn RoundProgressNotifier,
        cancel: &CancellationToken,
    ) -> Result<RoundOutcome, RunRoundError> {
        let query = user_message(&store.state().messages, round_number)
            .map(Message::text)
            .unwrap_or_default();
        self.run_pre_search(store, round_number, &query, progress, cancel)
            .await?;

        store.begin_participant_streaming()?;
        let mut machine = FlowMachine::new();
        machine.step(&store.flow_context());

        self.stream_participants(store, round_number, 0, progress, cancel)
            .await?;
        self.finish_round(store, &mut machine, round_number, progress, cancel)
            .await
    }

    // ==================== Thread ====================

    /// Create and load a thread when none is loaded. Returns whether one was created.
    async fn ensure_thread(&self, store: &mut ChatStore) -> Result<bool, RunRoundError> {
        if store.state().thread.is_some() {
            return Ok(false);
        }
        store.set_is_creating_thread(true);
        let participants: Vec<Participant> = store.state().participants.clone();
        let result = self
            .repository
            .create_thread(
                store.state().chat_mode(),
                store.state().web_search_enabled(),
                &participants,
            )
            .await;
        match result {
            Ok(thread) => {
                info!(thread_id = %thread.id, "Thread created");
                store.initialize_thread(thread, participants, Vec::new());
                Ok(true)
            }
            Err(e) => {
                store.set_is_creating_thread(false);
                store.set_error(e.to_string());
                Err(e.into())
            }
        }
    }

    async fn generate_title(&self, store: &mut ChatStore, thread_id: &str, text: &str) {
        match self.repository.generate_title(thread_id, text).await {
            Ok((title, slug)) => {
                if let Err(e) = store.update_thread_title(title, slug) {
                    warn!("Could not apply title: {}", e);
                }
            }
            Err(e) => warn!("Title generation failed: {}", e),
        }
    }

    fn thread_id(&self, store: &ChatStore) -> Result<String, RunRoundError> {
        store
            .state()
            .thread_id()
            .map(str::to_string)
            .ok_or(RunRoundError::Store(StoreError::NoThread))
    }

    // ==================== Pre-search ====================

    async fn run_pre_search(
        &self,
        store: &mut ChatStore,
        round_number: u32,
        query: &str,
        progress: &dyn RoundProgressNotifier,
        cancel: &CancellationToken,
    ) -> Result<(), RunRoundError> {
        if !store.state().web_search_enabled() {
            return Ok(());
        }
        let finished = store
            .pre_search_for_round(round_number)
            .is_some_and(|r| r.status.is_terminal());

        if !finished && store.try_mark_pre_search_triggered(round_number) {
            let thread_id = self.thread_id(store)?;
            store.add_pre_search(PreSearchRecord::pending(&thread_id, round_number, query));
            progress.on_pre_search_start(round_number);
            store.update_pre_search_status(round_number, RecordStatus::Streaming)?;

            let search = tokio::time::timeout(self.params.pre_search_timeout, self.search.search(query));
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    store.stop_streaming();
                    return Err(RunRoundError::Cancelled);
                }
                result = search => result,
            };

            match result {
                Ok(Ok(payload)) => {
                    info!(round_number, results = payload.results.len(), "Pre-search complete");
                    self.log(
                        "pre_search_completed",
                        json!({
                            "round_number": round_number,
                            "queries": payload.queries,
                            "result_count": payload.results.len(),
                        }),
                    );
                    store.update_pre_search_data(round_number, payload)?;
                    progress.on_pre_search_complete(round_number, true);
                }
                Ok(Err(e)) => {
                    warn!(round_number, "Pre-search failed: {}", e);
                    self.log(
                        "pre_search_failed",
                        json!({ "round_number": round_number, "error": e.to_string() }),
                    );
                    store.fail_pre_search(round_number, e.to_string())?;
                    progress.on_pre_search_complete(round_number, false);
                }
                Err(_) => {
                    warn!(round_number, "Pre-search timed out");
                    self.log(
                        "pre_search_failed",
                        json!({ "round_number": round_number, "error": "timeout" }),
                    );
                    store.fail_pre_search(round_number, "Pre-search timed out")?;
                    progress.on_pre_search_complete(round_number, false);
                }
            }
        }

        self.wait_for_gate(store, round_number, cancel).await
    }

    async fn wait_for_gate(
        &self,
        store: &mut ChatStore,
        round_number: u32,
        cancel: &CancellationToken,
    ) -> Result<(), RunRoundError> {
        loop {
            match store.pre_search_gate(round_number, Utc::now()) {
                GateDecision::Proceed { .. } => return Ok(()),
                GateDecision::TimedOut => {
                    warn!(round_number, "Pre-search stale, proceeding without it");
                    store.expire_stale_records(Utc::now());
                    return Ok(());
                }
                GateDecision::Wait => {
                    debug!(round_number, "Waiting for pre-search");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            store.stop_streaming();
                            return Err(RunRoundError::Cancelled);
                        }
                        _ = tokio::time::sleep(self.params.gate_poll_interval) => {}
                    }
                }
            }
        }
    }

    fn search_context(&self, store: &ChatStore, round_number: u32) -> Option<String> {
        store
            .pre_search_for_round(round_number)
            .filter(|r| r.status == RecordStatus::Complete)
            .and_then(|r| r.payload.as_ref())
            .map(|p| p.as_context())
    }

    // ==================== Participants ====================

    /// Stream participants from `start_index` until the round is complete.
    pub(crate) async fn stream_participants(
        &self,
        store: &mut ChatStore,
        round_number: u32,
        start_index: usize,
        progress: &dyn RoundProgressNotifier,
        cancel: &CancellationToken,
    ) -> Result<(), RunRoundError> {
        let mut next = Some(start_index);

        while let Some(index) = next {
            if cancel.is_cancelled() {
                store.stop_streaming();
                return Err(RunRoundError::Cancelled);
            }

            let participant = store
                .state()
                .participant_at(index)
                .cloned()
                .ok_or(RunRoundError::NoParticipants)?;

            // The index is committed before the request goes out.
            let message_id = store.start_participant(index)?;
            let request = self.participant_request(store, round_number, index, &participant)?;
            progress.on_participant_start(index, &participant.model);
            debug!(index, model = %participant.model, "Participant stream opening");

            let step = match self.streamer.stream_participant(&request).await {
                Ok(handle) => {
                    self.consume_participant(store, index, handle, progress, cancel)
                        .await?
                }
                Err(e) => {
                    warn!(index, model = %participant.model, "Participant failed to start: {}", e);
                    store.fail_participant(index, e.to_message_error())?
                }
            };

            if step == ParticipantStep::Ignored {
                return Err(RunRoundError::Cancelled);
            }
            self.record_participant(store, &message_id, index, &participant, progress)
                .await;

            next = step.next_index();
        }
        Ok(())
    }

    fn participant_request(
        &self,
        store: &ChatStore,
        round_number: u32,
        index: usize,
        participant: &Participant,
    ) -> Result<ParticipantRequest, RunRoundError> {
        let context = store.participant_context(round_number, index);
        let search_context = self.search_context(store, round_number);
        Ok(ParticipantRequest {
            thread_id: self.thread_id(store)?,
            round_number,
            participant_index: index,
            participant_id: participant.id.clone(),
            model: participant.model.clone(),
            system_prompt: PromptTemplate::participant_system(
                store.state().chat_mode(),
                participant.role.as_deref(),
            ),
            prompt: PromptTemplate::participant_prompt(&context, search_context.as_deref()),
        })
    }

    async fn consume_participant(
        &self,
        store: &mut ChatStore,
        index: usize,
        mut handle: StreamHandle,
        progress: &dyn RoundProgressNotifier,
        cancel: &CancellationToken,
    ) -> Result<ParticipantStep, RunRoundError> {
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    store.stop_streaming();
                    return Err(RunRoundError::Cancelled);
                }
                event = next_event(&mut handle, self.params.stream_idle_timeout) => event,
            };

            let step = match event {
                Some(StreamEvent::Delta(chunk)) => {
                    if store.append_participant_chunk(index, &chunk) {
                        progress.on_participant_chunk(index, &chunk);
                    }
                    continue;
                }
                Some(StreamEvent::Reasoning(chunk)) => {
                    store.append_participant_reasoning(index, &chunk);
                    continue;
                }
                Some(StreamEvent::Finished(reason)) => store.complete_participant(index, reason)?,
                Some(StreamEvent::Failed(error)) => {
                    warn!(index, category = %error.category, "Participant stream failed");
                    store.fail_participant(index, error)?
                }
                None => store.complete_participant(index, None)?,
            };
            return Ok(step);
        }
    }

    async fn record_participant(
        &self,
        store: &ChatStore,
        message_id: &str,
        index: usize,
        participant: &Participant,
        progress: &dyn RoundProgressNotifier,
    ) {
        let Some(message) = store.message(message_id) else {
            return;
        };
        let success = !message.has_error();
        progress.on_participant_complete(index, &participant.model, success);
        self.log(
            "participant_completed",
            json!({
                "round_number": message.round_number,
                "participant_index": index,
                "model": participant.model.to_string(),
                "success": success,
                "error_category": message.error.as_ref().map(|e| e.category.as_str()),
                "text": message.text(),
            }),
        );
        if let Err(e) = self.repository.save_message(message).await {
            warn!(index, "Could not persist participant message: {}", e);
        }
    }

    // ==================== Moderator ====================

    async fn finish_round(
        &self,
        store: &mut ChatStore,
        machine: &mut FlowMachine,
        round_number: u32,
        progress: &dyn RoundProgressNotifier,
        cancel: &CancellationToken,
    ) -> Result<RoundOutcome, RunRoundError> {
        let (state, action) = machine.step(&store.flow_context());
        debug!(round_number, state = %state, "Participants done");
        if let Some(FlowAction::CreateModerator { round_number }) = action {
            self.run_moderator(store, round_number, progress, cancel)
                .await?;
        }

        let (_, action) = machine.step(&store.flow_context());
        if let Some(FlowAction::InvalidateAndNavigate { thread_id, slug }) = action {
            self.navigator.invalidate_thread_lists();
            self.navigator.navigate_to_thread(&thread_id, &slug);
            store.set_has_navigated(true);
            store.set_screen_mode(ScreenMode::Thread);
        }
        let (flow_state, _) = machine.step(&store.flow_context());

        let outcome = self.outcome(store, round_number, flow_state)?;
        store.complete_streaming();

        info!(
            round_number,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "Round finished"
        );
        self.log(
            "round_completed",
            json!({
                "round_number": round_number,
                "succeeded": outcome.succeeded,
                "failed": outcome.failed,
                "moderator_status": outcome.moderator_status.map(|s| s.as_str()),
            }),
        );
        progress.on_round_complete(round_number);
        Ok(outcome)
    }

    async fn run_moderator(
        &self,
        store: &mut ChatStore,
        round_number: u32,
        progress: &dyn RoundProgressNotifier,
        cancel: &CancellationToken,
    ) -> Result<(), RunRoundError> {
        if !store.create_moderator(round_number)? {
            return Ok(());
        }
        let model = self.params.moderator.clone();
        let Some(message_id) = store.start_moderator_streaming(round_number, model.clone())? else {
            return Ok(());
        };

        let request = {
            let messages = &store.state().messages;
            let question = user_message(messages, round_number)
                .map(Message::text)
                .unwrap_or_default();
            let responses: Vec<&Message> = store
                .messages_in_round(round_number)
                .into_iter()
                .filter(|m| m.participant_index().is_some())
                .collect();
            ModeratorRequest {
                thread_id: self.thread_id(store)?,
                round_number,
                model: model.clone(),
                system_prompt: PromptTemplate::moderator_system().to_string(),
                prompt: PromptTemplate::moderator_prompt(&question, &responses),
            }
        };
        progress.on_moderator_start(&model);
        info!(round_number, model = %model, "Moderator streaming");

        match self.streamer.stream_moderator(&request).await {
            Ok(mut handle) => loop {
                let event = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        store.stop_streaming();
                        return Err(RunRoundError::Cancelled);
                    }
                    event = next_event(&mut handle, self.params.stream_idle_timeout) => event,
                };
                match event {
                    Some(StreamEvent::Delta(chunk)) => {
                        if store.append_moderator_chunk(round_number, &chunk) {
                            progress.on_moderator_chunk(&chunk);
                        }
                    }
                    Some(StreamEvent::Reasoning(_)) => {}
                    Some(StreamEvent::Finished(reason)) => {
                        let payload = self.analysis_payload(store, round_number, &message_id);
                        store.complete_moderator(round_number, reason, payload)?;
                        break;
                    }
                    Some(StreamEvent::Failed(error)) => {
                        store.fail_moderator(round_number, error)?;
                        break;
                    }
                    None => {
                        let payload = self.analysis_payload(store, round_number, &message_id);
                        store.complete_moderator(round_number, None, payload)?;
                        break;
                    }
                }
            },
            Err(e) => {
                warn!(round_number, "Moderator failed to start: {}", e);
                store.fail_moderator(round_number, e.to_message_error())?;
            }
        }

        let status = store.analysis_for_round(round_number).map(|a| a.status);
        let success = status == Some(RecordStatus::Complete);
        progress.on_moderator_complete(success);
        if let Some(message) = store.message(&message_id) {
            self.log(
                "moderator_completed",
                json!({
                    "round_number": round_number,
                    "model": model.to_string(),
                    "success": success,
                    "text": message.text(),
                }),
            );
            if let Err(e) = self.repository.save_message(message).await {
                warn!(round_number, "Could not persist moderator message: {}", e);
            }
        }
        Ok(())
    }

    fn analysis_payload(&self, store: &ChatStore, round_number: u32, message_id: &str) -> AnalysisPayload {
        let mut payload = AnalysisPayload {
            summary: store.message(message_id).map(Message::text).unwrap_or_default(),
            ..AnalysisPayload::default()
        };
        for message in store.messages_in_round(round_number) {
            if let Some(index) = message.participant_index() {
                if message.has_error() {
                    payload.failed_participants.push(index);
                } else {
                    payload.contributing_participants.push(index);
                }
            }
        }
        payload
    }

    // ==================== Helpers ====================

    fn outcome(
        &self,
        store: &ChatStore,
        round_number: u32,
        flow_state: FlowState,
    ) -> Result<RoundOutcome, RunRoundError> {
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for message in store.messages_in_round(round_number) {
            if let Some(index) = message.participant_index() {
                if message.has_error() {
                    failed.push(index);
                } else {
                    succeeded.push(index);
                }
            }
        }
        Ok(RoundOutcome {
            thread_id: self.thread_id(store)?,
            round_number,
            succeeded,
            failed,
            moderator_status: store.analysis_for_round(round_number).map(|a| a.status),
            flow_state,
        })
    }

    fn log(&self, event_type: &'static str, payload: serde_json::Value) {
        self.conversation_logger
            .log(ConversationEvent::new(event_type, payload));
    }
}

/// Next stream event, or a `timeout` failure after `idle` of silence.
pub(crate) async fn next_event(
    handle: &mut StreamHandle,
    idle: Option<Duration>,
) -> Option<StreamEvent> {
    match idle {
        Some(limit) => match tokio::time::timeout(limit, handle.next()).await {
            Ok(event) => event,
            Err(_) => Some(StreamEvent::Failed(MessageError::from_category(
                ErrorCategory::Timeout,
            ))),
        },
        None => handle.next().await,
    }
}
