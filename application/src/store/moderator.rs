//! Moderator (analysis) records and the moderator stream.

use super::messages::insert_message;
use super::{ChatStore, StoreError, StoreState};
use roundtable_domain::orchestration::participants::{
    is_round_complete, next_pending_participant, terminal_participants,
};
use roundtable_domain::orchestration::round::find_slot;
use roundtable_domain::{
    AnalysisPayload, AnalysisRecord, DomainError, FinishReason, Message, MessageError,
    MessageSlot, Model, RecordStatus,
};
use tracing::info;

fn analysis_mut(s: &mut StoreState, round_number: u32) -> Result<&mut AnalysisRecord, StoreError> {
    s.analyses
        .iter_mut()
        .find(|a| a.round_number == round_number)
        .ok_or(StoreError::AnalysisNotFound(round_number))
}

fn moderator_message_mut(s: &mut StoreState, round_number: u32) -> Result<&mut Message, StoreError> {
    s.messages
        .iter_mut()
        .find(|m| m.round_number == round_number && m.slot() == MessageSlot::Moderator)
        .ok_or(StoreError::MessageNotFound(format!("r{}_moderator", round_number)))
}

impl ChatStore {
    // ==================== Guards ====================

    pub fn try_mark_moderator_created(&mut self, round_number: u32) -> bool {
        self.apply("try_mark_moderator_created", |s| {
            s.guards.try_mark_moderator_created(round_number)
        })
    }

    pub fn has_moderator_been_created(&self, round_number: u32) -> bool {
        self.state.guards.has_moderator_been_created(round_number)
    }

    pub fn try_mark_moderator_stream_triggered(&mut self, id: &str, round_number: u32) -> bool {
        self.apply("try_mark_moderator_stream_triggered", |s| {
            s.guards.try_mark_moderator_stream_triggered(id, round_number)
        })
    }

    pub fn has_moderator_stream_been_triggered(&self, id: &str, round_number: u32) -> bool {
        self.state
            .guards
            .has_moderator_stream_been_triggered(id, round_number)
    }

    pub fn clear_moderator_tracking(&mut self, round_number: u32) {
        self.apply("clear_moderator_tracking", |s| {
            s.guards.clear_moderator_tracking(round_number)
        });
    }

    pub fn set_is_creating_moderator(&mut self, creating: bool) {
        self.apply("set_is_creating_moderator", |s| {
            s.is_creating_moderator = creating
        });
    }

    // ==================== Analysis records ====================

    pub fn add_analysis(&mut self, record: AnalysisRecord) {
        self.apply("add_analysis", |s| {
            s.analyses.retain(|a| a.round_number != record.round_number);
            s.analyses.push(record);
            s.analyses.sort_by_key(|a| a.round_number);
        });
    }

    pub fn update_analysis_status(
        &mut self,
        round_number: u32,
        status: RecordStatus,
    ) -> Result<(), StoreError> {
        self.commit("update_analysis_status", |s| {
            analysis_mut(s, round_number)?.status = status;
            Ok(())
        })
    }

    /// Drop a round's analysis and moderator message so the synthesis can be
    /// triggered again. Pair with [`ChatStore::clear_moderator_tracking`].
    pub fn remove_analysis(&mut self, round_number: u32) {
        self.apply("remove_analysis", |s| {
            s.analyses.retain(|a| a.round_number != round_number);
            s.messages
                .retain(|m| !(m.round_number == round_number && m.is_moderator()));
        });
    }

    pub fn analysis_for_round(&self, round_number: u32) -> Option<&AnalysisRecord> {
        self.state
            .analyses
            .iter()
            .find(|a| a.round_number == round_number)
    }

    // ==================== Moderator lifecycle ====================

    /// Create the pending analysis record for a completed round.
    ///
    /// Returns `Ok(false)` when the record was already created for this
    /// round; the guard and the record commit together.
    pub fn create_moderator(&mut self, round_number: u32) -> Result<bool, StoreError> {
        self.commit("create_moderator", |s| {
            let thread_id = s.thread_id().ok_or(StoreError::NoThread)?.to_string();
            let count = s.participant_count();
            if !is_round_complete(&s.messages, round_number, count) {
                let index = next_pending_participant(&s.messages, round_number, count).unwrap_or(0);
                return Err(DomainError::ParticipantNotTerminal {
                    round_number,
                    index,
                }
                .into());
            }
            if !s.guards.try_mark_moderator_created(round_number) {
                return Ok(false);
            }

            let ids: Vec<String> = terminal_participants(&s.messages, round_number)
                .into_iter()
                .filter_map(|i| find_slot(&s.messages, round_number, MessageSlot::Participant(i)))
                .map(|m| m.id.clone())
                .collect();
            s.analyses.retain(|a| a.round_number != round_number);
            s.analyses
                .push(AnalysisRecord::pending(thread_id, round_number, ids));
            s.analyses.sort_by_key(|a| a.round_number);
            s.is_creating_moderator = true;
            info!(round_number, "Moderator created");
            Ok(true)
        })
    }

    /// Open the moderator stream. Returns the moderator message id, or `None`
    /// when this analysis was already streamed.
    pub fn start_moderator_streaming(
        &mut self,
        round_number: u32,
        model: Model,
    ) -> Result<Option<String>, StoreError> {
        self.commit("start_moderator_streaming", |s| {
            let thread_id = s.thread_id().ok_or(StoreError::NoThread)?.to_string();
            let analysis_id = analysis_mut(s, round_number)?.id.clone();
            if !s
                .guards
                .try_mark_moderator_stream_triggered(&analysis_id, round_number)
            {
                return Ok(None);
            }
            analysis_mut(s, round_number)?.status = RecordStatus::Streaming;

            let message = Message::moderator(&thread_id, round_number, model);
            let id = message.id.clone();
            insert_message(&mut s.messages, message);
            s.is_creating_moderator = false;
            s.is_moderator_streaming = true;
            Ok(Some(id))
        })
    }

    /// Returns `false` once the moderator stream is no longer live.
    pub fn append_moderator_chunk(&mut self, round_number: u32, chunk: &str) -> bool {
        self.commit("append_moderator_chunk", |s| {
            if !s.is_moderator_streaming {
                return Err(StoreError::NotStreaming);
            }
            moderator_message_mut(s, round_number)?.push_text(chunk);
            Ok(())
        })
        .is_ok()
    }

    pub fn complete_moderator(
        &mut self,
        round_number: u32,
        finish_reason: Option<FinishReason>,
        payload: AnalysisPayload,
    ) -> Result<(), StoreError> {
        self.commit("complete_moderator", |s| {
            if !s.is_moderator_streaming {
                return Err(StoreError::NotStreaming);
            }
            let message = moderator_message_mut(s, round_number)?;
            message.finish(finish_reason);
            let failure = message.error.clone();

            let analysis = analysis_mut(s, round_number)?;
            match failure {
                Some(error) => {
                    analysis.status = RecordStatus::Failed;
                    analysis.error_message = Some(error.message);
                }
                None => {
                    analysis.status = RecordStatus::Complete;
                    analysis.payload = Some(payload);
                }
            }
            s.is_moderator_streaming = false;
            Ok(())
        })
    }

    /// Analysis failure is terminal for the round; thread and messages stay intact.
    pub fn fail_moderator(
        &mut self,
        round_number: u32,
        error: MessageError,
    ) -> Result<(), StoreError> {
        self.commit("fail_moderator", |s| {
            if let Ok(message) = moderator_message_mut(s, round_number) {
                message.fail(error.clone());
            }
            let analysis = analysis_mut(s, round_number)?;
            analysis.status = RecordStatus::Failed;
            analysis.error_message = Some(error.message);
            s.is_moderator_streaming = false;
            s.is_creating_moderator = false;
            Ok(())
        })
    }
}
